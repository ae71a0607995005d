pub mod sink;

pub use sink::{ChannelSink, CollectingSink, EventSink, TracingSink};
