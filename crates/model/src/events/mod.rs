pub mod ingest;

use std::fmt::Debug;

/// A trait for events published to an event sink.
pub trait Event: Send + Sync + Debug + 'static {
    /// Returns a unique identifier for this event type.
    fn event_type(&self) -> &'static str;
}
