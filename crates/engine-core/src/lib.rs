pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod report;
