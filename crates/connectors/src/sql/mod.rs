pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;
