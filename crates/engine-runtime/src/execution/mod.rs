pub mod entity;
pub mod executor;
pub(crate) mod file;
pub mod scheduler;
