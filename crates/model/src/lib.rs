pub mod core;
pub mod entity;
pub mod events;
pub mod records;
