pub mod committer;
pub mod locator;
pub mod mapper;
pub mod upsert;
