pub mod file;
pub mod sql;
pub mod storage;
