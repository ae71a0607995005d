pub mod params;
pub mod query;
pub mod row;
pub mod store;
pub mod utils;
