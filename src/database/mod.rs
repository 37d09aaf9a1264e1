pub mod category;
pub mod pool;
pub mod query;
pub mod repo;
pub mod schema;
