pub mod db;
pub mod memory;
#[cfg(feature = "redis")]
pub mod redis_store;
pub mod store;
pub mod surreal;
pub mod types;
