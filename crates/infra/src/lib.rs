//! Infrastructure layer: record store adapters and their configuration.

pub mod config;
pub mod store;


pub use config::{ConfigError, StoreConfig};
pub use store::{InMemoryStockStore, PostgresStockStore};
