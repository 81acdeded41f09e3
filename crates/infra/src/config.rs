//! Record store configuration.

use std::sync::Arc;

use thiserror::Error;

use beerstock_inventory::{StockStore, StoreError};

use crate::store::{InMemoryStockStore, PostgresStockStore};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set when USE_PERSISTENT_STORES=true")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Which record store backs the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    InMemory,
    Postgres {
        database_url: String,
        max_connections: u32,
        run_migrations: bool,
    },
}

impl StoreConfig {
    pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

    /// Read from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read through an arbitrary key lookup (environment, test fixtures).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        if !parse_bool(&lookup, "USE_PERSISTENT_STORES", false)? {
            return Ok(StoreConfig::InMemory);
        }

        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            None => Self::DEFAULT_MAX_CONNECTIONS,
            Some(v) => v
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConfigError::Invalid {
                    key: "DATABASE_MAX_CONNECTIONS",
                    value: v,
                })?,
        };

        Ok(StoreConfig::Postgres {
            database_url,
            max_connections,
            run_migrations: parse_bool(&lookup, "RUN_MIGRATIONS", true)?,
        })
    }

    /// Build the configured store.
    pub async fn build(&self) -> Result<Arc<dyn StockStore>, StoreError> {
        match self {
            StoreConfig::InMemory => {
                tracing::info!("using in-memory record store");
                Ok(Arc::new(InMemoryStockStore::new()))
            }
            StoreConfig::Postgres {
                database_url,
                max_connections,
                run_migrations,
            } => {
                tracing::info!("using postgres record store (max_connections={max_connections})");
                let store = PostgresStockStore::connect(database_url, *max_connections).await?;
                if *run_migrations {
                    store.migrate().await?;
                }
                Ok(Arc::new(store))
            }
        }
    }
}

fn parse_bool(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: bool,
) -> Result<bool, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(v) => match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" | "" => Ok(false),
            _ => Err(ConfigError::Invalid { key, value: v }),
        },
    }
}
