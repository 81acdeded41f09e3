use std::sync::Arc;

use anyhow::Context;

use beerstock_infra::{InMemoryStockStore, StoreConfig};
use beerstock_inventory::{StockService, StockStore};

/// Record store behind the API, chosen at startup.
pub type DynStockStore = Arc<dyn StockStore>;

/// Services shared by every handler.
pub struct AppServices {
    stock: StockService<DynStockStore>,
}

impl AppServices {
    pub fn new(store: DynStockStore) -> Self {
        Self {
            stock: StockService::new(store),
        }
    }

    /// In-memory wiring (dev/test).
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryStockStore::new()))
    }

    pub fn stock(&self) -> &StockService<DynStockStore> {
        &self.stock
    }
}

pub async fn build_services(config: &StoreConfig) -> anyhow::Result<AppServices> {
    let store = config
        .build()
        .await
        .context("failed to initialize record store")?;
    Ok(AppServices::new(store))
}
