use std::collections::BTreeMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicI64, Ordering};

use beerstock_core::BeerId;
use beerstock_inventory::{StockItem, StockStore, StoreError};

/// In-memory record store for tests/dev.
///
/// Identifiers are assigned from a monotonic counter starting at 1 and are
/// never reused. Iteration order is identifier order.
#[derive(Debug)]
pub struct InMemoryStockStore {
    inner: RwLock<BTreeMap<BeerId, StockItem>>,
    last_id: AtomicI64,
}

impl InMemoryStockStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(BTreeMap::new()),
            last_id: AtomicI64::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn poisoned() -> StoreError {
        StoreError::Unavailable("in-memory store lock poisoned".to_string())
    }
}

impl Default for InMemoryStockStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl StockStore for InMemoryStockStore {
    async fn find_by_id(&self, id: BeerId) -> Result<Option<StockItem>, StoreError> {
        let map = self.inner.read().map_err(|_| Self::poisoned())?;
        Ok(map.get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<StockItem>, StoreError> {
        let map = self.inner.read().map_err(|_| Self::poisoned())?;
        Ok(map.values().find(|item| item.name == name).cloned())
    }

    async fn find_all(&self) -> Result<Vec<StockItem>, StoreError> {
        let map = self.inner.read().map_err(|_| Self::poisoned())?;
        Ok(map.values().cloned().collect())
    }

    async fn save(&self, mut item: StockItem) -> Result<StockItem, StoreError> {
        let mut map = self.inner.write().map_err(|_| Self::poisoned())?;

        // Mirror the unique index a relational backend would carry on `name`.
        if map
            .values()
            .any(|existing| existing.name == item.name && existing.id != item.id)
        {
            return Err(StoreError::DuplicateName(item.name));
        }

        let id = match item.id {
            Some(id) => {
                self.last_id.fetch_max(id.get(), Ordering::SeqCst);
                id
            }
            None => BeerId::new(self.last_id.fetch_add(1, Ordering::SeqCst) + 1),
        };
        item.id = Some(id);
        map.insert(id, item.clone());
        Ok(item)
    }

    async fn delete_by_id(&self, id: BeerId) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| Self::poisoned())?;
        map.remove(&id);
        Ok(())
    }
}
