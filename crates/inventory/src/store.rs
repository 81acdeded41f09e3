//! Record store port consumed by the stock service.

use std::sync::Arc;

use thiserror::Error;

use beerstock_core::BeerId;

use crate::item::StockItem;

/// Record store operation error.
///
/// These are **infrastructure errors**, distinct from the business-rule
/// failures in [`beerstock_core::DomainError`]. The service propagates them
/// unchanged.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be reached (closed pool, IO, timeout).
    #[error("record store unavailable: {0}")]
    Unavailable(String),

    /// The backend rejected or failed the operation.
    #[error("record store backend error: {0}")]
    Backend(String),

    /// A stored row could not be decoded into a [`StockItem`].
    #[error("corrupt record: {0}")]
    Corrupt(String),

    /// The store's own uniqueness guard rejected a name.
    #[error("name already stored: {0}")]
    DuplicateName(String),
}

/// Keyed record store for catalog entries.
///
/// `save` inserts when `item.id` is `None` (the store assigns the identifier)
/// and overwrites the existing record otherwise. `find_all` returns records in
/// the store's iteration order.
#[async_trait::async_trait]
pub trait StockStore: Send + Sync {
    async fn find_by_id(&self, id: BeerId) -> Result<Option<StockItem>, StoreError>;

    async fn find_by_name(&self, name: &str) -> Result<Option<StockItem>, StoreError>;

    async fn find_all(&self) -> Result<Vec<StockItem>, StoreError>;

    async fn save(&self, item: StockItem) -> Result<StockItem, StoreError>;

    async fn delete_by_id(&self, id: BeerId) -> Result<(), StoreError>;
}

#[async_trait::async_trait]
impl<S> StockStore for Arc<S>
where
    S: StockStore + ?Sized,
{
    async fn find_by_id(&self, id: BeerId) -> Result<Option<StockItem>, StoreError> {
        (**self).find_by_id(id).await
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<StockItem>, StoreError> {
        (**self).find_by_name(name).await
    }

    async fn find_all(&self) -> Result<Vec<StockItem>, StoreError> {
        (**self).find_all().await
    }

    async fn save(&self, item: StockItem) -> Result<StockItem, StoreError> {
        (**self).save(item).await
    }

    async fn delete_by_id(&self, id: BeerId) -> Result<(), StoreError> {
        (**self).delete_by_id(id).await
    }
}
