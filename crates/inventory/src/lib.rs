//! Inventory domain module.
//!
//! Business rules for the beer catalog: name uniqueness on creation, existence
//! checks on lookup/delete/adjust, and the bounded stock increment. Storage is
//! reached only through the [`StockStore`] port; concrete stores live in
//! `beerstock-infra`.

pub mod item;
pub mod locks;
pub mod mapping;
pub mod service;
pub mod store;

pub use item::{BeerType, StockItem, StockItemDto};
pub use locks::KeyedLocks;
pub use mapping::{StockItemMapper, StockMapper};
pub use service::{StockError, StockService};
pub use store::{StockStore, StoreError};
