//! Stock service: catalog orchestration and the bounded-increment rule.
//!
//! ```text
//! caller (StockItemDto)
//!   ↓
//! StockService: uniqueness / existence / capacity checks
//!   ↓ StockMapper
//! StockStore (StockItem)
//! ```
//!
//! Check-then-act sequences run under a per-key lock: `create` locks the
//! candidate name, `increment` and `delete_by_id` lock the identifier. Two
//! requests touching the same key are therefore serialized inside one process.

use core::num::NonZeroU32;

use thiserror::Error;

use beerstock_core::{BeerId, DomainError};

use crate::item::{StockItem, StockItemDto};
use crate::locks::KeyedLocks;
use crate::mapping::{StockItemMapper, StockMapper};
use crate::store::{StockStore, StoreError};

/// Failure of a stock service operation.
#[derive(Debug, Error)]
pub enum StockError {
    /// Business-rule rejection (expected outcome, reported to the caller).
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Record store failure, propagated unchanged.
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct StockService<S, M = StockItemMapper> {
    store: S,
    mapper: M,
    name_locks: KeyedLocks<String>,
    id_locks: KeyedLocks<BeerId>,
}

impl<S> StockService<S>
where
    S: StockStore,
{
    pub fn new(store: S) -> Self {
        Self::with_mapper(store, StockItemMapper)
    }
}

impl<S, M> StockService<S, M>
where
    S: StockStore,
    M: StockMapper,
{
    pub fn with_mapper(store: S, mapper: M) -> Self {
        Self {
            store,
            mapper,
            name_locks: KeyedLocks::new(),
            id_locks: KeyedLocks::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Register a new catalog entry.
    ///
    /// Any identifier on the candidate is ignored; the store assigns one.
    pub async fn create(&self, item: StockItemDto) -> Result<StockItemDto, StockError> {
        let _guard = self.name_locks.lock(item.name.clone()).await;
        self.verify_not_registered(&item.name).await?;

        let mut stored = self.mapper.to_stored(item);
        stored.id = None;

        let saved = match self.store.save(stored).await {
            Ok(saved) => saved,
            // Another writer won the name between our check and the insert.
            Err(StoreError::DuplicateName(name)) => {
                tracing::warn!("store rejected duplicate beer name {name:?}");
                return Err(DomainError::already_registered(name).into());
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(
            id = ?saved.id,
            name = %saved.name,
            quantity = saved.quantity,
            max = saved.max,
            "beer registered"
        );
        Ok(self.mapper.to_external(saved))
    }

    pub async fn find_by_name(&self, name: &str) -> Result<StockItemDto, StockError> {
        tracing::debug!("looking up beer by name {name:?}");
        let item = self
            .store
            .find_by_name(name)
            .await?
            .ok_or_else(|| DomainError::not_found_name(name))?;
        Ok(self.mapper.to_external(item))
    }

    /// Every stored item in store-iteration order. Never fails on an empty store.
    pub async fn list_all(&self) -> Result<Vec<StockItemDto>, StockError> {
        let items = self.store.find_all().await?;
        tracing::debug!("listing {} beers", items.len());
        Ok(items
            .into_iter()
            .map(|item| self.mapper.to_external(item))
            .collect())
    }

    /// Delete an existing entry.
    ///
    /// The existence check is a separate store call so that a missing
    /// identifier surfaces as `NotFound` instead of a silent no-op.
    pub async fn delete_by_id(&self, id: BeerId) -> Result<(), StockError> {
        let _guard = self.id_locks.lock(id).await;
        self.verify_exists(id).await?;
        self.store.delete_by_id(id).await?;
        tracing::info!("beer {id} deleted");
        Ok(())
    }

    /// Add `quantity_to_increment` units to an item's stock.
    ///
    /// Reaching `max` exactly is allowed; going past it fails with
    /// `StockExceeded` and leaves the stored item untouched.
    pub async fn increment(
        &self,
        id: BeerId,
        quantity_to_increment: NonZeroU32,
    ) -> Result<StockItemDto, StockError> {
        let _guard = self.id_locks.lock(id).await;
        let mut item = self.verify_exists(id).await?;

        let requested = quantity_to_increment.get();
        if requested > item.headroom() {
            tracing::warn!(
                "rejected increment of {requested} for beer {id}: {} + {requested} > max {}",
                item.quantity,
                item.max
            );
            return Err(DomainError::stock_exceeded(id, requested, item.max).into());
        }

        // Within headroom, so the sum cannot pass max or overflow.
        item.quantity += requested;
        let saved = self.store.save(item).await?;
        tracing::info!("beer {id} stock incremented by {requested} to {}", saved.quantity);
        Ok(self.mapper.to_external(saved))
    }

    async fn verify_not_registered(&self, name: &str) -> Result<(), StockError> {
        if self.store.find_by_name(name).await?.is_some() {
            tracing::warn!("beer name {name:?} is already registered");
            return Err(DomainError::already_registered(name).into());
        }
        Ok(())
    }

    async fn verify_exists(&self, id: BeerId) -> Result<StockItem, StockError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found_id(id).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::BeerType;
    use beerstock_core::LookupKey;
    use proptest::prelude::*;
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        FindById(BeerId),
        FindByName(String),
        FindAll,
        Save(StockItem),
        DeleteById(BeerId),
    }

    /// Call-recording store double. Optionally yields between awaits so
    /// concurrent tasks interleave inside check-then-act sequences.
    #[derive(Debug, Default)]
    struct RecordingStore {
        items: Mutex<BTreeMap<BeerId, StockItem>>,
        next_id: Mutex<i64>,
        calls: Mutex<Vec<Call>>,
        interleave: bool,
    }

    impl RecordingStore {
        fn interleaving() -> Self {
            Self {
                interleave: true,
                ..Self::default()
            }
        }

        fn seeded(items: Vec<StockItem>) -> Self {
            let store = Self::default();
            {
                let mut map = store.items.lock().unwrap();
                let mut next = store.next_id.lock().unwrap();
                for item in items {
                    let id = item.id.expect("seeded items carry ids");
                    *next = (*next).max(id.get());
                    map.insert(id, item);
                }
            }
            store
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
            self.calls.lock().unwrap().iter().filter(|c| pred(*c)).count()
        }

        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }

        fn get(&self, id: BeerId) -> Option<StockItem> {
            self.items.lock().unwrap().get(&id).cloned()
        }

        async fn pause(&self) {
            if self.interleave {
                tokio::task::yield_now().await;
            }
        }
    }

    #[async_trait::async_trait]
    impl StockStore for RecordingStore {
        async fn find_by_id(&self, id: BeerId) -> Result<Option<StockItem>, StoreError> {
            self.record(Call::FindById(id));
            let found = self.get(id);
            self.pause().await;
            Ok(found)
        }

        async fn find_by_name(&self, name: &str) -> Result<Option<StockItem>, StoreError> {
            self.record(Call::FindByName(name.to_string()));
            let found = self
                .items
                .lock()
                .unwrap()
                .values()
                .find(|i| i.name == name)
                .cloned();
            self.pause().await;
            Ok(found)
        }

        async fn find_all(&self) -> Result<Vec<StockItem>, StoreError> {
            self.record(Call::FindAll);
            Ok(self.items.lock().unwrap().values().cloned().collect())
        }

        async fn save(&self, mut item: StockItem) -> Result<StockItem, StoreError> {
            self.record(Call::Save(item.clone()));
            let id = match item.id {
                Some(id) => id,
                None => {
                    let mut next = self.next_id.lock().unwrap();
                    *next += 1;
                    BeerId::new(*next)
                }
            };
            item.id = Some(id);
            self.items.lock().unwrap().insert(id, item.clone());
            Ok(item)
        }

        async fn delete_by_id(&self, id: BeerId) -> Result<(), StoreError> {
            self.record(Call::DeleteById(id));
            self.items.lock().unwrap().remove(&id);
            Ok(())
        }
    }

    /// Store whose backend is down.
    struct UnavailableStore;

    #[async_trait::async_trait]
    impl StockStore for UnavailableStore {
        async fn find_by_id(&self, _id: BeerId) -> Result<Option<StockItem>, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn find_by_name(&self, _name: &str) -> Result<Option<StockItem>, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn find_all(&self) -> Result<Vec<StockItem>, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn save(&self, _item: StockItem) -> Result<StockItem, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn delete_by_id(&self, _id: BeerId) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
    }

    /// Store that always loses the insert race on names.
    struct RacyNameStore;

    #[async_trait::async_trait]
    impl StockStore for RacyNameStore {
        async fn find_by_id(&self, _id: BeerId) -> Result<Option<StockItem>, StoreError> {
            Ok(None)
        }

        async fn find_by_name(&self, _name: &str) -> Result<Option<StockItem>, StoreError> {
            Ok(None)
        }

        async fn find_all(&self) -> Result<Vec<StockItem>, StoreError> {
            Ok(vec![])
        }

        async fn save(&self, item: StockItem) -> Result<StockItem, StoreError> {
            Err(StoreError::DuplicateName(item.name))
        }

        async fn delete_by_id(&self, _id: BeerId) -> Result<(), StoreError> {
            Ok(())
        }
    }

    const BRAHMA_ID: BeerId = BeerId::new(1);
    const MISSING_ID: BeerId = BeerId::new(999);

    fn brahma_dto() -> StockItemDto {
        StockItemDto {
            id: None,
            name: "Brahma".to_string(),
            brand: "Ambev".to_string(),
            max: 50,
            quantity: 10,
            beer_type: BeerType::Lager,
        }
    }

    fn stored_item(id: BeerId, name: &str, quantity: u32, max: u32) -> StockItem {
        StockItem {
            id: Some(id),
            name: name.to_string(),
            brand: "Ambev".to_string(),
            max,
            quantity,
            beer_type: BeerType::Lager,
        }
    }

    fn amount(n: u32) -> NonZeroU32 {
        NonZeroU32::new(n).unwrap()
    }

    fn expect_domain(err: StockError) -> DomainError {
        match err {
            StockError::Domain(e) => e,
            StockError::Store(e) => panic!("expected domain error, got store error {e:?}"),
        }
    }

    #[tokio::test]
    async fn create_saves_unregistered_beer_and_returns_it() {
        let service = StockService::new(RecordingStore::default());

        let created = service.create(brahma_dto()).await.unwrap();

        assert_eq!(created.id, Some(BRAHMA_ID));
        assert_eq!(created.name, "Brahma");
        assert_eq!(created.quantity, 10);
        assert_eq!(
            service.store().calls(),
            vec![
                Call::FindByName("Brahma".to_string()),
                Call::Save(StockItemMapper.to_stored(brahma_dto())),
            ]
        );
    }

    #[tokio::test]
    async fn create_ignores_caller_supplied_identifier() {
        let service = StockService::new(RecordingStore::default());
        let mut dto = brahma_dto();
        dto.id = Some(BeerId::new(77));

        let created = service.create(dto).await.unwrap();

        assert_eq!(created.id, Some(BRAHMA_ID));
        assert!(service.store().get(BeerId::new(77)).is_none());
    }

    #[tokio::test]
    async fn create_rejects_registered_name_without_saving() {
        let store = RecordingStore::seeded(vec![stored_item(BRAHMA_ID, "Brahma", 10, 50)]);
        let service = StockService::new(store);

        let err = expect_domain(service.create(brahma_dto()).await.unwrap_err());

        assert_eq!(err, DomainError::AlreadyRegistered("Brahma".to_string()));
        assert_eq!(service.store().count(|c| matches!(c, Call::Save(_))), 0);
    }

    #[tokio::test]
    async fn name_uniqueness_is_case_sensitive() {
        let store = RecordingStore::seeded(vec![stored_item(BRAHMA_ID, "Brahma", 10, 50)]);
        let service = StockService::new(store);
        let mut dto = brahma_dto();
        dto.name = "BRAHMA".to_string();

        let created = service.create(dto).await.unwrap();
        assert_eq!(created.name, "BRAHMA");
    }

    #[tokio::test]
    async fn create_reports_store_level_duplicate_as_already_registered() {
        let service = StockService::new(RacyNameStore);

        let err = expect_domain(service.create(brahma_dto()).await.unwrap_err());
        assert_eq!(err, DomainError::AlreadyRegistered("Brahma".to_string()));
    }

    #[tokio::test]
    async fn find_by_name_returns_created_beer() {
        let service = StockService::new(RecordingStore::default());
        let created = service.create(brahma_dto()).await.unwrap();

        let found = service.find_by_name("Brahma").await.unwrap();

        assert_eq!(found, created);
    }

    #[tokio::test]
    async fn find_by_name_fails_for_unknown_name() {
        let service = StockService::new(RecordingStore::default());

        let err = expect_domain(service.find_by_name("Skol").await.unwrap_err());

        assert_eq!(err, DomainError::NotFound(LookupKey::Name("Skol".to_string())));
    }

    #[tokio::test]
    async fn list_all_on_empty_store_is_empty() {
        let service = StockService::new(RecordingStore::default());

        assert!(service.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_all_returns_one_entry_per_item_in_store_order() {
        let store = RecordingStore::seeded(vec![
            stored_item(BeerId::new(2), "Skol", 0, 20),
            stored_item(BRAHMA_ID, "Brahma", 10, 50),
        ]);
        let service = StockService::new(store);

        let names: Vec<_> = service
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.name)
            .collect();

        assert_eq!(names, vec!["Brahma", "Skol"]);
    }

    #[tokio::test]
    async fn delete_checks_existence_then_deletes() {
        let store = RecordingStore::seeded(vec![stored_item(BRAHMA_ID, "Brahma", 10, 50)]);
        let service = StockService::new(store);

        service.delete_by_id(BRAHMA_ID).await.unwrap();

        assert_eq!(
            service.store().calls(),
            vec![Call::FindById(BRAHMA_ID), Call::DeleteById(BRAHMA_ID)]
        );
        let err = expect_domain(service.find_by_name("Brahma").await.unwrap_err());
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_of_missing_id_fails_without_delete_call() {
        let service = StockService::new(RecordingStore::default());

        let err = expect_domain(service.delete_by_id(MISSING_ID).await.unwrap_err());

        assert_eq!(err, DomainError::NotFound(LookupKey::Id(MISSING_ID)));
        assert_eq!(service.store().calls(), vec![Call::FindById(MISSING_ID)]);
    }

    #[tokio::test]
    async fn increment_adds_quantity_below_max() {
        let store = RecordingStore::seeded(vec![stored_item(BRAHMA_ID, "Brahma", 10, 50)]);
        let service = StockService::new(store);

        let updated = service.increment(BRAHMA_ID, amount(10)).await.unwrap();

        assert_eq!(updated.quantity, 20);
        assert!(updated.quantity < updated.max);
        assert_eq!(service.store().get(BRAHMA_ID).unwrap().quantity, 20);
    }

    #[tokio::test]
    async fn increment_past_max_fails_and_leaves_item_untouched() {
        let store = RecordingStore::seeded(vec![stored_item(BRAHMA_ID, "Brahma", 10, 50)]);
        let service = StockService::new(store);

        service.increment(BRAHMA_ID, amount(10)).await.unwrap();
        let err = expect_domain(service.increment(BRAHMA_ID, amount(45)).await.unwrap_err());

        assert_eq!(
            err,
            DomainError::StockExceeded {
                id: BRAHMA_ID,
                requested: 45,
                max: 50
            }
        );
        assert_eq!(service.store().get(BRAHMA_ID).unwrap().quantity, 20);
        assert_eq!(service.store().count(|c| matches!(c, Call::Save(_))), 1);
    }

    #[tokio::test]
    async fn increment_near_u32_max_reports_stock_exceeded() {
        let store = RecordingStore::seeded(vec![stored_item(BRAHMA_ID, "Brahma", u32::MAX - 1, u32::MAX)]);
        let service = StockService::new(store);

        let err = expect_domain(service.increment(BRAHMA_ID, amount(2)).await.unwrap_err());
        assert!(matches!(err, DomainError::StockExceeded { .. }));
    }

    #[tokio::test]
    async fn overfull_item_rejects_every_increment() {
        let store = RecordingStore::seeded(vec![stored_item(BRAHMA_ID, "Brahma", 60, 50)]);
        let service = StockService::new(store);

        let err = expect_domain(service.increment(BRAHMA_ID, amount(1)).await.unwrap_err());
        assert!(matches!(err, DomainError::StockExceeded { requested: 1, max: 50, .. }));
        assert_eq!(service.store().get(BRAHMA_ID).unwrap().quantity, 60);
        assert_eq!(service.store().count(|c| matches!(c, Call::Save(_))), 0);
    }

    #[tokio::test]
    async fn increment_of_missing_id_fails_with_not_found() {
        let service = StockService::new(RecordingStore::default());

        for n in [1, 45, u32::MAX] {
            let err = expect_domain(service.increment(MISSING_ID, amount(n)).await.unwrap_err());
            assert_eq!(err, DomainError::NotFound(LookupKey::Id(MISSING_ID)));
        }
        assert_eq!(service.store().count(|c| matches!(c, Call::Save(_))), 0);
    }

    #[tokio::test]
    async fn store_failures_propagate_unchanged() {
        let service = StockService::new(UnavailableStore);

        assert!(matches!(
            service.create(brahma_dto()).await,
            Err(StockError::Store(StoreError::Unavailable(_)))
        ));
        assert!(matches!(
            service.list_all().await,
            Err(StockError::Store(StoreError::Unavailable(_)))
        ));
        assert!(matches!(
            service.increment(BRAHMA_ID, amount(1)).await,
            Err(StockError::Store(StoreError::Unavailable(_)))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creates_of_same_name_register_once() {
        let service = Arc::new(StockService::new(RecordingStore::interleaving()));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let service = service.clone();
            handles.push(tokio::spawn(async move { service.create(brahma_dto()).await }));
        }

        let mut created = 0;
        let mut rejected = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(_) => created += 1,
                Err(StockError::Domain(DomainError::AlreadyRegistered(_))) => rejected += 1,
                Err(e) => panic!("unexpected error {e:?}"),
            }
        }

        assert_eq!((created, rejected), (1, 7));
        assert_eq!(service.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_increments_never_exceed_max() {
        let store = RecordingStore {
            interleave: true,
            ..RecordingStore::seeded(vec![stored_item(BRAHMA_ID, "Brahma", 0, 100)])
        };
        let service = Arc::new(StockService::new(store));

        let mut handles = Vec::new();
        for _ in 0..25 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                service.increment(BRAHMA_ID, amount(5)).await
            }));
        }

        let mut ok = 0;
        for h in handles {
            if h.await.unwrap().is_ok() {
                ok += 1;
            }
        }

        assert_eq!(ok, 20);
        assert_eq!(service.store().get(BRAHMA_ID).unwrap().quantity, 100);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: filling exactly to max succeeds; one unit more fails and
        /// leaves the quantity where it was.
        #[test]
        fn increment_boundary_is_inclusive(
            (max, quantity) in (1u32..10_000).prop_flat_map(|m| (Just(m), 0..m))
        ) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let headroom = max - quantity;

                let store = RecordingStore::seeded(vec![stored_item(BRAHMA_ID, "Brahma", quantity, max)]);
                let service = StockService::new(store);
                let over = service.increment(BRAHMA_ID, amount(headroom + 1)).await;
                let exceeded = matches!(
                    over,
                    Err(StockError::Domain(DomainError::StockExceeded { .. }))
                );
                prop_assert!(exceeded, "increment past max must be StockExceeded");
                prop_assert_eq!(service.store().get(BRAHMA_ID).unwrap().quantity, quantity);

                let filled = service.increment(BRAHMA_ID, amount(headroom)).await.unwrap();
                prop_assert_eq!(filled.quantity, max);
                Ok(())
            })?;
        }
    }
}
