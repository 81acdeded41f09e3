//! Postgres-backed record store.
//!
//! Maps onto the `beers` table (see `migrations/0001_create_beers.sql`).
//! Name uniqueness is enforced by a `UNIQUE` constraint, so a racing insert
//! from another process surfaces as [`StoreError::DuplicateName`].

use std::sync::Arc;

use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

use beerstock_core::BeerId;
use beerstock_inventory::{BeerType, StockItem, StockStore, StoreError};

const SCHEMA: &str = include_str!("../../migrations/0001_create_beers.sql");

const COLUMNS: &str = "id, name, brand, max_quantity, quantity, beer_type";

/// Postgres-backed record store for catalog entries.
///
/// ## Thread Safety
///
/// Uses the SQLx connection pool, which is `Send + Sync` and cheap to clone.
#[derive(Debug, Clone)]
pub struct PostgresStockStore {
    pool: Arc<PgPool>,
}

impl PostgresStockStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Open a pool against `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Apply the bundled schema. Idempotent.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        tracing::info!("beers schema applied");
        Ok(())
    }
}

#[async_trait::async_trait]
impl StockStore for PostgresStockStore {
    async fn find_by_id(&self, id: BeerId) -> Result<Option<StockItem>, StoreError> {
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM beers WHERE id = $1"))
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_by_id", e))?;

        row.as_ref().map(item_from_row).transpose()
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<StockItem>, StoreError> {
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM beers WHERE name = $1"))
            .bind(name)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_by_name", e))?;

        row.as_ref().map(item_from_row).transpose()
    }

    async fn find_all(&self) -> Result<Vec<StockItem>, StoreError> {
        let rows = sqlx::query(&format!("SELECT {COLUMNS} FROM beers ORDER BY id"))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_all", e))?;

        rows.iter().map(item_from_row).collect()
    }

    async fn save(&self, item: StockItem) -> Result<StockItem, StoreError> {
        let max = i32::try_from(item.max)
            .map_err(|_| StoreError::Backend(format!("max {} does not fit INTEGER", item.max)))?;
        let quantity = i32::try_from(item.quantity).map_err(|_| {
            StoreError::Backend(format!("quantity {} does not fit INTEGER", item.quantity))
        })?;

        let row = match item.id {
            None => {
                sqlx::query(&format!(
                    r#"
                    INSERT INTO beers (name, brand, max_quantity, quantity, beer_type)
                    VALUES ($1, $2, $3, $4, $5)
                    RETURNING {COLUMNS}
                    "#
                ))
                .bind(&item.name)
                .bind(&item.brand)
                .bind(max)
                .bind(quantity)
                .bind(item.beer_type.as_str())
                .fetch_one(&*self.pool)
                .await
            }
            Some(id) => {
                sqlx::query(&format!(
                    r#"
                    INSERT INTO beers (id, name, brand, max_quantity, quantity, beer_type)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    ON CONFLICT (id)
                    DO UPDATE SET
                        name = EXCLUDED.name,
                        brand = EXCLUDED.brand,
                        max_quantity = EXCLUDED.max_quantity,
                        quantity = EXCLUDED.quantity,
                        beer_type = EXCLUDED.beer_type
                    RETURNING {COLUMNS}
                    "#
                ))
                .bind(id.get())
                .bind(&item.name)
                .bind(&item.brand)
                .bind(max)
                .bind(quantity)
                .bind(item.beer_type.as_str())
                .fetch_one(&*self.pool)
                .await
            }
        };

        match row {
            Ok(row) => item_from_row(&row),
            Err(e) if is_unique_violation(&e) => Err(StoreError::DuplicateName(item.name)),
            Err(e) => Err(map_sqlx_error("save", e)),
        }
    }

    async fn delete_by_id(&self, id: BeerId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM beers WHERE id = $1")
            .bind(id.get())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_by_id", e))?;
        Ok(())
    }
}

fn item_from_row(row: &PgRow) -> Result<StockItem, StoreError> {
    decode_item(BeerRow {
        id: row.try_get("id").map_err(corrupt)?,
        name: row.try_get("name").map_err(corrupt)?,
        brand: row.try_get("brand").map_err(corrupt)?,
        max: row.try_get("max_quantity").map_err(corrupt)?,
        quantity: row.try_get("quantity").map_err(corrupt)?,
        beer_type: row.try_get("beer_type").map_err(corrupt)?,
    })
}

/// Raw column values of one `beers` row.
struct BeerRow {
    id: i64,
    name: String,
    brand: String,
    max: i32,
    quantity: i32,
    beer_type: String,
}

fn decode_item(row: BeerRow) -> Result<StockItem, StoreError> {
    let id = row.id;
    Ok(StockItem {
        id: Some(BeerId::new(id)),
        name: row.name,
        brand: row.brand,
        max: u32::try_from(row.max)
            .map_err(|_| StoreError::Corrupt(format!("beer {id}: negative max {}", row.max)))?,
        quantity: u32::try_from(row.quantity).map_err(|_| {
            StoreError::Corrupt(format!("beer {id}: negative quantity {}", row.quantity))
        })?,
        beer_type: row
            .beer_type
            .parse::<BeerType>()
            .map_err(|e| StoreError::Corrupt(format!("beer {id}: {e}")))?,
    })
}

fn corrupt(err: sqlx::Error) -> StoreError {
    StoreError::Corrupt(err.to_string())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            StoreError::Backend(format!("database error in {}: {}", operation, db_err.message()))
        }
        sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut => {
            StoreError::Unavailable(format!("connection pool unavailable in {}", operation))
        }
        sqlx::Error::Io(e) => StoreError::Unavailable(format!("io error in {}: {}", operation, e)),
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::ColumnNotFound(_) => {
            StoreError::Corrupt(format!("{} in {}", err, operation))
        }
        other => StoreError::Backend(format!("sqlx error in {}: {}", operation, other)),
    }
}
