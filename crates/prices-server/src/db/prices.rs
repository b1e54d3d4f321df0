//! Price persistence
//!
//! [`PriceStore`] is the seam between the HTTP features and the database.
//! [`PgPriceStore`] is the PostgreSQL implementation; tests substitute their
//! own.
//!
//! # Consistency
//!
//! `insert_batch` is all-or-nothing: every row goes through one transaction
//! and any failed insert rolls the whole batch back. `compute_stats` runs
//! afterwards as a separate read, so it sees whatever is committed at that
//! moment, including batches committed concurrently by other requests.

use std::sync::Arc;

use async_trait::async_trait;
use prices_common::{IngestionStats, PriceRecord};
use sqlx::PgPool;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::StoredPrice;

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("Failed to start transaction: {0}")]
    Begin(#[source] sqlx::Error),

    #[error("Failed to insert record {index} of the batch: {source}")]
    Insert {
        index: usize,
        #[source]
        source: sqlx::Error,
    },

    #[error("Failed to commit transaction: {0}")]
    Commit(#[source] sqlx::Error),

    #[error("Failed to query prices: {0}")]
    Query(#[source] sqlx::Error),
}

#[async_trait]
pub trait PriceStore: Send + Sync {
    /// Insert every record in one transaction. Returns the number inserted,
    /// which on success is always `records.len()`.
    async fn insert_batch(&self, records: &[PriceRecord]) -> Result<u64, PersistError>;

    /// Aggregate the whole stored dataset; `inserted` becomes `total_items`.
    async fn compute_stats(&self, inserted: u64) -> Result<IngestionStats, PersistError>;

    /// Every stored row, ordered by id.
    async fn fetch_all(&self) -> Result<Vec<StoredPrice>, PersistError>;

    async fn ping(&self) -> Result<(), PersistError>;
}

pub type SharedPriceStore = Arc<dyn PriceStore>;

const INSERT_PRICE: &str =
    "INSERT INTO prices (name, category, price, create_date) VALUES ($1, $2, $3, $4)";

const SELECT_STATS: &str = r#"
    SELECT
        COUNT(DISTINCT category) AS total_categories,
        COALESCE(SUM(price), 0)::FLOAT8 AS total_price
    FROM prices
"#;

const SELECT_ALL: &str =
    "SELECT id, name, category, price, create_date FROM prices ORDER BY id";

#[derive(Clone)]
pub struct PgPriceStore {
    pool: PgPool,
}

impl PgPriceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn shared(pool: PgPool) -> SharedPriceStore {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl PriceStore for PgPriceStore {
    #[tracing::instrument(skip(self, records), fields(batch_size = records.len()))]
    async fn insert_batch(&self, records: &[PriceRecord]) -> Result<u64, PersistError> {
        let mut tx = self.pool.begin().await.map_err(PersistError::Begin)?;

        for (index, record) in records.iter().enumerate() {
            let result = sqlx::query(INSERT_PRICE)
                .bind(&record.name)
                .bind(&record.category)
                .bind(&record.price)
                .bind(record.create_date)
                .execute(&mut *tx)
                .await;

            if let Err(source) = result {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "Rollback after failed insert also failed");
                }
                return Err(PersistError::Insert { index, source });
            }
        }

        tx.commit().await.map_err(PersistError::Commit)?;

        debug!(inserted = records.len(), "Price batch committed");
        Ok(records.len() as u64)
    }

    #[tracing::instrument(skip(self))]
    async fn compute_stats(&self, inserted: u64) -> Result<IngestionStats, PersistError> {
        let (total_categories, total_price): (i64, f64) = sqlx::query_as(SELECT_STATS)
            .fetch_one(&self.pool)
            .await
            .map_err(PersistError::Query)?;

        Ok(IngestionStats {
            total_items: inserted,
            total_categories,
            total_price,
        })
    }

    async fn fetch_all(&self) -> Result<Vec<StoredPrice>, PersistError> {
        sqlx::query_as::<_, StoredPrice>(SELECT_ALL)
            .fetch_all(&self.pool)
            .await
            .map_err(PersistError::Query)
    }

    async fn ping(&self) -> Result<(), PersistError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(PersistError::Query)
    }
}
