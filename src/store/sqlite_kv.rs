use crate::model::VisitorAggregate;
use crate::store::{AggregateStore, StoreError, StoreResult, Versioned};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

const TOTAL_KEY: &str = "total-visitors";
const COUNTRIES_KEY: &str = "countries-data";
const REVISION_KEY: &str = "revision";

/// Edge key-value backend: the aggregate is split across two separately
/// named records, an integer-as-string counter and a JSON country map,
/// the way the KV-hosted variant of this service stores them. A third
/// record carries the revision stamp; the conditional write checks it
/// inside a transaction so both records move together or not at all.
pub struct SqliteKvStore {
    pool: Arc<SqlitePool>,
}

impl SqliteKvStore {
    pub async fn new(database_url: &str) -> Result<Self> {
        // Writers queue on the busy handler instead of failing outright
        // when another recorder holds the write lock.
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("parsing {database_url}"))?
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .with_context(|| format!("connecting to {database_url}"))?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }
}

#[async_trait]
impl AggregateStore for SqliteKvStore {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;
        Ok(())
    }

    async fn fetch(&self) -> Result<Versioned<VisitorAggregate>> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT key, value FROM kv WHERE key IN (?, ?, ?)")
                .bind(TOTAL_KEY)
                .bind(COUNTRIES_KEY)
                .bind(REVISION_KEY)
                .fetch_all(self.pool.as_ref())
                .await?;

        let mut total_visitors = 0u64;
        let mut countries = BTreeMap::new();
        let mut version = 0u64;

        for (key, value) in rows {
            match key.as_str() {
                TOTAL_KEY => {
                    total_visitors = value
                        .parse()
                        .with_context(|| format!("invalid {TOTAL_KEY} record: {value:?}"))?;
                }
                COUNTRIES_KEY => {
                    countries = serde_json::from_str(&value)
                        .with_context(|| format!("invalid {COUNTRIES_KEY} record"))?;
                }
                REVISION_KEY => {
                    version = value
                        .parse()
                        .with_context(|| format!("invalid {REVISION_KEY} record: {value:?}"))?;
                }
                _ => {}
            }
        }

        Ok(Versioned {
            value: VisitorAggregate {
                total_visitors,
                countries,
            },
            version,
        })
    }

    async fn persist(&self, aggregate: &VisitorAggregate, expected: u64) -> StoreResult<()> {
        let countries_json =
            serde_json::to_string(&aggregate.countries).map_err(anyhow::Error::from)?;

        // Take the write lock up front: a deferred transaction would
        // grab a read lock on the revision check and then fail its
        // upgrade with SQLITE_BUSY whenever another recorder is racing.
        let mut tx = self
            .pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(|e| StoreError::Other(e.into()))?;

        let current: Option<(String,)> = sqlx::query_as("SELECT value FROM kv WHERE key = ?")
            .bind(REVISION_KEY)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| StoreError::Other(e.into()))?;
        let current: u64 = match current {
            Some((value,)) => value
                .parse()
                .map_err(|_| StoreError::Other(anyhow::anyhow!("invalid revision: {value:?}")))?,
            None => 0,
        };
        if current != expected {
            return Err(StoreError::Conflict);
        }

        for (key, value) in [
            (TOTAL_KEY, aggregate.total_visitors.to_string()),
            (COUNTRIES_KEY, countries_json),
            (REVISION_KEY, (expected + 1).to_string()),
        ] {
            sqlx::query("INSERT OR REPLACE INTO kv (key, value) VALUES (?, ?)")
                .bind(key)
                .bind(value)
                .execute(&mut *tx)
                .await
                .map_err(|e| StoreError::Other(e.into()))?;
        }

        tx.commit().await.map_err(|e| StoreError::Other(e.into()))?;
        Ok(())
    }
}
