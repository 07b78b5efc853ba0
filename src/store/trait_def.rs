use crate::model::VisitorAggregate;
use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("aggregate was modified since it was read")]
    Conflict,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A value read from the store together with the version stamp it was
/// read at. Version 0 means "no record exists yet".
#[derive(Debug, Clone, Default)]
pub struct Versioned<T> {
    pub value: T,
    pub version: u64,
}

/// Durable home of the visitor aggregate.
///
/// Each hosting backend supplies one implementation; the recording
/// protocol is written once against this contract. Reads are versioned
/// and writes are conditional so that concurrent read-modify-write
/// cycles cannot silently drop an increment: a write against a stale
/// version fails with [`StoreError::Conflict`] and the caller re-runs
/// the whole cycle.
#[async_trait]
pub trait AggregateStore: Send + Sync {
    /// Initialize the backend (create tables, directories, etc.)
    async fn init(&self) -> Result<()>;

    /// Read the current aggregate. A missing record is not an error: it
    /// reads as the zero aggregate at version 0.
    async fn fetch(&self) -> Result<Versioned<VisitorAggregate>>;

    /// Overwrite the whole aggregate, provided the stored version still
    /// equals `expected`.
    async fn persist(&self, aggregate: &VisitorAggregate, expected: u64) -> StoreResult<()>;
}
