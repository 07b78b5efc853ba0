use crate::model::VisitorAggregate;
use crate::store::{AggregateStore, StoreError, StoreResult, Versioned};
use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;

/// In-process store, bound when the configuration names no durable
/// backend. Reads then always see a well-defined (empty) aggregate
/// instead of failing; nothing survives a restart. Also the workhorse
/// of the test suite.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<Versioned<VisitorAggregate>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AggregateStore for MemoryStore {
    async fn init(&self) -> Result<()> {
        Ok(())
    }

    async fn fetch(&self) -> Result<Versioned<VisitorAggregate>> {
        Ok(self.state.lock().await.clone())
    }

    async fn persist(&self, aggregate: &VisitorAggregate, expected: u64) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        if state.version != expected {
            return Err(StoreError::Conflict);
        }
        state.value = aggregate.clone();
        state.version += 1;
        Ok(())
    }
}
