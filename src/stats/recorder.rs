//! The visit recording protocol: fetch, merge, persist.

use crate::model::{VisitEvent, VisitorAggregate};
use crate::store::{AggregateStore, StoreError, Versioned};
use anyhow::{bail, Result};
use std::sync::Arc;
use tracing::debug;

/// Upper bound on conflicting-write retries. Each conflict implies some
/// other recorder persisted successfully in the meantime, so a cycle can
/// only lose as many races as there are concurrent writers.
const MAX_PERSIST_ATTEMPTS: u32 = 8;

/// Runs the recording cycle against whichever store backend is bound.
///
/// Recording is deliberately not idempotent: calling [`record`] twice
/// for the same visit counts twice. At-most-once per logical visit is
/// the caller's job (the client chain's session dedup).
///
/// [`record`]: VisitRecorder::record
#[derive(Clone)]
pub struct VisitRecorder {
    store: Arc<dyn AggregateStore>,
}

impl VisitRecorder {
    pub fn new(store: Arc<dyn AggregateStore>) -> Self {
        Self { store }
    }

    /// Merge one visit into the durable aggregate and return the merged
    /// result for display.
    ///
    /// The whole fetch-merge-persist cycle is re-run when the
    /// conditional write loses a race, so concurrent recorders never
    /// silently drop an increment.
    pub async fn record(&self, event: &VisitEvent) -> Result<VisitorAggregate> {
        for attempt in 1..=MAX_PERSIST_ATTEMPTS {
            let Versioned { mut value, version } = self.store.fetch().await?;
            value.apply(event);

            match self.store.persist(&value, version).await {
                Ok(()) => return Ok(value),
                Err(StoreError::Conflict) => {
                    debug!(attempt, version, "aggregate changed under us, retrying merge");
                }
                Err(StoreError::Other(e)) => return Err(e),
            }
        }
        bail!("gave up recording visit after {MAX_PERSIST_ATTEMPTS} conflicting writes")
    }

    /// Read-only path: the current aggregate, or all zeros when nothing
    /// has been recorded yet. Never mutates the store.
    pub async fn snapshot(&self) -> Result<VisitorAggregate> {
        Ok(self.store.fetch().await?.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn record_then_snapshot_sees_the_merge() {
        let recorder = VisitRecorder::new(Arc::new(MemoryStore::new()));

        let merged = recorder
            .record(&VisitEvent::new("Brazil", "BR", "\u{1F1E7}\u{1F1F7}"))
            .await
            .unwrap();
        assert_eq!(merged.total_visitors, 1);

        let snapshot = recorder.snapshot().await.unwrap();
        assert_eq!(snapshot, merged);
    }

    #[tokio::test]
    async fn snapshot_before_any_write_is_zero() {
        let recorder = VisitRecorder::new(Arc::new(MemoryStore::new()));
        let snapshot = recorder.snapshot().await.unwrap();
        assert_eq!(snapshot.total_visitors, 0);
        assert!(snapshot.countries.is_empty());
    }
}
