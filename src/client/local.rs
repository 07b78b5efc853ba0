use crate::model::{CountryEntry, VisitEvent, VisitorAggregate};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Client-local statistics: the degraded, non-authoritative replica of
/// the aggregate scoped to this machine. Serves as tier-3 storage and
/// as the country book-keeping for tier 2. Recording here depends on no
/// network, so it cannot fail the visit; a disk error is logged and the
/// in-memory result still returned.
pub struct LocalStats {
    path: PathBuf,
}

impl LocalStats {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Last cached local values; missing or unreadable file reads as the
    /// zero aggregate.
    pub async fn load(&self) -> VisitorAggregate {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_default(),
            Err(_) => VisitorAggregate::default(),
        }
    }

    /// Tier 3: merge the whole visit (total and country) locally.
    pub async fn record(&self, event: &VisitEvent) -> VisitorAggregate {
        let mut stats = self.load().await;
        stats.apply(event);
        self.save(&stats).await;
        stats
    }

    /// Tier-2 companion: the total came from the counter API, so only
    /// the country breakdown is advanced here.
    pub async fn record_country(&self, event: &VisitEvent) -> BTreeMap<String, CountryEntry> {
        let mut stats = self.load().await;
        let before = stats.total_visitors;
        stats.apply(event);
        stats.total_visitors = before;
        self.save(&stats).await;
        stats.countries
    }

    async fn save(&self, stats: &VisitorAggregate) {
        let result = async {
            if let Some(parent) = self.path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
            let bytes = serde_json::to_vec(stats)?;
            tokio::fs::write(&self.path, bytes).await?;
            anyhow::Ok(())
        }
        .await;

        if let Err(e) = result {
            warn!(
                "Could not persist local stats to {}: {e:#}",
                self.path.display()
            );
        }
    }
}
