use crate::model::VisitorAggregate;
use crate::store::{AggregateStore, StoreError, StoreResult, Versioned};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Object-blob backend: the whole aggregate lives in one JSON document
/// at a fixed pathname, overwritten in place on every persist. The same
/// name is reused across writes so later reads observe the latest write.
///
/// The revision stamp is embedded in the document; a mutex serializes
/// the check-then-write so concurrent recorders in this process conflict
/// cleanly instead of clobbering each other.
pub struct FsBlobStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

#[derive(Debug, Serialize, Deserialize)]
struct BlobDocument {
    revision: u64,
    stats: VisitorAggregate,
}

impl FsBlobStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    async fn read_document(&self) -> Result<Option<BlobDocument>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("reading blob {}", self.path.display()))
            }
        };
        let doc = serde_json::from_slice(&bytes)
            .with_context(|| format!("parsing blob {}", self.path.display()))?;
        Ok(Some(doc))
    }
}

#[async_trait]
impl AggregateStore for FsBlobStore {
    async fn init(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("creating blob directory {}", parent.display()))?;
            }
        }
        Ok(())
    }

    async fn fetch(&self) -> Result<Versioned<VisitorAggregate>> {
        match self.read_document().await? {
            Some(doc) => Ok(Versioned {
                value: doc.stats,
                version: doc.revision,
            }),
            None => Ok(Versioned::default()),
        }
    }

    async fn persist(&self, aggregate: &VisitorAggregate, expected: u64) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;

        let current = self
            .read_document()
            .await?
            .map(|doc| doc.revision)
            .unwrap_or(0);
        if current != expected {
            return Err(StoreError::Conflict);
        }

        let doc = BlobDocument {
            revision: expected + 1,
            stats: aggregate.clone(),
        };
        let bytes = serde_json::to_vec(&doc).map_err(anyhow::Error::from)?;

        // Write-then-rename: readers observe either the old document or
        // the new one in full, never a torn write. The mutex serializes
        // writers, so one temp name in the same directory suffices.
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, bytes)
            .await
            .with_context(|| format!("writing blob {}", tmp.display()))
            .map_err(StoreError::Other)?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("replacing blob {}", self.path.display()))
            .map_err(StoreError::Other)?;
        Ok(())
    }
}
