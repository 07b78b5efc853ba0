use crate::model::VisitorAggregate;
use crate::store::{AggregateStore, StoreError, StoreResult, Versioned};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{ETAG, IF_MATCH};
use reqwest::StatusCode;

/// Name of the blob, kept stable across writes so reads always observe
/// the latest overwrite.
const BLOB_NAME: &str = "visitor-stats.json";

/// Remote blob backend: a plain HTTP store exposing GET/PUT on a fixed
/// pathname. The version stamp travels as the `ETag`; conditional writes
/// send `If-Match` and a 412 from the store maps to a conflict.
pub struct HttpBlobStore {
    http: reqwest::Client,
    base_url: String,
}

impl HttpBlobStore {
    pub fn new(base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .context("building HTTP client for blob store")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn blob_url(&self) -> String {
        format!("{}/{}", self.base_url, BLOB_NAME)
    }

    fn parse_etag(value: Option<&reqwest::header::HeaderValue>) -> u64 {
        value
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim_matches('"'))
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }
}

#[async_trait]
impl AggregateStore for HttpBlobStore {
    async fn init(&self) -> Result<()> {
        Ok(())
    }

    async fn fetch(&self) -> Result<Versioned<VisitorAggregate>> {
        let response = self
            .http
            .get(self.blob_url())
            .send()
            .await
            .context("fetching aggregate blob")?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Versioned::default());
        }
        let response = response
            .error_for_status()
            .context("fetching aggregate blob")?;

        let version = Self::parse_etag(response.headers().get(ETAG));
        let value: VisitorAggregate = response
            .json()
            .await
            .context("decoding aggregate blob body")?;

        Ok(Versioned { value, version })
    }

    async fn persist(&self, aggregate: &VisitorAggregate, expected: u64) -> StoreResult<()> {
        let response = self
            .http
            .put(self.blob_url())
            .header(IF_MATCH, format!("\"{expected}\""))
            .json(aggregate)
            .send()
            .await
            .context("persisting aggregate blob")?;

        if response.status() == StatusCode::PRECONDITION_FAILED {
            return Err(StoreError::Conflict);
        }
        response
            .error_for_status()
            .context("persisting aggregate blob")?;
        Ok(())
    }
}
