use anyhow::{Context, Result};
use serde::Deserialize;

/// Tier-2 fallback: a public, unauthenticated counter API keyed by a
/// fixed namespace/key pair. Carries only the total; the per-country
/// breakdown in this mode lives in the client-local replica.
pub struct CounterApi {
    http: reqwest::Client,
    base_url: String,
    namespace: String,
    key: String,
}

#[derive(Debug, Deserialize)]
struct CounterValue {
    value: Option<u64>,
}

impl CounterApi {
    pub fn new(http: reqwest::Client, base_url: &str, namespace: &str, key: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            namespace: namespace.to_string(),
            key: key.to_string(),
        }
    }

    /// Increment the counter and return the new value.
    pub async fn hit(&self) -> Result<u64> {
        self.call("hit").await.context("counter API hit failed")
    }

    /// Read the counter without incrementing.
    pub async fn read(&self) -> Result<u64> {
        self.call("get").await.context("counter API read failed")
    }

    async fn call(&self, op: &str) -> Result<u64> {
        let url = format!("{}/{op}/{}/{}", self.base_url, self.namespace, self.key);
        let counter: CounterValue = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(counter.value.unwrap_or(0))
    }
}
