use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub store: StoreConfig,
    pub server: ServerConfig,
    pub client: ClientConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub blob_path: String,
    pub database_url: String,
    pub remote_store_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// JSON document blob on the local filesystem
    Blob,
    /// SQLite-backed key-value records
    Kv,
    /// Remote HTTP blob store
    Http,
    /// Nothing bound; stats read as zeros and do not survive restarts
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Settings for the client-side fallback chain (the `tally-track` CLI).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Tier 1: the remote tracking endpoint
    pub track_endpoint: String,
    /// IP-geolocation lookup endpoint (ipapi-compatible)
    pub geo_api_url: String,
    /// Tier 2: public counter API base URL (countapi-compatible)
    pub counter_api_url: String,
    pub counter_namespace: String,
    pub counter_key: String,
    /// Directory holding session marker and local-only stats
    pub state_dir: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let backend_str = std::env::var("STORE_BACKEND").unwrap_or_else(|_| "memory".to_string());
        let backend = match backend_str.to_lowercase().as_str() {
            "blob" => StoreBackend::Blob,
            "kv" | "sqlite" => StoreBackend::Kv,
            "http" => StoreBackend::Http,
            "memory" => StoreBackend::Memory,
            other => {
                tracing::warn!(
                    "Unknown STORE_BACKEND '{other}', falling back to 'memory'. Supported values: blob, kv, http, memory"
                );
                StoreBackend::Memory
            }
        };

        let blob_path =
            std::env::var("BLOB_PATH").unwrap_or_else(|_| "./visitor-stats.json".to_string());
        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://./tally.db".to_string());
        let remote_store_url = std::env::var("REMOTE_STORE_URL").ok();

        let host = std::env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = std::env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()?;

        let track_endpoint = std::env::var("TRACK_ENDPOINT")
            .unwrap_or_else(|_| format!("http://{host}:{port}/api/track-visit"));
        let geo_api_url =
            std::env::var("GEO_API_URL").unwrap_or_else(|_| "https://ipapi.co/json/".to_string());
        let counter_api_url = std::env::var("COUNTER_API_URL")
            .unwrap_or_else(|_| "https://api.countapi.xyz".to_string());
        let counter_namespace =
            std::env::var("COUNTER_NAMESPACE").unwrap_or_else(|_| "tally".to_string());
        let counter_key =
            std::env::var("COUNTER_KEY").unwrap_or_else(|_| "total-visitors".to_string());
        let state_dir = std::env::var("CLIENT_STATE_DIR").unwrap_or_else(|_| ".tally".to_string());

        Ok(Config {
            store: StoreConfig {
                backend,
                blob_path,
                database_url,
                remote_store_url,
            },
            server: ServerConfig { host, port },
            client: ClientConfig {
                track_endpoint,
                geo_api_url,
                counter_api_url,
                counter_namespace,
                counter_key,
                state_dir,
            },
        })
    }
}
