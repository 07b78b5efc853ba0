pub mod fs_blob;
pub mod http_blob;
pub mod memory;
pub mod sqlite_kv;
pub mod trait_def;

pub use fs_blob::FsBlobStore;
pub use http_blob::HttpBlobStore;
pub use memory::MemoryStore;
pub use sqlite_kv::SqliteKvStore;
pub use trait_def::{AggregateStore, StoreError, StoreResult, Versioned};
