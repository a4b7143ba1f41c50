// src/storage/mod.rs
//! Durable key/value blob storage used for alert records.

pub mod fs;
pub mod http;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use thiserror::Error;

pub use fs::FsBlobStore;
pub use http::HttpBlobStore;
pub use memory::MemoryBlobStore;

use crate::config::{StorageKind, StorageSection};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid storage key `{0}`")]
    InvalidKey(String),
    #[error("storage io error for `{key}`: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("storage request for `{key}` failed: {source}")]
    Http {
        key: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("unexpected status {status} for `{key}`")]
    UnexpectedStatus { key: String, status: u16 },
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn exists(&self, key: &str) -> Result<bool, StorageError>;
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<(), StorageError>;
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;
    fn name(&self) -> &'static str;
}

pub type DynBlobStore = Arc<dyn BlobStore>;

pub fn build_store(cfg: &StorageSection, client: reqwest::Client) -> anyhow::Result<DynBlobStore> {
    let store: DynBlobStore = match cfg.kind {
        StorageKind::Memory => Arc::new(MemoryBlobStore::new()),
        StorageKind::Fs => Arc::new(FsBlobStore::new(&cfg.root)),
        StorageKind::Http => {
            let base = cfg
                .base_url
                .clone()
                .ok_or_else(|| anyhow::anyhow!("storage.kind = \"http\" requires storage.base_url"))?;
            Arc::new(HttpBlobStore::new(client, base).with_token(cfg.resolve_token()))
        }
    };
    tracing::info!(store = store.name(), "storage backend ready");
    Ok(store)
}

/// Keys are relative, `/`-separated, and may not climb out of the store root.
pub(crate) fn validate_key(key: &str) -> Result<(), StorageError> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..");
    if bad {
        Err(StorageError::InvalidKey(key.to_string()))
    } else {
        Ok(())
    }
}

/// Everything but RFC 3986 unreserved characters is escaped inside a path segment.
const SEGMENT_ENCODE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

pub(crate) fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT_ENCODE).to_string()
}

/// URL path for a key, one escaped segment per `/`-separated part.
pub(crate) fn encode_key_path(key: &str) -> String {
    key.split('/')
        .map(encode_segment)
        .collect::<Vec<_>>()
        .join("/")
}
