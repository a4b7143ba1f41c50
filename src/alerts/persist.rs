// src/alerts/persist.rs
use serde_json::{Map, Value};

use super::types::{TweetText, TEXT_FIELD};
use crate::storage::{BlobStore, StorageError};

pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Record body: the alert fields followed by the final text.
pub fn render_record(fields: &Map<String, Value>, text: &TweetText) -> Vec<u8> {
    let mut record = fields.clone();
    record.insert(TEXT_FIELD.to_string(), Value::String(text.as_str().to_string()));
    Value::Object(record).to_string().into_bytes()
}

pub async fn write_record(
    store: &dyn BlobStore,
    key: &str,
    fields: &Map<String, Value>,
    text: &TweetText,
) -> Result<(), StorageError> {
    store
        .put(key, render_record(fields, text), CONTENT_TYPE_JSON)
        .await
}
