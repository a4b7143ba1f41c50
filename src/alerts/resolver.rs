// src/alerts/resolver.rs
//! Looks for post text that already exists for an alert, so generation can be skipped.

use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;

use super::types::{alert_filename, ALERT_PREFIX, TEXT_FIELD};
use crate::storage::encode_segment;

/// Never fails: every problem is "no text".
#[async_trait]
pub trait TextSource: Send + Sync {
    async fn lookup(&self, alert_id: &str) -> Option<String>;
}

/// Secondary, versioned data source exposing `{base}/alerts/{id}.json`.
pub struct HttpSourceResolver {
    client: Client,
    base: String,
}

impl HttpSourceResolver {
    pub fn new(client: Client, base: impl Into<String>) -> Self {
        Self {
            client,
            base: base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn resource_url(&self, alert_id: &str) -> String {
        format!(
            "{}/{ALERT_PREFIX}/{}",
            self.base,
            encode_segment(&alert_filename(alert_id))
        )
    }

    async fn try_lookup(&self, alert_id: &str) -> anyhow::Result<Option<String>> {
        let url = self.resource_url(alert_id);

        let probe = self.client.head(&url).send().await.context("probe")?;
        if probe.status() != StatusCode::OK {
            return Ok(None);
        }

        let body: Value = self
            .client
            .get(&url)
            .send()
            .await
            .context("fetch")?
            .error_for_status()
            .context("fetch status")?
            .json()
            .await
            .context("decode")?;

        Ok(body
            .get(TEXT_FIELD)
            .and_then(Value::as_str)
            .filter(|t| !t.trim().is_empty())
            .map(str::to_owned))
    }
}

#[async_trait]
impl TextSource for HttpSourceResolver {
    async fn lookup(&self, alert_id: &str) -> Option<String> {
        match self.try_lookup(alert_id).await {
            Ok(found) => found,
            Err(e) => {
                tracing::debug!(alert_id, error = ?e, "secondary source lookup failed");
                None
            }
        }
    }
}

/// Used when no secondary source is configured.
pub struct NoSource;

#[async_trait]
impl TextSource for NoSource {
    async fn lookup(&self, _alert_id: &str) -> Option<String> {
        None
    }
}

// --- Test helper ---
/// Fixed id → text table.
#[derive(Default)]
pub struct StaticSource {
    texts: HashMap<String, String>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, alert_id: impl Into<String>, text: impl Into<String>) -> Self {
        self.texts.insert(alert_id.into(), text.into());
        self
    }
}

#[async_trait]
impl TextSource for StaticSource {
    async fn lookup(&self, alert_id: &str) -> Option<String> {
        self.texts.get(alert_id).cloned()
    }
}
