// src/publish/mod.rs
pub mod oauth;
pub mod twitter;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use thiserror::Error;

pub use twitter::TwitterPublisher;

use crate::config::{PublishKind, PublishSection};

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("publish request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("response not {expected}, is {status}: {body}")]
    UnexpectedStatus {
        expected: u16,
        status: u16,
        body: String,
    },
    #[error("missing credential {0}")]
    MissingCredential(&'static str),
    #[error("cannot sign request: {0}")]
    Signing(String),
    #[error("{0}")]
    Rejected(String),
}

/// The social-media endpoint: one post per call.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn post(&self, text: &str) -> Result<(), PublishError>;
    fn name(&self) -> &'static str;
}

pub type DynPublisher = Arc<dyn Publisher>;

pub fn build_publisher(cfg: &PublishSection, client: reqwest::Client) -> anyhow::Result<DynPublisher> {
    let publisher: DynPublisher = match cfg.kind {
        PublishKind::Log => Arc::new(LogPublisher),
        PublishKind::Twitter => Arc::new(
            TwitterPublisher::from_env(client)?.with_endpoint(cfg.endpoint.clone()),
        ),
    };
    tracing::info!(publisher = publisher.name(), "publisher ready");
    Ok(publisher)
}

/// Dry run: logs the text instead of posting it.
pub struct LogPublisher;

#[async_trait]
impl Publisher for LogPublisher {
    async fn post(&self, text: &str) -> Result<(), PublishError> {
        tracing::info!(chars = text.chars().count(), %text, "dry-run post");
        Ok(())
    }
    fn name(&self) -> &'static str {
        "log"
    }
}

// --- Test helper ---
/// Records posts; can be told to reject everything.
#[derive(Default)]
pub struct RecordingPublisher {
    posts: Mutex<Vec<String>>,
    reject: bool,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::default()
        }
    }

    pub fn posts(&self) -> Vec<String> {
        self.posts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn post(&self, text: &str) -> Result<(), PublishError> {
        if self.reject {
            return Err(PublishError::Rejected("publisher configured to reject".into()));
        }
        self.posts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(text.to_string());
        Ok(())
    }
    fn name(&self) -> &'static str {
        "recording"
    }
}
