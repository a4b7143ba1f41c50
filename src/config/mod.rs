// src/config/mod.rs
//! Bot configuration: `config/bots.toml`, overridable via `$BOTS_CONFIG_PATH`.

pub mod ai;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub use ai::AiSection;

use crate::alerts::types::{char_len, fallback_message, LinkBuilder, TWEET_MAX_LENGTH};
use crate::alerts::BatchPolicy;
use crate::publish::twitter::DEFAULT_TWEETS_ENDPOINT;

pub const ENV_CONFIG_PATH: &str = "BOTS_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/bots.toml";

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct BotConfig {
    #[serde(default)]
    pub alerts: AlertsSection,
    #[serde(default)]
    pub ai: AiSection,
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub publish: PublishSection,
}

fn default_link_base() -> String {
    "https://d1mqopqocx2rjl.cloudfront.net".to_string()
}
fn default_max_length() -> usize {
    TWEET_MAX_LENGTH
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AlertsSection {
    /// Topic that carries service alerts. Unset: any topic that is not a
    /// load-shedding topic is treated as service alerts.
    #[serde(default)]
    pub topic_arn: Option<String>,
    /// Public base URL the link sentence points at.
    #[serde(default = "default_link_base")]
    pub link_base: String,
    /// Secondary text source; unset disables the lookup.
    #[serde(default)]
    pub resolver_base: Option<String>,
    #[serde(default)]
    pub batch_policy: BatchPolicy,
    #[serde(default = "default_max_length")]
    pub max_length: usize,
}

impl Default for AlertsSection {
    fn default() -> Self {
        Self {
            topic_arn: None,
            link_base: default_link_base(),
            resolver_base: None,
            batch_policy: BatchPolicy::default(),
            max_length: default_max_length(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    Memory,
    Fs,
    Http,
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("data")
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct StorageSection {
    #[serde(default)]
    pub kind: StorageKind,
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
    #[serde(default)]
    pub base_url: Option<String>,
    /// Bearer token for the http store; "ENV" reads `$STORAGE_TOKEN`.
    #[serde(default)]
    pub token: Option<String>,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            kind: StorageKind::default(),
            root: default_storage_root(),
            base_url: None,
            token: None,
        }
    }
}

impl StorageSection {
    pub fn resolve_token(&self) -> Option<String> {
        match self.token.as_deref().map(str::trim) {
            Some(t) if t.eq_ignore_ascii_case("env") => std::env::var("STORAGE_TOKEN").ok(),
            Some(t) if !t.is_empty() => Some(t.to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PublishKind {
    Twitter,
    /// Dry run.
    #[default]
    Log,
}

fn default_publish_endpoint() -> String {
    DEFAULT_TWEETS_ENDPOINT.to_string()
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PublishSection {
    #[serde(default)]
    pub kind: PublishKind,
    #[serde(default = "default_publish_endpoint")]
    pub endpoint: String,
}

impl Default for PublishSection {
    fn default() -> Self {
        Self {
            kind: PublishKind::default(),
            endpoint: default_publish_endpoint(),
        }
    }
}

/// Length of the fallback message for a one-character id under `link_base`,
/// capped at the platform bound.
fn fallback_floor(link_base: &str) -> usize {
    let link = LinkBuilder::new(link_base).link_for("0");
    char_len(&fallback_message(&link)).min(TWEET_MAX_LENGTH)
}

impl BotConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading bot config from {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn parse(s: &str) -> Result<Self> {
        let mut cfg: BotConfig = toml::from_str(s)?;
        if cfg.alerts.max_length == 0 || cfg.alerts.max_length > TWEET_MAX_LENGTH {
            cfg.alerts.max_length = TWEET_MAX_LENGTH;
        }
        let floor = fallback_floor(&cfg.alerts.link_base);
        if cfg.alerts.max_length < floor {
            tracing::warn!(
                configured = cfg.alerts.max_length,
                raised_to = floor,
                "alerts.max_length is shorter than the fallback message; raising it"
            );
            cfg.alerts.max_length = floor;
        }
        cfg.alerts.topic_arn = cfg
            .alerts
            .topic_arn
            .filter(|arn| !arn.trim().is_empty());
        Ok(cfg)
    }

    /// Load config using env var + fallbacks:
    /// 1) $BOTS_CONFIG_PATH (must exist)
    /// 2) config/bots.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from_file(&pb);
            } else {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
        }
        let default = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default.exists() {
            return Self::load_from_file(&default);
        }
        Ok(Self::default())
    }
}
