// src/alerts/types.rs
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::storage::encode_segment;

/// Upstream identifier field of a service alert.
pub const ID_FIELD: &str = "Id";
/// Field holding the final post text, both in persisted records and in the
/// secondary text source.
pub const TEXT_FIELD: &str = "tweet_text";
/// Key/URL prefix shared by storage, the secondary source and the link sentence.
pub const ALERT_PREFIX: &str = "alerts";
/// Platform bound for a single post, counted in characters.
pub const TWEET_MAX_LENGTH: usize = 280;

/// A raw service alert exactly as delivered by the upstream event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Alert {
    fields: Map<String, Value>,
}

impl Alert {
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Identifier as a string. Numeric ids are accepted and rendered as-is.
    pub fn id(&self) -> Option<String> {
        match self.fields.get(ID_FIELD)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Alert fields after normalization; what the prompt and the persisted record see.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct NormalizedAlert {
    fields: Map<String, Value>,
}

impl NormalizedAlert {
    pub(crate) fn from_fields(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Compact JSON rendering, fields in upstream order.
    pub fn to_json_string(&self) -> String {
        Value::Object(self.fields.clone()).to_string()
    }
}

/// Final post text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TweetText(String);

impl TweetText {
    /// Accepts `text` only if it fits in `max` characters; hands it back otherwise.
    pub fn bounded(text: String, max: usize) -> Result<Self, String> {
        if char_len(&text) <= max {
            Ok(Self(text))
        } else {
            Err(text)
        }
    }

    /// Minimal link-only message used when no good text could be produced.
    ///
    /// Degrades to the bare link, then to a truncated link, so the result
    /// never exceeds `max` characters.
    pub fn fallback(link: &str, max: usize) -> Self {
        let full = fallback_message(link);
        if char_len(&full) <= max {
            return Self(full);
        }
        tracing::warn!(
            chars = char_len(&full),
            max,
            "fallback message exceeds limit; posting the link alone"
        );
        if char_len(link) <= max {
            Self(link.to_string())
        } else {
            Self(link.chars().take(max).collect())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len_chars(&self) -> usize {
        char_len(&self.0)
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

pub const FALLBACK_PREAMBLE: &str = "Failed to generate content. Please consult link below.";

/// The full fallback sentence for `link`, before any length bound is applied.
pub fn fallback_message(link: &str) -> String {
    format!("{FALLBACK_PREAMBLE}\n{link}")
}

pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Storage key of the persisted record, e.g. `alerts/42.json`.
pub fn storage_key(alert_id: &str) -> String {
    format!("{ALERT_PREFIX}/{}", alert_filename(alert_id))
}

pub fn alert_filename(alert_id: &str) -> String {
    format!("{alert_id}.json")
}

/// Builds the trailing link sentence that points at where the record will be
/// published. Known before anything is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkBuilder {
    base: String,
    prefix: String,
}

impl LinkBuilder {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
            prefix: ALERT_PREFIX.to_string(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into().trim_matches('/').to_string();
        self
    }

    pub fn link_for(&self, alert_id: &str) -> String {
        format!(
            "**Autogenerated** using {}/{}/{}",
            self.base,
            self.prefix,
            encode_segment(&alert_filename(alert_id))
        )
    }
}
