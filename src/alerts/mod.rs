// src/alerts/mod.rs
//! Service-alerts bot: dedup → existing text → generation → persist → publish.

pub mod backend;
pub mod dedup;
pub mod generator;
pub mod normalize;
pub mod persist;
pub mod prompt;
pub mod resolver;
pub mod types;

use std::sync::Arc;

use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::publish::{DynPublisher, PublishError};
use crate::storage::{DynBlobStore, StorageError};
use backend::DynBackend;
use dedup::DedupStatus;
use generator::{GenerationOutcome, TextGenerator};
use normalize::normalize;
use resolver::TextSource;
use types::{storage_key, Alert, LinkBuilder, TweetText};

/// What happens to the rest of a batch when one alert fails after text selection.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BatchPolicy {
    /// Stop at the first failing alert and return the error.
    #[default]
    FailFast,
    /// Log, record the failure and carry on with the next alert.
    ContinueOnError,
}

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("alert has no usable `Id`")]
    MissingId,
    #[error("dedup probe failed: {0}")]
    Dedup(#[source] StorageError),
    #[error("persisting record failed: {0}")]
    Persist(#[source] StorageError),
    #[error("publishing failed: {0}")]
    Publish(#[source] PublishError),
}

/// Where the final text came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextOrigin {
    Resolver,
    Generated { attempts: u8 },
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertOutcome {
    Duplicate,
    Published { origin: TextOrigin, text: String },
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<(String, AlertOutcome)>,
    pub failures: Vec<(String, AlertError)>,
}

impl BatchReport {
    pub fn published(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, AlertOutcome::Published { .. }))
            .count()
    }

    pub fn duplicates(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| *o == AlertOutcome::Duplicate)
            .count()
    }
}

/// Fail-fast abort; carries what was done before the failing alert.
#[derive(Debug, Error)]
#[error("batch aborted at alert `{alert_id}`: {source}")]
pub struct BatchAborted {
    pub alert_id: String,
    #[source]
    pub source: AlertError,
    pub report: BatchReport,
}

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("alerts_received_total", "Alerts seen in incoming batches.");
        describe_counter!(
            "alerts_duplicate_total",
            "Alerts skipped because a record already exists."
        );
        describe_counter!(
            "alerts_resolved_total",
            "Alerts whose text came from the secondary source."
        );
        describe_counter!("alerts_generated_total", "Alerts with generated text.");
        describe_counter!(
            "alerts_fallback_total",
            "Alerts posted with the link-only fallback text."
        );
        describe_counter!("alerts_failed_total", "Alerts that failed to persist or publish.");
        describe_counter!(
            "generation_attempts_total",
            "Backend calls made by the retry ladder."
        );
        describe_counter!("publish_total", "Posts accepted by the publisher.");
    });
}

pub struct AlertPipeline {
    store: DynBlobStore,
    source: Arc<dyn TextSource>,
    generator: TextGenerator,
    publisher: DynPublisher,
    links: LinkBuilder,
    policy: BatchPolicy,
}

impl AlertPipeline {
    pub fn new(
        store: DynBlobStore,
        source: Arc<dyn TextSource>,
        backend: DynBackend,
        publisher: DynPublisher,
        links: LinkBuilder,
    ) -> Self {
        Self {
            store,
            source,
            generator: TextGenerator::new(backend),
            publisher,
            links,
            policy: BatchPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: BatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_max_length(mut self, max: usize) -> Self {
        self.generator = self.generator.with_max_length(max);
        self
    }

    /// Process alerts in order, one at a time.
    pub async fn process_batch(&self, alerts: Vec<Alert>) -> Result<BatchReport, BatchAborted> {
        ensure_metrics_described();
        info!(count = alerts.len(), "processing alert batch");

        let mut report = BatchReport::default();
        for alert in alerts {
            let alert_id = alert.id().unwrap_or_else(|| "<missing>".to_string());
            match self.process_alert(&alert).await {
                Ok(outcome) => report.outcomes.push((alert_id, outcome)),
                Err(err) => {
                    counter!("alerts_failed_total").increment(1);
                    error!(alert_id = %alert_id, error = %err, policy = ?self.policy, "alert failed");
                    match self.policy {
                        BatchPolicy::FailFast => {
                            return Err(BatchAborted {
                                alert_id,
                                source: err,
                                report,
                            })
                        }
                        BatchPolicy::ContinueOnError => report.failures.push((alert_id, err)),
                    }
                }
            }
        }

        info!(
            published = report.published(),
            duplicates = report.duplicates(),
            failed = report.failures.len(),
            "alert batch done"
        );
        Ok(report)
    }

    pub async fn process_alert(&self, alert: &Alert) -> Result<AlertOutcome, AlertError> {
        counter!("alerts_received_total").increment(1);
        let alert_id = alert.id().ok_or(AlertError::MissingId)?;
        let key = storage_key(&alert_id);

        if dedup::check(self.store.as_ref(), &key)
            .await
            .map_err(AlertError::Dedup)?
            == DedupStatus::AlreadyProcessed
        {
            counter!("alerts_duplicate_total").increment(1);
            info!(alert_id = %alert_id, "alert already processed; skipping");
            return Ok(AlertOutcome::Duplicate);
        }

        let link = self.links.link_for(&alert_id);
        let normalized = normalize(alert);

        let (text, origin) = match self.existing_text(&alert_id).await {
            Some(text) => {
                counter!("alerts_resolved_total").increment(1);
                (text, TextOrigin::Resolver)
            }
            None => self.compose(&alert_id, &link, &normalized).await,
        };

        let fields = match &normalized {
            Ok(n) => n.fields(),
            Err(_) => alert.fields(),
        };
        persist::write_record(self.store.as_ref(), &key, fields, &text)
            .await
            .map_err(AlertError::Persist)?;

        self.publisher
            .post(text.as_str())
            .await
            .map_err(AlertError::Publish)?;
        counter!("publish_total").increment(1);
        info!(alert_id = %alert_id, origin = ?origin, "alert published");

        Ok(AlertOutcome::Published {
            origin,
            text: text.into_string(),
        })
    }

    async fn existing_text(&self, alert_id: &str) -> Option<TweetText> {
        let text = self.source.lookup(alert_id).await?;
        match TweetText::bounded(text, self.generator.max_length()) {
            Ok(t) => Some(t),
            Err(too_long) => {
                warn!(
                    alert_id,
                    chars = too_long.chars().count(),
                    "existing text exceeds limit; generating instead"
                );
                None
            }
        }
    }

    async fn compose(
        &self,
        alert_id: &str,
        link: &str,
        normalized: &Result<types::NormalizedAlert, normalize::NormalizeError>,
    ) -> (TweetText, TextOrigin) {
        let alert = match normalized {
            Ok(a) => a,
            Err(e) => {
                warn!(alert_id, error = %e, "normalization failed; using fallback text");
                counter!("alerts_fallback_total").increment(1);
                let text = TweetText::fallback(link, self.generator.max_length());
                return (text, TextOrigin::Fallback);
            }
        };

        match self.generator.generate(alert, alert_id, link).await {
            GenerationOutcome::Generated { text, attempts } => {
                counter!("alerts_generated_total").increment(1);
                (text, TextOrigin::Generated { attempts })
            }
            GenerationOutcome::Fallback { text, .. } => {
                counter!("alerts_fallback_total").increment(1);
                (text, TextOrigin::Fallback)
            }
        }
    }
}
