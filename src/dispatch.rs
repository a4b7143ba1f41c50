// src/dispatch.rs
//! Routes one SNS delivery to the bot owning its topic.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use reqwest::Client;
use thiserror::Error;
use tracing::info;

use crate::alerts::backend::build_backend;
use crate::alerts::resolver::{HttpSourceResolver, NoSource, TextSource};
use crate::alerts::types::LinkBuilder;
use crate::alerts::{AlertPipeline, BatchAborted, BatchReport};
use crate::config::BotConfig;
use crate::event::{parse_alert_batch, parse_envelope, EventError, SnsMessage};
use crate::loadshedding::{lookup_topic, LoadsheddingBot, LoadsheddingError};
use crate::publish::build_publisher;
use crate::storage::build_store;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Event(#[from] EventError),
    #[error("no bot handles topic `{0}`")]
    UnknownTopic(String),
    #[error("subscription confirmation failed: {0}")]
    Confirmation(String),
    #[error(transparent)]
    Alerts(#[from] BatchAborted),
    #[error(transparent)]
    Loadshedding(#[from] LoadsheddingError),
}

impl DispatchError {
    /// True when the delivery itself was unusable, as opposed to a processing failure.
    pub fn is_bad_request(&self) -> bool {
        matches!(self, DispatchError::Event(_) | DispatchError::UnknownTopic(_))
    }
}

#[derive(Debug)]
pub enum DispatchOutcome {
    SubscriptionConfirmed,
    Alerts(BatchReport),
    Loadshedding { message: String },
}

pub struct Dispatcher {
    client: Client,
    alerts_topic: Option<String>,
    alerts: AlertPipeline,
    loadshedding: LoadsheddingBot,
}

pub fn http_client() -> anyhow::Result<Client> {
    Client::builder()
        .user_agent(crate::USER_AGENT)
        .connect_timeout(Duration::from_secs(4))
        .build()
        .context("building http client")
}

impl Dispatcher {
    pub fn new(
        client: Client,
        alerts_topic: Option<String>,
        alerts: AlertPipeline,
        loadshedding: LoadsheddingBot,
    ) -> Self {
        Self {
            client,
            alerts_topic,
            alerts,
            loadshedding,
        }
    }

    /// Wire every collaborator from config. Clients are built once and shared.
    pub fn from_config(cfg: &BotConfig) -> anyhow::Result<Self> {
        let client = http_client()?;
        let store = build_store(&cfg.storage, client.clone())?;
        let publisher = build_publisher(&cfg.publish, client.clone())?;
        let backend = build_backend(&cfg.ai)?;
        info!(backend = backend.name(), "text backend ready");

        let source: Arc<dyn TextSource> = match &cfg.alerts.resolver_base {
            Some(base) => Arc::new(HttpSourceResolver::new(client.clone(), base.clone())),
            None => Arc::new(NoSource),
        };

        let alerts = AlertPipeline::new(
            store,
            source,
            backend,
            publisher.clone(),
            LinkBuilder::new(cfg.alerts.link_base.clone()),
        )
        .with_policy(cfg.alerts.batch_policy)
        .with_max_length(cfg.alerts.max_length);

        let loadshedding = LoadsheddingBot::new(client.clone(), publisher);
        Ok(Self::new(
            client,
            cfg.alerts.topic_arn.clone(),
            alerts,
            loadshedding,
        ))
    }

    pub async fn dispatch_body(&self, body: &str) -> Result<DispatchOutcome, DispatchError> {
        let msg = parse_envelope(body)?;
        self.dispatch(msg).await
    }

    pub async fn dispatch(&self, msg: SnsMessage) -> Result<DispatchOutcome, DispatchError> {
        info!(topic = %msg.topic_arn, kind = ?msg.kind, "event received");

        if msg.is_subscription_confirmation() {
            return self.confirm(&msg).await;
        }

        if let Some(route) = lookup_topic(&msg.topic_arn) {
            let message = self.loadshedding.handle(&route).await?;
            return Ok(DispatchOutcome::Loadshedding { message });
        }

        let is_alerts = match &self.alerts_topic {
            Some(topic) => *topic == msg.topic_arn,
            None => true,
        };
        if !is_alerts {
            return Err(DispatchError::UnknownTopic(msg.topic_arn));
        }

        let batch = parse_alert_batch(&msg.message)?;
        let report = self.alerts.process_batch(batch).await?;
        Ok(DispatchOutcome::Alerts(report))
    }

    async fn confirm(&self, msg: &SnsMessage) -> Result<DispatchOutcome, DispatchError> {
        let url = msg
            .subscribe_url
            .as_deref()
            .ok_or_else(|| DispatchError::Confirmation("missing SubscribeURL".into()))?;
        self.client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| DispatchError::Confirmation(e.to_string()))?;
        info!(topic = %msg.topic_arn, "subscription confirmed");
        Ok(DispatchOutcome::SubscriptionConfirmed)
    }
}
