// src/loadshedding.rs
//! Load-shedding bot: stage-change and schedule-update posts for CoCT and Eskom topics.

use std::fmt;

use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::publish::{DynPublisher, PublishError};

const SCHEDULE_LINK: &str = "https://www.capetown.gov.za/Family%20and%20home/Residential-utility-services/Residential-electricity-services/Load-shedding-and-outages";

/// Emoji per stage, 0..=16.
pub const DISAPPOINTMENT_SCALE: [&str; 17] = [
    "🙂", "😐", "😑", "😒", "😞", "😔", "😕", "😩", "😫", "🙁", "😖", "😤", "😡", "🤬", "😭", "😰",
    "😭😡🤬",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    CoCT,
    Eskom,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Provider::CoCT => "CoCT",
            Provider::Eskom => "Eskom",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Stage,
    Schedule,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicRoute {
    pub provider: Provider,
    pub kind: NotificationKind,
    pub data_url: String,
}

const TOPICS: [(&str, Provider, NotificationKind, &str); 4] = [
    (
        "arn:aws:sns:af-south-1:566800947500:coct-loadshedding-stage",
        Provider::CoCT,
        NotificationKind::Stage,
        "https://d42sspn7yra3u.cloudfront.net/coct-load-shedding-status.json",
    ),
    (
        "arn:aws:sns:af-south-1:566800947500:coct-loadshedding-schedule",
        Provider::CoCT,
        NotificationKind::Schedule,
        "https://d42sspn7yra3u.cloudfront.net/coct-load-shedding-extended-status.json",
    ),
    (
        "arn:aws:sns:af-south-1:566800947500:eskom-loadshedding-stage",
        Provider::Eskom,
        NotificationKind::Stage,
        "https://d42sspn7yra3u.cloudfront.net/eskom-load-shedding-status.json",
    ),
    (
        "arn:aws:sns:af-south-1:566800947500:eskom-loadshedding-schedule",
        Provider::Eskom,
        NotificationKind::Schedule,
        "https://d42sspn7yra3u.cloudfront.net/eskom-load-shedding-extended-status.json",
    ),
];

pub fn lookup_topic(topic_arn: &str) -> Option<TopicRoute> {
    TOPICS
        .iter()
        .find(|(arn, ..)| *arn == topic_arn)
        .map(|(_, provider, kind, url)| TopicRoute {
            provider: *provider,
            kind: *kind,
            data_url: url.to_string(),
        })
}

#[derive(Debug, Error)]
pub enum LoadsheddingError {
    #[error("status feed request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("status feed returned no entries")]
    EmptyStatus,
    #[error("no emoji for stage {0}")]
    UnknownStage(u8),
    #[error(transparent)]
    Publish(#[from] PublishError),
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StageStatus {
    pub current_stage: u8,
    pub next_stage: u8,
    pub next_stage_start_time: String,
}

pub fn stage_emoji(stage: u8) -> Option<&'static str> {
    DISAPPOINTMENT_SCALE.get(usize::from(stage)).copied()
}

pub fn stage_message(provider: Provider, status: &StageStatus) -> Result<String, LoadsheddingError> {
    let emoji =
        stage_emoji(status.current_stage).ok_or(LoadsheddingError::UnknownStage(status.current_stage))?;
    Ok(format!(
        "\n** {provider} Stage Change **\nLoadshedding stage is now {current} {emoji}!\n\nNext up is stage {next}, at {at}.\n\nFull schedule available at {SCHEDULE_LINK}\n",
        current = status.current_stage,
        next = status.next_stage,
        at = status.next_stage_start_time,
    ))
}

pub fn schedule_message(provider: Provider) -> String {
    format!(
        "\n** {provider} Schedule Updated **\nLoadshedding schedule has been updated!\n\nCheck it out at {SCHEDULE_LINK}\n"
    )
}

pub struct LoadsheddingBot {
    client: Client,
    publisher: DynPublisher,
}

impl LoadsheddingBot {
    pub fn new(client: Client, publisher: DynPublisher) -> Self {
        Self { client, publisher }
    }

    async fn fetch_stage(&self, url: &str) -> Result<StageStatus, LoadsheddingError> {
        let entries: Vec<StageStatus> = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        entries.into_iter().next().ok_or(LoadsheddingError::EmptyStatus)
    }

    /// Build the message for `route`, post it, and return what was posted.
    pub async fn handle(&self, route: &TopicRoute) -> Result<String, LoadsheddingError> {
        info!(provider = %route.provider, kind = ?route.kind, data_url = %route.data_url, "load-shedding notification");
        let message = match route.kind {
            NotificationKind::Stage => {
                let status = self.fetch_stage(&route.data_url).await?;
                stage_message(route.provider, &status)?
            }
            NotificationKind::Schedule => schedule_message(route.provider),
        };
        self.publisher.post(&message).await?;
        Ok(message)
    }
}
