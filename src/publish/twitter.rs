use async_trait::async_trait;
use reqwest::{header::AUTHORIZATION, Client, StatusCode};
use serde::Serialize;

use super::oauth::{authorization_header, Credentials, Nonce};
use super::{PublishError, Publisher};

pub const DEFAULT_TWEETS_ENDPOINT: &str = "https://api.twitter.com/2/tweets";

/// Twitter answers a created tweet with 201; anything else is a failure.
const EXPECTED_STATUS: StatusCode = StatusCode::CREATED;

#[derive(Serialize)]
struct TweetBody<'a> {
    text: &'a str,
}

pub struct TwitterPublisher {
    client: Client,
    endpoint: String,
    creds: Credentials,
}

impl TwitterPublisher {
    pub fn new(client: Client, creds: Credentials) -> Self {
        Self {
            client,
            endpoint: DEFAULT_TWEETS_ENDPOINT.to_string(),
            creds,
        }
    }

    /// Reads `TWITTER_CONSUMER_KEY`, `TWITTER_CONSUMER_SECRET`,
    /// `TWITTER_ACCESS_TOKEN` and `TWITTER_ACCESS_TOKEN_SECRET`.
    pub fn from_env(client: Client) -> Result<Self, PublishError> {
        fn var(name: &'static str) -> Result<String, PublishError> {
            std::env::var(name)
                .ok()
                .filter(|v| !v.is_empty())
                .ok_or(PublishError::MissingCredential(name))
        }
        let creds = Credentials {
            consumer_key: var("TWITTER_CONSUMER_KEY")?,
            consumer_secret: var("TWITTER_CONSUMER_SECRET")?,
            access_token: var("TWITTER_ACCESS_TOKEN")?,
            access_token_secret: var("TWITTER_ACCESS_TOKEN_SECRET")?,
        };
        Ok(Self::new(client, creds))
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl Publisher for TwitterPublisher {
    async fn post(&self, text: &str) -> Result<(), PublishError> {
        let auth = authorization_header("POST", &self.endpoint, &[], &self.creds, &Nonce::fresh())?;

        let resp = self
            .client
            .post(&self.endpoint)
            .header(AUTHORIZATION, auth)
            .json(&TweetBody { text })
            .send()
            .await?;

        let status = resp.status();
        if status != EXPECTED_STATUS {
            let body = resp.text().await.unwrap_or_default();
            return Err(PublishError::UnexpectedStatus {
                expected: EXPECTED_STATUS.as_u16(),
                status: status.as_u16(),
                body,
            });
        }
        tracing::info!(endpoint = %self.endpoint, "post published");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "twitter"
    }
}
