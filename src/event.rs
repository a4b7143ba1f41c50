// src/event.rs
//! SNS delivery envelopes.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::alerts::types::Alert;

#[derive(Debug, Error)]
pub enum EventError {
    #[error("event is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("event carries no records")]
    NoRecords,
    #[error("alert message is not a JSON array of objects")]
    NotABatch,
}

/// One SNS notification, from either delivery shape.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SnsMessage {
    #[serde(rename = "Type", default)]
    pub kind: Option<String>,
    #[serde(rename = "TopicArn")]
    pub topic_arn: String,
    #[serde(rename = "Message", default)]
    pub message: String,
    #[serde(rename = "SubscribeURL", default)]
    pub subscribe_url: Option<String>,
}

impl SnsMessage {
    pub fn is_subscription_confirmation(&self) -> bool {
        self.kind.as_deref() == Some("SubscriptionConfirmation")
    }
}

#[derive(Deserialize)]
struct LambdaRecord {
    #[serde(rename = "Sns")]
    sns: SnsMessage,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Envelope {
    /// `{"Records":[{"Sns":{...}}]}`
    Lambda {
        #[serde(rename = "Records")]
        records: Vec<LambdaRecord>,
    },
    /// Body of an SNS HTTP(S) subscription delivery.
    Http(SnsMessage),
}

/// Parse a delivery; only the first record is used.
pub fn parse_envelope(body: &str) -> Result<SnsMessage, EventError> {
    match serde_json::from_str::<Envelope>(body)? {
        Envelope::Lambda { records } => records
            .into_iter()
            .next()
            .map(|r| r.sns)
            .ok_or(EventError::NoRecords),
        Envelope::Http(msg) => Ok(msg),
    }
}

/// The service-alerts message is a JSON-encoded array of alert objects.
pub fn parse_alert_batch(message: &str) -> Result<Vec<Alert>, EventError> {
    match serde_json::from_str::<Value>(message)? {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(fields) => Ok(Alert::from_fields(fields)),
                _ => Err(EventError::NotABatch),
            })
            .collect(),
        _ => Err(EventError::NotABatch),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lambda_envelope_first_record() {
        let body = r#"{"Records":[
            {"Sns":{"TopicArn":"arn:a","Message":"[]"}},
            {"Sns":{"TopicArn":"arn:b","Message":"[]"}}
        ]}"#;
        let msg = parse_envelope(body).unwrap();
        assert_eq!(msg.topic_arn, "arn:a");
        assert!(!msg.is_subscription_confirmation());
    }

    #[test]
    fn http_delivery_and_confirmation() {
        let body = r#"{"Type":"SubscriptionConfirmation","TopicArn":"arn:x",
            "Message":"confirm","SubscribeURL":"https://sns.example/confirm"}"#;
        let msg = parse_envelope(body).unwrap();
        assert!(msg.is_subscription_confirmation());
        assert_eq!(msg.subscribe_url.as_deref(), Some("https://sns.example/confirm"));
    }

    #[test]
    fn empty_records_is_an_error() {
        assert!(matches!(
            parse_envelope(r#"{"Records":[]}"#),
            Err(EventError::NoRecords)
        ));
    }

    #[test]
    fn batch_must_be_array_of_objects() {
        assert_eq!(parse_alert_batch(r#"[{"Id":"1"}]"#).unwrap().len(), 1);
        assert!(matches!(
            parse_alert_batch(r#"{"Id":"1"}"#),
            Err(EventError::NotABatch)
        ));
        assert!(matches!(
            parse_alert_batch(r#"[1]"#),
            Err(EventError::NotABatch)
        ));
    }
}
