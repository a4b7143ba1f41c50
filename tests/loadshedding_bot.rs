// tests/loadshedding_bot.rs
use std::sync::Arc;

use coct_alert_bots::loadshedding::{
    LoadsheddingBot, LoadsheddingError, NotificationKind, Provider, TopicRoute,
};
use coct_alert_bots::publish::RecordingPublisher;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn route(server: &MockServer, kind: NotificationKind) -> TopicRoute {
    TopicRoute {
        provider: Provider::CoCT,
        kind,
        data_url: format!("{}/coct-load-shedding-status.json", server.uri()),
    }
}

#[tokio::test]
async fn stage_change_reads_first_feed_entry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/coct-load-shedding-status.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "currentStage": 6, "nextStage": 4, "nextStageStartTime": "2023-02-01T22:00" },
            { "currentStage": 1, "nextStage": 0, "nextStageStartTime": "later" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let publisher = Arc::new(RecordingPublisher::new());
    let bot = LoadsheddingBot::new(reqwest::Client::new(), publisher.clone());
    let posted = bot.handle(&route(&server, NotificationKind::Stage)).await.unwrap();

    assert!(posted.contains("Loadshedding stage is now 6 😔!"));
    assert!(posted.contains("Next up is stage 4, at 2023-02-01T22:00."));
    assert_eq!(publisher.posts(), vec![posted]);
}

#[tokio::test]
async fn schedule_update_needs_no_feed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let publisher = Arc::new(RecordingPublisher::new());
    let bot = LoadsheddingBot::new(reqwest::Client::new(), publisher.clone());
    let posted = bot
        .handle(&route(&server, NotificationKind::Schedule))
        .await
        .unwrap();
    assert!(posted.contains("** CoCT Schedule Updated **"));
    assert_eq!(publisher.posts().len(), 1);
}

#[tokio::test]
async fn empty_feed_posts_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let publisher = Arc::new(RecordingPublisher::new());
    let bot = LoadsheddingBot::new(reqwest::Client::new(), publisher.clone());
    let err = bot
        .handle(&route(&server, NotificationKind::Stage))
        .await
        .unwrap_err();
    assert!(matches!(err, LoadsheddingError::EmptyStatus));
    assert!(publisher.posts().is_empty());
}
