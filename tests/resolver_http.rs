// tests/resolver_http.rs
use coct_alert_bots::alerts::resolver::{HttpSourceResolver, TextSource};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn resolver(server: &MockServer) -> HttpSourceResolver {
    HttpSourceResolver::new(reqwest::Client::new(), format!("{}/v1/", server.uri()))
}

#[tokio::test]
async fn existing_text_is_returned() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/v1/alerts/42.json"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/alerts/42.json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "tweet_text": "Pipe burst in Claremont." })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let r = resolver(&server);
    assert_eq!(r.resource_url("42"), format!("{}/v1/alerts/42.json", server.uri()));
    assert_eq!(r.lookup("42").await.as_deref(), Some("Pipe burst in Claremont."));
}

#[tokio::test]
async fn not_found_skips_the_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "tweet_text": "x" })))
        .expect(0)
        .mount(&server)
        .await;

    assert_eq!(resolver(&server).lookup("42").await, None);
}

#[tokio::test]
async fn empty_missing_or_broken_text_is_no_match() {
    for body in [
        ResponseTemplate::new(200).set_body_json(json!({ "tweet_text": "   " })),
        ResponseTemplate::new(200).set_body_json(json!({ "other": "x" })),
        ResponseTemplate::new(200).set_body_json(json!({ "tweet_text": 12 })),
        ResponseTemplate::new(200).set_body_string("not json"),
        ResponseTemplate::new(500),
    ] {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(body)
            .mount(&server)
            .await;
        assert_eq!(resolver(&server).lookup("1").await, None);
    }
}

#[tokio::test]
async fn unreachable_source_is_no_match() {
    // Nothing listens on port 9 locally.
    let r = HttpSourceResolver::new(reqwest::Client::new(), "http://127.0.0.1:9");
    assert_eq!(r.lookup("1").await, None);
}

#[tokio::test]
async fn reserved_characters_in_id_are_escaped() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/v1/alerts/a"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "tweet_text": "wrong alert" })))
        .mount(&server)
        .await;

    let r = resolver(&server);
    assert_eq!(r.resource_url("a?b"), format!("{}/v1/alerts/a%3Fb.json", server.uri()));
    assert_eq!(r.lookup("a?b").await, None);
}
