// tests/storage_backends.rs
use coct_alert_bots::storage::{BlobStore, FsBlobStore, HttpBlobStore, StorageError};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn fs_store_roundtrip_and_missing() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsBlobStore::new(dir.path());

    assert!(!store.exists("alerts/1.json").await.unwrap());
    assert_eq!(store.get("alerts/1.json").await.unwrap(), None);

    store
        .put("alerts/1.json", br#"{"a":1}"#.to_vec(), "application/json")
        .await
        .unwrap();
    assert!(store.exists("alerts/1.json").await.unwrap());
    assert!(dir.path().join("alerts").join("1.json").is_file());
    assert!(!dir.path().join("alerts").join("1.tmp").exists());
    assert_eq!(
        store.get("alerts/1.json").await.unwrap().as_deref(),
        Some(&br#"{"a":1}"#[..])
    );
}

#[tokio::test]
async fn fs_store_rejects_escaping_keys() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsBlobStore::new(dir.path());
    let err = store
        .put("../outside.json", b"x".to_vec(), "application/json")
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::InvalidKey(_)));
}

#[tokio::test]
async fn http_store_head_maps_status() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/bucket/alerts/1.json"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/bucket/alerts/2.json"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/bucket/alerts/3.json"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let store = HttpBlobStore::new(reqwest::Client::new(), format!("{}/bucket/", server.uri()));
    assert!(store.exists("alerts/1.json").await.unwrap());
    assert!(!store.exists("alerts/2.json").await.unwrap());
    assert!(matches!(
        store.exists("alerts/3.json").await,
        Err(StorageError::UnexpectedStatus { status: 503, .. })
    ));
}

#[tokio::test]
async fn http_store_put_sends_type_and_token() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/alerts/1.json"))
        .and(header("content-type", "application/json"))
        .and(header("authorization", "Bearer s3cret"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/alerts/1.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .mount(&server)
        .await;

    let store = HttpBlobStore::new(reqwest::Client::new(), server.uri())
        .with_token(Some("s3cret".into()));
    store
        .put("alerts/1.json", b"{}".to_vec(), "application/json")
        .await
        .unwrap();
    assert_eq!(store.get("alerts/1.json").await.unwrap(), Some(b"{}".to_vec()));
    assert_eq!(store.get("alerts/2.json").await.unwrap(), None);
}

#[tokio::test]
async fn http_store_keeps_reserved_characters_inside_the_key() {
    let server = MockServer::start().await;
    // Record "a" exists; "a?b" does not.
    Mock::given(method("HEAD"))
        .and(path("/alerts/a.json"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/alerts/a"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let store = HttpBlobStore::new(reqwest::Client::new(), server.uri());
    assert!(store.exists("alerts/a.json").await.unwrap());
    assert!(!store.exists("alerts/a?b.json").await.unwrap());
    assert!(!store.exists("alerts/a#b.json").await.unwrap());

    store
        .put("alerts/a?b.json", b"{}".to_vec(), "application/json")
        .await
        .unwrap();
    let reqs = server.received_requests().await.unwrap();
    let put = reqs.iter().find(|r| r.method.as_str() == "PUT").unwrap();
    assert_eq!(put.url.path(), "/alerts/a%3Fb.json");
    assert_eq!(put.url.query(), None);
}
