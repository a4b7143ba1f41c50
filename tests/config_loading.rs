// tests/config_loading.rs
use coct_alert_bots::config::{BotConfig, PublishKind, StorageKind, ENV_CONFIG_PATH};
use coct_alert_bots::dispatch::DispatchOutcome;
use coct_alert_bots::{BatchPolicy, Dispatcher};
use serde_json::json;
use std::{env, fs};

#[serial_test::serial]
#[test]
fn default_uses_env_then_fallbacks() {
    // Isolate CWD so the repo's own config/ is not read.
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();
    env::remove_var(ENV_CONFIG_PATH);

    // 1) nothing on disk → defaults
    assert_eq!(BotConfig::load_default().unwrap(), BotConfig::default());

    // 2) ./config/bots.toml
    let cfg_dir = tmp.path().join("config");
    fs::create_dir_all(&cfg_dir).unwrap();
    fs::write(
        cfg_dir.join("bots.toml"),
        "[alerts]\nbatch_policy = \"continue_on_error\"\n",
    )
    .unwrap();
    let c = BotConfig::load_default().unwrap();
    assert_eq!(c.alerts.batch_policy, BatchPolicy::ContinueOnError);

    // 3) env wins
    let p_env = tmp.path().join("other.toml");
    fs::write(&p_env, "[storage]\nkind = \"fs\"\nroot = \"/tmp/alerts\"\n").unwrap();
    env::set_var(ENV_CONFIG_PATH, p_env.display().to_string());
    let c = BotConfig::load_default().unwrap();
    assert_eq!(c.storage.kind, StorageKind::Fs);
    assert_eq!(c.alerts.batch_policy, BatchPolicy::FailFast);

    // 4) env pointing nowhere is an error, not a silent default
    env::set_var(ENV_CONFIG_PATH, tmp.path().join("missing.toml").display().to_string());
    assert!(BotConfig::load_default().is_err());

    env::remove_var(ENV_CONFIG_PATH);
    env::set_current_dir(&old).unwrap();
}

#[test]
fn broken_toml_names_the_file() {
    let tmp = tempfile::tempdir().unwrap();
    let p = tmp.path().join("bots.toml");
    fs::write(&p, "[alerts\n").unwrap();
    let err = BotConfig::load_from_file(&p).unwrap_err();
    assert!(format!("{err:#}").contains("bots.toml"));
}

#[test]
fn unknown_publish_kind_is_rejected() {
    assert!(BotConfig::parse("[publish]\nkind = \"mastodon\"\n").is_err());
    assert_eq!(
        BotConfig::parse("[publish]\nkind = \"log\"\n").unwrap().publish.kind,
        PublishKind::Log
    );
}

#[serial_test::serial]
#[tokio::test]
async fn dispatcher_from_config_runs_in_dry_mode() {
    env::set_var("AI_TEST_MODE", "mock");
    let cfg = BotConfig::parse(
        r#"
[alerts]
topic_arn = "arn:test:alerts"
link_base = "https://cdn.example"
"#,
    )
    .unwrap();
    let dispatcher = Dispatcher::from_config(&cfg).unwrap();
    env::remove_var("AI_TEST_MODE");

    let message = json!([{
        "Id": "77",
        "service_area": "Electricity",
        "start_timestamp": "2023-03-01T06:00:00.000Z",
        "forecast_end_timestamp": "2023-03-01T09:30:00.000Z"
    }])
    .to_string();
    let body = json!({ "Type": "Notification", "TopicArn": "arn:test:alerts", "Message": message })
        .to_string();

    let outcome = dispatcher.dispatch_body(&body).await.unwrap();
    let DispatchOutcome::Alerts(report) = outcome else {
        panic!("expected alerts outcome");
    };
    assert_eq!(report.published(), 1);

    // Same process, same memory store: the redelivery is a duplicate.
    let DispatchOutcome::Alerts(report) = dispatcher.dispatch_body(&body).await.unwrap() else {
        panic!("expected alerts outcome");
    };
    assert_eq!(report.duplicates(), 1);
}
