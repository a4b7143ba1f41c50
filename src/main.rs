//! Alert bots service: binary entrypoint.
//! Boots the Axum HTTP server that receives SNS deliveries, wiring config, clients, and metrics.

use anyhow::Context;
use shuttle_axum::ShuttleAxum;
use tracing::info;

use coct_alert_bots::{api, logging, metrics::Metrics, BotConfig, Dispatcher};

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    logging::init_tracing();

    let cfg = BotConfig::load_default().context("loading bot config")?;
    info!(
        publish = ?cfg.publish.kind,
        storage = ?cfg.storage.kind,
        ai_enabled = cfg.ai.enabled,
        policy = ?cfg.alerts.batch_policy,
        "bot config loaded"
    );

    let metrics = Metrics::init()?;
    let dispatcher = Dispatcher::from_config(&cfg)?;

    let router = api::router(api::AppState::new(dispatcher)).merge(metrics.router());
    Ok(router.into())
}
