// src/metrics.rs
//! Prometheus exposition for the bot counters (`alerts_*`, `generation_attempts_total`,
//! `publish_total`), described once in `alerts::ensure_metrics_described`.

use anyhow::Context;
use axum::{routing::get, Router};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Global recorder for the `metrics` facade; a second install in the same process fails.
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        Ok(Self { handle })
    }

    /// `GET /metrics`, merged next to `/sns` and `/health` by the service entrypoint.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route("/metrics", get(move || render(handle.clone())))
    }
}

async fn render(handle: PrometheusHandle) -> String {
    handle.render()
}
