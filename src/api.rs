use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tokio::sync::Mutex;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::error;

use crate::alerts::AlertOutcome;
use crate::dispatch::{DispatchOutcome, Dispatcher};

#[derive(Clone)]
pub struct AppState {
    dispatcher: Arc<Dispatcher>,
    /// One invocation at a time; batches never overlap inside this process.
    invocation: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            invocation: Arc::new(Mutex::new(())),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/sns", post(sns_event))
        .layer(CorsLayer::very_permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// SNS posts with `text/plain`, so take the raw body.
async fn sns_event(State(state): State<AppState>, body: String) -> impl IntoResponse {
    let _guard = state.invocation.lock().await;
    match state.dispatcher.dispatch_body(&body).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome_json(&outcome))),
        Err(e) => {
            let status = if e.is_bad_request() {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            error!(error = %e, status = status.as_u16(), "event dispatch failed");
            (status, Json(json!({ "status": "error", "error": e.to_string() })))
        }
    }
}

fn outcome_json(outcome: &DispatchOutcome) -> serde_json::Value {
    match outcome {
        DispatchOutcome::SubscriptionConfirmed => json!({ "status": "confirmed" }),
        DispatchOutcome::Loadshedding { message } => json!({ "status": "ok", "posted": message }),
        DispatchOutcome::Alerts(report) => {
            let alerts: Vec<_> = report
                .outcomes
                .iter()
                .map(|(id, o)| match o {
                    AlertOutcome::Duplicate => json!({ "id": id, "result": "duplicate" }),
                    AlertOutcome::Published { origin, text } => json!({
                        "id": id,
                        "result": "published",
                        "origin": format!("{origin:?}"),
                        "text": text,
                    }),
                })
                .chain(report.failures.iter().map(|(id, e)| {
                    json!({ "id": id, "result": "failed", "error": e.to_string() })
                }))
                .collect();
            json!({
                "status": "ok",
                "published": report.published(),
                "duplicates": report.duplicates(),
                "failed": report.failures.len(),
                "alerts": alerts,
            })
        }
    }
}
