// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod api;
pub mod config;
pub mod dispatch;
pub mod event;
pub mod logging;
pub mod metrics;
pub mod storage;

// Service-alerts pipeline (normalize, dedup, resolver, generator, persist)
pub mod alerts;

// Outbound posting + the load-shedding bot that shares it
pub mod loadshedding;
pub mod publish;

// ---- Re-exports for stable public API ----
pub use crate::alerts::{AlertPipeline, BatchPolicy};
pub use crate::api::router;
pub use crate::config::BotConfig;
pub use crate::dispatch::{DispatchOutcome, Dispatcher};

pub const USER_AGENT: &str = concat!("coct-alert-bots/", env!("CARGO_PKG_VERSION"));
