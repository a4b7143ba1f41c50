//! Runs a single invocation: one SNS event read from a file (or stdin) and dispatched once.
//!
//! Usage: `process-event [event.json]`

use std::io::Read;

use anyhow::{Context, Result};
use coct_alert_bots::{logging, BotConfig, DispatchOutcome, Dispatcher};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    logging::init_tracing();

    let body = match std::env::args().nth(1) {
        Some(path) => {
            std::fs::read_to_string(&path).with_context(|| format!("reading event from {path}"))?
        }
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading event from stdin")?;
            buf
        }
    };

    let cfg = BotConfig::load_default()?;
    let dispatcher = Dispatcher::from_config(&cfg)?;

    match dispatcher.dispatch_body(&body).await? {
        DispatchOutcome::SubscriptionConfirmed => println!("subscription confirmed"),
        DispatchOutcome::Loadshedding { message } => println!("posted:{message}"),
        DispatchOutcome::Alerts(report) => println!(
            "alerts: published={} duplicates={} failed={}",
            report.published(),
            report.duplicates(),
            report.failures.len()
        ),
    }
    Ok(())
}
