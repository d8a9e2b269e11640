//! Tracing subscriber setup.

use anyhow::{anyhow, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "client_registry=debug,tower_http=info,info";

/// Install the global subscriber. `RUST_LOG`, from the environment or
/// `.env`, overrides the default filter.
pub fn init() -> Result<()> {
    // Runs before config::init, so `.env` has to be loaded here too.
    dotenvy::dotenv().ok();

    let directives = filter_directives(std::env::var("RUST_LOG").ok());
    let env_filter = EnvFilter::try_new(&directives).unwrap_or_else(|e| {
        eprintln!("invalid RUST_LOG {:?} ({}), using {}", directives, e, DEFAULT_FILTER);
        EnvFilter::new(DEFAULT_FILTER)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()
        .map_err(|e| anyhow!("failed to init tracing subscriber: {}", e))?;

    Ok(())
}

fn filter_directives(rust_log: Option<String>) -> String {
    match rust_log {
        Some(directives) if !directives.trim().is_empty() => directives,
        _ => DEFAULT_FILTER.to_string(),
    }
}
