use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use client_registry::{config, create_router, db, telemetry, AppState};

/// Client registry HTTP server
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Address to listen on, overrides BIND_ADDR
    #[arg(long)]
    bind: Option<String>,

    /// PostgreSQL URL, overrides DATABASE_URL
    #[arg(long)]
    database_url: Option<String>,

    /// Default page size, overrides DEFAULT_PAGE_SIZE
    #[arg(long)]
    page_size: Option<u32>,

    /// Do not load the fixture clients into an empty store
    #[arg(long)]
    no_seed: bool,
}

impl Args {
    fn apply(self, config: &mut config::Config) {
        if let Some(bind) = self.bind {
            config.bind_addr = bind;
        }
        if let Some(url) = self.database_url {
            config.database_url = Some(url);
        }
        if let Some(size) = self.page_size {
            config.default_page_size = size;
        }
        if self.no_seed {
            config.seed_fixtures = false;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    telemetry::init()?;

    // Load configuration
    let mut config = config::init()?;
    args.apply(&mut config);
    let paging = config.paging()?;
    let addr = config.bind_addr()?;

    // Initialize the client store
    let store = db::init(&config).await?;

    let app = create_router(AppState::new(store, paging));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(%addr, "Client registry listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Client registry stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!(error = %e, "Cannot listen for Ctrl-C, serving until killed");
            std::future::pending::<()>().await;
        }
    }
}
