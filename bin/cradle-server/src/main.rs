//! cradle-server – entry point.
//!
//! Startup order:
//! 1. Parse configuration from environment variables.
//! 2. Initialise structured tracing (JSON in production, pretty in dev).
//! 3. Open the SQLite database and create the schema if absent.
//! 4. Build the Axum router and start the HTTP server with graceful shutdown.

mod config;
mod entities;
mod error;
mod llm;
mod middleware;
mod routes;
mod schemas;
mod security;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::Config;
use crate::entities::{BabyStore, SqliteStore};
use crate::llm::AnthropicClient;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Configuration ───────────────────────────────────────────────────────
    let cfg = Config::from_env();

    // ── 2. Tracing ─────────────────────────────────────────────────────────────
    // Build the log-level filter, warning loudly if the configured value is
    // not a valid tracing filter expression.
    let env_filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => match cfg.log_level.parse::<tracing_subscriber::EnvFilter>() {
            Ok(f) => f,
            Err(e) => {
                eprintln!(
                    "WARN: CRADLE_LOG='{}' is not a valid tracing filter ({}); \
                     falling back to 'info'",
                    cfg.log_level, e
                );
                tracing_subscriber::EnvFilter::new("info")
            }
        },
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true);

    if cfg.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!(version = env!("CARGO_PKG_VERSION"), "cradle-server starting");

    // ── 3. Database ────────────────────────────────────────────────────────────
    let store = SqliteStore::connect(&cfg.database_url).await?;
    store.init_schema().await?;
    info!(database_url = %cfg.database_url, "database ready");

    if cfg.seed_demo_babies {
        let inserted = store.seed_demo_babies().await?;
        info!(inserted, "demo personas seeded (hidden until visibility is toggled)");
    }

    // ── 4. Model API client ────────────────────────────────────────────────────
    if cfg.anthropic_api_key.is_empty() {
        warn!("ANTHROPIC_API_KEY is not set; chat turns will fail upstream");
    }
    let llm = AnthropicClient::new(&cfg.anthropic_api_key, &cfg.anthropic_model)?;

    // ── 5. Shared application state ────────────────────────────────────────────
    let state = Arc::new(AppState {
        config: Arc::new(cfg.clone()),
        store: Arc::new(store),
        llm: Arc::new(llm),
    });

    // ── 6. HTTP server with graceful shutdown ──────────────────────────────────
    let app = routes::build(Arc::clone(&state));
    let addr: SocketAddr = cfg.bind_address.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("cradle-server stopped");
    Ok(())
}

/// Returns a future that resolves when SIGINT (Ctrl-C) or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install CTRL+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received; starting graceful shutdown");
}
