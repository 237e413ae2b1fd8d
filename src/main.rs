//! payout_gateway server
//!
//! Usage:
//!   payout_gateway [--env dev] [--port 8080] [--memory]
//!
//! `--memory` runs on the in-process store even when `postgres_url` is set.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

use payout_gateway::config::AppConfig;
use payout_gateway::db::{Database, PgStore};
use payout_gateway::gateway::{self, state::AppState, state::Collaborators};
use payout_gateway::memory_store::MemoryStore;
use payout_gateway::token_store::{InMemoryTokenStore, TokenStore};
use payout_gateway::user_auth::LogMailer;
use payout_gateway::withdrawal::HttpCallbackNotifier;

const TOKEN_PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Get environment from command line (--env or -e), default "dev"
fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

/// Get port override from command line (--port argument)
fn get_port_override() -> Option<u16> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--port" && i + 1 < args.len() {
            return args[i + 1].parse().ok();
        }
    }
    None
}

fn use_memory_store() -> bool {
    std::env::args().any(|a| a == "--memory")
}

#[tokio::main]
async fn main() -> Result<()> {
    let env = get_env();
    let app_config = AppConfig::load(&env)?;
    let _log_guard = payout_gateway::logging::init_logging(&app_config);

    tracing::info!(env = %env, "Starting payout_gateway");

    let tokens = Arc::new(InMemoryTokenStore::new());
    let collaborators = Collaborators {
        notifier: Arc::new(
            HttpCallbackNotifier::new(app_config.billing.callback_timeout())
                .context("Failed to build callback HTTP client")?,
        ),
        tokens: tokens.clone() as Arc<dyn TokenStore>,
        mailer: Arc::new(LogMailer),
    };

    // Expired confirmation and reset tokens are otherwise only dropped on read
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(TOKEN_PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            let purged = tokens.purge_expired();
            if purged > 0 {
                tracing::debug!(purged, "Expired tokens purged");
            }
        }
    });

    let state = match app_config.postgres_url.as_deref() {
        Some(url) if !use_memory_store() => {
            let db = Arc::new(
                Database::connect(url)
                    .await
                    .context("Failed to connect to PostgreSQL")?,
            );
            tracing::info!("Using PostgreSQL store");
            AppState::new(
                Arc::new(PgStore::new(db.clone())),
                &app_config,
                collaborators,
                Some(db),
            )
        }
        _ => {
            tracing::warn!("Using in-memory store, data is lost on exit");
            AppState::new(
                Arc::new(MemoryStore::new()),
                &app_config,
                collaborators,
                None,
            )
        }
    };

    let port = get_port_override().unwrap_or(app_config.gateway.port);
    gateway::run_server(&app_config.gateway.host, port, Arc::new(state))
        .await
        .context("Gateway server failed")
}
