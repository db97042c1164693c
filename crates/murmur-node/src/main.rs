//! # murmur-node
//!
//! A Murmur node: keeps the local event store, publishes the operator's own
//! posts and profile through a small HTTP API, and periodically retries
//! delivery of events that peers have not confirmed.

mod api;
mod broadcast;
mod config;
mod error;
mod publish;
mod resend;

use std::sync::Arc;

use murmur_store::{Database, StoreOptions};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::api::AppState;
use crate::broadcast::{Broadcaster, Standalone};
use crate::config::NodeConfig;
use crate::publish::Publisher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,murmur_node=debug,murmur_store=info")),
        )
        .init();

    info!("Starting Murmur node v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration and identity
    // -----------------------------------------------------------------------
    let config = NodeConfig::from_env();
    info!(?config, "Loaded configuration");

    let identity = config.identity();
    let owner = identity.pubkey64();
    info!(pubkey = %identity.pubkey(), author = %owner, "Node identity ready");

    // -----------------------------------------------------------------------
    // 3. Open the event store
    // -----------------------------------------------------------------------
    let options = StoreOptions {
        cache_kib: config.db_cache_kib,
    };
    let store = Arc::new(match &config.data_dir {
        Some(dir) => Database::open_in(dir, owner, &options)?,
        None => Database::new(owner, &options)?,
    });
    info!(events = store.try_ledger_len()?, "Event store ready");

    // -----------------------------------------------------------------------
    // 4. Wire publishing and the resend sweep
    // -----------------------------------------------------------------------
    let broadcaster: Arc<dyn Broadcaster> = Arc::new(Standalone);
    let publisher = Arc::new(Publisher::new(identity, store.clone(), broadcaster.clone()));

    let _sweeper = resend::spawn_sweeper(store.clone(), broadcaster, config.resend_interval);

    let app_state = AppState { store, publisher };

    // -----------------------------------------------------------------------
    // 5. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, config.http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
