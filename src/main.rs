//! Neon Pong Server
//!
//! Authoritative server for Pong matches against a rating-scaled AI:
//! runs the deterministic simulation, maintains ELO ratings and the
//! leaderboard, and pushes updates to every connected client.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use neon_pong::network::{AuthConfig, Broadcaster, GameServer, ServerConfig};
use neon_pong::rating::store::MemoryStore;
use neon_pong::{GameService, SystemClock, TICK_RATE, VERSION};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    info!("Neon Pong Server v{}", VERSION);
    info!("Tick Rate: {} Hz", TICK_RATE);

    let auth = AuthConfig::from_env();
    if auth.is_configured() {
        info!("token authentication enabled");
    } else {
        info!("no auth secret configured, accepting bare identities; admin operations disabled");
    }

    let broadcaster = Arc::new(Broadcaster::new());
    let store = Arc::new(MemoryStore::new());
    let service = Arc::new(GameService::new(store, broadcaster.clone(), Arc::new(SystemClock)));

    let config = ServerConfig::from_env();
    let server = GameServer::new(config, auth, service, broadcaster);
    server.run().await?;

    Ok(())
}
