//! Hexagram UNO match server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod leaderboard;
mod protocol;
mod server;
mod store;

use server::ServerState;

/// Default delay before each computer turn, in milliseconds
const DEFAULT_BOT_THINK_MS: u64 = 800;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr: SocketAddr = std::env::var("SERVER_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8080".into())
        .parse()?;

    let bot_think_ms: u64 = match std::env::var("BOT_THINK_MS") {
        Ok(value) => value.parse()?,
        Err(_) => DEFAULT_BOT_THINK_MS,
    };

    info!(bot_think_ms, "Starting Hexagram UNO server...");

    let state = Arc::new(ServerState::new(Duration::from_millis(bot_think_ms)));

    server::run_server(addr, state).await
}
