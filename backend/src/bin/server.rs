//! BloomWatch HTTP Server Binary
//!
//! This is the main entry point for the BloomWatch REST API server.
//! It loads the engine configuration, selects an observation provider, builds
//! the phenology engine and starts serving requests.
//!
//! # Usage
//!
//! ```bash
//! # Run with the deterministic synthetic provider (default)
//! cargo run --bin bloomwatch-server
//!
//! # Run against the NASA POWER daily point API
//! OBSERVATION_PROVIDER=nasa-power \
//!   cargo run --bin bloomwatch-server --features "http-server,nasa-power"
//! ```
//!
//! # Environment Variables
//!
//! - `HOST`: Server host (default: 0.0.0.0)
//! - `PORT`: Server port (default: 8080)
//! - `BLOOMWATCH_CONFIG`: Path to a TOML engine configuration (default: search for `bloomwatch.toml`)
//! - `OBSERVATION_PROVIDER`: `synthetic`, `local` or `nasa-power` (default: synthetic)
//! - `RUST_LOG`: Log level (default: info)

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use bloomwatch::http::{create_router, AppState};
use bloomwatch::provider::{create_provider, ProviderKind};
use bloomwatch::{EngineConfig, PhenologyEngine};

/// How often expired cache entries are swept.
const PURGE_INTERVAL: Duration = Duration::from_secs(15 * 60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    FmtSubscriber::builder()
        .with_max_level(
            env::var("RUST_LOG")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(Level::INFO),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!("Starting BloomWatch HTTP Server");

    let config = EngineConfig::from_env_or_default()?;
    let kind = ProviderKind::from_env().map_err(|e| anyhow::anyhow!(e))?;
    let provider = create_provider(kind)?;
    info!("Observation provider: {}", provider.name());

    let engine = Arc::new(PhenologyEngine::builder(provider).config(config).build()?);
    info!(
        "Engine ready (cache ttl {}s, capacity {})",
        engine.config().cache.ttl_secs,
        engine.config().cache.capacity
    );

    // Sweep the result cache in the background
    let sweeper = Arc::clone(&engine);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            interval.tick().await;
            let purged = sweeper.purge_expired();
            if purged > 0 {
                info!("Purged {} expired cache entries", purged);
            }
        }
    });

    // Create router with all endpoints
    let app = create_router(AppState::new(engine));

    // Determine bind address
    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8080);
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;

    info!("Server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    // Start the server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
