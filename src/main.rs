//! # Learning Tracker Server
//!
//! HTTP API for the learning tracker, built with Axum and Tokio.
//!
//! ## Environment Setup
//! Configuration is read from the environment, after loading `.env` if
//! present. See `.env.example` for every variable and its default.
//!
//! ## Running the Server
//! ```bash
//! cargo run
//! ```
//!
//! The server starts on `http://127.0.0.1:3000` by default.
//!
//! ## Health Check
//! ```bash
//! curl http://localhost:3000/ping
//! ```

use anyhow::Result;
use learning_tracker::{config::Config, server};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Application entry point.
///
/// Logging level comes from `RUST_LOG` and defaults to `info`.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .compact(),
        )
        .init();

    tracing::info!("🏁 Starting learning tracker...");
    tracing::info!("📦 Package: {} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    tracing::info!("🏗️  Build profile: {}", if cfg!(debug_assertions) { "debug" } else { "release" });

    let config = Config::from_env()?;
    server::start(config).await
}
