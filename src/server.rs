//! # Server Module
//!
//! HTTP server setup and route configuration for the learning tracker API.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{Router, http::HeaderValue, middleware, routing::get};
use chrono::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::auth::jwt::TokenCodec;
use crate::auth::middleware::{CookiePolicy, SessionMiddleware};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::directory::SessionDirectory;
use crate::routes;
use crate::routes::health::ping;
use crate::services::catalog::{LearningBackend, MockLearningBackend};
use crate::storage::{FileStore, KeyValueStore, MemoryStore};

/// Application state shared across all route handlers
#[derive(Clone)]
pub struct AppState {
    pub codec: Arc<TokenCodec>,
    pub directory: Arc<SessionDirectory>,
    pub backend: Arc<dyn LearningBackend>,
    /// Session cookie attributes; max-age matches the refresh token
    pub cookies: CookiePolicy,
}

impl AppState {
    pub fn from_config(config: &Config) -> Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let store: Arc<dyn KeyValueStore> = match &config.storage_path {
            Some(path) => Arc::new(
                FileStore::open(path).with_context(|| format!("opening storage at {}", path.display()))?,
            ),
            None => Arc::new(MemoryStore::new()),
        };

        let codec = TokenCodec::new(config.tokens.scheme, &config.tokens.secret, clock.clone()).with_ttls(
            Duration::seconds(config.tokens.access_ttl_secs),
            Duration::seconds(config.tokens.refresh_ttl_secs),
        );
        let backend = MockLearningBackend::new(clock)
            .with_delays(config.backend.load_delay, config.backend.update_delay);

        Ok(Self {
            codec: Arc::new(codec),
            directory: Arc::new(SessionDirectory::new(store)),
            backend: Arc::new(backend),
            cookies: CookiePolicy {
                max_age_secs: config.tokens.refresh_ttl_secs,
                cross_site: config.server.cross_site_cookies,
            },
        })
    }
}

/// Every route, with the session middleware in front of the API.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::auth::create_auth_routes())
        .merge(routes::learning::create_learning_routes())
        .merge(routes::reports::create_report_routes())
        .layer(middleware::from_fn_with_state(state.clone(), SessionMiddleware::attach));

    Router::new()
        .route("/ping", get(ping))
        .merge(api)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("ignoring invalid CORS origin {}: {}", origin, e);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::ORIGIN,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
        ])
        .allow_credentials(true)
}

/// Starts the HTTP server and serves until the process is terminated.
pub async fn start(config: Config) -> Result<()> {
    let state = AppState::from_config(&config)?;
    let app = router(state).layer(ServiceBuilder::new().layer(cors_layer(&config.server.allowed_origins)));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid SERVER_HOST/SERVER_PORT")?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("🚀 Learning tracker starting...");
    tracing::info!("📡 Listening on http://{}", addr);
    tracing::info!("🏥 Health check available at http://{}/ping", addr);
    tracing::info!("🔑 Token scheme: {:?}", config.tokens.scheme);
    tracing::info!("🍪 Cross-site session cookies: {}", config.server.cross_site_cookies);
    match &config.storage_path {
        Some(path) => tracing::info!("💾 User directory persisted at {}", path.display()),
        None => tracing::info!("💾 User directory kept in memory"),
    }

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
