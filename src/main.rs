//! Store Broadcast Backend
//!
//! Sends ad-hoc announcements and action items to selected stores through the
//! Staffbase REST API, and lists or deletes past broadcasts. The platform is the
//! system of record; this service keeps only an in-memory store directory.

mod api;
mod audience;
mod auth;
mod broadcast;
mod config;
mod directory;
mod discovery;
mod errors;
mod listing;
mod models;
mod tasks;
mod upstream;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use audience::AudienceResolver;
use broadcast::Broadcaster;
use config::Config;
use directory::{Clock, DirectoryCache, SystemClock};
use discovery::InstallationDiscoverer;
use listing::BroadcastReader;
use upstream::{HttpGateway, Upstream};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub directory: Arc<DirectoryCache>,
    pub broadcaster: Arc<Broadcaster>,
    pub reader: Arc<BroadcastReader>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wire every component to one upstream and one clock.
    pub fn build(config: Config, upstream: Arc<dyn Upstream>, clock: Arc<dyn Clock>) -> Self {
        let page_size = config.upstream.page_size;

        let directory = Arc::new(DirectoryCache::new(
            upstream.clone(),
            clock.clone(),
            config.directory.clone(),
            page_size,
        ));
        let broadcaster = Arc::new(Broadcaster::new(
            upstream.clone(),
            AudienceResolver::new(upstream.clone(), &config.directory),
            InstallationDiscoverer::new(upstream.clone(), &config.broadcast.space_id, page_size),
            clock.clone(),
            config.broadcast.clone(),
        ));
        let reader = Arc::new(BroadcastReader::new(
            upstream,
            directory.clone(),
            clock,
            config.broadcast.clone(),
            page_size,
        ));

        Self {
            directory,
            broadcaster,
            reader,
            config: Arc::new(config),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Store Broadcast Backend");
    tracing::info!("Upstream: {}", config.upstream.base_url);
    tracing::info!("Space: {}", config.broadcast.space_id);
    tracing::info!("Bind address: {}", config.bind_addr);

    if config.api_psk.is_none() {
        tracing::warn!("No API key configured (BROADCAST_API_PSK). Authentication is disabled!");
    }
    if config.broadcast.space_id.is_empty() {
        tracing::warn!("STAFFBASE_SPACE_ID is not set; channel creation and listing will fail");
    }

    let gateway = Arc::new(HttpGateway::new(&config.upstream)?);
    let bind_addr = config.bind_addr;
    let state = AppState::build(config, gateway, Arc::new(SystemClock));

    // Warm the directory so the first verification is fast; failure is not fatal
    match state.directory.get().await {
        Ok(snapshot) => tracing::info!("Store directory loaded with {} stores", snapshot.len()),
        Err(e) => tracing::warn!("Initial directory load failed: {}", e),
    }

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("Server listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let psk = state.config.api_psk.clone();

    let api_routes = Router::new()
        // Directory
        .route("/verify-users", post(api::verify_users))
        .route("/directory/refresh", post(api::refresh_directory))
        // Broadcasts
        .route("/create", post(api::create_broadcast))
        .route("/items", get(api::list_broadcasts))
        .route("/delete/{id}", delete(api::delete_broadcast))
        .layer(middleware::from_fn(move |req, next| {
            auth::admin_key_layer(psk.clone(), req, next)
        }));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
