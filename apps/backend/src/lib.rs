pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use review_core::{CardStore, Clock, MemoryCardStore, SystemClock};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::db::PgCardStore;
use crate::services::sessions::SessionRegistry;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CardStore>,
    pub clock: Arc<dyn Clock>,
    pub sessions: Arc<SessionRegistry>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn CardStore>, clock: Arc<dyn Clock>, config: Config) -> Self {
        Self {
            store,
            clock,
            sessions: Arc::new(SessionRegistry::new()),
            config: Arc::new(config),
        }
    }
}

/// Build the router with all routes.
pub fn build_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        // Card routes
        .route("/api/cards", post(routes::cards::create))
        .route("/api/cards/due", get(routes::cards::due))
        .route("/api/cards/due/count", get(routes::cards::due_count))
        .route("/api/cards/{id}", get(routes::cards::get))
        .route("/api/cards/{id}/review", post(routes::cards::review))
        // Session routes
        .route("/api/sessions", post(routes::sessions::start))
        .route(
            "/api/sessions/{id}",
            get(routes::sessions::show).delete(routes::sessions::abandon),
        )
        .route("/api/sessions/{id}/reveal", post(routes::sessions::reveal))
        .route("/api/sessions/{id}/grade", post(routes::sessions::grade))
        .route("/api/sessions/{id}/skip", post(routes::sessions::skip))
        .route("/api/sessions/{id}/refresh", post(routes::sessions::refresh))
        .layer(middleware::from_fn(routes::owner::owner_middleware));

    Router::new()
        .route("/health", get(health_check))
        .merge(protected_routes)
        .with_state(state)
}

pub async fn run() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store: Arc<dyn CardStore> = match &config.database_url {
        Some(url) => {
            tracing::info!("Connecting to database...");
            let db = PgCardStore::connect(url, config.database_max_connections).await?;

            tracing::info!("Running migrations...");
            db.run_migrations().await?;
            Arc::new(db)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, cards are kept in memory");
            Arc::new(MemoryCardStore::with_clock(clock.clone()))
        }
    };

    let addr = config.bind_addr();
    let state = AppState::new(store, clock, config);

    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}
