//! Green-build quote service.
//!
//! Exposes the quote totals engine over a JSON API backed by PostgreSQL or an
//! in-memory store.

pub mod cache;
pub mod config;
pub mod error;
pub mod quotes;
pub mod telemetry;

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::cache::AppCache;
use crate::quotes::responses::HealthResponse;
use crate::quotes::{QuoteService, QuoteStore};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub quotes: Arc<QuoteService>,
    pub cache: AppCache,
}

impl AppState {
    pub fn new(store: Arc<dyn QuoteStore>, cache: AppCache) -> Self {
        Self {
            quotes: Arc::new(QuoteService::new(store, cache.clone())),
            cache,
        }
    }
}

/// Build the full application router
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api", quotes::router())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        cache: state.cache.stats(),
    })
}
