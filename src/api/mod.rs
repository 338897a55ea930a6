//! JSON HTTP API over the market service.

pub mod handlers;
pub mod types;

use crate::pipeline::service::MarketService;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared handler state. Requests share nothing mutable; each lookup builds
/// its own adapter chain.
#[derive(Clone)]
pub struct AppState {
    pub service: MarketService,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods(Any);

    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        // live lookups
        .route("/api/gainers", get(handlers::gainers))
        .route("/api/live-trading", get(handlers::live_trading))
        .route("/api/indices", get(handlers::indices))
        .route("/api/company/:symbol", get(handlers::company))
        .route("/api/floorsheet/:symbol", get(handlers::floorsheet))
        // caller-supplied markup
        .route("/api/parse", post(handlers::parse_gainers))
        .route("/api/parse/live-trading", post(handlers::parse_live_trading))
        .route("/api/parse/indices", post(handlers::parse_indices))
        .route("/api/parse/floorsheet", post(handlers::parse_floorsheet))
        .route("/api/parse/company", post(handlers::parse_company))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
