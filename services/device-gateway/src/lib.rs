// Device Registry Gateway
// Stateless HTTP front for the device ledger: one request, one contract invocation

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;

use axum::{
    routing::{get, post},
    Router,
};
use device_ledger::Ledger;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Shared per-process state, injected into every handler
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<Ledger>,
    pub legacy_error_status: bool,
}

impl AppState {
    pub fn new(ledger: Arc<Ledger>, legacy_error_status: bool) -> Self {
        Self {
            ledger,
            legacy_error_status,
        }
    }
}

/// Build the gateway router
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/register", post(handlers::register))
        .route("/update", post(handlers::update))
        .route("/auth", post(handlers::auth))
        .route("/getall", get(handlers::get_all))
        .route("/delete", post(handlers::delete))
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
