//! API routes and handlers

use axum::{routing::get, Router};

use crate::AppState;

pub mod auth;
pub mod employees;
pub mod health;
pub mod roles;
pub mod tickets;

/// Public API routes (no authentication required)
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/detailed", get(health::health_check_detailed))
        .nest("/auth", auth::public_routes())
}

/// Protected API routes (authentication required)
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::protected_routes())
        .nest("/employees", employees::routes())
        .nest("/roles", roles::routes())
        .nest("/tickets", tickets::routes())
}
