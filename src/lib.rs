//! Helpdesk Library
//!
//! Employees, roles and helpdesk tickets behind a token-authenticated JSON API.

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

pub mod api;
pub mod config;
pub mod db;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

pub use config::AppConfig;
pub use db::{DbPool, FieldCipher};
pub use middleware::{auth_middleware, AuthUser, Claims};
use services::{AuthService, EmployeeService, RoleService, TicketService, ViewCache};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Database connection pool
    pub db: DbPool,
    /// Cipher for personal fields at rest
    pub cipher: Arc<FieldCipher>,
    /// Read-through view cache; disabled caches hold nothing
    pub cache: Arc<ViewCache>,
}

impl AppState {
    pub fn new(config: AppConfig, db: DbPool) -> anyhow::Result<Self> {
        let cipher = FieldCipher::from_secret(&config.security.field_encryption_key)
            .context("Failed to initialize field cipher")?;
        let cache = ViewCache::new(&config.cache);

        Ok(Self {
            config,
            db,
            cipher: Arc::new(cipher),
            cache: Arc::new(cache),
        })
    }

    pub fn auth(&self) -> AuthService {
        AuthService::new(self.db.clone(), self.cipher.clone())
    }

    pub fn employees(&self) -> EmployeeService {
        EmployeeService::new(self.db.clone(), self.cipher.clone(), self.cache.clone())
    }

    pub fn roles(&self) -> RoleService {
        RoleService::new(self.db.clone(), self.cache.clone())
    }

    pub fn tickets(&self) -> TicketService {
        TicketService::new(self.db.clone(), self.cipher.clone(), self.cache.clone())
    }
}

/// Create the application router with all routes and middleware
///
/// Authentication applies to protected routes only, so login, registration
/// and health stay reachable without a token.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .nest("/api/v1", api::public_routes())
        .nest(
            "/api/v1",
            api::protected_routes().layer(axum::middleware::from_fn_with_state(
                state.clone(),
                middleware::auth::auth_middleware,
            )),
        )
        .with_state(state)
        .layer(CompressionLayer::new())
        .layer(trace_layer)
        .layer(cors)
}
