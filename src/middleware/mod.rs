//! Middleware components
//!
//! Bearer token authentication and principal resolution.

pub mod auth;

pub use auth::{auth_middleware, AuthUser, Claims};
