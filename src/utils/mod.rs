//! Shared utilities: error types and input validation

pub mod error;
pub mod validation;

pub use error::{AppError, AppResult, ErrorResponse};
