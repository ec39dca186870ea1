//! Input validation utilities

use once_cell::sync::Lazy;
use regex::Regex;

use crate::utils::error::{AppError, AppResult};

/// Regex for validating contact numbers: digits with optional leading `+`,
/// separated by spaces, dashes, dots or parentheses
static CONTACT_NUMBER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9()][0-9 ().-]{2,30}$").unwrap());

/// Validate a contact number
pub fn validate_contact_number(value: &str) -> bool {
    CONTACT_NUMBER_REGEX.is_match(value)
}

/// Require a non-blank value, returning it trimmed
///
/// Fails with `ValidationError` naming the field ("Title is required").
pub fn require_text<'a>(field: &str, value: Option<&'a str>) -> AppResult<&'a str> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::validation(format!("{} is required", field))),
    }
}

/// `validator` hook rejecting empty or whitespace-only text
pub fn not_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        return Err(validator::ValidationError::new("blank"));
    }
    Ok(())
}

/// Normalize an optional free-text field: trimmed, blank becomes `None`
pub fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Normalize an email for storage and comparison
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
