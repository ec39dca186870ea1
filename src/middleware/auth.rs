//! JWT Authentication Middleware
//!
//! Validates bearer tokens and resolves the principal from the employee
//! store, so deleted employees and stale identities are rejected even while
//! their tokens are still unexpired.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use uuid::Uuid;

use crate::{
    models::{Employee, ADMIN_ROLE},
    services::AuthService,
    utils::error::ErrorResponse,
    AppState,
};

/// JWT Claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// Subject (employee ID)
    pub sub: String,
    /// Employee email, the principal identity
    pub email: String,
    pub iat: i64,
    pub exp: i64,
    pub nbf: i64,
    /// JWT ID (unique identifier for this token)
    pub jti: String,
    #[serde(default)]
    pub token_type: TokenType,
    /// Role names at issue time; the middleware reloads the current set
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Token type enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    #[default]
    Access,
    Refresh,
}

/// Authenticated principal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub employee_id: i64,
    pub email: String,
    /// Current role names, read from the store on every request
    pub roles: Vec<String>,
}

impl AuthUser {
    pub fn from_employee(employee: &Employee) -> Self {
        Self {
            employee_id: employee.id,
            email: employee.email.clone(),
            roles: employee.role_names(),
        }
    }

    /// Identity stamped into createdBy/updatedBy
    pub fn identity(&self) -> &str {
        &self.email
    }

    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(ADMIN_ROLE))
    }
}

/// Extractor for AuthUser from request extensions
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<AuthUser>().cloned().ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse::new("unauthorized", "Authentication required")),
            )
        })
    }
}

fn sign(claims: &Claims, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Create a new JWT access token
pub fn create_access_token(
    employee_id: i64,
    email: &str,
    roles: Vec<String>,
    secret: &str,
    expiry_hours: u64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let exp = now + Duration::hours(expiry_hours as i64);

    let claims = Claims {
        sub: employee_id.to_string(),
        email: email.to_string(),
        iat: now.timestamp(),
        exp: exp.timestamp(),
        nbf: now.timestamp(),
        jti: Uuid::new_v4().to_string(),
        token_type: TokenType::Access,
        roles,
    };
    sign(&claims, secret)
}

/// Create a new JWT refresh token
pub fn create_refresh_token(
    employee_id: i64,
    email: &str,
    secret: &str,
    expiry_days: u64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let exp = now + Duration::days(expiry_days as i64);

    let claims = Claims {
        sub: employee_id.to_string(),
        email: email.to_string(),
        iat: now.timestamp(),
        exp: exp.timestamp(),
        nbf: now.timestamp(),
        jti: Uuid::new_v4().to_string(),
        token_type: TokenType::Refresh,
        roles: vec![],
    };
    sign(&claims, secret)
}

/// Validate and decode a JWT token
pub fn validate_token(token: &str, secret: &str) -> Result<TokenData<Claims>, AuthError> {
    let mut validation = Validation::default();
    validation.validate_exp = true;
    validation.validate_nbf = true;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::InvalidToken,
    })
}

/// Authentication error types
#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
    TokenExpired,
    InvalidTokenType,
    /// Token is valid but its employee no longer resolves
    UnknownPrincipal,
    Internal,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            AuthError::MissingToken => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Missing authentication token",
            ),
            AuthError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Invalid authentication token",
            ),
            AuthError::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Authentication token has expired",
            ),
            AuthError::InvalidTokenType => {
                (StatusCode::UNAUTHORIZED, "unauthorized", "Invalid token type")
            }
            AuthError::UnknownPrincipal => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Account is no longer active",
            ),
            AuthError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "An internal error occurred",
            ),
        };

        (status, Json(ErrorResponse::new(error, message))).into_response()
    }
}

/// Extract bearer token from Authorization header
fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .or_else(|| auth_header.strip_prefix("bearer "))
}

/// Resolve the principal named by validated claims
///
/// The employee must still be active under the token's email and keep the
/// token's subject id.
pub async fn resolve_principal(state: &AppState, claims: &Claims) -> Result<AuthUser, AuthError> {
    let employee = AuthService::new(state.db.clone(), state.cipher.clone())
        .find_active_by_email(&claims.email)
        .await
        .map_err(|e| {
            error!("Failed to resolve principal: {:#}", e);
            AuthError::Internal
        })?
        .ok_or(AuthError::UnknownPrincipal)?;

    if employee.id.to_string() != claims.sub {
        debug!("Token subject {} does not match employee {}", claims.sub, employee.id);
        return Err(AuthError::UnknownPrincipal);
    }

    Ok(AuthUser::from_employee(&employee))
}

/// Authentication middleware
///
/// Extracts and validates the bearer token, then injects the resolved
/// [`AuthUser`] into request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AuthError::MissingToken)
        .and_then(|header| extract_bearer_token(header).ok_or(AuthError::InvalidToken))?;

    let token_data = validate_token(token, &state.config.auth.jwt_secret)?;
    if token_data.claims.token_type != TokenType::Access {
        return Err(AuthError::InvalidTokenType);
    }

    let auth_user = resolve_principal(&state, &token_data.claims).await?;
    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}
