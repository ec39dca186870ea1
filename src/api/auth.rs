//! Authentication API endpoints
//!
//! Login, self-registration, token refresh and the current principal.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, warn};

use crate::{
    middleware::auth::{
        create_access_token, create_refresh_token, resolve_principal, validate_token, AuthUser,
        TokenType,
    },
    models::{
        AuthResponse, CreateEmployeeRequest, EmployeePublic, LoginRequest, PrincipalResponse,
        RefreshTokenRequest, TokenResponse,
    },
    services::policy,
    utils::error::{AppError, AppResult},
    AppState,
};

/// Routes reachable without a token
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/refresh", post(refresh_token))
}

/// Routes behind the auth middleware
pub fn protected_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_current_principal))
}

fn token_error(e: jsonwebtoken::errors::Error) -> AppError {
    AppError::internal(format!("Failed to create token: {}", e))
}

/// POST /api/v1/auth/login
async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let employee = state
        .auth()
        .authenticate(&payload.email, &payload.password)
        .await?
        .ok_or_else(|| {
            warn!("Failed login attempt");
            AppError::Unauthorized("Invalid email or password".to_string())
        })?;

    let auth = &state.config.auth;
    let access_token = create_access_token(
        employee.id,
        &employee.email,
        employee.role_names(),
        &auth.jwt_secret,
        auth.token_expiry_hours,
    )
    .map_err(token_error)?;
    let refresh_token = create_refresh_token(
        employee.id,
        &employee.email,
        &auth.jwt_secret,
        auth.refresh_token_expiry_days,
    )
    .map_err(token_error)?;

    info!(employee_id = employee.id, "Employee logged in");

    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: auth.token_expiry_hours * 3600,
        employee: EmployeePublic::from(employee),
    }))
}

/// POST /api/v1/auth/register
async fn register(
    State(state): State<AppState>,
    Json(payload): Json<CreateEmployeeRequest>,
) -> AppResult<(StatusCode, Json<EmployeePublic>)> {
    if !state.config.auth.allow_registration {
        return Err(AppError::forbidden("Self-registration is disabled"));
    }

    let employee = state.employees().register(payload).await?;
    Ok((StatusCode::CREATED, Json(employee)))
}

/// POST /api/v1/auth/refresh
async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshTokenRequest>,
) -> AppResult<Json<TokenResponse>> {
    let invalid = || AppError::Unauthorized("Invalid or expired refresh token".to_string());

    let token_data =
        validate_token(&payload.refresh_token, &state.config.auth.jwt_secret).map_err(|_| invalid())?;
    if token_data.claims.token_type != TokenType::Refresh {
        return Err(invalid());
    }

    // Roles are re-read so the new token reflects current grants
    let principal = resolve_principal(&state, &token_data.claims)
        .await
        .map_err(|_| AppError::Unauthorized("Account is no longer active".to_string()))?;

    let auth = &state.config.auth;
    let access_token = create_access_token(
        principal.employee_id,
        &principal.email,
        principal.roles.clone(),
        &auth.jwt_secret,
        auth.token_expiry_hours,
    )
    .map_err(token_error)?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: auth.token_expiry_hours * 3600,
    }))
}

/// GET /api/v1/auth/me
async fn get_current_principal(user: AuthUser) -> Json<PrincipalResponse> {
    let capabilities = policy::capabilities(&user)
        .iter()
        .map(|c| c.as_str().to_string())
        .collect();

    Json(PrincipalResponse {
        id: user.employee_id,
        email: user.email,
        roles: user.roles,
        capabilities,
    })
}
