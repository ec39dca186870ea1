//! Role management API endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use crate::{
    middleware::AuthUser,
    models::{Page, PageRequest, Role, RoleRequest},
    utils::error::AppResult,
    AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_roles).post(create_role))
        .route("/{id}", get(get_role).put(update_role).delete(delete_role))
}

/// GET /api/v1/roles
async fn list_roles(
    State(state): State<AppState>,
    user: AuthUser,
    Query(page): Query<PageRequest>,
) -> AppResult<Json<Page<Role>>> {
    Ok(Json(state.roles().list(&user, page).await?))
}

/// POST /api/v1/roles
async fn create_role(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<RoleRequest>,
) -> AppResult<(StatusCode, Json<Role>)> {
    let role = state.roles().create(&user, payload).await?;
    Ok((StatusCode::CREATED, Json(role)))
}

async fn get_role(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Role>> {
    Ok(Json(state.roles().get(&user, id).await?))
}

async fn update_role(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<RoleRequest>,
) -> AppResult<Json<Role>> {
    Ok(Json(state.roles().update(&user, id, payload).await?))
}

/// DELETE /api/v1/roles/{id}
///
/// Detaches the role from every employee before removing it.
async fn delete_role(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    state.roles().delete(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
