//! Employee management and self-service endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};

use crate::{
    middleware::AuthUser,
    models::{
        CreateEmployeeRequest, EmployeeFilter, EmployeePublic, EmployeeReference, Page,
        PageRequest, ProfileUpdateResponse, RemarkRequest, TicketFilter, TicketView,
        UpdateEmployeeRequest, UpdateProfileRequest,
    },
    services::RemarkPath,
    utils::error::AppResult,
    AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_employees).post(create_employee))
        .route("/references", get(list_references))
        .route("/profile", get(get_profile).put(update_profile))
        .route("/profile/filed", get(list_relevant_tickets))
        .route("/profile/assigned", get(list_assigned_tickets))
        .route("/profile/assigned/{id}/remark", put(remark_assigned_ticket))
        .route(
            "/{id}",
            get(get_employee).put(update_employee).delete(delete_employee),
        )
        .route("/{id}/roles/{role_id}", put(assign_role))
}

/// GET /api/v1/employees
async fn list_employees(
    State(state): State<AppState>,
    user: AuthUser,
    Query(page): Query<PageRequest>,
    Query(filter): Query<EmployeeFilter>,
) -> AppResult<Json<Page<EmployeePublic>>> {
    let result = state.employees().list(&user, &filter, page).await?;
    Ok(Json(result))
}

/// POST /api/v1/employees
async fn create_employee(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateEmployeeRequest>,
) -> AppResult<(StatusCode, Json<EmployeePublic>)> {
    let employee = state.employees().create(&user, payload).await?;
    Ok((StatusCode::CREATED, Json(employee)))
}

async fn list_references(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<Vec<EmployeeReference>>> {
    Ok(Json(state.employees().references(&user).await?))
}

async fn get_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<EmployeePublic>> {
    Ok(Json(state.employees().profile(&user).await?))
}

/// PUT /api/v1/employees/profile
///
/// An email change invalidates the caller's tokens; the response says so.
async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<Json<ProfileUpdateResponse>> {
    Ok(Json(state.employees().update_profile(&user, payload).await?))
}

/// GET /api/v1/employees/profile/filed
async fn list_relevant_tickets(
    State(state): State<AppState>,
    user: AuthUser,
    Query(page): Query<PageRequest>,
    Query(filter): Query<TicketFilter>,
) -> AppResult<Json<Page<TicketView>>> {
    Ok(Json(state.tickets().relevant(&user, &filter, page).await?))
}

async fn list_assigned_tickets(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<Vec<TicketView>>> {
    Ok(Json(state.tickets().assigned(&user).await?))
}

/// PUT /api/v1/employees/profile/assigned/{id}/remark
async fn remark_assigned_ticket(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<RemarkRequest>,
) -> AppResult<Json<TicketView>> {
    let ticket = state
        .tickets()
        .remark(&user, id, payload, RemarkPath::Assignee)
        .await?;
    Ok(Json(ticket))
}

async fn get_employee(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<EmployeePublic>> {
    Ok(Json(state.employees().get(&user, id).await?))
}

async fn update_employee(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateEmployeeRequest>,
) -> AppResult<Json<EmployeePublic>> {
    Ok(Json(state.employees().update(&user, id, payload).await?))
}

/// DELETE /api/v1/employees/{id}
///
/// Tickets assigned to the employee become unassigned.
async fn delete_employee(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    state.employees().delete(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn assign_role(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, role_id)): Path<(i64, i64)>,
) -> AppResult<Json<EmployeePublic>> {
    Ok(Json(state.employees().assign_role(&user, id, role_id).await?))
}
