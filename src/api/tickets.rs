//! Helpdesk ticket endpoints

use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};

use crate::{
    middleware::AuthUser,
    models::{
        CreateTicketRequest, Page, PageRequest, RemarkRequest, TicketFilter, TicketStatus,
        TicketView, UpdateTicketRequest,
    },
    services::RemarkPath,
    utils::error::AppResult,
    AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tickets).post(create_ticket))
        .route("/counts-by-status", get(counts_by_status))
        .route("/profile/ticket-counts", get(personal_counts))
        .route("/status/{status}", get(list_by_status))
        .route("/assignee/{employee_id}", get(list_by_assignee))
        .route(
            "/{id}",
            get(get_ticket).put(update_ticket).delete(delete_ticket),
        )
        .route("/{id}/assign/{employee_id}", put(assign_ticket))
        .route("/{id}/remark", put(remark_ticket))
}

/// GET /api/v1/tickets
///
/// Paged, filtered listing over every active ticket.
async fn list_tickets(
    State(state): State<AppState>,
    user: AuthUser,
    Query(page): Query<PageRequest>,
    Query(filter): Query<TicketFilter>,
) -> AppResult<Json<Page<TicketView>>> {
    Ok(Json(state.tickets().list(&user, &filter, page).await?))
}

/// POST /api/v1/tickets
///
/// New tickets always start as DRAFT with a fresh ticket number.
async fn create_ticket(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateTicketRequest>,
) -> AppResult<(StatusCode, Json<TicketView>)> {
    let ticket = state.tickets().create(&user, payload).await?;
    Ok((StatusCode::CREATED, Json(ticket)))
}

async fn get_ticket(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<TicketView>> {
    Ok(Json(state.tickets().get(&user, id).await?))
}

async fn update_ticket(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateTicketRequest>,
) -> AppResult<Json<TicketView>> {
    Ok(Json(state.tickets().update(&user, id, payload).await?))
}

async fn delete_ticket(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    state.tickets().delete(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/tickets/{id}/assign/{employee_id}
async fn assign_ticket(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, employee_id)): Path<(i64, i64)>,
) -> AppResult<Json<TicketView>> {
    Ok(Json(state.tickets().assign(&user, id, employee_id).await?))
}

/// PUT /api/v1/tickets/{id}/remark
async fn remark_ticket(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<RemarkRequest>,
) -> AppResult<Json<TicketView>> {
    let ticket = state
        .tickets()
        .remark(&user, id, payload, RemarkPath::Admin)
        .await?;
    Ok(Json(ticket))
}

/// GET /api/v1/tickets/status/{status}
async fn list_by_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(status): Path<String>,
) -> AppResult<Json<Vec<TicketView>>> {
    Ok(Json(state.tickets().by_status(&user, &status).await?))
}

async fn list_by_assignee(
    State(state): State<AppState>,
    user: AuthUser,
    Path(employee_id): Path<i64>,
) -> AppResult<Json<Vec<TicketView>>> {
    Ok(Json(state.tickets().by_assignee(&user, employee_id).await?))
}

/// GET /api/v1/tickets/counts-by-status
async fn counts_by_status(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<BTreeMap<TicketStatus, u64>>> {
    Ok(Json(state.tickets().counts_by_status(&user).await?))
}

/// GET /api/v1/tickets/profile/ticket-counts
async fn personal_counts(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<BTreeMap<String, u64>>> {
    Ok(Json(state.tickets().personal_counts(&user).await?))
}
