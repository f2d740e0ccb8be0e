use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::instrument;

use crate::checkin::RosterService;
use crate::checkin::maintenance::delete_term as cascade_delete_term;
use crate::error::{AppError, ErrorBody};
use crate::extractors::json::AppJson;
use crate::models::roster::*;
use crate::models::shared::validate_name;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/",
    tag = "Terms",
    operation_id = "createTerm",
    summary = "Create a term",
    description = "New terms start inactive.",
    request_body = CreateTermRequest,
    responses(
        (status = 201, description = "Term created", body = TermResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(name = %payload.name))]
pub async fn create_term(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateTermRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_name(&payload.name, "name", 64)?;
    let model = RosterService::new(&state.db)
        .create_term(payload.name.trim().to_string(), chrono::Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(TermResponse::from(model))))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Terms",
    operation_id = "listTerms",
    summary = "List terms, newest first",
    responses(
        (status = 200, description = "Terms", body = Vec<TermResponse>),
    ),
)]
#[instrument(skip(state))]
pub async fn list_terms(State(state): State<AppState>) -> Result<Json<Vec<TermResponse>>, AppError> {
    let terms = RosterService::new(&state.db).list_terms().await?;
    Ok(Json(terms.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/active",
    tag = "Terms",
    operation_id = "getActiveTerm",
    summary = "Get the active term",
    responses(
        (status = 200, description = "Active term", body = TermResponse),
        (status = 404, description = "No active term (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn active_term(State(state): State<AppState>) -> Result<Json<TermResponse>, AppError> {
    let term = RosterService::new(&state.db)
        .active_term()
        .await?
        .ok_or_else(|| AppError::NotFound("No active term".into()))?;
    Ok(Json(term.into()))
}

#[utoipa::path(
    post,
    path = "/{id}/activate",
    tag = "Terms",
    operation_id = "activateTerm",
    summary = "Make a term the only active term",
    params(("id" = String, Path, description = "Term ID")),
    responses(
        (status = 200, description = "Term activated", body = TermResponse),
        (status = 404, description = "Term not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn activate_term(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TermResponse>, AppError> {
    let term = RosterService::new(&state.db).activate_term(&id).await?;
    Ok(Json(term.into()))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Terms",
    operation_id = "deleteTerm",
    summary = "Delete a term and all of its data",
    description = "Deletes attendance, sessions, assignments, timetable entries, subjects, students and classrooms of the term, then the term. Each collection is deleted in chunks of `store.batch_size`, one transaction per chunk. On `PARTIAL_CASCADE_FAILURE` repeat the request to finish.",
    params(("id" = String, Path, description = "Term ID")),
    responses(
        (status = 200, description = "Term deleted", body = DeleteTermResponse),
        (status = 404, description = "Term not found (NOT_FOUND)", body = ErrorBody),
        (status = 500, description = "Stopped partway (PARTIAL_CASCADE_FAILURE)", body = ErrorBody),
        (status = 503, description = "Store unavailable (STORE_UNAVAILABLE)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn delete_term(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteTermResponse>, AppError> {
    let report = cascade_delete_term(&state.db, &id, state.config.store.batch_size).await?;
    Ok(Json(DeleteTermResponse {
        term_id: id,
        deleted: report
            .into_iter()
            .map(|c| CollectionDeleted {
                collection: c.collection.to_string(),
                deleted: c.deleted,
            })
            .collect(),
    }))
}
