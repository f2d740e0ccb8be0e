use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use tracing::instrument;

use crate::checkin::{AttendanceWriter, RecordBatch};
use crate::error::{AppError, ErrorBody};
use crate::extractors::json::AppJson;
use crate::models::attendance::*;
use crate::state::AppState;
use crate::utils::term::resolve_term;

#[utoipa::path(
    post,
    path = "/",
    tag = "Attendance",
    operation_id = "saveAttendance",
    summary = "Save attendance for one period",
    description = "Inserts or updates one record per student for `(term_id, date, subject_id, classroom_id, period)`. Resubmitting the same sheet updates in place and never duplicates. If a student appears twice the last entry wins. Writes are committed in chunks of `store.batch_size`.",
    request_body = SaveAttendanceRequest,
    responses(
        (status = 200, description = "Attendance saved", body = SaveAttendanceResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 409, description = "Concurrent edit of the same period (CONFLICT)", body = ErrorBody),
        (status = 503, description = "Store unavailable (STORE_UNAVAILABLE)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(subject_id = %payload.subject_id, classroom_id = %payload.classroom_id, records = payload.records.len()))]
pub async fn save_attendance(
    State(state): State<AppState>,
    AppJson(payload): AppJson<SaveAttendanceRequest>,
) -> Result<Json<SaveAttendanceResponse>, AppError> {
    validate_save_attendance(&payload)?;
    let term_id = resolve_term(&state.db, payload.term_id).await?;

    let summary = AttendanceWriter::new(&state.db, state.config.store.batch_size)
        .save(
            RecordBatch {
                term_id,
                date: payload.date,
                subject_id: payload.subject_id.trim().to_string(),
                classroom_id: payload.classroom_id.trim().to_string(),
                period: payload.period,
                drafts: payload.records.into_iter().map(Into::into).collect(),
            },
            chrono::Utc::now(),
        )
        .await?;

    Ok(Json(SaveAttendanceResponse {
        inserted: summary.inserted,
        updated: summary.updated,
    }))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Attendance",
    operation_id = "listAttendance",
    summary = "List attendance records",
    description = "Filters combine with AND; `from` and `to` bound the date inclusively. Ordered by date, period and student id.",
    params(AttendanceListQuery),
    responses(
        (status = 200, description = "Matching records", body = Vec<AttendanceResponse>),
        (status = 503, description = "Store unavailable (STORE_UNAVAILABLE)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn list_attendance(
    State(state): State<AppState>,
    Query(query): Query<AttendanceListQuery>,
) -> Result<Json<Vec<AttendanceResponse>>, AppError> {
    crate::models::shared::validate_date_range(query.from, query.to)?;
    let records = AttendanceWriter::new(&state.db, state.config.store.batch_size)
        .list(query.into())
        .await?;
    Ok(Json(records.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Attendance",
    operation_id = "deleteAttendance",
    summary = "Delete an attendance record",
    params(("id" = String, Path, description = "Record ID")),
    responses(
        (status = 204, description = "Record deleted"),
        (status = 404, description = "Record not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn delete_attendance(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    AttendanceWriter::new(&state.db, state.config.store.batch_size)
        .delete(&id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
