use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::{debug, instrument};

use crate::checkin::{CheckInEvent, ScanOutcome, ScanValidator};
use crate::error::{AppError, ErrorBody};
use crate::extractors::json::AppJson;
use crate::models::checkin::*;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/",
    tag = "Check-in",
    operation_id = "checkIn",
    summary = "Check in by scanning a session QR code",
    description = "Validates the scanned token against the session and records the student as present. Exactly one record is kept per student and period, even under concurrent scans.",
    request_body = CheckInRequest,
    responses(
        (status = 201, description = "Checked in", body = CheckInResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 403, description = "Classroom not targeted by the session (NOT_ELIGIBLE)", body = ErrorBody),
        (status = 404, description = "Unknown or tampered token (INVALID_TOKEN)", body = ErrorBody),
        (status = 409, description = "Already checked in (ALREADY_CHECKED_IN)", body = ErrorBody),
        (status = 410, description = "Session closed or expired (SESSION_CLOSED, SESSION_EXPIRED)", body = ErrorBody),
        (status = 503, description = "Store unavailable (STORE_UNAVAILABLE)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(student_id = %payload.student_id, classroom_id = %payload.classroom_id))]
pub async fn check_in(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CheckInRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_check_in(&payload)?;

    let outcome = ScanValidator::new(&state.db, &state.signer)
        .validate_and_check_in(payload.into(), chrono::Utc::now())
        .await?;

    let (session_id, record) = match outcome {
        ScanOutcome::Accepted { session_id, record } => (session_id, record),
        ScanOutcome::Rejected(rejection) => return Err(rejection.into()),
    };

    let reached = state.feed.publish(CheckInEvent {
        session_id: session_id.clone(),
        record_id: record.id.clone(),
        student_id: record.student_id.clone(),
        classroom_id: record.classroom_id.clone(),
        checked_in_at: record.check_in_time.unwrap_or(record.created_at),
    });
    debug!(record_id = %record.id, reached, "Published check-in");

    Ok((
        StatusCode::CREATED,
        Json(CheckInResponse::new(session_id, record)),
    ))
}
