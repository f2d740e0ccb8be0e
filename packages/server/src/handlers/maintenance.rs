use axum::Json;
use axum::extract::State;
use tracing::instrument;

use crate::checkin::maintenance::recalculate_classroom_counts;
use crate::error::{AppError, ErrorBody};
use crate::extractors::json::AppJson;
use crate::models::maintenance::*;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/classroom-counts",
    tag = "Maintenance",
    operation_id = "recalculateClassroomCounts",
    summary = "Recompute cached classroom student counts",
    description = "Counts students per classroom and rewrites the cached `student_count` where it drifted. Idempotent and safe to run at any time.",
    request_body(content = RecountRequest, description = "Send `{}` to reconcile every term"),
    responses(
        (status = 200, description = "Counts reconciled", body = RecountResponse),
        (status = 503, description = "Store unavailable (STORE_UNAVAILABLE)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload))]
pub async fn recalculate_counts(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RecountRequest>,
) -> Result<Json<RecountResponse>, AppError> {
    let report = recalculate_classroom_counts(&state.db, payload.term_id.as_deref()).await?;
    Ok(Json(report.into()))
}
