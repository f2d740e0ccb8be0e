use std::collections::HashMap;

use axum::Json;
use axum::extract::{Query, State};
use sea_orm::*;
use tracing::instrument;

use crate::checkin::aggregate::{grid, summarize};
use crate::checkin::{AttendanceWriter, RecordFilter, RosterService};
use crate::entity::student;
use crate::error::{AppError, ErrorBody};
use crate::models::shared::validate_date_range;
use crate::models::summary::*;
use crate::state::AppState;
use crate::utils::term::resolve_term;

#[utoipa::path(
    get,
    path = "/dashboard",
    tag = "Summary",
    operation_id = "getDashboardSummary",
    summary = "Daily attendance dashboard",
    description = "Counts students by their worst status of the day, overall and per classroom. Students without records are counted in `total_students` but in no status bucket.",
    params(DashboardQuery),
    responses(
        (status = 200, description = "Dashboard summary", body = DashboardResponse),
        (status = 400, description = "No term given and none active (VALIDATION_ERROR)", body = ErrorBody),
        (status = 503, description = "Store unavailable (STORE_UNAVAILABLE)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn dashboard(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<DashboardResponse>, AppError> {
    let term_id = resolve_term(&state.db, query.term_id).await?;

    let records = AttendanceWriter::new(&state.db, state.config.store.batch_size)
        .list(RecordFilter {
            term_id: Some(term_id.clone()),
            date: Some(query.date),
            ..Default::default()
        })
        .await?;
    let classrooms = RosterService::new(&state.db)
        .list_classrooms(&term_id)
        .await?;
    let total_students = student::Entity::find()
        .filter(student::Column::TermId.eq(&term_id))
        .count(&state.db)
        .await?;

    let summary = summarize(&records, &classrooms);
    Ok(Json(DashboardResponse {
        term_id,
        date: query.date,
        stats: DashboardStats::new(total_students, summary.per_student),
        classroom_summary: summary.per_classroom.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/grid",
    tag = "Summary",
    operation_id = "getGridSummary",
    summary = "Student by date attendance grid",
    description = "Worst status per student and day over the filtered records. Columns are the distinct dates that have records; rows are ordered by student code.",
    params(GridQuery),
    responses(
        (status = 200, description = "Grid summary", body = GridResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 503, description = "Store unavailable (STORE_UNAVAILABLE)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn grid_summary(
    State(state): State<AppState>,
    Query(query): Query<GridQuery>,
) -> Result<Json<GridResponse>, AppError> {
    validate_date_range(query.from, query.to)?;
    let term_id = resolve_term(&state.db, query.term_id).await?;

    let records = AttendanceWriter::new(&state.db, state.config.store.batch_size)
        .list(RecordFilter {
            term_id: Some(term_id.clone()),
            from: query.from,
            to: query.to,
            classroom_id: query.classroom_id,
            subject_id: query.subject_id,
            ..Default::default()
        })
        .await?;
    let matrix = grid(&records);

    let ids: Vec<String> = matrix.rows.iter().map(|r| r.student_id.clone()).collect();
    let roster: HashMap<String, student::Model> = student::Entity::find()
        .filter(student::Column::Id.is_in(ids))
        .all(&state.db)
        .await?
        .into_iter()
        .map(|s| (s.id.clone(), s))
        .collect();

    let mut rows: Vec<GridRowResponse> = matrix
        .rows
        .into_iter()
        .map(|row| {
            let (student_code, name) = roster
                .get(&row.student_id)
                .map(|s| (s.student_code.clone(), format!("{} {}", s.first_name, s.last_name)))
                .unwrap_or_default();
            GridRowResponse {
                student_id: row.student_id,
                student_code,
                name,
                cells: row.cells,
            }
        })
        .collect();
    rows.sort_by(|a, b| {
        a.student_code
            .cmp(&b.student_code)
            .then_with(|| a.student_id.cmp(&b.student_id))
    });

    Ok(Json(GridResponse {
        term_id,
        dates: matrix.dates,
        rows,
    }))
}
