use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::instrument;

use crate::checkin::RosterService;
use crate::checkin::roster::{NewClassroom, NewStudent, NewSubject};
use crate::error::{AppError, ErrorBody};
use crate::extractors::json::AppJson;
use crate::models::roster::*;
use crate::state::AppState;
use crate::utils::term::resolve_term;

#[utoipa::path(
    post,
    path = "/",
    tag = "Rosters",
    operation_id = "createClassroom",
    summary = "Create a classroom",
    request_body = CreateClassroomRequest,
    responses(
        (status = 201, description = "Classroom created", body = ClassroomResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Term not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(name = %payload.name))]
pub async fn create_classroom(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateClassroomRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create_classroom(&payload)?;
    let term_id = resolve_term(&state.db, payload.term_id).await?;
    let model = RosterService::new(&state.db)
        .create_classroom(
            NewClassroom {
                name: payload.name.trim().to_string(),
                level: payload.level.trim().to_string(),
                term_id,
            },
            chrono::Utc::now(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(ClassroomResponse::from(model))))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Rosters",
    operation_id = "listClassrooms",
    summary = "List classrooms of a term",
    params(TermScopeQuery),
    responses(
        (status = 200, description = "Classrooms", body = Vec<ClassroomResponse>),
    ),
)]
#[instrument(skip(state))]
pub async fn list_classrooms(
    State(state): State<AppState>,
    Query(query): Query<TermScopeQuery>,
) -> Result<Json<Vec<ClassroomResponse>>, AppError> {
    let term_id = resolve_term(&state.db, query.term_id).await?;
    let rooms = RosterService::new(&state.db)
        .list_classrooms(&term_id)
        .await?;
    Ok(Json(rooms.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Rosters",
    operation_id = "createSubject",
    summary = "Create a subject",
    description = "Every classroom must belong to the subject's term.",
    request_body = CreateSubjectRequest,
    responses(
        (status = 201, description = "Subject created", body = SubjectResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Term not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(code = %payload.code))]
pub async fn create_subject(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateSubjectRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create_subject(&payload)?;
    let term_id = resolve_term(&state.db, payload.term_id).await?;
    let model = RosterService::new(&state.db)
        .create_subject(
            NewSubject {
                code: payload.code.trim().to_string(),
                name: payload.name.trim().to_string(),
                classrooms: payload.classrooms,
                schedules: payload.schedules,
                term_id,
            },
            chrono::Utc::now(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(SubjectResponse::from(model))))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Rosters",
    operation_id = "listSubjects",
    summary = "List subjects of a term",
    params(TermScopeQuery),
    responses(
        (status = 200, description = "Subjects", body = Vec<SubjectResponse>),
    ),
)]
#[instrument(skip(state))]
pub async fn list_subjects(
    State(state): State<AppState>,
    Query(query): Query<TermScopeQuery>,
) -> Result<Json<Vec<SubjectResponse>>, AppError> {
    let term_id = resolve_term(&state.db, query.term_id).await?;
    let subjects = RosterService::new(&state.db).list_subjects(&term_id).await?;
    Ok(Json(subjects.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Rosters",
    operation_id = "createStudent",
    summary = "Add a student to a classroom",
    description = "The student joins the classroom's term. The classroom's cached `student_count` is bumped after the insert.",
    request_body = CreateStudentRequest,
    responses(
        (status = 201, description = "Student created", body = StudentResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Classroom not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Student id taken (CONFLICT)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(classroom_id = %payload.classroom_id))]
pub async fn create_student(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateStudentRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create_student(&payload)?;
    let model = RosterService::new(&state.db)
        .create_student(
            NewStudent {
                id: payload.id.map(|id| id.trim().to_string()),
                student_code: payload.student_code.trim().to_string(),
                first_name: payload.first_name.trim().to_string(),
                last_name: payload.last_name.trim().to_string(),
                classroom_id: payload.classroom_id.trim().to_string(),
            },
            chrono::Utc::now(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(StudentResponse::from(model))))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Rosters",
    operation_id = "moveStudent",
    summary = "Move a student to another classroom",
    params(("id" = String, Path, description = "Student ID")),
    request_body = UpdateStudentRequest,
    responses(
        (status = 200, description = "Student moved", body = StudentResponse),
        (status = 400, description = "Target classroom in another term (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Student or classroom not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload))]
pub async fn move_student(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(payload): AppJson<UpdateStudentRequest>,
) -> Result<Json<StudentResponse>, AppError> {
    let model = RosterService::new(&state.db)
        .move_student(&id, payload.classroom_id.trim())
        .await?;
    Ok(Json(model.into()))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Rosters",
    operation_id = "deleteStudent",
    summary = "Remove a student",
    description = "Attendance records of the student are kept.",
    params(("id" = String, Path, description = "Student ID")),
    responses(
        (status = 204, description = "Student deleted"),
        (status = 404, description = "Student not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn delete_student(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    RosterService::new(&state.db).delete_student(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
