use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::subject::Schedule;
use crate::entity::{classroom, student, subject, term};
use crate::error::AppError;

use super::shared::{validate_id_list, validate_name, validate_period};

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateTermRequest {
    #[schema(example = "2024/1")]
    pub name: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct TermResponse {
    pub id: String,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<term::Model> for TermResponse {
    fn from(m: term::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            is_active: m.is_active,
            created_at: m.created_at,
        }
    }
}

/// Per-collection counts removed by a term delete.
#[derive(Serialize, utoipa::ToSchema)]
pub struct DeleteTermResponse {
    pub term_id: String,
    pub deleted: Vec<CollectionDeleted>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CollectionDeleted {
    #[schema(example = "attendance")]
    pub collection: String,
    #[schema(example = 5400)]
    pub deleted: u64,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct TermScopeQuery {
    /// Defaults to the active term.
    pub term_id: Option<String>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateClassroomRequest {
    #[schema(example = "M.1/1")]
    pub name: String,
    #[schema(example = "M1")]
    pub level: String,
    /// Defaults to the active term.
    pub term_id: Option<String>,
}

pub fn validate_create_classroom(payload: &CreateClassroomRequest) -> Result<(), AppError> {
    validate_name(&payload.name, "name", 64)?;
    validate_name(&payload.level, "level", 32)
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ClassroomResponse {
    pub id: String,
    pub name: String,
    pub level: String,
    /// Cached roster size; see the classroom count maintenance endpoint.
    pub student_count: i32,
    pub term_id: String,
    pub created_at: DateTime<Utc>,
}

impl From<classroom::Model> for ClassroomResponse {
    fn from(m: classroom::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            level: m.level,
            student_count: m.student_count,
            term_id: m.term_id,
            created_at: m.created_at,
        }
    }
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateSubjectRequest {
    #[schema(example = "MATH101")]
    pub code: String,
    #[schema(example = "Mathematics 1")]
    pub name: String,
    pub classrooms: Vec<String>,
    #[serde(default)]
    pub schedules: Vec<Schedule>,
    /// Defaults to the active term.
    pub term_id: Option<String>,
}

pub fn validate_create_subject(payload: &CreateSubjectRequest) -> Result<(), AppError> {
    validate_name(&payload.code, "code", 32)?;
    validate_name(&payload.name, "name", 128)?;
    if payload.classrooms.is_empty() {
        return Err(AppError::Validation(
            "classrooms must not be empty".into(),
        ));
    }
    validate_id_list(&payload.classrooms, "classroom")?;
    for s in &payload.schedules {
        if !(1..=7).contains(&s.day_of_week) {
            return Err(AppError::Validation("day_of_week must be 1-7".into()));
        }
        validate_period(s.period)?;
    }
    Ok(())
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SubjectResponse {
    pub id: String,
    pub code: String,
    pub name: String,
    pub classrooms: Vec<String>,
    pub schedules: Vec<Schedule>,
    pub term_id: String,
    pub created_at: DateTime<Utc>,
}

impl From<subject::Model> for SubjectResponse {
    fn from(m: subject::Model) -> Self {
        Self {
            classrooms: m.classroom_ids(),
            schedules: m.schedule_list(),
            id: m.id,
            code: m.code,
            name: m.name,
            term_id: m.term_id,
            created_at: m.created_at,
        }
    }
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateStudentRequest {
    /// Optional caller-chosen id, e.g. an id from a school information system.
    #[schema(example = "S1")]
    pub id: Option<String>,
    #[schema(example = "66001")]
    pub student_code: String,
    pub first_name: String,
    pub last_name: String,
    #[schema(example = "M1-1")]
    pub classroom_id: String,
}

pub fn validate_create_student(payload: &CreateStudentRequest) -> Result<(), AppError> {
    if let Some(id) = &payload.id {
        validate_name(id, "id", 64)?;
    }
    validate_name(&payload.student_code, "student_code", 32)?;
    validate_name(&payload.first_name, "first_name", 64)?;
    validate_name(&payload.last_name, "last_name", 64)?;
    validate_name(&payload.classroom_id, "classroom_id", 64)
}

/// Move a student to another classroom.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateStudentRequest {
    pub classroom_id: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct StudentResponse {
    pub id: String,
    pub student_code: String,
    pub first_name: String,
    pub last_name: String,
    pub classroom_id: String,
    pub term_id: String,
    pub created_at: DateTime<Utc>,
}

impl From<student::Model> for StudentResponse {
    fn from(m: student::Model) -> Self {
        Self {
            id: m.id,
            student_code: m.student_code,
            first_name: m.first_name,
            last_name: m.last_name,
            classroom_id: m.classroom_id,
            term_id: m.term_id,
            created_at: m.created_at,
        }
    }
}
