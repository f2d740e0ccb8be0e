use chrono::{DateTime, NaiveDate, Utc};
use common::{AttendanceStatus, GeoPoint};
use serde::{Deserialize, Serialize};

use crate::checkin::{DraftRecord, RecordFilter};
use crate::entity::attendance;
use crate::error::AppError;

use super::shared::validate_period;

/// One student's row in a manual attendance sheet.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct DraftRecordRequest {
    #[schema(example = "S1")]
    pub student_id: String,
    pub status: AttendanceStatus,
    #[schema(example = "arrived with a note from home")]
    pub note: Option<String>,
}

/// Request body for saving a roster's worth of attendance for one period.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct SaveAttendanceRequest {
    /// Defaults to the active term.
    pub term_id: Option<String>,
    #[schema(example = "2024-06-01", value_type = String, format = Date)]
    pub date: NaiveDate,
    #[schema(example = "MATH101")]
    pub subject_id: String,
    #[schema(example = "M1-1")]
    pub classroom_id: String,
    #[schema(example = 2)]
    pub period: i32,
    pub records: Vec<DraftRecordRequest>,
}

pub fn validate_save_attendance(payload: &SaveAttendanceRequest) -> Result<(), AppError> {
    if payload.subject_id.trim().is_empty() || payload.classroom_id.trim().is_empty() {
        return Err(AppError::Validation(
            "subject_id and classroom_id must not be empty".into(),
        ));
    }
    validate_period(payload.period)?;
    if let Some(blank) = payload.records.iter().position(|r| r.student_id.trim().is_empty()) {
        return Err(AppError::Validation(format!(
            "records[{blank}].student_id must not be empty"
        )));
    }
    if let Some(long) = payload
        .records
        .iter()
        .position(|r| r.note.as_ref().is_some_and(|n| n.chars().count() > 500))
    {
        return Err(AppError::Validation(format!(
            "records[{long}].note must be at most 500 characters"
        )));
    }
    Ok(())
}

impl From<DraftRecordRequest> for DraftRecord {
    fn from(r: DraftRecordRequest) -> Self {
        Self {
            student_id: r.student_id.trim().to_string(),
            status: r.status,
            note: r.note.filter(|n| !n.trim().is_empty()),
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SaveAttendanceResponse {
    #[schema(example = 28)]
    pub inserted: usize,
    #[schema(example = 2)]
    pub updated: usize,
}

/// Query parameters for listing attendance records. Every filter is optional.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct AttendanceListQuery {
    pub term_id: Option<String>,
    #[param(value_type = Option<String>, format = Date, example = "2024-06-01")]
    pub date: Option<NaiveDate>,
    /// Inclusive start date.
    #[param(value_type = Option<String>, format = Date)]
    pub from: Option<NaiveDate>,
    /// Inclusive end date.
    #[param(value_type = Option<String>, format = Date)]
    pub to: Option<NaiveDate>,
    pub subject_id: Option<String>,
    pub classroom_id: Option<String>,
    pub period: Option<i32>,
    pub student_id: Option<String>,
}

impl From<AttendanceListQuery> for RecordFilter {
    fn from(q: AttendanceListQuery) -> Self {
        Self {
            term_id: q.term_id,
            date: q.date,
            from: q.from,
            to: q.to,
            subject_id: q.subject_id,
            classroom_id: q.classroom_id,
            period: q.period,
            student_id: q.student_id,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct AttendanceResponse {
    pub id: String,
    pub term_id: String,
    pub subject_id: String,
    pub classroom_id: String,
    #[schema(value_type = String, format = Date)]
    pub date: NaiveDate,
    pub period: i32,
    pub student_id: String,
    pub status: AttendanceStatus,
    pub note: Option<String>,
    pub location: Option<GeoPoint>,
    pub device_fingerprint: Option<String>,
    /// Set for records created by a QR scan.
    pub check_in_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<attendance::Model> for AttendanceResponse {
    fn from(m: attendance::Model) -> Self {
        Self {
            location: m.geo_point(),
            id: m.id,
            term_id: m.term_id,
            subject_id: m.subject_id,
            classroom_id: m.classroom_id,
            date: m.date,
            period: m.period,
            student_id: m.student_id,
            status: m.status,
            note: m.note,
            device_fingerprint: m.fingerprint,
            check_in_time: m.check_in_time,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}
