use chrono::{DateTime, NaiveDate, Utc};
use common::{AttendanceStatus, GeoPoint};
use serde::{Deserialize, Serialize};

use crate::checkin::ScanRequest;
use crate::entity::attendance;
use crate::error::AppError;

/// A scan submitted by a student device.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CheckInRequest {
    /// The decoded QR payload.
    #[schema(example = "0b5c3f5e-3f43-4a4b-9b07-0c3f2d8f1f3e")]
    pub token: String,
    #[schema(example = "S1")]
    pub student_id: String,
    /// The classroom the student belongs to.
    #[schema(example = "M1-1")]
    pub classroom_id: String,
    pub device_fingerprint: Option<String>,
    pub location: Option<GeoPoint>,
}

pub fn validate_check_in(payload: &CheckInRequest) -> Result<(), AppError> {
    if payload.student_id.trim().is_empty() {
        return Err(AppError::Validation("student_id must not be empty".into()));
    }
    if payload.classroom_id.trim().is_empty() {
        return Err(AppError::Validation("classroom_id must not be empty".into()));
    }
    if let Some(fp) = &payload.device_fingerprint
        && fp.len() > 256
    {
        return Err(AppError::Validation(
            "device_fingerprint must be at most 256 bytes".into(),
        ));
    }
    if let Some(loc) = &payload.location
        && !loc.is_valid()
    {
        return Err(AppError::Validation("location is out of range".into()));
    }
    Ok(())
}

impl From<CheckInRequest> for ScanRequest {
    fn from(r: CheckInRequest) -> Self {
        Self {
            payload: r.token,
            student_id: r.student_id.trim().to_string(),
            classroom_id: r.classroom_id.trim().to_string(),
            fingerprint: r.device_fingerprint,
            location: r.location,
        }
    }
}

/// An accepted check-in.
#[derive(Serialize, utoipa::ToSchema)]
pub struct CheckInResponse {
    pub record_id: String,
    pub session_id: String,
    pub subject_id: String,
    pub student_id: String,
    pub classroom_id: String,
    #[schema(value_type = String, format = Date)]
    pub date: NaiveDate,
    pub period: i32,
    pub status: AttendanceStatus,
    pub checked_in_at: DateTime<Utc>,
}

impl CheckInResponse {
    pub fn new(session_id: String, m: attendance::Model) -> Self {
        Self {
            checked_in_at: m.check_in_time.unwrap_or(m.created_at),
            record_id: m.id,
            session_id,
            subject_id: m.subject_id,
            student_id: m.student_id,
            classroom_id: m.classroom_id,
            date: m.date,
            period: m.period,
            status: m.status,
        }
    }
}
