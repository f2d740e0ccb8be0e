use chrono::{DateTime, NaiveDate, Utc};
use common::GeoPoint;
use serde::{Deserialize, Serialize};

use crate::checkin::TokenSigner;
use crate::config::CheckinConfig;
use crate::entity::qr_session;
use crate::error::AppError;

use super::shared::{validate_id_list, validate_period};

/// Request body for opening a check-in session.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateSessionRequest {
    #[schema(example = "MATH101")]
    pub subject_id: String,
    /// Target classrooms. Omitted or empty means every classroom of the subject.
    #[serde(default)]
    pub classrooms: Vec<String>,
    #[schema(example = "2024-06-01", value_type = String, format = Date)]
    pub date: NaiveDate,
    #[schema(example = 2)]
    pub period: i32,
    /// Session lifetime in minutes. Defaults to `checkin.default_ttl_minutes`.
    #[schema(example = 10)]
    pub ttl_minutes: Option<i64>,
    /// Where the teacher opened the session.
    pub location: Option<GeoPoint>,
}

/// Validate a create request and return the effective TTL in minutes.
pub fn validate_create_session(
    payload: &CreateSessionRequest,
    config: &CheckinConfig,
) -> Result<i64, AppError> {
    if payload.subject_id.trim().is_empty() {
        return Err(AppError::Validation("subject_id must not be empty".into()));
    }
    validate_period(payload.period)?;
    validate_id_list(&payload.classrooms, "classroom")?;

    let ttl = payload.ttl_minutes.unwrap_or(config.default_ttl_minutes);
    if ttl < 1 || ttl > config.max_ttl_minutes {
        return Err(AppError::Validation(format!(
            "ttl_minutes must be between 1 and {}",
            config.max_ttl_minutes
        )));
    }
    if let Some(loc) = &payload.location
        && !loc.is_valid()
    {
        return Err(AppError::Validation("location is out of range".into()));
    }
    Ok(ttl)
}

/// Request body for closing every active session of a slot.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct DeactivateSessionsRequest {
    #[schema(example = "MATH101")]
    pub subject_id: String,
    #[schema(example = "2024-06-01", value_type = String, format = Date)]
    pub date: NaiveDate,
    #[schema(example = 2)]
    pub period: i32,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct DeactivateSessionsResponse {
    /// Number of sessions that were active and are now closed.
    #[schema(example = 1)]
    pub deactivated: u64,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SessionResponse {
    #[schema(example = "0b5c3f5e-3f43-4a4b-9b07-0c3f2d8f1f3e")]
    pub id: String,
    /// Payload to render as the QR code.
    pub token: String,
    pub subject_id: String,
    pub term_id: String,
    pub classrooms: Vec<String>,
    #[schema(value_type = String, format = Date)]
    pub date: NaiveDate,
    pub period: i32,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
    /// `true` once `expires_at` has passed, even if no scan has closed the session yet.
    pub is_expired: bool,
    pub location: Option<GeoPoint>,
    pub created_at: DateTime<Utc>,
}

impl SessionResponse {
    pub fn new(m: qr_session::Model, signer: &TokenSigner, now: DateTime<Utc>) -> Self {
        Self {
            token: signer.encode(&m.id),
            classrooms: m.classroom_ids(),
            is_expired: m.is_expired_at(now),
            location: m.geo_point(),
            id: m.id,
            subject_id: m.subject_id,
            term_id: m.term_id,
            date: m.date,
            period: m.period,
            expires_at: m.expires_at,
            is_active: m.is_active,
            created_at: m.created_at,
        }
    }
}
