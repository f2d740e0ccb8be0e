use chrono::{DateTime, Utc};
use common::{AttendanceStatus, GeoPoint};
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set, SqlErr};
use tracing::{debug, info};

use super::session::SessionManager;
use super::token::TokenSigner;
use super::CheckinError;
use crate::entity::{attendance, qr_session, student};

/// A scan submitted by a student device.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    /// Decoded QR payload.
    pub payload: String,
    pub student_id: String,
    pub classroom_id: String,
    pub fingerprint: Option<String>,
    pub location: Option<GeoPoint>,
}

/// Why a scan was turned down. Each variant maps to one pipeline step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanRejection {
    /// The payload does not resolve to any session.
    InvalidToken,
    /// The session exists but was closed or superseded.
    SessionClosed { session_id: String },
    /// The session passed its `expires_at`.
    SessionExpired {
        session_id: String,
        expired_at: DateTime<Utc>,
    },
    /// The student's classroom is not targeted by the session.
    NotEligible {
        session_id: String,
        classroom_id: String,
    },
    /// A record for the natural key already exists.
    AlreadyCheckedIn {
        record_id: String,
        classroom_id: String,
        checked_in_at: Option<DateTime<Utc>>,
    },
}

impl ScanRejection {
    /// Machine-readable code, stable across releases.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidToken => "INVALID_TOKEN",
            Self::SessionClosed { .. } => "SESSION_CLOSED",
            Self::SessionExpired { .. } => "SESSION_EXPIRED",
            Self::NotEligible { .. } => "NOT_ELIGIBLE",
            Self::AlreadyCheckedIn { .. } => "ALREADY_CHECKED_IN",
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::InvalidToken => "QR code is not a valid check-in code".into(),
            Self::SessionClosed { .. } => {
                "This check-in session is closed, ask for a new QR code".into()
            }
            Self::SessionExpired { .. } => {
                "This check-in session has expired, ask for a new QR code".into()
            }
            Self::NotEligible { classroom_id, .. } => {
                format!("Classroom '{classroom_id}' is not part of this check-in session")
            }
            Self::AlreadyCheckedIn { checked_in_at, .. } => match checked_in_at {
                Some(at) => format!("Already checked in at {}", at.to_rfc3339()),
                None => "Attendance for this period is already recorded".into(),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub enum ScanOutcome {
    /// The new record and the session it was checked in to.
    Accepted {
        session_id: String,
        record: attendance::Model,
    },
    Rejected(ScanRejection),
}

/// Runs the scan pipeline and writes the check-in record.
///
/// Steps, short-circuiting on the first failure:
/// payload decoding and session existence, active flag, expiry (closing the
/// session lazily), classroom eligibility, commit.
///
/// The commit inserts straight away and lets the natural-key unique index
/// decide duplicates. A violation means the student already has a record for
/// the slot, whether from an earlier scan or a concurrent one, and that record
/// is reported back.
pub struct ScanValidator<'a, C> {
    conn: &'a C,
    signer: &'a TokenSigner,
}

impl<'a, C: ConnectionTrait> ScanValidator<'a, C> {
    pub fn new(conn: &'a C, signer: &'a TokenSigner) -> Self {
        Self { conn, signer }
    }

    pub async fn validate_and_check_in(
        &self,
        scan: ScanRequest,
        now: DateTime<Utc>,
    ) -> Result<ScanOutcome, CheckinError> {
        let session = match self.resolve(&scan.payload).await? {
            Some(session) => session,
            None => return Ok(ScanOutcome::Rejected(ScanRejection::InvalidToken)),
        };

        if let Some(rejection) = self.check_session(&session, &scan, now).await? {
            debug!(session_id = %session.id, code = rejection.code(), "Scan rejected");
            return Ok(ScanOutcome::Rejected(rejection));
        }

        self.commit(&session, scan, now).await
    }

    async fn resolve(&self, payload: &str) -> Result<Option<qr_session::Model>, CheckinError> {
        let Some(id) = self.signer.decode(payload) else {
            return Ok(None);
        };
        SessionManager::new(self.conn).get(id).await
    }

    /// Active flag, expiry and eligibility checks.
    async fn check_session(
        &self,
        session: &qr_session::Model,
        scan: &ScanRequest,
        now: DateTime<Utc>,
    ) -> Result<Option<ScanRejection>, CheckinError> {
        if !session.is_active {
            return Ok(Some(ScanRejection::SessionClosed {
                session_id: session.id.clone(),
            }));
        }

        if session.is_expired_at(now) {
            SessionManager::new(self.conn).close(&session.id).await?;
            info!(session_id = %session.id, "Closed expired check-in session");
            return Ok(Some(ScanRejection::SessionExpired {
                session_id: session.id.clone(),
                expired_at: session.expires_at,
            }));
        }

        let not_eligible = || ScanRejection::NotEligible {
            session_id: session.id.clone(),
            classroom_id: scan.classroom_id.clone(),
        };
        if !session.admits(&scan.classroom_id) {
            return Ok(Some(not_eligible()));
        }

        // The claimed classroom must match the roster.
        let enrolled = student::Entity::find_by_id(scan.student_id.clone())
            .one(self.conn)
            .await?
            .is_some_and(|s| s.classroom_id == scan.classroom_id && s.term_id == session.term_id);
        if !enrolled {
            return Ok(Some(not_eligible()));
        }

        Ok(None)
    }

    async fn commit(
        &self,
        session: &qr_session::Model,
        scan: ScanRequest,
        now: DateTime<Utc>,
    ) -> Result<ScanOutcome, CheckinError> {
        let record = attendance::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            term_id: Set(session.term_id.clone()),
            subject_id: Set(session.subject_id.clone()),
            classroom_id: Set(scan.classroom_id.clone()),
            date: Set(session.date),
            period: Set(session.period),
            student_id: Set(scan.student_id.clone()),
            status: Set(AttendanceStatus::Present),
            note: Set(None),
            location: Set(scan.location.map(|l| serde_json::json!(l))),
            fingerprint: Set(scan.fingerprint.clone()),
            check_in_time: Set(Some(now)),
            created_at: Set(now),
            updated_at: Set(now),
        };

        match record.insert(self.conn).await {
            Ok(model) => {
                info!(
                    session_id = %session.id,
                    student_id = %model.student_id,
                    record_id = %model.id,
                    "Student checked in"
                );
                Ok(ScanOutcome::Accepted {
                    session_id: session.id.clone(),
                    record: model,
                })
            }
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                debug!(
                    session_id = %session.id,
                    student_id = %scan.student_id,
                    "Check-in hit existing record on natural key"
                );
                let existing = find_by_natural_key(self.conn, session, &scan)
                    .await?
                    .ok_or_else(|| {
                        CheckinError::Conflict(
                            "natural key collision but existing record not found".into(),
                        )
                    })?;
                Ok(ScanOutcome::Rejected(already_checked_in(existing)))
            }
            Err(e) => Err(e.into()),
        }
    }
}

async fn find_by_natural_key<C: ConnectionTrait>(
    conn: &C,
    session: &qr_session::Model,
    scan: &ScanRequest,
) -> Result<Option<attendance::Model>, CheckinError> {
    Ok(attendance::Entity::find()
        .filter(attendance::Column::TermId.eq(&session.term_id))
        .filter(attendance::Column::SubjectId.eq(&session.subject_id))
        .filter(attendance::Column::ClassroomId.eq(&scan.classroom_id))
        .filter(attendance::Column::Date.eq(session.date))
        .filter(attendance::Column::Period.eq(session.period))
        .filter(attendance::Column::StudentId.eq(&scan.student_id))
        .one(conn)
        .await?)
}

fn already_checked_in(existing: attendance::Model) -> ScanRejection {
    ScanRejection::AlreadyCheckedIn {
        record_id: existing.id,
        classroom_id: existing.classroom_id,
        checked_in_at: existing.check_in_time.or(Some(existing.created_at)),
    }
}
