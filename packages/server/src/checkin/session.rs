use chrono::{DateTime, Duration, NaiveDate, Utc};
use common::GeoPoint;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    SqlErr,
};
use tracing::{debug, info, warn};

use super::CheckinError;
use crate::entity::{qr_session, subject};

/// How many deactivate-then-insert rounds `create` runs before giving up.
const CREATE_ATTEMPTS: usize = 5;

/// Parameters for opening a check-in session.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub subject_id: String,
    /// Target classrooms. Empty means every classroom the subject is taught to.
    pub classrooms: Vec<String>,
    pub date: NaiveDate,
    pub period: i32,
    pub ttl: Duration,
    pub location: Option<GeoPoint>,
}

/// Creates, looks up and closes check-in sessions.
///
/// At most one session is active per `(subject_id, date, period)`: creating a
/// session first deactivates the previous ones for that key and only then
/// inserts the new one. The partial unique index `uq_qr_sessions_active_key`
/// rejects a second active row when two creates interleave.
pub struct SessionManager<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> SessionManager<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Open a new session, superseding any active session for the same key.
    ///
    /// Deactivation is committed before the insert. If the insert fails the
    /// previous sessions stay closed. An insert that loses a race for the key
    /// deactivates the winner and tries again, so the latest create wins.
    pub async fn create(
        &self,
        new: NewSession,
        now: DateTime<Utc>,
    ) -> Result<qr_session::Model, CheckinError> {
        if new.period < 1 {
            return Err(CheckinError::Invalid("period must be >= 1".into()));
        }
        if new.ttl <= Duration::zero() {
            return Err(CheckinError::Invalid("ttl must be positive".into()));
        }
        if let Some(loc) = &new.location
            && !loc.is_valid()
        {
            return Err(CheckinError::Invalid("location is out of range".into()));
        }

        let subject = subject::Entity::find_by_id(new.subject_id.clone())
            .one(self.conn)
            .await?
            .ok_or(CheckinError::NotFound("Subject"))?;

        let taught = subject.classroom_ids();
        let classrooms = if new.classrooms.is_empty() {
            taught
        } else {
            if let Some(stray) = new.classrooms.iter().find(|c| !taught.contains(c)) {
                return Err(CheckinError::Invalid(format!(
                    "classroom '{stray}' is not assigned to subject '{}'",
                    subject.code
                )));
            }
            let mut unique = new.classrooms;
            unique.sort();
            unique.dedup();
            unique
        };
        if classrooms.is_empty() {
            return Err(CheckinError::Invalid(
                "session needs at least one classroom".into(),
            ));
        }

        let classrooms = serde_json::json!(classrooms);
        let location = new.location.map(|l| serde_json::json!(l));
        let mut superseded = 0;
        let mut attempt = 0;
        let model = loop {
            attempt += 1;
            superseded += self
                .deactivate_all(&subject.id, new.date, new.period)
                .await?;

            let session = qr_session::ActiveModel {
                id: Set(uuid::Uuid::new_v4().to_string()),
                subject_id: Set(subject.id.clone()),
                term_id: Set(subject.term_id.clone()),
                classrooms: Set(classrooms.clone()),
                date: Set(new.date),
                period: Set(new.period),
                expires_at: Set(now + new.ttl),
                is_active: Set(true),
                location: Set(location.clone()),
                created_at: Set(now),
            };
            match session.insert(self.conn).await {
                Ok(model) => break model,
                Err(e)
                    if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) =>
                {
                    // Another create for this key inserted between our
                    // deactivation and insert.
                    if attempt >= CREATE_ATTEMPTS {
                        warn!(
                            subject_id = %subject.id,
                            date = %new.date,
                            period = new.period,
                            attempts = attempt,
                            "Gave up opening check-in session under contention"
                        );
                        return Err(CheckinError::Conflict(
                            "another session for this period is being opened, retry".into(),
                        ));
                    }
                    debug!(
                        subject_id = %subject.id,
                        attempt,
                        "Active session appeared concurrently, superseding it"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        };

        info!(
            session_id = %model.id,
            subject_id = %model.subject_id,
            date = %model.date,
            period = model.period,
            superseded,
            "Opened check-in session"
        );
        Ok(model)
    }

    /// Deactivate every active session for the key. Returns how many were closed.
    pub async fn deactivate_all(
        &self,
        subject_id: &str,
        date: NaiveDate,
        period: i32,
    ) -> Result<u64, CheckinError> {
        let result = qr_session::Entity::update_many()
            .col_expr(qr_session::Column::IsActive, Expr::value(false))
            .filter(qr_session::Column::SubjectId.eq(subject_id))
            .filter(qr_session::Column::Date.eq(date))
            .filter(qr_session::Column::Period.eq(period))
            .filter(qr_session::Column::IsActive.eq(true))
            .exec(self.conn)
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn get(&self, id: &str) -> Result<Option<qr_session::Model>, CheckinError> {
        Ok(qr_session::Entity::find_by_id(id.to_string())
            .one(self.conn)
            .await?)
    }

    /// Teacher cancellation. Cancelling a closed session is a no-op.
    pub async fn cancel(&self, id: &str) -> Result<qr_session::Model, CheckinError> {
        let session = self.get(id).await?.ok_or(CheckinError::NotFound("Session"))?;
        if !session.is_active {
            return Ok(session);
        }
        self.close(id).await?;
        info!(session_id = %id, "Cancelled check-in session");
        Ok(qr_session::Model {
            is_active: false,
            ..session
        })
    }

    /// Active sessions of a subject, newest first. Expired sessions that no scan
    /// has touched yet are still listed; callers compare `expires_at` themselves.
    pub async fn list_active(
        &self,
        subject_id: &str,
    ) -> Result<Vec<qr_session::Model>, CheckinError> {
        Ok(qr_session::Entity::find()
            .filter(qr_session::Column::SubjectId.eq(subject_id))
            .filter(qr_session::Column::IsActive.eq(true))
            .order_by_desc(qr_session::Column::CreatedAt)
            .all(self.conn)
            .await?)
    }

    /// Flip `is_active` off for one session, without reading it first.
    pub(crate) async fn close(&self, id: &str) -> Result<(), CheckinError> {
        qr_session::Entity::update_many()
            .col_expr(qr_session::Column::IsActive, Expr::value(false))
            .filter(qr_session::Column::Id.eq(id))
            .exec(self.conn)
            .await?;
        Ok(())
    }
}
