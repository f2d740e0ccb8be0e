use common::{AttendanceStatus, GeoPoint};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One student's attendance for one (subject, classroom, date, period) slot.
///
/// The natural key `(term_id, subject_id, classroom_id, date, period, student_id)`
/// is backed by the `uq_attendance_natural_key` unique index.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "attendance")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub term_id: String,
    pub subject_id: String,
    pub classroom_id: String,
    pub date: Date,
    pub period: i32,
    pub student_id: String,

    pub status: AttendanceStatus,
    pub note: Option<String>,

    /// Scanning device position, as a [`GeoPoint`] object.
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub location: Option<Json>,
    pub fingerprint: Option<String>,
    /// Set only for records written by a QR scan.
    pub check_in_time: Option<DateTimeUtc>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn geo_point(&self) -> Option<GeoPoint> {
        self.location
            .as_ref()
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}
