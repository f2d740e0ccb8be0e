use chrono::{DateTime, Utc};
use common::GeoPoint;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A time-boxed check-in session. The primary key doubles as the bearer token
/// carried by the QR code.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "qr_sessions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub subject_id: String,
    /// Copied from the subject when the session is created.
    pub term_id: String,

    /// Target classroom ids stored as a JSON array of strings.
    #[sea_orm(column_type = "JsonBinary")]
    pub classrooms: Json,

    pub date: Date,
    pub period: i32,
    pub expires_at: DateTimeUtc,
    pub is_active: bool,

    /// Where the teacher opened the session, as a [`GeoPoint`] object.
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub location: Option<Json>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn classroom_ids(&self) -> Vec<String> {
        serde_json::from_value(self.classrooms.clone()).unwrap_or_default()
    }

    /// Whether students of `classroom_id` may check in to this session.
    pub fn admits(&self, classroom_id: &str) -> bool {
        self.classroom_ids().iter().any(|c| c == classroom_id)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn geo_point(&self) -> Option<GeoPoint> {
        self.location
            .as_ref()
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}
