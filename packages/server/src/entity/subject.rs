use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A weekly teaching slot of a subject.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Schedule {
    /// 1 = Monday ... 7 = Sunday.
    pub day_of_week: u8,
    pub period: i32,
    /// Local wall-clock time, `HH:MM`.
    pub start_time: String,
    pub end_time: String,
}

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "subjects")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub code: String,
    pub name: String,

    /// Classroom ids stored as a JSON array of strings.
    #[sea_orm(column_type = "JsonBinary")]
    pub classrooms: Json,
    /// Stored as JSON array of [`Schedule`] objects.
    #[sea_orm(column_type = "JsonBinary")]
    pub schedules: Json,

    pub term_id: String,
    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn classroom_ids(&self) -> Vec<String> {
        serde_json::from_value(self.classrooms.clone()).unwrap_or_default()
    }

    pub fn schedule_list(&self) -> Vec<Schedule> {
        serde_json::from_value(self.schedules.clone()).unwrap_or_default()
    }
}
