use chrono::NaiveDate;
use common::AttendanceStatus;
use serde::{Deserialize, Serialize};

use crate::checkin::aggregate::{ClassroomRow, StatusCounts};

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct DashboardQuery {
    /// Defaults to the active term.
    pub term_id: Option<String>,
    #[param(value_type = String, format = Date, example = "2024-06-01")]
    pub date: NaiveDate,
}

/// Day totals, one student counted once by their worst status.
#[derive(Serialize, utoipa::ToSchema)]
pub struct DashboardStats {
    /// Students on the term roster, recorded or not.
    #[schema(example = 120)]
    pub total_students: u64,
    pub present: u64,
    pub late: u64,
    pub absent: u64,
    pub leave: u64,
    pub sick: u64,
    pub activity: u64,
    pub online: u64,
    /// Students with at least one record that day.
    #[schema(example = 117)]
    pub recorded: u64,
}

impl DashboardStats {
    pub fn new(total_students: u64, counts: StatusCounts) -> Self {
        Self {
            total_students,
            present: counts.present,
            late: counts.late,
            absent: counts.absent,
            leave: counts.leave,
            sick: counts.sick,
            activity: counts.activity,
            online: counts.online,
            recorded: counts.total,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ClassroomSummary {
    pub classroom_id: String,
    #[schema(example = "M.1/1")]
    pub classroom_name: String,
    pub counts: StatusCounts,
}

impl From<ClassroomRow> for ClassroomSummary {
    fn from(r: ClassroomRow) -> Self {
        Self {
            classroom_id: r.classroom_id,
            classroom_name: r.classroom_name,
            counts: r.counts,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct DashboardResponse {
    pub term_id: String,
    #[schema(value_type = String, format = Date)]
    pub date: NaiveDate,
    pub stats: DashboardStats,
    /// Sorted by classroom name.
    pub classroom_summary: Vec<ClassroomSummary>,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct GridQuery {
    /// Defaults to the active term.
    pub term_id: Option<String>,
    /// Inclusive start date.
    #[param(value_type = Option<String>, format = Date)]
    pub from: Option<NaiveDate>,
    /// Inclusive end date.
    #[param(value_type = Option<String>, format = Date)]
    pub to: Option<NaiveDate>,
    pub classroom_id: Option<String>,
    pub subject_id: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct GridRowResponse {
    pub student_id: String,
    /// Empty when the student is no longer on the roster.
    pub student_code: String,
    pub name: String,
    /// One cell per entry of `dates`; `null` where the student has no record.
    pub cells: Vec<Option<AttendanceStatus>>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct GridResponse {
    pub term_id: String,
    /// Ascending distinct dates present in the filtered records.
    #[schema(value_type = Vec<String>)]
    pub dates: Vec<NaiveDate>,
    /// Ordered by student code.
    pub rows: Vec<GridRowResponse>,
}
