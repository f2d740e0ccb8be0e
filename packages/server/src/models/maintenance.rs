use serde::{Deserialize, Serialize};

use crate::checkin::maintenance::{ClassroomCount, RecountReport};

#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
pub struct RecountRequest {
    /// Restrict to one term. All classrooms when omitted.
    pub term_id: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ClassroomCountResponse {
    pub classroom_id: String,
    pub name: String,
    /// Cached value before the run.
    pub previous: i32,
    /// Value counted from the student table.
    pub current: i32,
}

impl From<ClassroomCount> for ClassroomCountResponse {
    fn from(c: ClassroomCount) -> Self {
        Self {
            classroom_id: c.classroom_id,
            name: c.name,
            previous: c.previous,
            current: c.current,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct RecountResponse {
    #[schema(example = 2)]
    pub updated_classrooms: usize,
    pub classrooms: Vec<ClassroomCountResponse>,
}

impl From<RecountReport> for RecountResponse {
    fn from(r: RecountReport) -> Self {
        Self {
            updated_classrooms: r.updated_classrooms,
            classrooms: r.classrooms.into_iter().map(Into::into).collect(),
        }
    }
}
