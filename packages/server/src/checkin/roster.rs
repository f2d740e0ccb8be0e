use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    SqlErr, TransactionSession, TransactionTrait,
};
use tracing::{info, warn};

use super::CheckinError;
use super::aggregate::compare_names;
use crate::entity::subject::Schedule;
use crate::entity::{classroom, student, subject, term};

#[derive(Debug, Clone)]
pub struct NewClassroom {
    pub name: String,
    pub level: String,
    pub term_id: String,
}

#[derive(Debug, Clone)]
pub struct NewSubject {
    pub code: String,
    pub name: String,
    pub classrooms: Vec<String>,
    pub schedules: Vec<Schedule>,
    pub term_id: String,
}

#[derive(Debug, Clone)]
pub struct NewStudent {
    /// Caller-chosen id. Generated when absent.
    pub id: Option<String>,
    pub student_code: String,
    pub first_name: String,
    pub last_name: String,
    pub classroom_id: String,
}

/// Terms, classrooms, subjects and students.
///
/// Student writes adjust the cached `student_count` of the affected classrooms
/// with separate statements after the student write. The two are not atomic,
/// so the cache can drift under concurrency or partial failure; the classroom
/// count reconciliation in [`super::maintenance`] repairs it.
pub struct RosterService<'a, C> {
    conn: &'a C,
}

impl<'a, C> RosterService<'a, C>
where
    C: ConnectionTrait + TransactionTrait,
{
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    pub async fn create_term(
        &self,
        name: String,
        now: DateTime<Utc>,
    ) -> Result<term::Model, CheckinError> {
        let model = term::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            name: Set(name),
            is_active: Set(false),
            created_at: Set(now),
        }
        .insert(self.conn)
        .await?;
        info!(term_id = %model.id, "Created term");
        Ok(model)
    }

    pub async fn list_terms(&self) -> Result<Vec<term::Model>, CheckinError> {
        Ok(term::Entity::find()
            .order_by_desc(term::Column::CreatedAt)
            .all(self.conn)
            .await?)
    }

    pub async fn active_term(&self) -> Result<Option<term::Model>, CheckinError> {
        Ok(term::Entity::find()
            .filter(term::Column::IsActive.eq(true))
            .one(self.conn)
            .await?)
    }

    /// Make `term_id` the only active term.
    pub async fn activate_term(&self, term_id: &str) -> Result<term::Model, CheckinError> {
        let txn = self.conn.begin().await?;
        let found = term::Entity::find_by_id(term_id.to_string())
            .one(&txn)
            .await?
            .ok_or(CheckinError::NotFound("Term"))?;

        term::Entity::update_many()
            .col_expr(term::Column::IsActive, Expr::value(false))
            .filter(term::Column::IsActive.eq(true))
            .exec(&txn)
            .await?;
        let mut active: term::ActiveModel = found.into();
        active.is_active = Set(true);
        let model = active.update(&txn).await?;
        txn.commit().await?;

        info!(term_id, "Activated term");
        Ok(model)
    }

    pub async fn create_classroom(
        &self,
        new: NewClassroom,
        now: DateTime<Utc>,
    ) -> Result<classroom::Model, CheckinError> {
        self.require_term(&new.term_id).await?;
        let model = classroom::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            name: Set(new.name),
            level: Set(new.level),
            student_count: Set(0),
            term_id: Set(new.term_id),
            created_at: Set(now),
        }
        .insert(self.conn)
        .await?;
        info!(classroom_id = %model.id, term_id = %model.term_id, "Created classroom");
        Ok(model)
    }

    pub async fn list_classrooms(
        &self,
        term_id: &str,
    ) -> Result<Vec<classroom::Model>, CheckinError> {
        let mut rooms = classroom::Entity::find()
            .filter(classroom::Column::TermId.eq(term_id))
            .all(self.conn)
            .await?;
        rooms.sort_by(|a, b| compare_names(&a.name, &b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(rooms)
    }

    /// Every listed classroom must exist in the subject's term.
    pub async fn create_subject(
        &self,
        mut new: NewSubject,
        now: DateTime<Utc>,
    ) -> Result<subject::Model, CheckinError> {
        self.require_term(&new.term_id).await?;
        new.classrooms.sort();
        new.classrooms.dedup();

        let known = classroom::Entity::find()
            .filter(classroom::Column::TermId.eq(&new.term_id))
            .filter(classroom::Column::Id.is_in(new.classrooms.clone()))
            .all(self.conn)
            .await?;
        if let Some(missing) = new
            .classrooms
            .iter()
            .find(|id| !known.iter().any(|c| &c.id == *id))
        {
            return Err(CheckinError::Invalid(format!(
                "classroom '{missing}' does not belong to term '{}'",
                new.term_id
            )));
        }

        let model = subject::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            code: Set(new.code),
            name: Set(new.name),
            classrooms: Set(serde_json::json!(new.classrooms)),
            schedules: Set(serde_json::json!(new.schedules)),
            term_id: Set(new.term_id),
            created_at: Set(now),
        }
        .insert(self.conn)
        .await?;
        info!(subject_id = %model.id, code = %model.code, "Created subject");
        Ok(model)
    }

    pub async fn list_subjects(&self, term_id: &str) -> Result<Vec<subject::Model>, CheckinError> {
        Ok(subject::Entity::find()
            .filter(subject::Column::TermId.eq(term_id))
            .order_by_asc(subject::Column::Code)
            .all(self.conn)
            .await?)
    }

    /// The student inherits the term of its classroom.
    pub async fn create_student(
        &self,
        new: NewStudent,
        now: DateTime<Utc>,
    ) -> Result<student::Model, CheckinError> {
        let room = self.require_classroom(&new.classroom_id).await?;
        let inserted = student::ActiveModel {
            id: Set(new.id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string())),
            student_code: Set(new.student_code),
            first_name: Set(new.first_name),
            last_name: Set(new.last_name),
            classroom_id: Set(room.id.clone()),
            term_id: Set(room.term_id.clone()),
            created_at: Set(now),
        }
        .insert(self.conn)
        .await;
        let model = match inserted {
            Ok(model) => model,
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                return Err(CheckinError::Conflict("student id already exists".into()));
            }
            Err(e) => return Err(e.into()),
        };

        self.adjust_count(&room.id, 1).await?;
        info!(student_id = %model.id, classroom_id = %room.id, "Created student");
        Ok(model)
    }

    /// Move a student to another classroom of the same term.
    pub async fn move_student(
        &self,
        student_id: &str,
        classroom_id: &str,
    ) -> Result<student::Model, CheckinError> {
        let current = self.require_student(student_id).await?;
        if current.classroom_id == classroom_id {
            return Ok(current);
        }
        let target = self.require_classroom(classroom_id).await?;
        if target.term_id != current.term_id {
            return Err(CheckinError::Invalid(
                "a student can only move within its term".into(),
            ));
        }

        let previous = current.classroom_id.clone();
        let mut active: student::ActiveModel = current.into();
        active.classroom_id = Set(target.id.clone());
        let model = active.update(self.conn).await?;

        self.adjust_count(&previous, -1).await?;
        self.adjust_count(&target.id, 1).await?;
        info!(student_id, from = %previous, to = %target.id, "Moved student");
        Ok(model)
    }

    pub async fn delete_student(&self, student_id: &str) -> Result<(), CheckinError> {
        let current = self.require_student(student_id).await?;
        student::Entity::delete_by_id(current.id.clone())
            .exec(self.conn)
            .await?;
        self.adjust_count(&current.classroom_id, -1).await?;
        info!(student_id, classroom_id = %current.classroom_id, "Deleted student");
        Ok(())
    }

    /// Read-modify-write of the cached counter, clamped at zero.
    async fn adjust_count(&self, classroom_id: &str, delta: i32) -> Result<(), CheckinError> {
        let Some(room) = classroom::Entity::find_by_id(classroom_id.to_string())
            .one(self.conn)
            .await?
        else {
            warn!(classroom_id, "Classroom vanished before its count was adjusted");
            return Ok(());
        };
        let next = (room.student_count + delta).max(0);
        let mut active: classroom::ActiveModel = room.into();
        active.student_count = Set(next);
        active.update(self.conn).await?;
        Ok(())
    }

    async fn require_term(&self, term_id: &str) -> Result<term::Model, CheckinError> {
        term::Entity::find_by_id(term_id.to_string())
            .one(self.conn)
            .await?
            .ok_or(CheckinError::NotFound("Term"))
    }

    async fn require_classroom(&self, id: &str) -> Result<classroom::Model, CheckinError> {
        classroom::Entity::find_by_id(id.to_string())
            .one(self.conn)
            .await?
            .ok_or(CheckinError::NotFound("Classroom"))
    }

    async fn require_student(&self, id: &str) -> Result<student::Model, CheckinError> {
        student::Entity::find_by_id(id.to_string())
            .one(self.conn)
            .await?
            .ok_or(CheckinError::NotFound("Student"))
    }
}
