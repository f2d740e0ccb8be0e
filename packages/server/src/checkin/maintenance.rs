use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Select, TransactionSession, TransactionTrait,
};
use tracing::{info, warn};

use super::CheckinError;
use crate::entity::{
    assignment, attendance, classroom, qr_session, student, subject, term, timetable_entry,
};

/// Count change for one classroom during reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassroomCount {
    pub classroom_id: String,
    pub name: String,
    pub previous: i32,
    pub current: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecountReport {
    /// Number of classrooms whose cached count was wrong and got rewritten.
    pub updated_classrooms: usize,
    pub classrooms: Vec<ClassroomCount>,
}

/// Recompute every classroom's `student_count` from the student table.
///
/// Each classroom is counted and written on its own, with absolute values, so
/// the job is idempotent and can run next to roster writes. Running it again
/// once those writes settle always converges on the true counts.
pub async fn recalculate_classroom_counts<C: ConnectionTrait>(
    conn: &C,
    term_id: Option<&str>,
) -> Result<RecountReport, CheckinError> {
    let mut select = classroom::Entity::find();
    if let Some(term_id) = term_id {
        select = select.filter(classroom::Column::TermId.eq(term_id));
    }
    let classrooms = select
        .order_by_asc(classroom::Column::Name)
        .all(conn)
        .await?;

    let mut report = RecountReport::default();
    for room in classrooms {
        let current = student::Entity::find()
            .filter(student::Column::ClassroomId.eq(&room.id))
            .count(conn)
            .await? as i32;

        if current != room.student_count {
            classroom::Entity::update_many()
                .col_expr(classroom::Column::StudentCount, Expr::value(current))
                .filter(classroom::Column::Id.eq(&room.id))
                .exec(conn)
                .await?;
            report.updated_classrooms += 1;
        }
        report.classrooms.push(ClassroomCount {
            classroom_id: room.id,
            name: room.name,
            previous: room.student_count,
            current,
        });
    }

    info!(
        term_id = term_id.unwrap_or("*"),
        checked = report.classrooms.len(),
        updated = report.updated_classrooms,
        "Recalculated classroom student counts"
    );
    Ok(report)
}

/// Per-collection result of a term cascade delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionDeletion {
    pub collection: &'static str,
    pub deleted: u64,
}

/// Delete a term and everything that references it.
///
/// Collections are emptied in chunks of `batch_size` documents, one
/// transaction per chunk, committed in order. On a failure after the first
/// committed chunk the error is [`CheckinError::PartialCascadeFailure`];
/// committed chunks stay deleted and the call can simply be repeated.
pub async fn delete_term<C>(
    conn: &C,
    term_id: &str,
    batch_size: usize,
) -> Result<Vec<CollectionDeletion>, CheckinError>
where
    C: ConnectionTrait + TransactionTrait,
{
    term::Entity::find_by_id(term_id.to_string())
        .one(conn)
        .await?
        .ok_or(CheckinError::NotFound("Term"))?;

    let mut cascade = Cascade {
        conn,
        batch_size: batch_size.max(1),
        committed: 0,
        report: Vec::new(),
    };

    cascade
        .run(
            "attendance",
            attendance::Entity::find().filter(attendance::Column::TermId.eq(term_id)),
            attendance::Column::Id,
        )
        .await?;
    cascade
        .run(
            "qr_sessions",
            qr_session::Entity::find().filter(qr_session::Column::TermId.eq(term_id)),
            qr_session::Column::Id,
        )
        .await?;
    cascade
        .run(
            "assignments",
            assignment::Entity::find().filter(assignment::Column::TermId.eq(term_id)),
            assignment::Column::Id,
        )
        .await?;
    cascade
        .run(
            "timetable_entries",
            timetable_entry::Entity::find().filter(timetable_entry::Column::TermId.eq(term_id)),
            timetable_entry::Column::Id,
        )
        .await?;
    cascade
        .run(
            "subjects",
            subject::Entity::find().filter(subject::Column::TermId.eq(term_id)),
            subject::Column::Id,
        )
        .await?;
    cascade
        .run(
            "students",
            student::Entity::find().filter(student::Column::TermId.eq(term_id)),
            student::Column::Id,
        )
        .await?;
    cascade
        .run(
            "classrooms",
            classroom::Entity::find().filter(classroom::Column::TermId.eq(term_id)),
            classroom::Column::Id,
        )
        .await?;
    cascade
        .run(
            "terms",
            term::Entity::find().filter(term::Column::Id.eq(term_id)),
            term::Column::Id,
        )
        .await?;

    info!(term_id, deleted = cascade.committed, "Deleted term with cascade");
    Ok(cascade.report)
}

struct Cascade<'a, C> {
    conn: &'a C,
    batch_size: usize,
    /// Documents deleted by committed chunks so far, across collections.
    committed: u64,
    report: Vec<CollectionDeletion>,
}

impl<C> Cascade<'_, C>
where
    C: ConnectionTrait + TransactionTrait,
{
    async fn run<E>(
        &mut self,
        collection: &'static str,
        select: Select<E>,
        id_column: E::Column,
    ) -> Result<(), CheckinError>
    where
        E: EntityTrait,
    {
        let ids: Vec<String> = select
            .select_only()
            .column(id_column)
            .into_tuple()
            .all(self.conn)
            .await
            .map_err(|e| self.fail(collection, e))?;

        let mut deleted = 0u64;
        for chunk in ids.chunks(self.batch_size) {
            let result = self.delete_chunk::<E>(id_column, chunk).await;
            match result {
                Ok(n) => {
                    deleted += n;
                    self.committed += n;
                }
                Err(e) => return Err(self.fail(collection, e)),
            }
        }

        self.report.push(CollectionDeletion {
            collection,
            deleted,
        });
        Ok(())
    }

    async fn delete_chunk<E: EntityTrait>(
        &self,
        id_column: E::Column,
        chunk: &[String],
    ) -> Result<u64, DbErr> {
        let txn = self.conn.begin().await?;
        let result = E::delete_many()
            .filter(id_column.is_in(chunk.to_vec()))
            .exec(&txn)
            .await?;
        txn.commit().await?;
        Ok(result.rows_affected)
    }

    fn fail(&self, collection: &'static str, source: DbErr) -> CheckinError {
        if self.committed == 0 {
            return CheckinError::StoreUnavailable(source);
        }
        warn!(
            collection,
            deleted = self.committed,
            error = %source,
            "Term cascade delete stopped partway"
        );
        CheckinError::PartialCascadeFailure {
            collection,
            deleted: self.committed,
            source,
        }
    }
}
