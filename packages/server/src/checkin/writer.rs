use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use common::AttendanceStatus;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionSession,
    TransactionTrait,
};
use tracing::info;

use super::CheckinError;
use crate::entity::attendance;

/// One student's entry in a manual attendance batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftRecord {
    pub student_id: String,
    pub status: AttendanceStatus,
    pub note: Option<String>,
}

/// A roster's worth of drafts for one `(term, date, subject, classroom, period)` slot.
#[derive(Debug, Clone)]
pub struct RecordBatch {
    pub term_id: String,
    pub date: NaiveDate,
    pub subject_id: String,
    pub classroom_id: String,
    pub period: i32,
    pub drafts: Vec<DraftRecord>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveSummary {
    pub inserted: usize,
    pub updated: usize,
}

/// Filters for listing records. Unset fields do not filter.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub term_id: Option<String>,
    pub date: Option<NaiveDate>,
    /// Inclusive lower date bound.
    pub from: Option<NaiveDate>,
    /// Inclusive upper date bound.
    pub to: Option<NaiveDate>,
    pub subject_id: Option<String>,
    pub classroom_id: Option<String>,
    pub period: Option<i32>,
    pub student_id: Option<String>,
}

/// Idempotent insert-or-update of attendance records.
///
/// Every draft is written as an upsert on the natural key, so a record that
/// appears between planning and writing (a concurrent scan or save) is
/// updated rather than duplicated. Only status and note are overwritten; scan
/// metadata on an existing record is kept. Writes are committed in
/// transactions of at most `batch_size` rows, one after another.
pub struct AttendanceWriter<'a, C> {
    conn: &'a C,
    batch_size: usize,
}

impl<'a, C> AttendanceWriter<'a, C>
where
    C: ConnectionTrait + TransactionTrait,
{
    pub fn new(conn: &'a C, batch_size: usize) -> Self {
        Self {
            conn,
            batch_size: batch_size.max(1),
        }
    }

    /// The summary splits drafts by whether a record existed when the batch
    /// was planned.
    pub async fn save(
        &self,
        batch: RecordBatch,
        now: DateTime<Utc>,
    ) -> Result<SaveSummary, CheckinError> {
        if batch.period < 1 {
            return Err(CheckinError::Invalid("period must be >= 1".into()));
        }

        let drafts = collapse_drafts(batch.drafts);
        if drafts.is_empty() {
            return Ok(SaveSummary::default());
        }

        let existing: HashSet<String> = attendance::Entity::find()
            .filter(attendance::Column::TermId.eq(&batch.term_id))
            .filter(attendance::Column::Date.eq(batch.date))
            .filter(attendance::Column::SubjectId.eq(&batch.subject_id))
            .filter(attendance::Column::ClassroomId.eq(&batch.classroom_id))
            .filter(attendance::Column::Period.eq(batch.period))
            .all(self.conn)
            .await?
            .into_iter()
            .map(|m| m.student_id)
            .collect();

        let mut summary = SaveSummary::default();
        let mut rows = Vec::with_capacity(drafts.len());
        for draft in drafts {
            if existing.contains(&draft.student_id) {
                summary.updated += 1;
            } else {
                summary.inserted += 1;
            }
            rows.push(attendance::ActiveModel {
                id: Set(uuid::Uuid::new_v4().to_string()),
                term_id: Set(batch.term_id.clone()),
                subject_id: Set(batch.subject_id.clone()),
                classroom_id: Set(batch.classroom_id.clone()),
                date: Set(batch.date),
                period: Set(batch.period),
                student_id: Set(draft.student_id),
                status: Set(draft.status),
                note: Set(draft.note),
                location: Set(None),
                fingerprint: Set(None),
                check_in_time: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
            });
        }

        let chunks = self.upsert_chunks(rows).await?;

        info!(
            subject_id = %batch.subject_id,
            classroom_id = %batch.classroom_id,
            date = %batch.date,
            period = batch.period,
            inserted = summary.inserted,
            updated = summary.updated,
            chunks,
            "Saved attendance batch"
        );
        Ok(summary)
    }

    /// Write `rows` in chunked transactions. Returns the number of chunks.
    async fn upsert_chunks(&self, rows: Vec<attendance::ActiveModel>) -> Result<usize, CheckinError> {
        let mut pending = rows.into_iter().peekable();
        let mut chunks = 0usize;
        while pending.peek().is_some() {
            let txn = self.conn.begin().await?;
            for row in pending.by_ref().take(self.batch_size) {
                attendance::Entity::insert(row)
                    .on_conflict(natural_key_upsert())
                    .exec(&txn)
                    .await?;
            }
            txn.commit().await?;
            chunks += 1;
        }
        Ok(chunks)
    }

    pub async fn list(&self, filter: RecordFilter) -> Result<Vec<attendance::Model>, CheckinError> {
        let mut select = attendance::Entity::find();
        if let Some(term_id) = filter.term_id {
            select = select.filter(attendance::Column::TermId.eq(term_id));
        }
        if let Some(date) = filter.date {
            select = select.filter(attendance::Column::Date.eq(date));
        }
        if let Some(from) = filter.from {
            select = select.filter(attendance::Column::Date.gte(from));
        }
        if let Some(to) = filter.to {
            select = select.filter(attendance::Column::Date.lte(to));
        }
        if let Some(subject_id) = filter.subject_id {
            select = select.filter(attendance::Column::SubjectId.eq(subject_id));
        }
        if let Some(classroom_id) = filter.classroom_id {
            select = select.filter(attendance::Column::ClassroomId.eq(classroom_id));
        }
        if let Some(period) = filter.period {
            select = select.filter(attendance::Column::Period.eq(period));
        }
        if let Some(student_id) = filter.student_id {
            select = select.filter(attendance::Column::StudentId.eq(student_id));
        }

        Ok(select
            .order_by_asc(attendance::Column::Date)
            .order_by_asc(attendance::Column::Period)
            .order_by_asc(attendance::Column::StudentId)
            .all(self.conn)
            .await?)
    }

    /// Explicit teacher deletion.
    pub async fn delete(&self, record_id: &str) -> Result<(), CheckinError> {
        let result = attendance::Entity::delete_by_id(record_id.to_string())
            .exec(self.conn)
            .await?;
        if result.rows_affected == 0 {
            return Err(CheckinError::NotFound("Attendance record"));
        }
        info!(record_id, "Deleted attendance record");
        Ok(())
    }
}

/// Conflict target matching `uq_attendance_natural_key`.
fn natural_key_upsert() -> OnConflict {
    OnConflict::columns([
        attendance::Column::TermId,
        attendance::Column::SubjectId,
        attendance::Column::ClassroomId,
        attendance::Column::Date,
        attendance::Column::Period,
        attendance::Column::StudentId,
    ])
    .update_columns([
        attendance::Column::Status,
        attendance::Column::Note,
        attendance::Column::UpdatedAt,
    ])
    .to_owned()
}

/// Keep one draft per student: the last one wins, at the position of the first.
fn collapse_drafts(drafts: Vec<DraftRecord>) -> Vec<DraftRecord> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<DraftRecord> = Vec::with_capacity(drafts.len());
    for draft in drafts {
        match index.get(&draft.student_id) {
            Some(&i) => out[i] = draft,
            None => {
                index.insert(draft.student_id.clone(), out.len());
                out.push(draft);
            }
        }
    }
    out
}
