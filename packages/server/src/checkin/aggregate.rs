//! Worst-status aggregation of raw per-period records.
//!
//! A student's day is summarized by the most severe status among that day's
//! records. Students without records count in no bucket; absence is never
//! inferred.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;
use common::AttendanceStatus;
use serde::Serialize;

use crate::entity::{attendance, classroom};

/// Student tallies by worst status. `total` counts students with at least one record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct StatusCounts {
    pub present: u64,
    pub late: u64,
    pub absent: u64,
    pub leave: u64,
    pub sick: u64,
    pub activity: u64,
    pub online: u64,
    pub total: u64,
}

impl StatusCounts {
    pub fn add(&mut self, status: AttendanceStatus) {
        *self.slot(status) += 1;
        self.total += 1;
    }

    #[cfg(test)]
    fn get(&self, status: AttendanceStatus) -> u64 {
        match status {
            AttendanceStatus::Present => self.present,
            AttendanceStatus::Late => self.late,
            AttendanceStatus::Absent => self.absent,
            AttendanceStatus::Leave => self.leave,
            AttendanceStatus::Sick => self.sick,
            AttendanceStatus::Activity => self.activity,
            AttendanceStatus::Online => self.online,
        }
    }

    fn slot(&mut self, status: AttendanceStatus) -> &mut u64 {
        match status {
            AttendanceStatus::Present => &mut self.present,
            AttendanceStatus::Late => &mut self.late,
            AttendanceStatus::Absent => &mut self.absent,
            AttendanceStatus::Leave => &mut self.leave,
            AttendanceStatus::Sick => &mut self.sick,
            AttendanceStatus::Activity => &mut self.activity,
            AttendanceStatus::Online => &mut self.online,
        }
    }

    fn from_worst<'a>(worst: impl IntoIterator<Item = &'a AttendanceStatus>) -> Self {
        let mut counts = Self::default();
        for status in worst {
            counts.add(*status);
        }
        counts
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassroomRow {
    pub classroom_id: String,
    pub classroom_name: String,
    pub counts: StatusCounts,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaySummary {
    pub per_student: StatusCounts,
    /// Sorted by classroom name.
    pub per_classroom: Vec<ClassroomRow>,
}

/// Summarize one day's records.
///
/// Every classroom in `classrooms` gets a row, with zero counts if it has no
/// records. Records pointing at a classroom outside `classrooms` get a row
/// named after the classroom id.
pub fn summarize(records: &[attendance::Model], classrooms: &[classroom::Model]) -> DaySummary {
    let mut by_student: HashMap<&str, Vec<AttendanceStatus>> = HashMap::new();
    let mut by_classroom: HashMap<&str, HashMap<&str, Vec<AttendanceStatus>>> = HashMap::new();
    for r in records {
        by_student
            .entry(r.student_id.as_str())
            .or_default()
            .push(r.status);
        by_classroom
            .entry(r.classroom_id.as_str())
            .or_default()
            .entry(r.student_id.as_str())
            .or_default()
            .push(r.status);
    }

    let per_student = StatusCounts::from_worst(&reduce(by_student));

    let mut names: HashMap<&str, &str> = classrooms
        .iter()
        .map(|c| (c.id.as_str(), c.name.as_str()))
        .collect();
    for id in by_classroom.keys() {
        names.entry(*id).or_insert(*id);
    }

    let mut per_classroom: Vec<ClassroomRow> = names
        .into_iter()
        .map(|(id, name)| {
            let counts = by_classroom
                .remove(id)
                .map(|students| StatusCounts::from_worst(&reduce(students)))
                .unwrap_or_default();
            ClassroomRow {
                classroom_id: id.to_string(),
                classroom_name: name.to_string(),
                counts,
            }
        })
        .collect();
    per_classroom.sort_by(|a, b| {
        compare_names(&a.classroom_name, &b.classroom_name)
            .then_with(|| a.classroom_id.cmp(&b.classroom_id))
    });

    DaySummary {
        per_student,
        per_classroom,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridRow {
    pub student_id: String,
    /// One cell per entry of [`Grid::dates`]; `None` where the student has no record.
    pub cells: Vec<Option<AttendanceStatus>>,
}

/// Student x date matrix of worst statuses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    /// Ascending distinct dates present in the records.
    pub dates: Vec<NaiveDate>,
    /// Ordered by student id.
    pub rows: Vec<GridRow>,
}

pub fn grid(records: &[attendance::Model]) -> Grid {
    let dates: Vec<NaiveDate> = records
        .iter()
        .map(|r| r.date)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let column: HashMap<NaiveDate, usize> =
        dates.iter().enumerate().map(|(i, d)| (*d, i)).collect();

    let mut cells: BTreeMap<&str, Vec<Option<AttendanceStatus>>> = BTreeMap::new();
    for r in records {
        let row = cells
            .entry(r.student_id.as_str())
            .or_insert_with(|| vec![None; dates.len()]);
        let cell = &mut row[column[&r.date]];
        *cell = match *cell {
            Some(current) if !r.status.is_more_severe_than(&current) => Some(current),
            _ => Some(r.status),
        };
    }

    Grid {
        rows: cells
            .into_iter()
            .map(|(student_id, cells)| GridRow {
                student_id: student_id.to_string(),
                cells,
            })
            .collect(),
        dates,
    }
}

fn reduce<K>(groups: HashMap<K, Vec<AttendanceStatus>>) -> Vec<AttendanceStatus> {
    groups
        .into_values()
        .filter_map(AttendanceStatus::worst)
        .collect()
}

/// Case-insensitive first, then case-sensitive so the order is total.
///
/// Folding is Unicode lowercase followed by code point order. There is no
/// locale tailoring, so scripts with combining marks (Thai, for one) sort by
/// code point rather than dictionary order.
pub(crate) fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}
