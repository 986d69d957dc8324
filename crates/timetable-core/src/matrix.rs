//! Display-ready weekly matrices stored in the caches.
//!
//! A matrix maps `slot number -> weekday -> cell`, with a legend giving the
//! time range of each slot number. Both maps are ordered so the JSON payload
//! of a rebuilt cache is byte-for-byte stable for unchanged inputs.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use timetable_db::models::{TimeSlot, Weekday};

/// Start and end of a slot number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotTimes {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleMatrix<C> {
    pub rows: BTreeMap<i32, BTreeMap<Weekday, C>>,
    pub legend: BTreeMap<i32, SlotTimes>,
}

impl<C> Default for ScheduleMatrix<C> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            legend: BTreeMap::new(),
        }
    }
}

impl<C> ScheduleMatrix<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, slot: i32, weekday: Weekday) -> Option<&C> {
        self.rows.get(&slot).and_then(|row| row.get(&weekday))
    }

    pub fn is_empty(&self) -> bool {
        self.rows.values().all(BTreeMap::is_empty)
    }

    /// Number of filled cells.
    pub fn cell_count(&self) -> usize {
        self.rows.values().map(BTreeMap::len).sum()
    }

    /// Weekdays with at least one filled cell, Monday first.
    pub fn weekdays(&self) -> Vec<Weekday> {
        let mut days: Vec<Weekday> = self
            .rows
            .values()
            .flat_map(|row| row.keys().copied())
            .collect();
        days.sort();
        days.dedup();
        days
    }

    /// Record the time range of a slot number. The first range seen for a
    /// number wins; callers feed slots Monday first.
    pub(crate) fn note_slot(&mut self, slot: i32, times: SlotTimes) {
        self.legend.entry(slot).or_insert(times);
    }

    /// Fill the legend from every slot of the year, booked or not, so the
    /// grid shows free periods between lessons.
    pub(crate) fn note_slots<'a>(&mut self, slots: impl IntoIterator<Item = &'a TimeSlot>) {
        for slot in slots {
            self.note_slot(
                slot.sequence_number,
                SlotTimes {
                    start_time: slot.start_time,
                    end_time: slot.end_time,
                },
            );
        }
    }

    pub(crate) fn cell_mut(&mut self, slot: i32, weekday: Weekday) -> Option<&mut C> {
        self.rows.get_mut(&slot).and_then(|row| row.get_mut(&weekday))
    }

    pub(crate) fn insert(&mut self, slot: i32, weekday: Weekday, cell: C) {
        self.rows.entry(slot).or_default().insert(weekday, cell);
    }
}

// ---------------------------------------------------------------------------
// Class-group view
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassCell {
    pub subject_id: Uuid,
    pub subject_code: String,
    pub subject_name: String,
    /// Course the entry was recorded for.
    pub course_id: Uuid,
    /// Active teacher, when one is assigned.
    pub teacher_id: Option<Uuid>,
    pub teacher_name: Option<String>,
}

/// How a sibling class group is labelled next to this one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiblingInfo {
    pub course_code: String,
    pub course_name: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSchedule {
    pub class_group_id: Uuid,
    /// Short label such as `1A`.
    pub label: String,
    pub validity_period_id: Uuid,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub matrix: ScheduleMatrix<ClassCell>,
    /// Every class group sharing this one's key, itself included.
    pub siblings: BTreeMap<Uuid, SiblingInfo>,
}

// ---------------------------------------------------------------------------
// Teacher view
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClassRef {
    /// Short class label such as `1A`.
    pub label: String,
    pub course_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeacherCell {
    /// Set only while the cell comes from a single subject.
    pub subject_id: Option<Uuid>,
    pub subject_code: String,
    pub subject_name: String,
    /// Distinct classes taught in this cell, sorted.
    pub classes: Vec<ClassRef>,
    /// Set only while the cell belongs to exactly one class group.
    pub class_group_id: Option<Uuid>,
}

impl TeacherCell {
    pub fn is_merged(&self) -> bool {
        self.class_group_id.is_none()
    }

    /// Fold another lesson at the same slot and weekday into this cell.
    pub(crate) fn merge(&mut self, other: TeacherCell) {
        if self.class_group_id != other.class_group_id {
            self.class_group_id = None;
        }
        if self.subject_id != other.subject_id {
            self.subject_id = None;
            self.subject_code = join_distinct(&self.subject_code, &other.subject_code, "/");
            self.subject_name = join_distinct(&self.subject_name, &other.subject_name, " / ");
        }
        for class in other.classes {
            if !self.classes.contains(&class) {
                self.classes.push(class);
            }
        }
        self.classes.sort();
    }
}

fn join_distinct(current: &str, extra: &str, sep: &str) -> String {
    let mut parts: Vec<&str> = current.split(sep).collect();
    for part in extra.split(sep) {
        if !parts.contains(&part) {
            parts.push(part);
        }
    }
    parts.sort_unstable();
    parts.join(sep)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeacherSchedule {
    pub teacher_id: Uuid,
    pub teacher_name: Option<String>,
    pub school_year: i32,
    pub matrix: ScheduleMatrix<TeacherCell>,
}

impl TeacherSchedule {
    pub fn empty(teacher_id: Uuid, school_year: i32) -> Self {
        Self {
            teacher_id,
            teacher_name: None,
            school_year,
            matrix: ScheduleMatrix::new(),
        }
    }
}
