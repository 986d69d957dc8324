//! Errors returned by the mutation and read operations of [`crate::Timetable`].

use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;
use uuid::Uuid;

use timetable_db::models::{ClassGroupKey, Weekday};

pub type ScheduleResult<T> = Result<T, ScheduleError>;

/// Validation failures are raised before anything is written; `Store` wraps
/// failures of the underlying store.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("time slot must start before it ends (start {start}, end {end})")]
    SlotTimesReversed { start: NaiveTime, end: NaiveTime },

    #[error("a time slot already starts at {start_time} on {weekday} in school year {school_year}")]
    DuplicateTimeSlot {
        school_year: i32,
        weekday: Weekday,
        start_time: NaiveTime,
    },

    #[error("date range starts after it ends (start {start}, end {end})")]
    DateRangeReversed { start: NaiveDate, end: NaiveDate },

    #[error("validity period {start}..{end} of {key} overlaps existing period {existing}")]
    OverlappingPeriod {
        key: ClassGroupKey,
        start: NaiveDate,
        end: NaiveDate,
        existing: Uuid,
    },

    #[error(
        "time slot belongs to school year {slot_year} but the validity period to school year {period_year}"
    )]
    SchoolYearMismatch { slot_year: i32, period_year: i32 },

    #[error("time slot {time_slot_id} is already booked in validity period {validity_period_id}")]
    SlotAlreadyBooked {
        validity_period_id: Uuid,
        time_slot_id: Uuid,
        existing: Uuid,
    },

    #[error("subject not linked to any sibling class")]
    SubjectNotLinked { subject_id: Uuid, key: ClassGroupKey },

    #[error("no sibling class of {key} with course {course_id} links subject {subject_id}")]
    CourseNotLinked {
        key: ClassGroupKey,
        course_id: Uuid,
        subject_id: Uuid,
    },

    #[error("subject {subject_id} is already linked to class group {class_group_id}")]
    DuplicateLink {
        subject_id: Uuid,
        class_group_id: Uuid,
    },

    #[error("weekly lesson count must not be negative (got {0})")]
    NegativeWeeklyLessons(i32),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl ScheduleError {
    pub(crate) fn not_found(entity: &'static str, id: Uuid) -> Self {
        Self::NotFound { entity, id }
    }

    /// Whether the error is a rejected input rather than a store failure.
    pub fn is_validation(&self) -> bool {
        !matches!(self, Self::Store(_) | Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlinked_subject_message() {
        let err = ScheduleError::SubjectNotLinked {
            subject_id: Uuid::nil(),
            key: ClassGroupKey::new(2026, 1, "A"),
        };
        assert_eq!(err.to_string(), "subject not linked to any sibling class");
        assert!(err.is_validation());
    }

    #[test]
    fn store_errors_are_not_validation() {
        let err = ScheduleError::from(anyhow::anyhow!("connection reset"));
        assert!(!err.is_validation());
        assert_eq!(err.to_string(), "connection reset");
    }
}
