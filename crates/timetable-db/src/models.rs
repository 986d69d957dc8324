use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Day of the week a time slot falls on.
///
/// Variants are declared Monday-first so the derived `Ord` matches the column
/// order of a rendered timetable.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    /// All weekdays, Monday first.
    pub const ALL: [Weekday; 7] = [
        Self::Monday,
        Self::Tuesday,
        Self::Wednesday,
        Self::Thursday,
        Self::Friday,
        Self::Saturday,
        Self::Sunday,
    ];

    /// Three-letter column header.
    pub fn short_name(self) -> &'static str {
        match self {
            Self::Monday => "Mon",
            Self::Tuesday => "Tue",
            Self::Wednesday => "Wed",
            Self::Thursday => "Thu",
            Self::Friday => "Fri",
            Self::Saturday => "Sat",
            Self::Sunday => "Sun",
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Monday => "monday",
            Self::Tuesday => "tuesday",
            Self::Wednesday => "wednesday",
            Self::Thursday => "thursday",
            Self::Friday => "friday",
            Self::Saturday => "saturday",
            Self::Sunday => "sunday",
        };
        f.write_str(s)
    }
}

impl FromStr for Weekday {
    type Err = WeekdayParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monday" => Ok(Self::Monday),
            "tuesday" => Ok(Self::Tuesday),
            "wednesday" => Ok(Self::Wednesday),
            "thursday" => Ok(Self::Thursday),
            "friday" => Ok(Self::Friday),
            "saturday" => Ok(Self::Saturday),
            "sunday" => Ok(Self::Sunday),
            other => Err(WeekdayParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`Weekday`] string.
#[derive(Debug, Clone)]
pub struct WeekdayParseError(pub String);

impl fmt::Display for WeekdayParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid weekday: {:?}", self.0)
    }
}

impl std::error::Error for WeekdayParseError {}

// ---------------------------------------------------------------------------

/// Priority tier of a teacher assignment. Lower tiers win when several
/// teachers are active for the same subject and class.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Primary,
    Substitute,
    Auxiliary,
}

impl Priority {
    /// Numeric rank: 1 for primary, 2 for substitute, 3 for auxiliary.
    pub fn rank(self) -> u8 {
        match self {
            Self::Primary => 1,
            Self::Substitute => 2,
            Self::Auxiliary => 3,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Primary => "primary",
            Self::Substitute => "substitute",
            Self::Auxiliary => "auxiliary",
        };
        f.write_str(s)
    }
}

impl FromStr for Priority {
    type Err = PriorityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "primary" => Ok(Self::Primary),
            "substitute" => Ok(Self::Substitute),
            "auxiliary" => Ok(Self::Auxiliary),
            other => Err(PriorityParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`Priority`] string.
#[derive(Debug, Clone)]
pub struct PriorityParseError(pub String);

impl fmt::Display for PriorityParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid priority: {:?}", self.0)
    }
}

impl std::error::Error for PriorityParseError {}

// ---------------------------------------------------------------------------
// Value types
// ---------------------------------------------------------------------------

/// The scheduling unit shared by sibling class groups: every class group with
/// the same year, number and letter follows the same weekly schedule, whatever
/// its course.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClassGroupKey {
    pub school_year: i32,
    pub number: i32,
    pub letter: String,
}

impl ClassGroupKey {
    pub fn new(school_year: i32, number: i32, letter: impl Into<String>) -> Self {
        Self {
            school_year,
            number,
            letter: letter.into(),
        }
    }

    /// Short display label such as `1A`.
    pub fn label(&self) -> String {
        format!("{}{}", self.number, self.letter)
    }
}

impl fmt::Display for ClassGroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}/{}", self.number, self.letter, self.school_year)
    }
}

// ---------------------------------------------------------------------------
// Row structs
// ---------------------------------------------------------------------------

/// A course (track) a class group belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Course {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// One course's cohort for a given year, number and letter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ClassGroup {
    pub id: Uuid,
    pub school_year: i32,
    pub number: i32,
    pub letter: String,
    pub course_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl ClassGroup {
    pub fn key(&self) -> ClassGroupKey {
        ClassGroupKey::new(self.school_year, self.number, self.letter.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Subject {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Teacher {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A numbered lesson period of a weekday within a school year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct TimeSlot {
    pub id: Uuid,
    pub school_year: i32,
    pub weekday: Weekday,
    pub sequence_number: i32,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub created_at: DateTime<Utc>,
}

/// A date range during which one weekly schedule applies to a class key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ValidityPeriod {
    pub id: Uuid,
    pub school_year: i32,
    pub number: i32,
    pub letter: String,
    pub date_start: NaiveDate,
    pub date_end: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl ValidityPeriod {
    pub fn key(&self) -> ClassGroupKey {
        ClassGroupKey::new(self.school_year, self.number, self.letter.clone())
    }

    /// Whether `day` falls inside the period (both ends inclusive).
    pub fn covers(&self, day: NaiveDate) -> bool {
        self.date_start <= day && day <= self.date_end
    }
}

/// A subject bound to a time slot inside a validity period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ScheduleEntry {
    pub id: Uuid,
    pub validity_period_id: Uuid,
    pub time_slot_id: Uuid,
    pub subject_id: Uuid,
    pub course_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// A subject taught in a specific class group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct SubjectClassLink {
    pub id: Uuid,
    pub subject_id: Uuid,
    pub class_group_id: Uuid,
    pub weekly_lessons: i32,
    pub created_at: DateTime<Utc>,
}

/// A teacher bound to a subject in a class group for a date window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct TeacherAssignment {
    pub id: Uuid,
    pub teacher_id: Uuid,
    pub subject_class_link_id: Uuid,
    pub priority: Priority,
    pub active_from: NaiveDate,
    pub active_to: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl TeacherAssignment {
    /// An assignment counts as active unless its window closed before `day`.
    pub fn is_active_on(&self, day: NaiveDate) -> bool {
        self.active_to.is_none_or(|to| to >= day)
    }
}

/// Stored class-group cache row. `schedule` is `None` when no validity
/// period covered `valid_on`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ClassScheduleCacheRow {
    pub class_group_id: Uuid,
    pub school_year: i32,
    pub schedule: Option<serde_json::Value>,
    pub valid_on: NaiveDate,
    pub generation: i64,
    pub generated_at: DateTime<Utc>,
}

/// Stored teacher cache row, keyed by teacher and school year.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TeacherScheduleCacheRow {
    pub teacher_id: Uuid,
    pub school_year: i32,
    pub schedule: serde_json::Value,
    pub valid_on: NaiveDate,
    pub generation: i64,
    pub generated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Insert / update payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTimeSlot {
    pub school_year: i32,
    pub weekday: Weekday,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewValidityPeriod {
    pub key: ClassGroupKey,
    pub date_start: NaiveDate,
    pub date_end: NaiveDate,
}

/// Schedule entry payload with its course already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewScheduleEntry {
    pub validity_period_id: Uuid,
    pub time_slot_id: Uuid,
    pub subject_id: Uuid,
    pub course_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubjectClassLink {
    pub subject_id: Uuid,
    pub class_group_id: Uuid,
    pub weekly_lessons: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTeacherAssignment {
    pub teacher_id: Uuid,
    pub subject_class_link_id: Uuid,
    pub priority: Priority,
    pub active_from: NaiveDate,
    pub active_to: Option<NaiveDate>,
}

/// One class-group cache row to upsert.
#[derive(Debug, Clone)]
pub struct ClassCacheWrite {
    pub class_group_id: Uuid,
    pub school_year: i32,
    pub schedule: Option<serde_json::Value>,
    pub valid_on: NaiveDate,
    pub generated_at: DateTime<Utc>,
}

/// One teacher cache row to upsert.
#[derive(Debug, Clone)]
pub struct TeacherCacheWrite {
    pub teacher_id: Uuid,
    pub school_year: i32,
    pub schedule: serde_json::Value,
    pub valid_on: NaiveDate,
    pub generated_at: DateTime<Utc>,
}

/// Every scheduling fact of one school year, loaded in one pass so a batch
/// of rebuilds never goes back to the store.
#[derive(Debug, Clone, Default)]
pub struct YearData {
    pub school_year: i32,
    pub time_slots: Vec<TimeSlot>,
    pub courses: Vec<Course>,
    pub class_groups: Vec<ClassGroup>,
    pub subjects: Vec<Subject>,
    pub teachers: Vec<Teacher>,
    pub validity_periods: Vec<ValidityPeriod>,
    pub schedule_entries: Vec<ScheduleEntry>,
    pub subject_links: Vec<SubjectClassLink>,
    pub assignments: Vec<TeacherAssignment>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weekday_display_roundtrip() {
        for v in Weekday::ALL {
            let parsed: Weekday = v.to_string().parse().expect("should parse");
            assert_eq!(v, parsed);
        }
    }

    #[test]
    fn weekday_invalid() {
        assert!("funday".parse::<Weekday>().is_err());
    }

    #[test]
    fn weekday_orders_monday_first() {
        assert!(Weekday::Monday < Weekday::Tuesday);
        assert!(Weekday::Saturday < Weekday::Sunday);
    }

    #[test]
    fn priority_rank_orders_tiers() {
        assert!(Priority::Primary.rank() < Priority::Substitute.rank());
        assert!(Priority::Substitute.rank() < Priority::Auxiliary.rank());
        assert!(Priority::Primary < Priority::Auxiliary);
    }

    #[test]
    fn priority_invalid() {
        assert!("boss".parse::<Priority>().is_err());
        assert_eq!("substitute".parse::<Priority>().ok(), Some(Priority::Substitute));
    }

    #[test]
    fn class_group_key_label() {
        let key = ClassGroupKey::new(2026, 1, "A");
        assert_eq!(key.label(), "1A");
        assert_eq!(key.to_string(), "1A/2026");
    }

    #[test]
    fn validity_period_covers_is_inclusive() {
        let period = ValidityPeriod {
            id: Uuid::new_v4(),
            school_year: 2026,
            number: 1,
            letter: "A".into(),
            date_start: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
            date_end: NaiveDate::from_ymd_opt(2026, 12, 15).unwrap(),
            created_at: Utc::now(),
        };
        assert!(period.covers(NaiveDate::from_ymd_opt(2026, 2, 1).unwrap()));
        assert!(period.covers(NaiveDate::from_ymd_opt(2026, 12, 15).unwrap()));
        assert!(!period.covers(NaiveDate::from_ymd_opt(2026, 12, 16).unwrap()));
        assert!(!period.covers(NaiveDate::from_ymd_opt(2026, 1, 31).unwrap()));
    }

    #[test]
    fn assignment_open_ended_is_active() {
        let mut a = TeacherAssignment {
            id: Uuid::new_v4(),
            teacher_id: Uuid::new_v4(),
            subject_class_link_id: Uuid::new_v4(),
            priority: Priority::Primary,
            active_from: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
            active_to: None,
            created_at: Utc::now(),
        };
        let day = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        assert!(a.is_active_on(day));
        a.active_to = Some(day);
        assert!(a.is_active_on(day));
        a.active_to = NaiveDate::from_ymd_opt(2026, 3, 9);
        assert!(!a.is_active_on(day));
    }
}
