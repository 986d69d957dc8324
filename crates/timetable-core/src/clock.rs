//! Collaborators the engine consumes: what "today" is, and which school year
//! a teacher's view should show.

use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

/// Source of the current date and instant.
pub trait Clock: Send + Sync {
    /// The calendar day validity periods and assignment windows are resolved
    /// against.
    fn today(&self) -> NaiveDate;

    /// Timestamp recorded as `generated_at` on rebuilt caches.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock. "Today" is the local calendar date.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen on one day, for tests and replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    today: NaiveDate,
}

impl FixedClock {
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.today
    }

    fn now(&self) -> DateTime<Utc> {
        self.today.and_time(NaiveTime::MIN).and_utc()
    }
}

/// Chooses the school year shown when a teacher's schedule is requested.
pub trait SchoolYearResolver: Send + Sync {
    fn school_year_for_teacher(&self, teacher_id: Uuid, today: NaiveDate) -> i32;
}

/// School years follow the calendar year of "today".
#[derive(Debug, Clone, Copy, Default)]
pub struct CalendarYearResolver;

impl SchoolYearResolver for CalendarYearResolver {
    fn school_year_for_teacher(&self, _teacher_id: Uuid, today: NaiveDate) -> i32 {
        today.year()
    }
}

/// Always resolves to the same school year.
#[derive(Debug, Clone, Copy)]
pub struct FixedSchoolYear(pub i32);

impl SchoolYearResolver for FixedSchoolYear {
    fn school_year_for_teacher(&self, _teacher_id: Uuid, _today: NaiveDate) -> i32 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_reports_its_day() {
        let day = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let clock = FixedClock::new(day);
        assert_eq!(clock.today(), day);
        assert_eq!(clock.now().date_naive(), day);
    }

    #[test]
    fn calendar_resolver_uses_year_of_today() {
        let day = NaiveDate::from_ymd_opt(2026, 11, 2).unwrap();
        assert_eq!(
            CalendarYearResolver.school_year_for_teacher(Uuid::nil(), day),
            2026
        );
        assert_eq!(FixedSchoolYear(2025).school_year_for_teacher(Uuid::nil(), day), 2025);
    }
}
