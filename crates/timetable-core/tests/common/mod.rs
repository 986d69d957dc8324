//! Shared fixture for the engine integration tests: an in-memory database
//! seeded with the 2026 school year, a clock frozen on a Tuesday in March,
//! and helpers that go through the public mutation API.

#![allow(dead_code)]

use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

use timetable_core::{Applied, FixedClock, FixedSchoolYear, ScheduleEntryInput, Timetable};
use timetable_db::models::{
    ClassGroup, ClassGroupKey, Course, NewSubjectClassLink, NewTeacherAssignment, NewTimeSlot,
    NewValidityPeriod, Priority, ScheduleEntry, Subject, SubjectClassLink, Teacher,
    TeacherAssignment, TimeSlot, ValidityPeriod, Weekday,
};
use timetable_test_utils::MemoryDb;

pub type TestTimetable = Timetable<MemoryDb, FixedClock, FixedSchoolYear>;

pub const YEAR: i32 = 2026;

pub fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(YEAR, month, day).expect("valid date")
}

pub fn time(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).expect("valid time")
}

/// Tuesday 2026-03-10.
pub fn today() -> NaiveDate {
    date(3, 10)
}

pub struct Fixture {
    pub db: MemoryDb,
    pub tt: TestTimetable,
    pub key: ClassGroupKey,
    pub em: Course,
    pub tec: Course,
    pub class_em: ClassGroup,
    pub mat: Subject,
    pub phy: Subject,
    pub ana: Teacher,
    pub bruno: Teacher,
}

impl Fixture {
    /// Class 1A/2026 with one course (EM); subjects MAT and PHY; teachers
    /// Ana and Bruno. Nothing scheduled yet.
    pub fn new() -> Self {
        let db = MemoryDb::new();
        let key = ClassGroupKey::new(YEAR, 1, "A");
        let em = db.add_course("EM", "Ensino Medio");
        let tec = db.add_course("TEC", "Tecnico");
        let class_em = db.add_class_group(&key, em.id);
        let mat = db.add_subject("MAT", "Mathematics");
        let phy = db.add_subject("PHY", "Physics");
        let ana = db.add_teacher("Ana");
        let bruno = db.add_teacher("Bruno");

        let tt = Timetable::new(db.clone())
            .with_clock(FixedClock::new(today()))
            .with_year_resolver(FixedSchoolYear(YEAR));

        Self {
            db,
            tt,
            key,
            em,
            tec,
            class_em,
            mat,
            phy,
            ana,
            bruno,
        }
    }

    /// Add the TEC sibling of 1A.
    pub fn add_tec_sibling(&self) -> ClassGroup {
        self.db.add_class_group(&self.key, self.tec.id)
    }

    pub async fn slot(&self, weekday: Weekday, start: NaiveTime, end: NaiveTime) -> TimeSlot {
        self.tt
            .create_time_slot(NewTimeSlot {
                school_year: YEAR,
                weekday,
                start_time: start,
                end_time: end,
            })
            .await
            .expect("create time slot")
            .record
    }

    /// A period of 1A covering 2026-02-01..=2026-12-15.
    pub async fn school_term(&self) -> ValidityPeriod {
        self.period(&self.key, date(2, 1), date(12, 15)).await
    }

    pub async fn period(&self, key: &ClassGroupKey, start: NaiveDate, end: NaiveDate) -> ValidityPeriod {
        self.tt
            .create_validity_period(NewValidityPeriod {
                key: key.clone(),
                date_start: start,
                date_end: end,
            })
            .await
            .expect("create validity period")
            .record
    }

    pub async fn link(&self, subject: &Subject, class_group: &ClassGroup) -> SubjectClassLink {
        self.tt
            .create_subject_link(NewSubjectClassLink {
                subject_id: subject.id,
                class_group_id: class_group.id,
                weekly_lessons: 4,
            })
            .await
            .expect("create subject link")
            .record
    }

    pub async fn assign(
        &self,
        teacher: &Teacher,
        link: &SubjectClassLink,
        priority: Priority,
    ) -> TeacherAssignment {
        self.tt
            .create_teacher_assignment(NewTeacherAssignment {
                teacher_id: teacher.id,
                subject_class_link_id: link.id,
                priority,
                active_from: date(2, 1),
                active_to: None,
            })
            .await
            .expect("create teacher assignment")
            .record
    }

    pub async fn book(
        &self,
        period: &ValidityPeriod,
        slot: &TimeSlot,
        subject: &Subject,
    ) -> Applied<ScheduleEntry> {
        self.tt
            .create_schedule_entry(entry_input(period, slot, subject, None))
            .await
            .expect("create schedule entry")
    }
}

pub fn entry_input(
    period: &ValidityPeriod,
    slot: &TimeSlot,
    subject: &Subject,
    course_id: Option<Uuid>,
) -> ScheduleEntryInput {
    ScheduleEntryInput {
        validity_period_id: period.id,
        time_slot_id: slot.id,
        subject_id: subject.id,
        course_id,
    }
}
