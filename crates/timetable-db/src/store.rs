//! Unit-of-work abstraction the engine runs against.
//!
//! A [`Database`] hands out one [`ScheduleStore`] per mutation. Everything the
//! mutation does, including the cache rebuilds it triggers, goes through that
//! store and becomes visible only on [`ScheduleStore::commit`]. Dropping the
//! store without committing discards every write.

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveTime;
use uuid::Uuid;

use crate::models::{
    ClassCacheWrite, ClassGroup, ClassGroupKey, ClassScheduleCacheRow, NewScheduleEntry,
    NewSubjectClassLink, NewTeacherAssignment, NewTimeSlot, NewValidityPeriod, ScheduleEntry,
    SubjectClassLink, Teacher, TeacherAssignment, TeacherCacheWrite, TeacherScheduleCacheRow,
    TimeSlot, ValidityPeriod, Weekday, YearData,
};

/// Source of transactional stores.
#[async_trait]
pub trait Database: Send + Sync {
    type Store: ScheduleStore;

    /// Open a new unit of work.
    async fn begin(&self) -> Result<Self::Store>;
}

/// Reads and writes available inside one unit of work.
#[async_trait]
pub trait ScheduleStore: Send {
    // -- source entities ---------------------------------------------------

    async fn get_class_group(&mut self, id: Uuid) -> Result<Option<ClassGroup>>;

    /// Siblings sharing `key`, ordered by course code then id.
    async fn list_siblings(&mut self, key: &ClassGroupKey) -> Result<Vec<ClassGroup>>;

    async fn get_teacher(&mut self, id: Uuid) -> Result<Option<Teacher>>;

    // -- time slots --------------------------------------------------------

    async fn get_time_slot(&mut self, id: Uuid) -> Result<Option<TimeSlot>>;

    async fn find_time_slot(
        &mut self,
        school_year: i32,
        weekday: Weekday,
        start_time: NaiveTime,
    ) -> Result<Option<TimeSlot>>;

    /// Slots of one day ordered by start time.
    async fn list_time_slots_for_day(
        &mut self,
        school_year: i32,
        weekday: Weekday,
    ) -> Result<Vec<TimeSlot>>;

    /// Slots of a year ordered by weekday then start time.
    async fn list_time_slots_for_year(&mut self, school_year: i32) -> Result<Vec<TimeSlot>>;

    async fn insert_time_slot(&mut self, new: &NewTimeSlot) -> Result<TimeSlot>;

    async fn update_time_slot(&mut self, id: Uuid, new: &NewTimeSlot) -> Result<Option<TimeSlot>>;

    /// Delete a slot and the schedule entries bound to it.
    async fn delete_time_slot(&mut self, id: Uuid) -> Result<bool>;

    async fn set_sequence_number(&mut self, id: Uuid, sequence_number: i32) -> Result<()>;

    // -- validity periods --------------------------------------------------

    async fn get_validity_period(&mut self, id: Uuid) -> Result<Option<ValidityPeriod>>;

    async fn list_validity_periods(&mut self, key: &ClassGroupKey) -> Result<Vec<ValidityPeriod>>;

    async fn insert_validity_period(&mut self, new: &NewValidityPeriod) -> Result<ValidityPeriod>;

    async fn update_validity_period(
        &mut self,
        id: Uuid,
        new: &NewValidityPeriod,
    ) -> Result<Option<ValidityPeriod>>;

    /// Delete a period and its schedule entries.
    async fn delete_validity_period(&mut self, id: Uuid) -> Result<bool>;

    // -- schedule entries --------------------------------------------------

    async fn get_schedule_entry(&mut self, id: Uuid) -> Result<Option<ScheduleEntry>>;

    async fn find_schedule_entry(
        &mut self,
        validity_period_id: Uuid,
        time_slot_id: Uuid,
    ) -> Result<Option<ScheduleEntry>>;

    async fn list_entries_for_key_subject(
        &mut self,
        key: &ClassGroupKey,
        subject_id: Uuid,
    ) -> Result<Vec<ScheduleEntry>>;

    /// Entries booked on `time_slot_id`, in any period.
    async fn list_entries_for_slot(&mut self, time_slot_id: Uuid) -> Result<Vec<ScheduleEntry>>;

    async fn list_entries_for_period(
        &mut self,
        validity_period_id: Uuid,
    ) -> Result<Vec<ScheduleEntry>>;

    async fn insert_schedule_entry(&mut self, new: &NewScheduleEntry) -> Result<ScheduleEntry>;

    async fn update_schedule_entry(
        &mut self,
        id: Uuid,
        new: &NewScheduleEntry,
    ) -> Result<Option<ScheduleEntry>>;

    async fn delete_schedule_entry(&mut self, id: Uuid) -> Result<bool>;

    // -- subject links -----------------------------------------------------

    async fn get_subject_link(&mut self, id: Uuid) -> Result<Option<SubjectClassLink>>;

    async fn find_subject_link(
        &mut self,
        subject_id: Uuid,
        class_group_id: Uuid,
    ) -> Result<Option<SubjectClassLink>>;

    async fn list_links_for_class_groups(
        &mut self,
        class_group_ids: &[Uuid],
    ) -> Result<Vec<SubjectClassLink>>;

    async fn insert_subject_link(&mut self, new: &NewSubjectClassLink) -> Result<SubjectClassLink>;

    async fn update_weekly_lessons(
        &mut self,
        id: Uuid,
        weekly_lessons: i32,
    ) -> Result<Option<SubjectClassLink>>;

    /// Delete a link and its teacher assignments.
    async fn delete_subject_link(&mut self, id: Uuid) -> Result<bool>;

    // -- teacher assignments -----------------------------------------------

    async fn get_assignment(&mut self, id: Uuid) -> Result<Option<TeacherAssignment>>;

    async fn list_assignments_for_links(
        &mut self,
        link_ids: &[Uuid],
    ) -> Result<Vec<TeacherAssignment>>;

    async fn insert_assignment(&mut self, new: &NewTeacherAssignment) -> Result<TeacherAssignment>;

    async fn update_assignment(
        &mut self,
        id: Uuid,
        new: &NewTeacherAssignment,
    ) -> Result<Option<TeacherAssignment>>;

    async fn delete_assignment(&mut self, id: Uuid) -> Result<bool>;

    // -- rebuild input and output --------------------------------------------

    async fn load_year(&mut self, school_year: i32) -> Result<YearData>;

    async fn get_class_cache(&mut self, class_group_id: Uuid)
    -> Result<Option<ClassScheduleCacheRow>>;

    async fn get_teacher_cache(
        &mut self,
        teacher_id: Uuid,
        school_year: i32,
    ) -> Result<Option<TeacherScheduleCacheRow>>;

    /// Upsert a batch of class caches. Rows for vanished class groups are
    /// skipped. Returns the number of rows written.
    async fn put_class_caches(&mut self, rows: &[ClassCacheWrite]) -> Result<u64>;

    /// Upsert a batch of teacher caches. Rows for vanished teachers are
    /// skipped. Returns the number of rows written.
    async fn put_teacher_caches(&mut self, rows: &[TeacherCacheWrite]) -> Result<u64>;

    /// Make every write of this unit of work durable.
    async fn commit(self) -> Result<()>;
}
