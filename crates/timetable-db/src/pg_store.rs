//! PostgreSQL implementation of [`ScheduleStore`]: a thin wrapper around an
//! open transaction that forwards every call to the query modules.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveTime;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::models::{
    ClassCacheWrite, ClassGroup, ClassGroupKey, ClassScheduleCacheRow, NewScheduleEntry,
    NewSubjectClassLink, NewTeacherAssignment, NewTimeSlot, NewValidityPeriod, ScheduleEntry,
    SubjectClassLink, Teacher, TeacherAssignment, TeacherCacheWrite, TeacherScheduleCacheRow,
    TimeSlot, ValidityPeriod, Weekday, YearData,
};
use crate::queries::{
    assignments, caches, schedule_entries, sources, subject_links, time_slots, validity_periods,
    year_data,
};
use crate::store::{Database, ScheduleStore};

/// A unit of work backed by a PostgreSQL transaction.
pub struct PgStore {
    tx: Transaction<'static, Postgres>,
}

impl PgStore {
    pub async fn begin(pool: &PgPool) -> Result<Self> {
        let tx = pool.begin().await.context("failed to begin transaction")?;
        Ok(Self { tx })
    }
}

#[async_trait]
impl Database for PgPool {
    type Store = PgStore;

    async fn begin(&self) -> Result<PgStore> {
        PgStore::begin(self).await
    }
}

#[async_trait]
impl ScheduleStore for PgStore {
    async fn get_class_group(&mut self, id: Uuid) -> Result<Option<ClassGroup>> {
        sources::get_class_group(&mut self.tx, id).await
    }

    async fn list_siblings(&mut self, key: &ClassGroupKey) -> Result<Vec<ClassGroup>> {
        sources::list_siblings(&mut self.tx, key).await
    }

    async fn get_teacher(&mut self, id: Uuid) -> Result<Option<Teacher>> {
        sources::get_teacher(&mut self.tx, id).await
    }

    async fn get_time_slot(&mut self, id: Uuid) -> Result<Option<TimeSlot>> {
        time_slots::get_time_slot(&mut self.tx, id).await
    }

    async fn find_time_slot(
        &mut self,
        school_year: i32,
        weekday: Weekday,
        start_time: NaiveTime,
    ) -> Result<Option<TimeSlot>> {
        time_slots::find_time_slot(&mut self.tx, school_year, weekday, start_time).await
    }

    async fn list_time_slots_for_day(
        &mut self,
        school_year: i32,
        weekday: Weekday,
    ) -> Result<Vec<TimeSlot>> {
        time_slots::list_time_slots_for_day(&mut self.tx, school_year, weekday).await
    }

    async fn list_time_slots_for_year(&mut self, school_year: i32) -> Result<Vec<TimeSlot>> {
        time_slots::list_time_slots_for_year(&mut self.tx, school_year).await
    }

    async fn insert_time_slot(&mut self, new: &NewTimeSlot) -> Result<TimeSlot> {
        time_slots::insert_time_slot(&mut self.tx, new).await
    }

    async fn update_time_slot(&mut self, id: Uuid, new: &NewTimeSlot) -> Result<Option<TimeSlot>> {
        time_slots::update_time_slot(&mut self.tx, id, new).await
    }

    async fn delete_time_slot(&mut self, id: Uuid) -> Result<bool> {
        time_slots::delete_time_slot(&mut self.tx, id).await
    }

    async fn set_sequence_number(&mut self, id: Uuid, sequence_number: i32) -> Result<()> {
        time_slots::set_sequence_number(&mut self.tx, id, sequence_number).await
    }

    async fn get_validity_period(&mut self, id: Uuid) -> Result<Option<ValidityPeriod>> {
        validity_periods::get_validity_period(&mut self.tx, id).await
    }

    async fn list_validity_periods(&mut self, key: &ClassGroupKey) -> Result<Vec<ValidityPeriod>> {
        validity_periods::list_validity_periods(&mut self.tx, key).await
    }

    async fn insert_validity_period(&mut self, new: &NewValidityPeriod) -> Result<ValidityPeriod> {
        validity_periods::insert_validity_period(&mut self.tx, new).await
    }

    async fn update_validity_period(
        &mut self,
        id: Uuid,
        new: &NewValidityPeriod,
    ) -> Result<Option<ValidityPeriod>> {
        validity_periods::update_validity_period(&mut self.tx, id, new).await
    }

    async fn delete_validity_period(&mut self, id: Uuid) -> Result<bool> {
        validity_periods::delete_validity_period(&mut self.tx, id).await
    }

    async fn get_schedule_entry(&mut self, id: Uuid) -> Result<Option<ScheduleEntry>> {
        schedule_entries::get_schedule_entry(&mut self.tx, id).await
    }

    async fn find_schedule_entry(
        &mut self,
        validity_period_id: Uuid,
        time_slot_id: Uuid,
    ) -> Result<Option<ScheduleEntry>> {
        schedule_entries::find_schedule_entry(&mut self.tx, validity_period_id, time_slot_id).await
    }

    async fn list_entries_for_key_subject(
        &mut self,
        key: &ClassGroupKey,
        subject_id: Uuid,
    ) -> Result<Vec<ScheduleEntry>> {
        schedule_entries::list_entries_for_key_subject(&mut self.tx, key, subject_id).await
    }

    async fn list_entries_for_slot(&mut self, time_slot_id: Uuid) -> Result<Vec<ScheduleEntry>> {
        schedule_entries::list_entries_for_slot(&mut self.tx, time_slot_id).await
    }

    async fn list_entries_for_period(
        &mut self,
        validity_period_id: Uuid,
    ) -> Result<Vec<ScheduleEntry>> {
        schedule_entries::list_entries_for_period(&mut self.tx, validity_period_id).await
    }

    async fn insert_schedule_entry(&mut self, new: &NewScheduleEntry) -> Result<ScheduleEntry> {
        schedule_entries::insert_schedule_entry(&mut self.tx, new).await
    }

    async fn update_schedule_entry(
        &mut self,
        id: Uuid,
        new: &NewScheduleEntry,
    ) -> Result<Option<ScheduleEntry>> {
        schedule_entries::update_schedule_entry(&mut self.tx, id, new).await
    }

    async fn delete_schedule_entry(&mut self, id: Uuid) -> Result<bool> {
        schedule_entries::delete_schedule_entry(&mut self.tx, id).await
    }

    async fn get_subject_link(&mut self, id: Uuid) -> Result<Option<SubjectClassLink>> {
        subject_links::get_subject_link(&mut self.tx, id).await
    }

    async fn find_subject_link(
        &mut self,
        subject_id: Uuid,
        class_group_id: Uuid,
    ) -> Result<Option<SubjectClassLink>> {
        subject_links::find_subject_link(&mut self.tx, subject_id, class_group_id).await
    }

    async fn list_links_for_class_groups(
        &mut self,
        class_group_ids: &[Uuid],
    ) -> Result<Vec<SubjectClassLink>> {
        subject_links::list_links_for_class_groups(&mut self.tx, class_group_ids).await
    }

    async fn insert_subject_link(&mut self, new: &NewSubjectClassLink) -> Result<SubjectClassLink> {
        subject_links::insert_subject_link(&mut self.tx, new).await
    }

    async fn update_weekly_lessons(
        &mut self,
        id: Uuid,
        weekly_lessons: i32,
    ) -> Result<Option<SubjectClassLink>> {
        subject_links::update_weekly_lessons(&mut self.tx, id, weekly_lessons).await
    }

    async fn delete_subject_link(&mut self, id: Uuid) -> Result<bool> {
        subject_links::delete_subject_link(&mut self.tx, id).await
    }

    async fn get_assignment(&mut self, id: Uuid) -> Result<Option<TeacherAssignment>> {
        assignments::get_assignment(&mut self.tx, id).await
    }

    async fn list_assignments_for_links(
        &mut self,
        link_ids: &[Uuid],
    ) -> Result<Vec<TeacherAssignment>> {
        assignments::list_assignments_for_links(&mut self.tx, link_ids).await
    }

    async fn insert_assignment(&mut self, new: &NewTeacherAssignment) -> Result<TeacherAssignment> {
        assignments::insert_assignment(&mut self.tx, new).await
    }

    async fn update_assignment(
        &mut self,
        id: Uuid,
        new: &NewTeacherAssignment,
    ) -> Result<Option<TeacherAssignment>> {
        assignments::update_assignment(&mut self.tx, id, new).await
    }

    async fn delete_assignment(&mut self, id: Uuid) -> Result<bool> {
        assignments::delete_assignment(&mut self.tx, id).await
    }

    async fn load_year(&mut self, school_year: i32) -> Result<YearData> {
        year_data::load_year(&mut self.tx, school_year).await
    }

    async fn get_class_cache(
        &mut self,
        class_group_id: Uuid,
    ) -> Result<Option<ClassScheduleCacheRow>> {
        caches::get_class_cache(&mut self.tx, class_group_id).await
    }

    async fn get_teacher_cache(
        &mut self,
        teacher_id: Uuid,
        school_year: i32,
    ) -> Result<Option<TeacherScheduleCacheRow>> {
        caches::get_teacher_cache(&mut self.tx, teacher_id, school_year).await
    }

    async fn put_class_caches(&mut self, rows: &[ClassCacheWrite]) -> Result<u64> {
        caches::put_class_caches(&mut self.tx, rows).await
    }

    async fn put_teacher_caches(&mut self, rows: &[TeacherCacheWrite]) -> Result<u64> {
        caches::put_teacher_caches(&mut self.tx, rows).await
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await.context("failed to commit transaction")
    }
}
