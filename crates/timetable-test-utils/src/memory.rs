//! In-memory [`Database`] with the same observable contract as the
//! PostgreSQL store: unique constraints, cascading deletes, batched cache
//! upserts that skip vanished owners, and all-or-nothing commits.
//!
//! Each [`MemoryStore`] works on a private copy of the state and publishes
//! it on commit; dropping the store rolls back.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use uuid::Uuid;

use timetable_db::models::{
    ClassCacheWrite, ClassGroup, ClassGroupKey, ClassScheduleCacheRow, Course, NewScheduleEntry,
    NewSubjectClassLink, NewTeacherAssignment, NewTimeSlot, NewValidityPeriod, ScheduleEntry,
    Subject, SubjectClassLink, Teacher, TeacherAssignment, TeacherCacheWrite,
    TeacherScheduleCacheRow, TimeSlot, ValidityPeriod, Weekday, YearData,
};
use timetable_db::store::{Database, ScheduleStore};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    ticks: i64,
    courses: Vec<Course>,
    class_groups: Vec<ClassGroup>,
    subjects: Vec<Subject>,
    teachers: Vec<Teacher>,
    time_slots: Vec<TimeSlot>,
    validity_periods: Vec<ValidityPeriod>,
    schedule_entries: Vec<ScheduleEntry>,
    subject_links: Vec<SubjectClassLink>,
    assignments: Vec<TeacherAssignment>,
    class_caches: BTreeMap<Uuid, ClassScheduleCacheRow>,
    teacher_caches: BTreeMap<(Uuid, i32), TeacherScheduleCacheRow>,
    commits: u64,
}

impl MemoryState {
    /// Strictly increasing creation timestamps, so creation order is
    /// observable the same way `clock_timestamp()` makes it in PostgreSQL.
    fn stamp(&mut self) -> DateTime<Utc> {
        self.ticks += 1;
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or_default()
            + Duration::milliseconds(self.ticks)
    }

    fn course_code(&self, course_id: Uuid) -> &str {
        self.courses
            .iter()
            .find(|c| c.id == course_id)
            .map(|c| c.code.as_str())
            .unwrap_or_default()
    }

    fn siblings(&self, key: &ClassGroupKey) -> Vec<ClassGroup> {
        let mut siblings: Vec<ClassGroup> = self
            .class_groups
            .iter()
            .filter(|cg| cg.key() == *key)
            .cloned()
            .collect();
        siblings.sort_by(|a, b| {
            self.course_code(a.course_id)
                .cmp(self.course_code(b.course_id))
                .then(a.id.cmp(&b.id))
        });
        siblings
    }

    fn class_group_year(&self, class_group_id: Uuid) -> Option<i32> {
        self.class_groups
            .iter()
            .find(|cg| cg.id == class_group_id)
            .map(|cg| cg.school_year)
    }

    fn link_year(&self, link_id: Uuid) -> Option<i32> {
        self.subject_links
            .iter()
            .find(|l| l.id == link_id)
            .and_then(|l| self.class_group_year(l.class_group_id))
    }

    fn period_year(&self, period_id: Uuid) -> Option<i32> {
        self.validity_periods
            .iter()
            .find(|p| p.id == period_id)
            .map(|p| p.school_year)
    }

    fn slot_taken(&self, new: &NewTimeSlot, except: Option<Uuid>) -> bool {
        self.time_slots.iter().any(|s| {
            Some(s.id) != except
                && s.school_year == new.school_year
                && s.weekday == new.weekday
                && s.start_time == new.start_time
        })
    }

    fn entry_taken(&self, new: &NewScheduleEntry, except: Option<Uuid>) -> bool {
        self.schedule_entries.iter().any(|e| {
            Some(e.id) != except
                && e.validity_period_id == new.validity_period_id
                && e.time_slot_id == new.time_slot_id
        })
    }

    fn remove_links_where(&mut self, pred: impl Fn(&SubjectClassLink) -> bool) {
        let removed: Vec<Uuid> = self
            .subject_links
            .iter()
            .filter(|l| pred(l))
            .map(|l| l.id)
            .collect();
        self.subject_links.retain(|l| !removed.contains(&l.id));
        self.assignments
            .retain(|a| !removed.contains(&a.subject_class_link_id));
    }
}

/// Shared in-memory database. Cloning yields another handle on the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryDb {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // -- seeding ------------------------------------------------------------

    pub fn add_course(&self, code: &str, name: &str) -> Course {
        let mut state = self.lock();
        let course = Course {
            id: Uuid::new_v4(),
            code: code.to_owned(),
            name: name.to_owned(),
            created_at: state.stamp(),
        };
        state.courses.push(course.clone());
        course
    }

    pub fn add_class_group(&self, key: &ClassGroupKey, course_id: Uuid) -> ClassGroup {
        let mut state = self.lock();
        let class_group = ClassGroup {
            id: Uuid::new_v4(),
            school_year: key.school_year,
            number: key.number,
            letter: key.letter.clone(),
            course_id,
            created_at: state.stamp(),
        };
        state.class_groups.push(class_group.clone());
        class_group
    }

    pub fn add_subject(&self, code: &str, name: &str) -> Subject {
        let mut state = self.lock();
        let subject = Subject {
            id: Uuid::new_v4(),
            code: code.to_owned(),
            name: name.to_owned(),
            created_at: state.stamp(),
        };
        state.subjects.push(subject.clone());
        subject
    }

    pub fn add_teacher(&self, name: &str) -> Teacher {
        let mut state = self.lock();
        let teacher = Teacher {
            id: Uuid::new_v4(),
            name: name.to_owned(),
            created_at: state.stamp(),
        };
        state.teachers.push(teacher.clone());
        teacher
    }

    /// Delete a class group outside the engine, cascading like the schema
    /// does (links, their assignments, the class cache).
    pub fn remove_class_group(&self, id: Uuid) {
        let mut state = self.lock();
        state.class_groups.retain(|cg| cg.id != id);
        state.remove_links_where(|l| l.class_group_id == id);
        state.class_caches.remove(&id);
    }

    /// Delete a teacher outside the engine, cascading assignments and caches.
    pub fn remove_teacher(&self, id: Uuid) {
        let mut state = self.lock();
        state.teachers.retain(|t| t.id != id);
        state.assignments.retain(|a| a.teacher_id != id);
        state.teacher_caches.retain(|(teacher_id, _), _| *teacher_id != id);
    }

    // -- inspection ---------------------------------------------------------

    pub fn class_cache(&self, class_group_id: Uuid) -> Option<ClassScheduleCacheRow> {
        self.lock().class_caches.get(&class_group_id).cloned()
    }

    pub fn teacher_cache(&self, teacher_id: Uuid, school_year: i32) -> Option<TeacherScheduleCacheRow> {
        self.lock()
            .teacher_caches
            .get(&(teacher_id, school_year))
            .cloned()
    }

    pub fn time_slots(&self, school_year: i32) -> Vec<TimeSlot> {
        self.lock()
            .time_slots
            .iter()
            .filter(|s| s.school_year == school_year)
            .cloned()
            .collect()
    }

    pub fn schedule_entries(&self) -> Vec<ScheduleEntry> {
        self.lock().schedule_entries.clone()
    }

    pub fn assignments(&self) -> Vec<TeacherAssignment> {
        self.lock().assignments.clone()
    }

    /// Number of committed units of work.
    pub fn commits(&self) -> u64 {
        self.lock().commits
    }
}

#[async_trait]
impl Database for MemoryDb {
    type Store = MemoryStore;

    async fn begin(&self) -> Result<MemoryStore> {
        let working = self.lock().clone();
        Ok(MemoryStore {
            shared: Arc::clone(&self.state),
            working,
        })
    }
}

/// One unit of work over a [`MemoryDb`].
pub struct MemoryStore {
    shared: Arc<Mutex<MemoryState>>,
    working: MemoryState,
}

#[async_trait]
impl ScheduleStore for MemoryStore {
    async fn get_class_group(&mut self, id: Uuid) -> Result<Option<ClassGroup>> {
        Ok(self.working.class_groups.iter().find(|cg| cg.id == id).cloned())
    }

    async fn list_siblings(&mut self, key: &ClassGroupKey) -> Result<Vec<ClassGroup>> {
        Ok(self.working.siblings(key))
    }

    async fn get_teacher(&mut self, id: Uuid) -> Result<Option<Teacher>> {
        Ok(self.working.teachers.iter().find(|t| t.id == id).cloned())
    }

    async fn get_time_slot(&mut self, id: Uuid) -> Result<Option<TimeSlot>> {
        Ok(self.working.time_slots.iter().find(|s| s.id == id).cloned())
    }

    async fn find_time_slot(
        &mut self,
        school_year: i32,
        weekday: Weekday,
        start_time: NaiveTime,
    ) -> Result<Option<TimeSlot>> {
        Ok(self
            .working
            .time_slots
            .iter()
            .find(|s| {
                s.school_year == school_year && s.weekday == weekday && s.start_time == start_time
            })
            .cloned())
    }

    async fn list_time_slots_for_day(
        &mut self,
        school_year: i32,
        weekday: Weekday,
    ) -> Result<Vec<TimeSlot>> {
        let mut slots: Vec<TimeSlot> = self
            .working
            .time_slots
            .iter()
            .filter(|s| s.school_year == school_year && s.weekday == weekday)
            .cloned()
            .collect();
        slots.sort_by(|a, b| a.start_time.cmp(&b.start_time).then(a.id.cmp(&b.id)));
        Ok(slots)
    }

    async fn list_time_slots_for_year(&mut self, school_year: i32) -> Result<Vec<TimeSlot>> {
        let mut slots: Vec<TimeSlot> = self
            .working
            .time_slots
            .iter()
            .filter(|s| s.school_year == school_year)
            .cloned()
            .collect();
        slots.sort_by(|a, b| {
            (a.weekday, a.start_time, a.id).cmp(&(b.weekday, b.start_time, b.id))
        });
        Ok(slots)
    }

    async fn insert_time_slot(&mut self, new: &NewTimeSlot) -> Result<TimeSlot> {
        if new.start_time >= new.end_time {
            bail!("check constraint violated: start_time < end_time");
        }
        if self.working.slot_taken(new, None) {
            bail!("unique constraint violated: time_slots (school_year, weekday, start_time)");
        }
        let slot = TimeSlot {
            id: Uuid::new_v4(),
            school_year: new.school_year,
            weekday: new.weekday,
            sequence_number: 0,
            start_time: new.start_time,
            end_time: new.end_time,
            created_at: self.working.stamp(),
        };
        self.working.time_slots.push(slot.clone());
        Ok(slot)
    }

    async fn update_time_slot(&mut self, id: Uuid, new: &NewTimeSlot) -> Result<Option<TimeSlot>> {
        if self.working.slot_taken(new, Some(id)) {
            bail!("unique constraint violated: time_slots (school_year, weekday, start_time)");
        }
        let Some(slot) = self.working.time_slots.iter_mut().find(|s| s.id == id) else {
            return Ok(None);
        };
        slot.school_year = new.school_year;
        slot.weekday = new.weekday;
        slot.start_time = new.start_time;
        slot.end_time = new.end_time;
        Ok(Some(slot.clone()))
    }

    async fn delete_time_slot(&mut self, id: Uuid) -> Result<bool> {
        let before = self.working.time_slots.len();
        self.working.time_slots.retain(|s| s.id != id);
        self.working.schedule_entries.retain(|e| e.time_slot_id != id);
        Ok(self.working.time_slots.len() != before)
    }

    async fn set_sequence_number(&mut self, id: Uuid, sequence_number: i32) -> Result<()> {
        if let Some(slot) = self.working.time_slots.iter_mut().find(|s| s.id == id) {
            slot.sequence_number = sequence_number;
        }
        Ok(())
    }

    async fn get_validity_period(&mut self, id: Uuid) -> Result<Option<ValidityPeriod>> {
        Ok(self.working.validity_periods.iter().find(|p| p.id == id).cloned())
    }

    async fn list_validity_periods(&mut self, key: &ClassGroupKey) -> Result<Vec<ValidityPeriod>> {
        let mut periods: Vec<ValidityPeriod> = self
            .working
            .validity_periods
            .iter()
            .filter(|p| p.key() == *key)
            .cloned()
            .collect();
        periods.sort_by(|a, b| a.date_start.cmp(&b.date_start).then(a.id.cmp(&b.id)));
        Ok(periods)
    }

    async fn insert_validity_period(&mut self, new: &NewValidityPeriod) -> Result<ValidityPeriod> {
        if new.date_start > new.date_end {
            bail!("check constraint violated: date_start <= date_end");
        }
        let period = ValidityPeriod {
            id: Uuid::new_v4(),
            school_year: new.key.school_year,
            number: new.key.number,
            letter: new.key.letter.clone(),
            date_start: new.date_start,
            date_end: new.date_end,
            created_at: self.working.stamp(),
        };
        self.working.validity_periods.push(period.clone());
        Ok(period)
    }

    async fn update_validity_period(
        &mut self,
        id: Uuid,
        new: &NewValidityPeriod,
    ) -> Result<Option<ValidityPeriod>> {
        let Some(period) = self.working.validity_periods.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        period.school_year = new.key.school_year;
        period.number = new.key.number;
        period.letter = new.key.letter.clone();
        period.date_start = new.date_start;
        period.date_end = new.date_end;
        Ok(Some(period.clone()))
    }

    async fn delete_validity_period(&mut self, id: Uuid) -> Result<bool> {
        let before = self.working.validity_periods.len();
        self.working.validity_periods.retain(|p| p.id != id);
        self.working
            .schedule_entries
            .retain(|e| e.validity_period_id != id);
        Ok(self.working.validity_periods.len() != before)
    }

    async fn get_schedule_entry(&mut self, id: Uuid) -> Result<Option<ScheduleEntry>> {
        Ok(self.working.schedule_entries.iter().find(|e| e.id == id).cloned())
    }

    async fn find_schedule_entry(
        &mut self,
        validity_period_id: Uuid,
        time_slot_id: Uuid,
    ) -> Result<Option<ScheduleEntry>> {
        Ok(self
            .working
            .schedule_entries
            .iter()
            .find(|e| e.validity_period_id == validity_period_id && e.time_slot_id == time_slot_id)
            .cloned())
    }

    async fn list_entries_for_key_subject(
        &mut self,
        key: &ClassGroupKey,
        subject_id: Uuid,
    ) -> Result<Vec<ScheduleEntry>> {
        let period_ids: Vec<Uuid> = self
            .working
            .validity_periods
            .iter()
            .filter(|p| p.key() == *key)
            .map(|p| p.id)
            .collect();
        Ok(self
            .working
            .schedule_entries
            .iter()
            .filter(|e| e.subject_id == subject_id && period_ids.contains(&e.validity_period_id))
            .cloned()
            .collect())
    }

    async fn list_entries_for_slot(&mut self, time_slot_id: Uuid) -> Result<Vec<ScheduleEntry>> {
        Ok(self
            .working
            .schedule_entries
            .iter()
            .filter(|e| e.time_slot_id == time_slot_id)
            .cloned()
            .collect())
    }

    async fn list_entries_for_period(
        &mut self,
        validity_period_id: Uuid,
    ) -> Result<Vec<ScheduleEntry>> {
        Ok(self
            .working
            .schedule_entries
            .iter()
            .filter(|e| e.validity_period_id == validity_period_id)
            .cloned()
            .collect())
    }

    async fn insert_schedule_entry(&mut self, new: &NewScheduleEntry) -> Result<ScheduleEntry> {
        if self.working.entry_taken(new, None) {
            bail!("unique constraint violated: schedule_entries (validity_period_id, time_slot_id)");
        }
        let entry = ScheduleEntry {
            id: Uuid::new_v4(),
            validity_period_id: new.validity_period_id,
            time_slot_id: new.time_slot_id,
            subject_id: new.subject_id,
            course_id: new.course_id,
            created_at: self.working.stamp(),
        };
        self.working.schedule_entries.push(entry.clone());
        Ok(entry)
    }

    async fn update_schedule_entry(
        &mut self,
        id: Uuid,
        new: &NewScheduleEntry,
    ) -> Result<Option<ScheduleEntry>> {
        if self.working.entry_taken(new, Some(id)) {
            bail!("unique constraint violated: schedule_entries (validity_period_id, time_slot_id)");
        }
        let Some(entry) = self.working.schedule_entries.iter_mut().find(|e| e.id == id) else {
            return Ok(None);
        };
        entry.validity_period_id = new.validity_period_id;
        entry.time_slot_id = new.time_slot_id;
        entry.subject_id = new.subject_id;
        entry.course_id = new.course_id;
        Ok(Some(entry.clone()))
    }

    async fn delete_schedule_entry(&mut self, id: Uuid) -> Result<bool> {
        let before = self.working.schedule_entries.len();
        self.working.schedule_entries.retain(|e| e.id != id);
        Ok(self.working.schedule_entries.len() != before)
    }

    async fn get_subject_link(&mut self, id: Uuid) -> Result<Option<SubjectClassLink>> {
        Ok(self.working.subject_links.iter().find(|l| l.id == id).cloned())
    }

    async fn find_subject_link(
        &mut self,
        subject_id: Uuid,
        class_group_id: Uuid,
    ) -> Result<Option<SubjectClassLink>> {
        Ok(self
            .working
            .subject_links
            .iter()
            .find(|l| l.subject_id == subject_id && l.class_group_id == class_group_id)
            .cloned())
    }

    async fn list_links_for_class_groups(
        &mut self,
        class_group_ids: &[Uuid],
    ) -> Result<Vec<SubjectClassLink>> {
        Ok(self
            .working
            .subject_links
            .iter()
            .filter(|l| class_group_ids.contains(&l.class_group_id))
            .cloned()
            .collect())
    }

    async fn insert_subject_link(&mut self, new: &NewSubjectClassLink) -> Result<SubjectClassLink> {
        let duplicate = self
            .working
            .subject_links
            .iter()
            .any(|l| l.subject_id == new.subject_id && l.class_group_id == new.class_group_id);
        if duplicate {
            bail!("unique constraint violated: subject_class_links (subject_id, class_group_id)");
        }
        let link = SubjectClassLink {
            id: Uuid::new_v4(),
            subject_id: new.subject_id,
            class_group_id: new.class_group_id,
            weekly_lessons: new.weekly_lessons,
            created_at: self.working.stamp(),
        };
        self.working.subject_links.push(link.clone());
        Ok(link)
    }

    async fn update_weekly_lessons(
        &mut self,
        id: Uuid,
        weekly_lessons: i32,
    ) -> Result<Option<SubjectClassLink>> {
        let Some(link) = self.working.subject_links.iter_mut().find(|l| l.id == id) else {
            return Ok(None);
        };
        link.weekly_lessons = weekly_lessons;
        Ok(Some(link.clone()))
    }

    async fn delete_subject_link(&mut self, id: Uuid) -> Result<bool> {
        let before = self.working.subject_links.len();
        self.working.remove_links_where(|l| l.id == id);
        Ok(self.working.subject_links.len() != before)
    }

    async fn get_assignment(&mut self, id: Uuid) -> Result<Option<TeacherAssignment>> {
        Ok(self.working.assignments.iter().find(|a| a.id == id).cloned())
    }

    async fn list_assignments_for_links(
        &mut self,
        link_ids: &[Uuid],
    ) -> Result<Vec<TeacherAssignment>> {
        Ok(self
            .working
            .assignments
            .iter()
            .filter(|a| link_ids.contains(&a.subject_class_link_id))
            .cloned()
            .collect())
    }

    async fn insert_assignment(&mut self, new: &NewTeacherAssignment) -> Result<TeacherAssignment> {
        let assignment = TeacherAssignment {
            id: Uuid::new_v4(),
            teacher_id: new.teacher_id,
            subject_class_link_id: new.subject_class_link_id,
            priority: new.priority,
            active_from: new.active_from,
            active_to: new.active_to,
            created_at: self.working.stamp(),
        };
        self.working.assignments.push(assignment.clone());
        Ok(assignment)
    }

    async fn update_assignment(
        &mut self,
        id: Uuid,
        new: &NewTeacherAssignment,
    ) -> Result<Option<TeacherAssignment>> {
        let Some(assignment) = self.working.assignments.iter_mut().find(|a| a.id == id) else {
            return Ok(None);
        };
        assignment.teacher_id = new.teacher_id;
        assignment.subject_class_link_id = new.subject_class_link_id;
        assignment.priority = new.priority;
        assignment.active_from = new.active_from;
        assignment.active_to = new.active_to;
        Ok(Some(assignment.clone()))
    }

    async fn delete_assignment(&mut self, id: Uuid) -> Result<bool> {
        let before = self.working.assignments.len();
        self.working.assignments.retain(|a| a.id != id);
        Ok(self.working.assignments.len() != before)
    }

    async fn load_year(&mut self, school_year: i32) -> Result<YearData> {
        let state = &self.working;
        let class_groups: Vec<ClassGroup> = state
            .class_groups
            .iter()
            .filter(|cg| cg.school_year == school_year)
            .cloned()
            .collect();
        let subject_links: Vec<SubjectClassLink> = state
            .subject_links
            .iter()
            .filter(|l| state.class_group_year(l.class_group_id) == Some(school_year))
            .cloned()
            .collect();
        let schedule_entries: Vec<ScheduleEntry> = state
            .schedule_entries
            .iter()
            .filter(|e| state.period_year(e.validity_period_id) == Some(school_year))
            .cloned()
            .collect();
        let assignments: Vec<TeacherAssignment> = state
            .assignments
            .iter()
            .filter(|a| state.link_year(a.subject_class_link_id) == Some(school_year))
            .cloned()
            .collect();

        Ok(YearData {
            school_year,
            time_slots: state
                .time_slots
                .iter()
                .filter(|s| s.school_year == school_year)
                .cloned()
                .collect(),
            courses: state
                .courses
                .iter()
                .filter(|c| class_groups.iter().any(|cg| cg.course_id == c.id))
                .cloned()
                .collect(),
            subjects: state
                .subjects
                .iter()
                .filter(|s| {
                    subject_links.iter().any(|l| l.subject_id == s.id)
                        || schedule_entries.iter().any(|e| e.subject_id == s.id)
                })
                .cloned()
                .collect(),
            teachers: state
                .teachers
                .iter()
                .filter(|t| assignments.iter().any(|a| a.teacher_id == t.id))
                .cloned()
                .collect(),
            validity_periods: state
                .validity_periods
                .iter()
                .filter(|p| p.school_year == school_year)
                .cloned()
                .collect(),
            class_groups,
            schedule_entries,
            subject_links,
            assignments,
        })
    }

    async fn get_class_cache(
        &mut self,
        class_group_id: Uuid,
    ) -> Result<Option<ClassScheduleCacheRow>> {
        Ok(self.working.class_caches.get(&class_group_id).cloned())
    }

    async fn get_teacher_cache(
        &mut self,
        teacher_id: Uuid,
        school_year: i32,
    ) -> Result<Option<TeacherScheduleCacheRow>> {
        Ok(self
            .working
            .teacher_caches
            .get(&(teacher_id, school_year))
            .cloned())
    }

    async fn put_class_caches(&mut self, rows: &[ClassCacheWrite]) -> Result<u64> {
        let mut written = 0;
        for row in rows {
            if self.working.class_group_year(row.class_group_id).is_none() {
                continue;
            }
            let generation = self
                .working
                .class_caches
                .get(&row.class_group_id)
                .map_or(1, |existing| existing.generation + 1);
            self.working.class_caches.insert(
                row.class_group_id,
                ClassScheduleCacheRow {
                    class_group_id: row.class_group_id,
                    school_year: row.school_year,
                    schedule: row.schedule.clone(),
                    valid_on: row.valid_on,
                    generation,
                    generated_at: row.generated_at,
                },
            );
            written += 1;
        }
        Ok(written)
    }

    async fn put_teacher_caches(&mut self, rows: &[TeacherCacheWrite]) -> Result<u64> {
        let mut written = 0;
        for row in rows {
            if !self.working.teachers.iter().any(|t| t.id == row.teacher_id) {
                continue;
            }
            let key = (row.teacher_id, row.school_year);
            let generation = self
                .working
                .teacher_caches
                .get(&key)
                .map_or(1, |existing| existing.generation + 1);
            self.working.teacher_caches.insert(
                key,
                TeacherScheduleCacheRow {
                    teacher_id: row.teacher_id,
                    school_year: row.school_year,
                    schedule: row.schedule.clone(),
                    valid_on: row.valid_on,
                    generation,
                    generated_at: row.generated_at,
                },
            );
            written += 1;
        }
        Ok(written)
    }

    async fn commit(self) -> Result<()> {
        let mut shared = self
            .shared
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let commits = shared.commits + 1;
        *shared = self.working;
        shared.commits = commits;
        Ok(())
    }
}
