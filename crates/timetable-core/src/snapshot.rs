//! In-memory index over one school year of scheduling facts.
//!
//! Built once per rebuild batch from [`YearData`]; every builder in the batch
//! reads from it instead of going back to the store.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use uuid::Uuid;

use timetable_db::models::{
    ClassGroup, ClassGroupKey, Course, ScheduleEntry, Subject, SubjectClassLink, Teacher,
    TeacherAssignment, TimeSlot, ValidityPeriod, YearData,
};

/// Key to member class groups, members ordered by course code then id.
#[derive(Debug, Clone, Default)]
pub struct ClassGroupIndex {
    members: BTreeMap<ClassGroupKey, Vec<Uuid>>,
}

impl ClassGroupIndex {
    pub fn build(class_groups: &[ClassGroup], courses: &HashMap<Uuid, Course>) -> Self {
        let mut members: BTreeMap<ClassGroupKey, Vec<&ClassGroup>> = BTreeMap::new();
        for cg in class_groups {
            members.entry(cg.key()).or_default().push(cg);
        }

        let course_code = |cg: &ClassGroup| {
            courses
                .get(&cg.course_id)
                .map(|c| c.code.clone())
                .unwrap_or_default()
        };

        let members = members
            .into_iter()
            .map(|(key, mut groups)| {
                groups.sort_by(|a, b| course_code(a).cmp(&course_code(b)).then(a.id.cmp(&b.id)));
                (key, groups.into_iter().map(|cg| cg.id).collect())
            })
            .collect();

        Self { members }
    }

    /// Members sharing `key`, or an empty slice for an unknown key.
    pub fn siblings(&self, key: &ClassGroupKey) -> &[Uuid] {
        self.members.get(key).map(Vec::as_slice).unwrap_or_default()
    }
}

/// One school year of facts with lookup tables.
#[derive(Debug, Clone)]
pub struct YearSnapshot {
    pub school_year: i32,
    pub class_groups: HashMap<Uuid, ClassGroup>,
    pub courses: HashMap<Uuid, Course>,
    pub subjects: HashMap<Uuid, Subject>,
    pub teachers: HashMap<Uuid, Teacher>,
    pub time_slots: HashMap<Uuid, TimeSlot>,
    pub index: ClassGroupIndex,
    periods_by_key: HashMap<ClassGroupKey, Vec<ValidityPeriod>>,
    entries_by_period: HashMap<Uuid, Vec<ScheduleEntry>>,
    links: Vec<SubjectClassLink>,
    assignments: Vec<TeacherAssignment>,
}

impl YearSnapshot {
    pub fn new(data: YearData) -> Self {
        let courses: HashMap<Uuid, Course> =
            data.courses.into_iter().map(|c| (c.id, c)).collect();
        let index = ClassGroupIndex::build(&data.class_groups, &courses);

        let mut periods_by_key: HashMap<ClassGroupKey, Vec<ValidityPeriod>> = HashMap::new();
        for period in data.validity_periods {
            periods_by_key.entry(period.key()).or_default().push(period);
        }
        for periods in periods_by_key.values_mut() {
            periods.sort_by(|a, b| a.date_start.cmp(&b.date_start).then(a.id.cmp(&b.id)));
        }

        let mut entries_by_period: HashMap<Uuid, Vec<ScheduleEntry>> = HashMap::new();
        for entry in data.schedule_entries {
            entries_by_period
                .entry(entry.validity_period_id)
                .or_default()
                .push(entry);
        }

        Self {
            school_year: data.school_year,
            class_groups: data.class_groups.into_iter().map(|cg| (cg.id, cg)).collect(),
            courses,
            subjects: data.subjects.into_iter().map(|s| (s.id, s)).collect(),
            teachers: data.teachers.into_iter().map(|t| (t.id, t)).collect(),
            time_slots: data.time_slots.into_iter().map(|s| (s.id, s)).collect(),
            index,
            periods_by_key,
            entries_by_period,
            links: data.subject_links,
            assignments: data.assignments,
        }
    }

    /// The period of `key` that covers `day`. Periods never overlap, so at
    /// most one matches; the earliest start wins if stored data says otherwise.
    pub fn period_covering(&self, key: &ClassGroupKey, day: NaiveDate) -> Option<&ValidityPeriod> {
        self.periods_by_key
            .get(key)
            .and_then(|periods| periods.iter().find(|p| p.covers(day)))
    }

    pub fn entries_of(&self, period_id: Uuid) -> &[ScheduleEntry] {
        self.entries_by_period
            .get(&period_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn link_for(&self, subject_id: Uuid, class_group_id: Uuid) -> Option<&SubjectClassLink> {
        self.links
            .iter()
            .find(|l| l.subject_id == subject_id && l.class_group_id == class_group_id)
    }

    pub fn link(&self, link_id: Uuid) -> Option<&SubjectClassLink> {
        self.links.iter().find(|l| l.id == link_id)
    }

    pub fn assignments_on_link(&self, link_id: Uuid) -> impl Iterator<Item = &TeacherAssignment> {
        self.assignments
            .iter()
            .filter(move |a| a.subject_class_link_id == link_id)
    }

    pub fn assignments_of_teacher(&self, teacher_id: Uuid) -> impl Iterator<Item = &TeacherAssignment> {
        self.assignments
            .iter()
            .filter(move |a| a.teacher_id == teacher_id)
    }

    /// Every teacher with at least one assignment this year, sorted.
    pub fn teacher_ids(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = self.assignments.iter().map(|a| a.teacher_id).collect();
        ids.sort();
        ids.dedup();
        ids
    }

    pub fn class_group_ids(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = self.class_groups.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Every slot of the year, Monday first, then by start time.
    pub fn slots_in_week_order(&self) -> Vec<&TimeSlot> {
        let mut slots: Vec<&TimeSlot> = self.time_slots.values().collect();
        slots.sort_by_key(|s| (s.weekday, s.start_time, s.id));
        slots
    }

    pub fn course_code(&self, course_id: Uuid) -> &str {
        self.courses
            .get(&course_id)
            .map(|c| c.code.as_str())
            .unwrap_or_default()
    }
}
