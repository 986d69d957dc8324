//! Which caches a mutation makes stale, and the batched rebuild of them.
//!
//! Every mutation collects an [`Invalidation`] while it validates and
//! writes, then hands it to [`rebuild_many`] on the same store before
//! committing. Rebuilds load each affected school year once, compute every
//! matrix in memory, and write the results in one batch per cache table.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use timetable_db::models::{ClassCacheWrite, ClassGroupKey, TeacherCacheWrite};
use timetable_db::store::ScheduleStore;

use crate::class_cache::build_class_schedule;
use crate::snapshot::YearSnapshot;
use crate::teacher_cache::build_teacher_schedule;

/// Set of caches to rebuild, grouped by school year.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invalidation {
    class_groups: BTreeMap<i32, BTreeSet<Uuid>>,
    teachers: BTreeMap<i32, BTreeSet<Uuid>>,
    full_years: BTreeSet<i32>,
}

impl Invalidation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn class_group(&mut self, school_year: i32, id: Uuid) -> &mut Self {
        self.class_groups.entry(school_year).or_default().insert(id);
        self
    }

    pub fn class_groups(&mut self, school_year: i32, ids: impl IntoIterator<Item = Uuid>) -> &mut Self {
        self.class_groups.entry(school_year).or_default().extend(ids);
        self
    }

    pub fn teacher(&mut self, school_year: i32, id: Uuid) -> &mut Self {
        self.teachers.entry(school_year).or_default().insert(id);
        self
    }

    pub fn teachers(&mut self, school_year: i32, ids: impl IntoIterator<Item = Uuid>) -> &mut Self {
        self.teachers.entry(school_year).or_default().extend(ids);
        self
    }

    /// Every class group and every assigned teacher of `school_year`.
    pub fn full_year(&mut self, school_year: i32) -> &mut Self {
        self.full_years.insert(school_year);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.full_years.is_empty()
            && self.class_groups.values().all(BTreeSet::is_empty)
            && self.teachers.values().all(BTreeSet::is_empty)
    }

    /// School years touched, ascending.
    pub fn school_years(&self) -> BTreeSet<i32> {
        self.class_groups
            .keys()
            .chain(self.teachers.keys())
            .chain(self.full_years.iter())
            .copied()
            .collect()
    }

    pub fn is_full_year(&self, school_year: i32) -> bool {
        self.full_years.contains(&school_year)
    }

    fn class_groups_of(&self, school_year: i32) -> impl Iterator<Item = Uuid> + '_ {
        self.class_groups
            .get(&school_year)
            .into_iter()
            .flat_map(|ids| ids.iter().copied())
    }

    fn teachers_of(&self, school_year: i32) -> impl Iterator<Item = Uuid> + '_ {
        self.teachers
            .get(&school_year)
            .into_iter()
            .flat_map(|ids| ids.iter().copied())
    }
}

/// Caches written by one [`rebuild_many`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebuildSummary {
    pub school_years: Vec<i32>,
    pub class_groups: Vec<Uuid>,
    pub teachers: Vec<Uuid>,
}

impl RebuildSummary {
    pub fn is_empty(&self) -> bool {
        self.class_groups.is_empty() && self.teachers.is_empty()
    }
}

/// Add every sibling of `key` and every teacher holding an assignment in
/// those siblings. With `subject` set, only assignments on links of that
/// subject count.
pub(crate) async fn invalidate_key<S: ScheduleStore>(
    store: &mut S,
    invalidation: &mut Invalidation,
    key: &ClassGroupKey,
    subject: Option<Uuid>,
) -> Result<()> {
    let sibling_ids: Vec<Uuid> = store
        .list_siblings(key)
        .await?
        .into_iter()
        .map(|cg| cg.id)
        .collect();
    let teachers = teachers_for_class_groups(store, &sibling_ids, subject).await?;

    invalidation
        .class_groups(key.school_year, sibling_ids)
        .teachers(key.school_year, teachers);
    Ok(())
}

/// Teachers holding an assignment on a link of one of `class_group_ids`.
pub(crate) async fn teachers_for_class_groups<S: ScheduleStore>(
    store: &mut S,
    class_group_ids: &[Uuid],
    subject: Option<Uuid>,
) -> Result<Vec<Uuid>> {
    if class_group_ids.is_empty() {
        return Ok(Vec::new());
    }
    let link_ids: Vec<Uuid> = store
        .list_links_for_class_groups(class_group_ids)
        .await?
        .into_iter()
        .filter(|l| subject.is_none_or(|s| s == l.subject_id))
        .map(|l| l.id)
        .collect();
    teachers_on_links(store, &link_ids).await
}

pub(crate) async fn teachers_on_links<S: ScheduleStore>(
    store: &mut S,
    link_ids: &[Uuid],
) -> Result<Vec<Uuid>> {
    if link_ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut teachers: Vec<Uuid> = store
        .list_assignments_for_links(link_ids)
        .await?
        .into_iter()
        .map(|a| a.teacher_id)
        .collect();
    teachers.sort();
    teachers.dedup();
    Ok(teachers)
}

/// Rebuild every cache named by `invalidation` for `today`.
///
/// Class groups or teachers that no longer exist are skipped. The writes
/// happen on `store` and become visible when the caller commits it.
pub async fn rebuild_many<S: ScheduleStore>(
    store: &mut S,
    invalidation: &Invalidation,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Result<RebuildSummary> {
    let mut summary = RebuildSummary::default();

    for school_year in invalidation.school_years() {
        let data = store
            .load_year(school_year)
            .await
            .with_context(|| format!("failed to load school year {school_year}"))?;
        let snapshot = YearSnapshot::new(data);
        let full = invalidation.is_full_year(school_year);

        let mut class_ids: BTreeSet<Uuid> = invalidation.class_groups_of(school_year).collect();
        let mut teacher_ids: BTreeSet<Uuid> = invalidation.teachers_of(school_year).collect();
        if full {
            class_ids.extend(snapshot.class_group_ids());
            teacher_ids.extend(snapshot.teacher_ids());
        }

        let mut class_rows = Vec::with_capacity(class_ids.len());
        for class_group_id in class_ids {
            if !snapshot.class_groups.contains_key(&class_group_id) {
                debug!(%class_group_id, school_year, "class group vanished, skipping rebuild");
                continue;
            }
            let schedule = build_class_schedule(&snapshot, class_group_id, today)
                .map(|s| serde_json::to_value(&s))
                .transpose()
                .context("failed to serialize class schedule")?;
            class_rows.push(ClassCacheWrite {
                class_group_id,
                school_year,
                schedule,
                valid_on: today,
                generated_at: now,
            });
        }

        let mut teacher_rows = Vec::with_capacity(teacher_ids.len());
        for teacher_id in teacher_ids {
            let mut schedule = build_teacher_schedule(&snapshot, teacher_id, today);
            if schedule.teacher_name.is_none() {
                // Teachers without assignments this year are not in the snapshot.
                match store.get_teacher(teacher_id).await? {
                    Some(teacher) => schedule.teacher_name = Some(teacher.name),
                    None => {
                        debug!(%teacher_id, school_year, "teacher vanished, skipping rebuild");
                        continue;
                    }
                }
            }
            let schedule =
                serde_json::to_value(&schedule).context("failed to serialize teacher schedule")?;
            teacher_rows.push(TeacherCacheWrite {
                teacher_id,
                school_year,
                schedule,
                valid_on: today,
                generated_at: now,
            });
        }

        let class_written = store.put_class_caches(&class_rows).await?;
        let teacher_written = store.put_teacher_caches(&teacher_rows).await?;
        info!(
            school_year,
            full,
            class_groups = class_written,
            teachers = teacher_written,
            %today,
            "rebuilt schedule caches"
        );

        summary.school_years.push(school_year);
        summary
            .class_groups
            .extend(class_rows.iter().map(|r| r.class_group_id));
        summary
            .teachers
            .extend(teacher_rows.iter().map(|r| r.teacher_id));
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_years_from_every_bucket() {
        let mut inv = Invalidation::new();
        inv.class_group(2026, Uuid::new_v4())
            .teacher(2025, Uuid::new_v4())
            .full_year(2027);

        assert_eq!(inv.school_years().into_iter().collect::<Vec<_>>(), vec![2025, 2026, 2027]);
        assert!(inv.is_full_year(2027));
        assert!(!inv.is_full_year(2026));
        assert!(!inv.is_empty());
    }

    #[test]
    fn duplicates_collapse() {
        let id = Uuid::new_v4();
        let mut inv = Invalidation::new();
        inv.class_groups(2026, [id, id]).class_group(2026, id);
        assert_eq!(inv.class_groups_of(2026).count(), 1);
        assert!(Invalidation::new().is_empty());
    }
}
