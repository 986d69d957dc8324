//! Entry point for every timetable mutation and read.

use anyhow::Context;
use chrono::NaiveDate;
use tracing::{debug, warn};
use uuid::Uuid;

use timetable_db::models::{ScheduleEntry, TimeSlot};
use timetable_db::store::{Database, ScheduleStore};

use crate::clock::{CalendarYearResolver, Clock, SchoolYearResolver, SystemClock};
use crate::error::{ScheduleError, ScheduleResult};
use crate::invalidation::{Invalidation, RebuildSummary, rebuild_many};
use crate::matrix::{ClassSchedule, TeacherSchedule};

/// Outcome of a committed mutation.
#[derive(Debug, Clone)]
pub struct Applied<T> {
    /// The row as written (or as it was, for deletes).
    pub record: T,
    /// Caches rebuilt in the same unit of work.
    pub rebuilt: RebuildSummary,
    /// Entries whose recorded course no longer matches a sibling linking
    /// their subject. Only link removals report these.
    pub stale_entries: Vec<ScheduleEntry>,
}

/// Timetable service over a [`Database`].
///
/// Each mutation opens one unit of work, validates, writes, rebuilds the
/// affected caches and commits. A validation failure returns before
/// anything is committed.
pub struct Timetable<D, C = SystemClock, R = CalendarYearResolver> {
    db: D,
    clock: C,
    years: R,
}

impl<D: Database> Timetable<D> {
    pub fn new(db: D) -> Self {
        Self {
            db,
            clock: SystemClock,
            years: CalendarYearResolver,
        }
    }
}

impl<D, C, R> Timetable<D, C, R>
where
    D: Database,
    C: Clock,
    R: SchoolYearResolver,
{
    pub fn with_clock<C2: Clock>(self, clock: C2) -> Timetable<D, C2, R> {
        Timetable {
            db: self.db,
            clock,
            years: self.years,
        }
    }

    pub fn with_year_resolver<R2: SchoolYearResolver>(self, years: R2) -> Timetable<D, C, R2> {
        Timetable {
            db: self.db,
            clock: self.clock,
            years,
        }
    }

    pub fn db(&self) -> &D {
        &self.db
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub(crate) async fn begin(&self) -> ScheduleResult<D::Store> {
        Ok(self.db.begin().await?)
    }

    /// Rebuild what `invalidation` names, then commit.
    pub(crate) async fn finish<T>(
        &self,
        mut store: D::Store,
        record: T,
        invalidation: Invalidation,
    ) -> ScheduleResult<Applied<T>> {
        let rebuilt = rebuild_many(
            &mut store,
            &invalidation,
            self.clock.today(),
            self.clock.now(),
        )
        .await?;
        store.commit().await?;
        Ok(Applied {
            record,
            rebuilt,
            stale_entries: Vec::new(),
        })
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Weekly matrix of a class group as of `today`.
    ///
    /// Served from the cache when it was computed for `today`; recomputed
    /// and stored otherwise. `None` when no validity period covers `today`
    /// or the class group does not exist.
    pub async fn get_class_group_schedule(
        &self,
        class_group_id: Uuid,
        today: NaiveDate,
    ) -> ScheduleResult<Option<ClassSchedule>> {
        let mut store = self.begin().await?;
        let Some(class_group) = store.get_class_group(class_group_id).await? else {
            debug!(%class_group_id, "class group not found");
            return Ok(None);
        };

        if let Some(row) = store.get_class_cache(class_group_id).await? {
            if row.valid_on == today {
                match row.schedule.map(serde_json::from_value::<ClassSchedule>).transpose() {
                    Ok(schedule) => return Ok(schedule),
                    Err(err) => warn!(%class_group_id, error = %err, "unreadable class cache, recomputing"),
                }
            }
        }

        let mut invalidation = Invalidation::new();
        invalidation.class_group(class_group.school_year, class_group_id);
        rebuild_many(&mut store, &invalidation, today, self.clock.now()).await?;

        let schedule = store
            .get_class_cache(class_group_id)
            .await?
            .and_then(|row| row.schedule)
            .map(serde_json::from_value::<ClassSchedule>)
            .transpose()
            .context("failed to decode class schedule")?;
        store.commit().await?;
        Ok(schedule)
    }

    /// Weekly matrix of a teacher as of `today`, for the school year the
    /// resolver picks.
    pub async fn get_teacher_schedule(
        &self,
        teacher_id: Uuid,
        today: NaiveDate,
    ) -> ScheduleResult<TeacherSchedule> {
        let school_year = self.years.school_year_for_teacher(teacher_id, today);
        let mut store = self.begin().await?;
        if store.get_teacher(teacher_id).await?.is_none() {
            return Err(ScheduleError::not_found("teacher", teacher_id));
        }

        if let Some(row) = store.get_teacher_cache(teacher_id, school_year).await? {
            if row.valid_on == today {
                match serde_json::from_value::<TeacherSchedule>(row.schedule) {
                    Ok(schedule) => return Ok(schedule),
                    Err(err) => warn!(%teacher_id, error = %err, "unreadable teacher cache, recomputing"),
                }
            }
        }

        let mut invalidation = Invalidation::new();
        invalidation.teacher(school_year, teacher_id);
        rebuild_many(&mut store, &invalidation, today, self.clock.now()).await?;

        let schedule = match store.get_teacher_cache(teacher_id, school_year).await? {
            Some(row) => serde_json::from_value::<TeacherSchedule>(row.schedule)
                .context("failed to decode teacher schedule")?,
            None => TeacherSchedule::empty(teacher_id, school_year),
        };
        store.commit().await?;
        Ok(schedule)
    }

    // -----------------------------------------------------------------------
    // Maintenance
    // -----------------------------------------------------------------------

    /// Rebuild every class group and assigned teacher of `school_year` for
    /// the clock's today.
    pub async fn rebuild_school_year(&self, school_year: i32) -> ScheduleResult<RebuildSummary> {
        let store = self.begin().await?;
        let mut invalidation = Invalidation::new();
        invalidation.full_year(school_year);
        let applied = self.finish(store, (), invalidation).await?;
        Ok(applied.rebuilt)
    }

    /// Every slot of `school_year`, Monday first, by start time.
    pub async fn list_time_slots(&self, school_year: i32) -> ScheduleResult<Vec<TimeSlot>> {
        let mut store = self.begin().await?;
        Ok(store.list_time_slots_for_year(school_year).await?)
    }
}
