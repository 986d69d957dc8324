//! Schedule entries: a subject booked on a time slot within a validity
//! period, with the course it was booked for.

use uuid::Uuid;

use timetable_db::models::{ClassGroupKey, NewScheduleEntry, ScheduleEntry, TimeSlot, ValidityPeriod};
use timetable_db::store::{Database, ScheduleStore};

use crate::clock::{Clock, SchoolYearResolver};
use crate::error::{ScheduleError, ScheduleResult};
use crate::invalidation::{Invalidation, invalidate_key};
use crate::service::{Applied, Timetable};

/// Requested booking. Without `course_id` the course is taken from the
/// first sibling, by course code, that links the subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleEntryInput {
    pub validity_period_id: Uuid,
    pub time_slot_id: Uuid,
    pub subject_id: Uuid,
    pub course_id: Option<Uuid>,
}

/// Pick the course a booking of `subject_id` is recorded for.
pub(crate) async fn resolve_course<S: ScheduleStore>(
    store: &mut S,
    key: &ClassGroupKey,
    subject_id: Uuid,
    requested: Option<Uuid>,
) -> ScheduleResult<Uuid> {
    let siblings = store.list_siblings(key).await?;
    let sibling_ids: Vec<Uuid> = siblings.iter().map(|cg| cg.id).collect();
    let links = if sibling_ids.is_empty() {
        Vec::new()
    } else {
        store.list_links_for_class_groups(&sibling_ids).await?
    };

    let mut linking = siblings.iter().filter(|cg| {
        links
            .iter()
            .any(|l| l.subject_id == subject_id && l.class_group_id == cg.id)
    });

    let Some(first) = linking.next() else {
        return Err(ScheduleError::SubjectNotLinked {
            subject_id,
            key: key.clone(),
        });
    };

    match requested {
        None => Ok(first.course_id),
        Some(course_id) if first.course_id == course_id || linking.any(|cg| cg.course_id == course_id) => {
            Ok(course_id)
        }
        Some(course_id) => Err(ScheduleError::CourseNotLinked {
            key: key.clone(),
            course_id,
            subject_id,
        }),
    }
}

async fn load_target<S: ScheduleStore>(
    store: &mut S,
    input: &ScheduleEntryInput,
) -> ScheduleResult<(ValidityPeriod, TimeSlot)> {
    let period = store
        .get_validity_period(input.validity_period_id)
        .await?
        .ok_or_else(|| ScheduleError::not_found("validity period", input.validity_period_id))?;
    let slot = store
        .get_time_slot(input.time_slot_id)
        .await?
        .ok_or_else(|| ScheduleError::not_found("time slot", input.time_slot_id))?;

    if slot.school_year != period.school_year {
        return Err(ScheduleError::SchoolYearMismatch {
            slot_year: slot.school_year,
            period_year: period.school_year,
        });
    }
    Ok((period, slot))
}

async fn check_not_booked<S: ScheduleStore>(
    store: &mut S,
    input: &ScheduleEntryInput,
    except: Option<Uuid>,
) -> ScheduleResult<()> {
    match store
        .find_schedule_entry(input.validity_period_id, input.time_slot_id)
        .await?
    {
        Some(existing) if Some(existing.id) != except => Err(ScheduleError::SlotAlreadyBooked {
            validity_period_id: input.validity_period_id,
            time_slot_id: input.time_slot_id,
            existing: existing.id,
        }),
        _ => Ok(()),
    }
}

impl<D, C, R> Timetable<D, C, R>
where
    D: Database,
    C: Clock,
    R: SchoolYearResolver,
{
    pub async fn create_schedule_entry(
        &self,
        input: ScheduleEntryInput,
    ) -> ScheduleResult<Applied<ScheduleEntry>> {
        let mut store = self.begin().await?;
        let (period, _slot) = load_target(&mut store, &input).await?;
        check_not_booked(&mut store, &input, None).await?;
        let key = period.key();
        let course_id = resolve_course(&mut store, &key, input.subject_id, input.course_id).await?;

        let entry = store
            .insert_schedule_entry(&NewScheduleEntry {
                validity_period_id: input.validity_period_id,
                time_slot_id: input.time_slot_id,
                subject_id: input.subject_id,
                course_id,
            })
            .await?;

        let mut invalidation = Invalidation::new();
        invalidate_key(&mut store, &mut invalidation, &key, Some(entry.subject_id)).await?;
        self.finish(store, entry, invalidation).await
    }

    /// Rebook an entry. Siblings and teachers of both the old and the new
    /// booking are rebuilt.
    pub async fn update_schedule_entry(
        &self,
        id: Uuid,
        input: ScheduleEntryInput,
    ) -> ScheduleResult<Applied<ScheduleEntry>> {
        let mut store = self.begin().await?;
        let old = store
            .get_schedule_entry(id)
            .await?
            .ok_or_else(|| ScheduleError::not_found("schedule entry", id))?;
        let old_period = store.get_validity_period(old.validity_period_id).await?;

        let (period, _slot) = load_target(&mut store, &input).await?;
        check_not_booked(&mut store, &input, Some(id)).await?;
        let key = period.key();
        let course_id = resolve_course(&mut store, &key, input.subject_id, input.course_id).await?;

        let entry = store
            .update_schedule_entry(
                id,
                &NewScheduleEntry {
                    validity_period_id: input.validity_period_id,
                    time_slot_id: input.time_slot_id,
                    subject_id: input.subject_id,
                    course_id,
                },
            )
            .await?
            .ok_or_else(|| ScheduleError::not_found("schedule entry", id))?;

        let mut invalidation = Invalidation::new();
        if let Some(old_period) = old_period {
            invalidate_key(&mut store, &mut invalidation, &old_period.key(), Some(old.subject_id))
                .await?;
        }
        invalidate_key(&mut store, &mut invalidation, &key, Some(entry.subject_id)).await?;
        self.finish(store, entry, invalidation).await
    }

    pub async fn delete_schedule_entry(&self, id: Uuid) -> ScheduleResult<Applied<ScheduleEntry>> {
        let mut store = self.begin().await?;
        let entry = store
            .get_schedule_entry(id)
            .await?
            .ok_or_else(|| ScheduleError::not_found("schedule entry", id))?;
        let period = store.get_validity_period(entry.validity_period_id).await?;

        store.delete_schedule_entry(id).await?;

        let mut invalidation = Invalidation::new();
        if let Some(period) = period {
            invalidate_key(&mut store, &mut invalidation, &period.key(), Some(entry.subject_id))
                .await?;
        }
        self.finish(store, entry, invalidation).await
    }
}
