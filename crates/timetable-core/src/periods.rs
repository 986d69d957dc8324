//! Validity periods: the date ranges that bind a weekly schedule to a class
//! key. Periods of one key never overlap, ends included.

use chrono::NaiveDate;
use uuid::Uuid;

use timetable_db::models::{NewValidityPeriod, ValidityPeriod};
use timetable_db::store::{Database, ScheduleStore};

use crate::clock::{Clock, SchoolYearResolver};
use crate::entries::resolve_course;
use crate::error::{ScheduleError, ScheduleResult};
use crate::invalidation::{Invalidation, invalidate_key};
use crate::service::{Applied, Timetable};

/// Whether two inclusive date ranges share at least one day.
pub fn ranges_overlap(
    a_start: NaiveDate,
    a_end: NaiveDate,
    b_start: NaiveDate,
    b_end: NaiveDate,
) -> bool {
    a_start <= b_end && b_start <= a_end
}

fn check_range(new: &NewValidityPeriod) -> ScheduleResult<()> {
    if new.date_start > new.date_end {
        return Err(ScheduleError::DateRangeReversed {
            start: new.date_start,
            end: new.date_end,
        });
    }
    Ok(())
}

async fn check_overlap<S: ScheduleStore>(
    store: &mut S,
    new: &NewValidityPeriod,
    except: Option<Uuid>,
) -> ScheduleResult<()> {
    let clash = store
        .list_validity_periods(&new.key)
        .await?
        .into_iter()
        .filter(|p| Some(p.id) != except)
        .find(|p| ranges_overlap(new.date_start, new.date_end, p.date_start, p.date_end));

    match clash {
        Some(existing) => Err(ScheduleError::OverlappingPeriod {
            key: new.key.clone(),
            start: new.date_start,
            end: new.date_end,
            existing: existing.id,
        }),
        None => Ok(()),
    }
}

/// Entries of a period moved to another key must still be valid there: slot
/// in the new school year, subject linked to a sibling, course kept.
async fn check_entries_fit<S: ScheduleStore>(
    store: &mut S,
    period_id: Uuid,
    new: &NewValidityPeriod,
) -> ScheduleResult<()> {
    for entry in store.list_entries_for_period(period_id).await? {
        let slot = store
            .get_time_slot(entry.time_slot_id)
            .await?
            .ok_or_else(|| ScheduleError::not_found("time slot", entry.time_slot_id))?;
        if slot.school_year != new.key.school_year {
            return Err(ScheduleError::SchoolYearMismatch {
                slot_year: slot.school_year,
                period_year: new.key.school_year,
            });
        }
        resolve_course(store, &new.key, entry.subject_id, Some(entry.course_id)).await?;
    }
    Ok(())
}

impl<D, C, R> Timetable<D, C, R>
where
    D: Database,
    C: Clock,
    R: SchoolYearResolver,
{
    pub async fn create_validity_period(
        &self,
        new: NewValidityPeriod,
    ) -> ScheduleResult<Applied<ValidityPeriod>> {
        check_range(&new)?;
        let mut store = self.begin().await?;
        check_overlap(&mut store, &new, None).await?;

        let period = store.insert_validity_period(&new).await?;

        let mut invalidation = Invalidation::new();
        invalidate_key(&mut store, &mut invalidation, &new.key, None).await?;
        self.finish(store, period, invalidation).await
    }

    /// Move or resize a period. A key change is rejected unless every entry
    /// of the period stays valid under the new key; siblings of both keys are
    /// rebuilt.
    pub async fn update_validity_period(
        &self,
        id: Uuid,
        new: NewValidityPeriod,
    ) -> ScheduleResult<Applied<ValidityPeriod>> {
        check_range(&new)?;
        let mut store = self.begin().await?;
        let old = store
            .get_validity_period(id)
            .await?
            .ok_or_else(|| ScheduleError::not_found("validity period", id))?;
        check_overlap(&mut store, &new, Some(id)).await?;
        if old.key() != new.key {
            check_entries_fit(&mut store, id, &new).await?;
        }

        let period = store
            .update_validity_period(id, &new)
            .await?
            .ok_or_else(|| ScheduleError::not_found("validity period", id))?;

        let mut invalidation = Invalidation::new();
        invalidate_key(&mut store, &mut invalidation, &old.key(), None).await?;
        if old.key() != new.key {
            invalidate_key(&mut store, &mut invalidation, &new.key, None).await?;
        }
        self.finish(store, period, invalidation).await
    }

    /// Delete a period and every schedule entry inside it.
    pub async fn delete_validity_period(&self, id: Uuid) -> ScheduleResult<Applied<ValidityPeriod>> {
        let mut store = self.begin().await?;
        let period = store
            .get_validity_period(id)
            .await?
            .ok_or_else(|| ScheduleError::not_found("validity period", id))?;

        store.delete_validity_period(id).await?;

        let mut invalidation = Invalidation::new();
        invalidate_key(&mut store, &mut invalidation, &period.key(), None).await?;
        self.finish(store, period, invalidation).await
    }
}
