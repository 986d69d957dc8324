//! Time slot registry: slot CRUD with per-day renumbering.
//!
//! Sequence numbers are derived, never supplied: after any change the slots
//! of the affected `(school_year, weekday)` are ordered by start time and
//! numbered from 1. Any slot change invalidates the whole school year.

use anyhow::Result;
use tracing::debug;
use uuid::Uuid;

use timetable_db::models::{NewTimeSlot, TimeSlot, Weekday};
use timetable_db::store::{Database, ScheduleStore};

use crate::clock::{Clock, SchoolYearResolver};
use crate::error::{ScheduleError, ScheduleResult};
use crate::invalidation::Invalidation;
use crate::service::{Applied, Timetable};

/// Sequence numbers a day's slots should carry, as `(slot id, number)` for
/// only the slots whose number changes.
pub fn plan_renumbering(slots: &[TimeSlot]) -> Vec<(Uuid, i32)> {
    let mut ordered: Vec<&TimeSlot> = slots.iter().collect();
    ordered.sort_by_key(|s| (s.start_time, s.id));

    ordered
        .into_iter()
        .zip(1..)
        .filter(|(slot, number)| slot.sequence_number != *number)
        .map(|(slot, number)| (slot.id, number))
        .collect()
}

async fn renumber_day<S: ScheduleStore>(store: &mut S, school_year: i32, weekday: Weekday) -> Result<()> {
    let slots = store.list_time_slots_for_day(school_year, weekday).await?;
    let changes = plan_renumbering(&slots);
    debug!(school_year, %weekday, changed = changes.len(), "renumbering time slots");
    for (id, number) in changes {
        store.set_sequence_number(id, number).await?;
    }
    Ok(())
}

fn check_times(new: &NewTimeSlot) -> ScheduleResult<()> {
    if new.start_time >= new.end_time {
        return Err(ScheduleError::SlotTimesReversed {
            start: new.start_time,
            end: new.end_time,
        });
    }
    Ok(())
}

async fn check_free<S: ScheduleStore>(
    store: &mut S,
    new: &NewTimeSlot,
    except: Option<Uuid>,
) -> ScheduleResult<()> {
    match store
        .find_time_slot(new.school_year, new.weekday, new.start_time)
        .await?
    {
        Some(existing) if Some(existing.id) != except => Err(ScheduleError::DuplicateTimeSlot {
            school_year: new.school_year,
            weekday: new.weekday,
            start_time: new.start_time,
        }),
        _ => Ok(()),
    }
}

/// A slot with bookings cannot change school year: its entries would point a
/// period of one year at a slot of another.
async fn check_year_move<S: ScheduleStore>(
    store: &mut S,
    old: &TimeSlot,
    new: &NewTimeSlot,
) -> ScheduleResult<()> {
    if old.school_year == new.school_year {
        return Ok(());
    }
    if store.list_entries_for_slot(old.id).await?.is_empty() {
        return Ok(());
    }
    Err(ScheduleError::SchoolYearMismatch {
        slot_year: new.school_year,
        period_year: old.school_year,
    })
}

async fn reload<S: ScheduleStore>(store: &mut S, id: Uuid) -> ScheduleResult<TimeSlot> {
    store
        .get_time_slot(id)
        .await?
        .ok_or_else(|| ScheduleError::not_found("time slot", id))
}

impl<D, C, R> Timetable<D, C, R>
where
    D: Database,
    C: Clock,
    R: SchoolYearResolver,
{
    pub async fn create_time_slot(&self, new: NewTimeSlot) -> ScheduleResult<Applied<TimeSlot>> {
        check_times(&new)?;
        let mut store = self.begin().await?;
        check_free(&mut store, &new, None).await?;

        let inserted = store.insert_time_slot(&new).await?;
        renumber_day(&mut store, new.school_year, new.weekday).await?;
        let slot = reload(&mut store, inserted.id).await?;

        let mut invalidation = Invalidation::new();
        invalidation.full_year(slot.school_year);
        self.finish(store, slot, invalidation).await
    }

    /// Change a slot's times, weekday or year. A slot moved to another day
    /// renumbers both days; a booked slot keeps its school year.
    pub async fn update_time_slot(&self, id: Uuid, new: NewTimeSlot) -> ScheduleResult<Applied<TimeSlot>> {
        check_times(&new)?;
        let mut store = self.begin().await?;
        let old = reload(&mut store, id).await?;
        check_free(&mut store, &new, Some(id)).await?;
        check_year_move(&mut store, &old, &new).await?;

        store
            .update_time_slot(id, &new)
            .await?
            .ok_or_else(|| ScheduleError::not_found("time slot", id))?;
        renumber_day(&mut store, new.school_year, new.weekday).await?;
        if (old.school_year, old.weekday) != (new.school_year, new.weekday) {
            renumber_day(&mut store, old.school_year, old.weekday).await?;
        }
        let slot = reload(&mut store, id).await?;

        let mut invalidation = Invalidation::new();
        invalidation.full_year(old.school_year).full_year(new.school_year);
        self.finish(store, slot, invalidation).await
    }

    /// Delete a slot together with the schedule entries bound to it.
    pub async fn delete_time_slot(&self, id: Uuid) -> ScheduleResult<Applied<TimeSlot>> {
        let mut store = self.begin().await?;
        let slot = reload(&mut store, id).await?;

        store.delete_time_slot(id).await?;
        renumber_day(&mut store, slot.school_year, slot.weekday).await?;

        let mut invalidation = Invalidation::new();
        invalidation.full_year(slot.school_year);
        self.finish(store, slot, invalidation).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveTime, TimeZone, Utc};

    use super::*;

    fn slot(hour: u32, sequence_number: i32) -> TimeSlot {
        TimeSlot {
            id: Uuid::new_v4(),
            school_year: 2026,
            weekday: Weekday::Monday,
            sequence_number,
            start_time: NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(hour, 50, 0).unwrap(),
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn numbered_day_needs_no_changes() {
        let slots = vec![slot(7, 1), slot(8, 2), slot(9, 3)];
        assert!(plan_renumbering(&slots).is_empty());
    }

    #[test]
    fn gap_after_delete_shifts_later_slots() {
        let first = slot(7, 1);
        let last = slot(9, 3);
        let plan = plan_renumbering(&[last.clone(), first]);
        assert_eq!(plan, vec![(last.id, 2)]);
    }

    #[test]
    fn inserted_slot_is_placed_by_start_time() {
        let a = slot(7, 1);
        let b = slot(9, 2);
        let new = slot(8, 0);
        let plan = plan_renumbering(&[a, b.clone(), new.clone()]);
        assert_eq!(plan, vec![(new.id, 2), (b.id, 3)]);
    }

    #[test]
    fn empty_day() {
        assert!(plan_renumbering(&[]).is_empty());
    }
}
