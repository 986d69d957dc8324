//! Database query functions for the `time_slots` table.

use anyhow::{Context, Result};
use chrono::NaiveTime;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::models::{NewTimeSlot, TimeSlot, Weekday};

/// Insert a slot with a placeholder sequence number; the registry renumbers
/// the day right after.
pub async fn insert_time_slot(conn: &mut PgConnection, new: &NewTimeSlot) -> Result<TimeSlot> {
    sqlx::query_as::<_, TimeSlot>(
        "INSERT INTO time_slots (school_year, weekday, start_time, end_time) \
         VALUES ($1, $2, $3, $4) \
         RETURNING *",
    )
    .bind(new.school_year)
    .bind(new.weekday)
    .bind(new.start_time)
    .bind(new.end_time)
    .fetch_one(conn)
    .await
    .context("failed to insert time slot")
}

pub async fn get_time_slot(conn: &mut PgConnection, id: Uuid) -> Result<Option<TimeSlot>> {
    sqlx::query_as::<_, TimeSlot>("SELECT * FROM time_slots WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await
        .context("failed to fetch time slot")
}

/// Look up the slot occupying `(school_year, weekday, start_time)`.
pub async fn find_time_slot(
    conn: &mut PgConnection,
    school_year: i32,
    weekday: Weekday,
    start_time: NaiveTime,
) -> Result<Option<TimeSlot>> {
    sqlx::query_as::<_, TimeSlot>(
        "SELECT * FROM time_slots \
         WHERE school_year = $1 AND weekday = $2 AND start_time = $3",
    )
    .bind(school_year)
    .bind(weekday)
    .bind(start_time)
    .fetch_optional(conn)
    .await
    .context("failed to look up time slot")
}

/// Slots of one weekday, ordered by start time.
pub async fn list_time_slots_for_day(
    conn: &mut PgConnection,
    school_year: i32,
    weekday: Weekday,
) -> Result<Vec<TimeSlot>> {
    sqlx::query_as::<_, TimeSlot>(
        "SELECT * FROM time_slots \
         WHERE school_year = $1 AND weekday = $2 \
         ORDER BY start_time, id",
    )
    .bind(school_year)
    .bind(weekday)
    .fetch_all(conn)
    .await
    .context("failed to list time slots for day")
}

pub async fn list_time_slots_for_year(
    conn: &mut PgConnection,
    school_year: i32,
) -> Result<Vec<TimeSlot>> {
    sqlx::query_as::<_, TimeSlot>(
        "SELECT * FROM time_slots \
         WHERE school_year = $1 \
         ORDER BY array_position(ARRAY['monday', 'tuesday', 'wednesday', 'thursday', \
                                       'friday', 'saturday', 'sunday'], weekday), \
                  start_time, id",
    )
    .bind(school_year)
    .fetch_all(conn)
    .await
    .context("failed to list time slots for year")
}

pub async fn update_time_slot(
    conn: &mut PgConnection,
    id: Uuid,
    new: &NewTimeSlot,
) -> Result<Option<TimeSlot>> {
    sqlx::query_as::<_, TimeSlot>(
        "UPDATE time_slots \
         SET school_year = $1, weekday = $2, start_time = $3, end_time = $4 \
         WHERE id = $5 \
         RETURNING *",
    )
    .bind(new.school_year)
    .bind(new.weekday)
    .bind(new.start_time)
    .bind(new.end_time)
    .bind(id)
    .fetch_optional(conn)
    .await
    .context("failed to update time slot")
}

/// Delete a slot. Schedule entries bound to it go with it (FK cascade).
pub async fn delete_time_slot(conn: &mut PgConnection, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM time_slots WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await
        .context("failed to delete time slot")?;

    Ok(result.rows_affected() > 0)
}

pub async fn set_sequence_number(conn: &mut PgConnection, id: Uuid, sequence_number: i32) -> Result<()> {
    sqlx::query("UPDATE time_slots SET sequence_number = $1 WHERE id = $2")
        .bind(sequence_number)
        .bind(id)
        .execute(conn)
        .await
        .context("failed to renumber time slot")?;

    Ok(())
}
