//! Database query functions for the `schedule_entries` table.

use anyhow::{Context, Result};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::models::{ClassGroupKey, NewScheduleEntry, ScheduleEntry};

pub async fn insert_schedule_entry(
    conn: &mut PgConnection,
    new: &NewScheduleEntry,
) -> Result<ScheduleEntry> {
    sqlx::query_as::<_, ScheduleEntry>(
        "INSERT INTO schedule_entries (validity_period_id, time_slot_id, subject_id, course_id) \
         VALUES ($1, $2, $3, $4) \
         RETURNING *",
    )
    .bind(new.validity_period_id)
    .bind(new.time_slot_id)
    .bind(new.subject_id)
    .bind(new.course_id)
    .fetch_one(conn)
    .await
    .context("failed to insert schedule entry")
}

pub async fn get_schedule_entry(conn: &mut PgConnection, id: Uuid) -> Result<Option<ScheduleEntry>> {
    sqlx::query_as::<_, ScheduleEntry>("SELECT * FROM schedule_entries WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await
        .context("failed to fetch schedule entry")
}

/// The entry occupying a slot of a period, if any.
pub async fn find_schedule_entry(
    conn: &mut PgConnection,
    validity_period_id: Uuid,
    time_slot_id: Uuid,
) -> Result<Option<ScheduleEntry>> {
    sqlx::query_as::<_, ScheduleEntry>(
        "SELECT * FROM schedule_entries \
         WHERE validity_period_id = $1 AND time_slot_id = $2",
    )
    .bind(validity_period_id)
    .bind(time_slot_id)
    .fetch_optional(conn)
    .await
    .context("failed to look up schedule entry")
}

/// Entries of any period of `key` that teach `subject_id`.
pub async fn list_entries_for_key_subject(
    conn: &mut PgConnection,
    key: &ClassGroupKey,
    subject_id: Uuid,
) -> Result<Vec<ScheduleEntry>> {
    sqlx::query_as::<_, ScheduleEntry>(
        "SELECT se.* FROM schedule_entries se \
         JOIN validity_periods vp ON vp.id = se.validity_period_id \
         WHERE vp.school_year = $1 AND vp.number = $2 AND vp.letter = $3 \
           AND se.subject_id = $4 \
         ORDER BY se.created_at, se.id",
    )
    .bind(key.school_year)
    .bind(key.number)
    .bind(&key.letter)
    .bind(subject_id)
    .fetch_all(conn)
    .await
    .context("failed to list schedule entries for subject")
}

pub async fn list_entries_for_slot(
    conn: &mut PgConnection,
    time_slot_id: Uuid,
) -> Result<Vec<ScheduleEntry>> {
    sqlx::query_as::<_, ScheduleEntry>(
        "SELECT * FROM schedule_entries WHERE time_slot_id = $1 ORDER BY created_at, id",
    )
    .bind(time_slot_id)
    .fetch_all(conn)
    .await
    .context("failed to list schedule entries for time slot")
}

pub async fn list_entries_for_period(
    conn: &mut PgConnection,
    validity_period_id: Uuid,
) -> Result<Vec<ScheduleEntry>> {
    sqlx::query_as::<_, ScheduleEntry>(
        "SELECT * FROM schedule_entries WHERE validity_period_id = $1 ORDER BY created_at, id",
    )
    .bind(validity_period_id)
    .fetch_all(conn)
    .await
    .context("failed to list schedule entries for validity period")
}

pub async fn update_schedule_entry(
    conn: &mut PgConnection,
    id: Uuid,
    new: &NewScheduleEntry,
) -> Result<Option<ScheduleEntry>> {
    sqlx::query_as::<_, ScheduleEntry>(
        "UPDATE schedule_entries \
         SET validity_period_id = $1, time_slot_id = $2, subject_id = $3, course_id = $4 \
         WHERE id = $5 \
         RETURNING *",
    )
    .bind(new.validity_period_id)
    .bind(new.time_slot_id)
    .bind(new.subject_id)
    .bind(new.course_id)
    .bind(id)
    .fetch_optional(conn)
    .await
    .context("failed to update schedule entry")
}

pub async fn delete_schedule_entry(conn: &mut PgConnection, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM schedule_entries WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await
        .context("failed to delete schedule entry")?;

    Ok(result.rows_affected() > 0)
}
