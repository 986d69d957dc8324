//! Database query functions for the derived `class_group_schedule_caches` and
//! `teacher_schedule_caches` tables.
//!
//! Writes are batched: one `INSERT .. SELECT FROM UNNEST(..)` per call,
//! whatever the number of rows. Rows whose class group or teacher no longer
//! exists are dropped by the join instead of failing the foreign key.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::models::{
    ClassCacheWrite, ClassScheduleCacheRow, TeacherCacheWrite, TeacherScheduleCacheRow,
};

pub async fn get_class_cache(
    conn: &mut PgConnection,
    class_group_id: Uuid,
) -> Result<Option<ClassScheduleCacheRow>> {
    sqlx::query_as::<_, ClassScheduleCacheRow>(
        "SELECT * FROM class_group_schedule_caches WHERE class_group_id = $1",
    )
    .bind(class_group_id)
    .fetch_optional(conn)
    .await
    .context("failed to fetch class group cache")
}

pub async fn get_teacher_cache(
    conn: &mut PgConnection,
    teacher_id: Uuid,
    school_year: i32,
) -> Result<Option<TeacherScheduleCacheRow>> {
    sqlx::query_as::<_, TeacherScheduleCacheRow>(
        "SELECT * FROM teacher_schedule_caches WHERE teacher_id = $1 AND school_year = $2",
    )
    .bind(teacher_id)
    .bind(school_year)
    .fetch_optional(conn)
    .await
    .context("failed to fetch teacher cache")
}

/// Upsert class-group caches, bumping `generation` on every overwrite.
pub async fn put_class_caches(conn: &mut PgConnection, rows: &[ClassCacheWrite]) -> Result<u64> {
    if rows.is_empty() {
        return Ok(0);
    }

    let mut ids: Vec<Uuid> = Vec::with_capacity(rows.len());
    let mut years: Vec<i32> = Vec::with_capacity(rows.len());
    let mut schedules: Vec<Option<String>> = Vec::with_capacity(rows.len());
    let mut valid_on: Vec<NaiveDate> = Vec::with_capacity(rows.len());
    let mut generated_at: Vec<DateTime<Utc>> = Vec::with_capacity(rows.len());
    for row in rows {
        ids.push(row.class_group_id);
        years.push(row.school_year);
        schedules.push(row.schedule.as_ref().map(|v| v.to_string()));
        valid_on.push(row.valid_on);
        generated_at.push(row.generated_at);
    }

    let result = sqlx::query(
        "INSERT INTO class_group_schedule_caches \
             (class_group_id, school_year, schedule, valid_on, generated_at) \
         SELECT w.id, w.school_year, w.schedule::jsonb, w.valid_on, w.generated_at \
         FROM UNNEST($1::uuid[], $2::int4[], $3::text[], $4::date[], $5::timestamptz[]) \
              AS w(id, school_year, schedule, valid_on, generated_at) \
         JOIN class_groups cg ON cg.id = w.id \
         ON CONFLICT (class_group_id) DO UPDATE \
         SET school_year = EXCLUDED.school_year, \
             schedule = EXCLUDED.schedule, \
             valid_on = EXCLUDED.valid_on, \
             generated_at = EXCLUDED.generated_at, \
             generation = class_group_schedule_caches.generation + 1",
    )
    .bind(&ids)
    .bind(&years)
    .bind(&schedules)
    .bind(&valid_on)
    .bind(&generated_at)
    .execute(conn)
    .await
    .context("failed to write class group caches")?;

    Ok(result.rows_affected())
}

/// Upsert teacher caches, bumping `generation` on every overwrite.
pub async fn put_teacher_caches(
    conn: &mut PgConnection,
    rows: &[TeacherCacheWrite],
) -> Result<u64> {
    if rows.is_empty() {
        return Ok(0);
    }

    let mut ids: Vec<Uuid> = Vec::with_capacity(rows.len());
    let mut years: Vec<i32> = Vec::with_capacity(rows.len());
    let mut schedules: Vec<String> = Vec::with_capacity(rows.len());
    let mut valid_on: Vec<NaiveDate> = Vec::with_capacity(rows.len());
    let mut generated_at: Vec<DateTime<Utc>> = Vec::with_capacity(rows.len());
    for row in rows {
        ids.push(row.teacher_id);
        years.push(row.school_year);
        schedules.push(row.schedule.to_string());
        valid_on.push(row.valid_on);
        generated_at.push(row.generated_at);
    }

    let result = sqlx::query(
        "INSERT INTO teacher_schedule_caches \
             (teacher_id, school_year, schedule, valid_on, generated_at) \
         SELECT w.id, w.school_year, w.schedule::jsonb, w.valid_on, w.generated_at \
         FROM UNNEST($1::uuid[], $2::int4[], $3::text[], $4::date[], $5::timestamptz[]) \
              AS w(id, school_year, schedule, valid_on, generated_at) \
         JOIN teachers t ON t.id = w.id \
         ON CONFLICT (teacher_id, school_year) DO UPDATE \
         SET schedule = EXCLUDED.schedule, \
             valid_on = EXCLUDED.valid_on, \
             generated_at = EXCLUDED.generated_at, \
             generation = teacher_schedule_caches.generation + 1",
    )
    .bind(&ids)
    .bind(&years)
    .bind(&schedules)
    .bind(&valid_on)
    .bind(&generated_at)
    .execute(conn)
    .await
    .context("failed to write teacher caches")?;

    Ok(result.rows_affected())
}
