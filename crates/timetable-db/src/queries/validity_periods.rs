//! Database query functions for the `validity_periods` table.

use anyhow::{Context, Result};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::models::{ClassGroupKey, NewValidityPeriod, ValidityPeriod};

pub async fn insert_validity_period(
    conn: &mut PgConnection,
    new: &NewValidityPeriod,
) -> Result<ValidityPeriod> {
    sqlx::query_as::<_, ValidityPeriod>(
        "INSERT INTO validity_periods (school_year, number, letter, date_start, date_end) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING *",
    )
    .bind(new.key.school_year)
    .bind(new.key.number)
    .bind(&new.key.letter)
    .bind(new.date_start)
    .bind(new.date_end)
    .fetch_one(conn)
    .await
    .context("failed to insert validity period")
}

pub async fn get_validity_period(
    conn: &mut PgConnection,
    id: Uuid,
) -> Result<Option<ValidityPeriod>> {
    sqlx::query_as::<_, ValidityPeriod>("SELECT * FROM validity_periods WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await
        .context("failed to fetch validity period")
}

/// All periods of a class key, oldest range first.
pub async fn list_validity_periods(
    conn: &mut PgConnection,
    key: &ClassGroupKey,
) -> Result<Vec<ValidityPeriod>> {
    sqlx::query_as::<_, ValidityPeriod>(
        "SELECT * FROM validity_periods \
         WHERE school_year = $1 AND number = $2 AND letter = $3 \
         ORDER BY date_start, id",
    )
    .bind(key.school_year)
    .bind(key.number)
    .bind(&key.letter)
    .fetch_all(conn)
    .await
    .with_context(|| format!("failed to list validity periods of {key}"))
}

pub async fn update_validity_period(
    conn: &mut PgConnection,
    id: Uuid,
    new: &NewValidityPeriod,
) -> Result<Option<ValidityPeriod>> {
    sqlx::query_as::<_, ValidityPeriod>(
        "UPDATE validity_periods \
         SET school_year = $1, number = $2, letter = $3, date_start = $4, date_end = $5 \
         WHERE id = $6 \
         RETURNING *",
    )
    .bind(new.key.school_year)
    .bind(new.key.number)
    .bind(&new.key.letter)
    .bind(new.date_start)
    .bind(new.date_end)
    .bind(id)
    .fetch_optional(conn)
    .await
    .context("failed to update validity period")
}

/// Delete a period together with its schedule entries (FK cascade).
pub async fn delete_validity_period(conn: &mut PgConnection, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM validity_periods WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await
        .context("failed to delete validity period")?;

    Ok(result.rows_affected() > 0)
}
