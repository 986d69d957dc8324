//! Database query functions for the `subject_class_links` table.

use anyhow::{Context, Result};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::models::{NewSubjectClassLink, SubjectClassLink};

pub async fn insert_subject_link(
    conn: &mut PgConnection,
    new: &NewSubjectClassLink,
) -> Result<SubjectClassLink> {
    sqlx::query_as::<_, SubjectClassLink>(
        "INSERT INTO subject_class_links (subject_id, class_group_id, weekly_lessons) \
         VALUES ($1, $2, $3) \
         RETURNING *",
    )
    .bind(new.subject_id)
    .bind(new.class_group_id)
    .bind(new.weekly_lessons)
    .fetch_one(conn)
    .await
    .context("failed to insert subject link")
}

pub async fn get_subject_link(
    conn: &mut PgConnection,
    id: Uuid,
) -> Result<Option<SubjectClassLink>> {
    sqlx::query_as::<_, SubjectClassLink>("SELECT * FROM subject_class_links WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await
        .context("failed to fetch subject link")
}

pub async fn find_subject_link(
    conn: &mut PgConnection,
    subject_id: Uuid,
    class_group_id: Uuid,
) -> Result<Option<SubjectClassLink>> {
    sqlx::query_as::<_, SubjectClassLink>(
        "SELECT * FROM subject_class_links WHERE subject_id = $1 AND class_group_id = $2",
    )
    .bind(subject_id)
    .bind(class_group_id)
    .fetch_optional(conn)
    .await
    .context("failed to look up subject link")
}

/// Links of any of the given class groups.
pub async fn list_links_for_class_groups(
    conn: &mut PgConnection,
    class_group_ids: &[Uuid],
) -> Result<Vec<SubjectClassLink>> {
    sqlx::query_as::<_, SubjectClassLink>(
        "SELECT * FROM subject_class_links \
         WHERE class_group_id = ANY($1) \
         ORDER BY created_at, id",
    )
    .bind(class_group_ids)
    .fetch_all(conn)
    .await
    .context("failed to list subject links")
}

pub async fn update_weekly_lessons(
    conn: &mut PgConnection,
    id: Uuid,
    weekly_lessons: i32,
) -> Result<Option<SubjectClassLink>> {
    sqlx::query_as::<_, SubjectClassLink>(
        "UPDATE subject_class_links SET weekly_lessons = $1 WHERE id = $2 RETURNING *",
    )
    .bind(weekly_lessons)
    .bind(id)
    .fetch_optional(conn)
    .await
    .context("failed to update subject link")
}

/// Delete a link and, through the FK cascade, its teacher assignments.
pub async fn delete_subject_link(conn: &mut PgConnection, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM subject_class_links WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await
        .context("failed to delete subject link")?;

    Ok(result.rows_affected() > 0)
}
