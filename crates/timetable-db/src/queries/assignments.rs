//! Database query functions for the `teacher_assignments` table.

use anyhow::{Context, Result};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::models::{NewTeacherAssignment, TeacherAssignment};

pub async fn insert_assignment(
    conn: &mut PgConnection,
    new: &NewTeacherAssignment,
) -> Result<TeacherAssignment> {
    sqlx::query_as::<_, TeacherAssignment>(
        "INSERT INTO teacher_assignments \
             (teacher_id, subject_class_link_id, priority, active_from, active_to) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING *",
    )
    .bind(new.teacher_id)
    .bind(new.subject_class_link_id)
    .bind(new.priority)
    .bind(new.active_from)
    .bind(new.active_to)
    .fetch_one(conn)
    .await
    .context("failed to insert teacher assignment")
}

pub async fn get_assignment(conn: &mut PgConnection, id: Uuid) -> Result<Option<TeacherAssignment>> {
    sqlx::query_as::<_, TeacherAssignment>("SELECT * FROM teacher_assignments WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await
        .context("failed to fetch teacher assignment")
}

/// Assignments hanging off any of the given subject links.
pub async fn list_assignments_for_links(
    conn: &mut PgConnection,
    link_ids: &[Uuid],
) -> Result<Vec<TeacherAssignment>> {
    sqlx::query_as::<_, TeacherAssignment>(
        "SELECT * FROM teacher_assignments \
         WHERE subject_class_link_id = ANY($1) \
         ORDER BY created_at, id",
    )
    .bind(link_ids)
    .fetch_all(conn)
    .await
    .context("failed to list teacher assignments for links")
}

pub async fn update_assignment(
    conn: &mut PgConnection,
    id: Uuid,
    new: &NewTeacherAssignment,
) -> Result<Option<TeacherAssignment>> {
    sqlx::query_as::<_, TeacherAssignment>(
        "UPDATE teacher_assignments \
         SET teacher_id = $1, subject_class_link_id = $2, priority = $3, \
             active_from = $4, active_to = $5 \
         WHERE id = $6 \
         RETURNING *",
    )
    .bind(new.teacher_id)
    .bind(new.subject_class_link_id)
    .bind(new.priority)
    .bind(new.active_from)
    .bind(new.active_to)
    .bind(id)
    .fetch_optional(conn)
    .await
    .context("failed to update teacher assignment")
}

pub async fn delete_assignment(conn: &mut PgConnection, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM teacher_assignments WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await
        .context("failed to delete teacher assignment")?;

    Ok(result.rows_affected() > 0)
}
