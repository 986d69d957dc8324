//! Queries for the source tables maintained outside the engine: `courses`,
//! `class_groups`, `subjects` and `teachers`. The engine only reads them; the
//! inserts exist for seeding and tests.

use anyhow::{Context, Result};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::models::{ClassGroup, ClassGroupKey, Course, Subject, Teacher};

pub async fn insert_course(conn: &mut PgConnection, code: &str, name: &str) -> Result<Course> {
    sqlx::query_as::<_, Course>(
        "INSERT INTO courses (code, name) VALUES ($1, $2) RETURNING *",
    )
    .bind(code)
    .bind(name)
    .fetch_one(conn)
    .await
    .with_context(|| format!("failed to insert course {code:?}"))
}

pub async fn insert_class_group(
    conn: &mut PgConnection,
    key: &ClassGroupKey,
    course_id: Uuid,
) -> Result<ClassGroup> {
    sqlx::query_as::<_, ClassGroup>(
        "INSERT INTO class_groups (school_year, number, letter, course_id) \
         VALUES ($1, $2, $3, $4) \
         RETURNING *",
    )
    .bind(key.school_year)
    .bind(key.number)
    .bind(&key.letter)
    .bind(course_id)
    .fetch_one(conn)
    .await
    .with_context(|| format!("failed to insert class group {key}"))
}

pub async fn insert_subject(conn: &mut PgConnection, code: &str, name: &str) -> Result<Subject> {
    sqlx::query_as::<_, Subject>(
        "INSERT INTO subjects (code, name) VALUES ($1, $2) RETURNING *",
    )
    .bind(code)
    .bind(name)
    .fetch_one(conn)
    .await
    .with_context(|| format!("failed to insert subject {code:?}"))
}

pub async fn insert_teacher(conn: &mut PgConnection, name: &str) -> Result<Teacher> {
    sqlx::query_as::<_, Teacher>("INSERT INTO teachers (name) VALUES ($1) RETURNING *")
        .bind(name)
        .fetch_one(conn)
        .await
        .with_context(|| format!("failed to insert teacher {name:?}"))
}

pub async fn get_class_group(conn: &mut PgConnection, id: Uuid) -> Result<Option<ClassGroup>> {
    sqlx::query_as::<_, ClassGroup>("SELECT * FROM class_groups WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await
        .context("failed to fetch class group")
}

pub async fn get_teacher(conn: &mut PgConnection, id: Uuid) -> Result<Option<Teacher>> {
    sqlx::query_as::<_, Teacher>("SELECT * FROM teachers WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await
        .context("failed to fetch teacher")
}

/// Every class group sharing `key`, ordered by course code then id. The order
/// is the one used to pick a schedule entry's course.
pub async fn list_siblings(conn: &mut PgConnection, key: &ClassGroupKey) -> Result<Vec<ClassGroup>> {
    sqlx::query_as::<_, ClassGroup>(
        "SELECT cg.* FROM class_groups cg \
         JOIN courses c ON c.id = cg.course_id \
         WHERE cg.school_year = $1 AND cg.number = $2 AND cg.letter = $3 \
         ORDER BY c.code, cg.id",
    )
    .bind(key.school_year)
    .bind(key.number)
    .bind(&key.letter)
    .fetch_all(conn)
    .await
    .with_context(|| format!("failed to list siblings of {key}"))
}
