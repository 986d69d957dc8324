//! Integration tests for the embedded migrations and pool helpers.
//!
//! Uses the shared PostgreSQL from `timetable-test-utils` (a testcontainers
//! instance, or `TIMETABLE_TEST_PG_URL` when set). Each test works in its
//! own temporary database and drops it on completion.

use sqlx::Row;

use timetable_db::config::DbConfig;
use timetable_db::pool;
use timetable_test_utils::{create_test_db, drop_test_db, pg_url};

/// Tables created by the initial migration.
const EXPECTED_TABLES: &[&str] = &[
    "class_group_schedule_caches",
    "class_groups",
    "courses",
    "schedule_entries",
    "subject_class_links",
    "subjects",
    "teacher_assignments",
    "teacher_schedule_caches",
    "teachers",
    "time_slots",
    "validity_periods",
];

#[tokio::test]
async fn migrations_create_all_tables() {
    let (temp_pool, db_name) = create_test_db().await;

    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT tablename::text FROM pg_tables \
         WHERE schemaname = 'public' \
         ORDER BY tablename",
    )
    .fetch_all(&temp_pool)
    .await
    .expect("should list tables");

    let user_tables: Vec<&str> = rows
        .iter()
        .map(|(name,)| name.as_str())
        .filter(|t| !t.starts_with("_sqlx"))
        .collect();

    assert_eq!(
        user_tables, EXPECTED_TABLES,
        "migration should create exactly the expected tables"
    );

    temp_pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let (temp_pool, db_name) = create_test_db().await;

    // create_test_db already ran them once.
    pool::run_migrations(&temp_pool)
        .await
        .expect("second migration run should succeed");

    for table in EXPECTED_TABLES {
        let query = format!("SELECT COUNT(*) AS cnt FROM {table}");
        let row = sqlx::query(&query)
            .fetch_one(&temp_pool)
            .await
            .unwrap_or_else(|e| panic!("failed to count {table}: {e}"));
        let count: i64 = row.get("cnt");
        assert_eq!(count, 0, "table {table} should be empty after migrations");
    }

    temp_pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn table_counts_lists_every_table() {
    let (temp_pool, db_name) = create_test_db().await;

    let counts = pool::table_counts(&temp_pool)
        .await
        .expect("table_counts should succeed");
    let names: Vec<&str> = counts.iter().map(|(name, _)| name.as_str()).collect();

    assert_eq!(names, EXPECTED_TABLES);
    assert!(counts.iter().all(|(_, count)| *count == 0));

    temp_pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn weekday_check_constraint_rejects_unknown_day() {
    let (temp_pool, db_name) = create_test_db().await;

    let result = sqlx::query(
        "INSERT INTO time_slots (school_year, weekday, start_time, end_time) \
         VALUES (2026, 'funday', '07:00', '07:50')",
    )
    .execute(&temp_pool)
    .await;
    assert!(result.is_err(), "unknown weekday should violate the CHECK");

    temp_pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn ensure_database_exists_accepts_existing_and_rejects_bad_names() {
    let (temp_pool, db_name) = create_test_db().await;
    let config = DbConfig::new(format!("{}/{db_name}", pg_url().await));

    pool::ensure_database_exists(&config)
        .await
        .expect("existing database is left alone");

    let err = pool::ensure_database_exists(&config.for_database("bad-name"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("invalid characters"), "unexpected error: {err}");

    temp_pool.close().await;
    drop_test_db(&db_name).await;
}
