//! Shared test utilities for timetable tests.
//!
//! Two backends:
//! - [`memory::MemoryDb`]: an in-process store with the same transactional
//!   contract as PostgreSQL, used by the engine tests.
//! - A PostgreSQL instance shared across the tests of one binary, where each
//!   test gets its own database ([`create_test_db`] / [`drop_test_db`]).
//!   `TIMETABLE_TEST_PG_URL` points at an already running server; without it
//!   a container is started through testcontainers.

pub mod memory;

use std::time::Duration;

use sqlx::{Executor, PgPool};
use testcontainers::ContainerAsync;
use testcontainers::ImageExt;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use uuid::Uuid;

use timetable_db::config::DbConfig;
use timetable_db::pool;

pub use memory::MemoryDb;

struct SharedPg {
    base_url: String,
    /// Keeps the container alive. `None` when using an external URL.
    _container: Option<ContainerAsync<Postgres>>,
}

static SHARED_PG: OnceCell<SharedPg> = OnceCell::const_new();

async fn init_shared_pg() -> SharedPg {
    if let Ok(url) = std::env::var("TIMETABLE_TEST_PG_URL") {
        return SharedPg {
            base_url: url.trim_end_matches('/').to_owned(),
            _container: None,
        };
    }

    let container = Postgres::default()
        .with_tag("16")
        .start()
        .await
        .expect("failed to start PostgreSQL container");

    let host = container.get_host().await.expect("failed to get host");
    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("failed to get mapped port");

    SharedPg {
        base_url: format!("postgresql://postgres:postgres@{host}:{port}"),
        _container: Some(container),
    }
}

/// Server root URL of the shared PostgreSQL (no database name).
pub async fn pg_url() -> &'static str {
    let shared = SHARED_PG.get_or_init(init_shared_pg).await;
    &shared.base_url
}

/// Config for a database on the shared server, with a longer acquire
/// timeout than the binary's default.
async fn test_config(db_name: &str) -> DbConfig {
    DbConfig::new(format!("{}/{db_name}", pg_url().await))
        .with_acquire_timeout(Duration::from_secs(30))
}

/// Create a uniquely named database with migrations applied.
///
/// Returns `(pool, db_name)`; pass `db_name` to [`drop_test_db`] when done.
pub async fn create_test_db() -> (PgPool, String) {
    let db_name = format!("timetable_test_{}", Uuid::new_v4().simple());
    let config = test_config(&db_name).await;

    pool::ensure_database_exists(&config)
        .await
        .unwrap_or_else(|e| panic!("failed to create temp database {db_name}: {e:#}"));
    let temp_pool = pool::create_pool(&config)
        .await
        .unwrap_or_else(|e| panic!("failed to connect to temp database {db_name}: {e:#}"));
    pool::run_migrations(&temp_pool)
        .await
        .expect("migrations should succeed");

    (temp_pool, db_name)
}

/// Drop a database created by [`create_test_db`], terminating any remaining
/// connections first. Safe to call twice.
pub async fn drop_test_db(db_name: &str) {
    let config = test_config(db_name).await;
    let maint_pool = pool::connect_maintenance(&config)
        .await
        .expect("failed to connect to maintenance database for cleanup");

    let _ = sqlx::query(
        "SELECT pg_terminate_backend(pid) \
         FROM pg_stat_activity \
         WHERE datname = $1 AND pid <> pg_backend_pid()",
    )
    .bind(db_name)
    .execute(&maint_pool)
    .await;
    let _ = maint_pool
        .execute(format!("DROP DATABASE IF EXISTS {db_name}").as_str())
        .await;
    maint_pool.close().await;
}
