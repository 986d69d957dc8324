//! Persistence layer for the timetable engine: row models, embedded
//! migrations, per-table queries and the transactional store the engine
//! runs its mutations and rebuilds through.

pub mod config;
pub mod models;
pub mod pg_store;
pub mod pool;
pub mod queries;
pub mod store;

pub use pg_store::PgStore;
pub use store::{Database, ScheduleStore};
