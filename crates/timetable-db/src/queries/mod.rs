//! Per-table query functions. Every function takes a `&mut PgConnection` so
//! the same call runs on a pooled connection or inside an open transaction
//! (`&mut *tx`).

pub mod assignments;
pub mod caches;
pub mod schedule_entries;
pub mod sources;
pub mod subject_links;
pub mod time_slots;
pub mod validity_periods;
pub mod year_data;
