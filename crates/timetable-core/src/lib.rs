//! Timetable schedule cache engine.
//!
//! Turns scheduling facts (time slots, validity periods, schedule entries,
//! subject links, teacher assignments) into display-ready weekly matrices per
//! class group and per teacher, and keeps those matrices consistent with
//! every write. All mutations go through [`Timetable`], which validates,
//! persists and rebuilds the affected caches in one unit of work.

pub mod class_cache;
pub mod clock;
pub mod error;
pub mod invalidation;
pub mod matrix;
pub mod snapshot;
pub mod teacher_cache;

mod assignments;
mod entries;
mod links;
mod periods;
mod service;
mod slots;

pub use clock::{
    CalendarYearResolver, Clock, FixedClock, FixedSchoolYear, SchoolYearResolver, SystemClock,
};
pub use entries::ScheduleEntryInput;
pub use error::{ScheduleError, ScheduleResult};
pub use invalidation::{Invalidation, RebuildSummary, rebuild_many};
pub use matrix::{
    ClassCell, ClassRef, ClassSchedule, ScheduleMatrix, SiblingInfo, SlotTimes, TeacherCell,
    TeacherSchedule,
};
pub use periods::ranges_overlap;
pub use service::{Applied, Timetable};
pub use slots::plan_renumbering;
