//! Schedule commands: read class and teacher matrices, rebuild a school year,
//! and list its time slots.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use timetable_core::{Clock, FixedClock, SystemClock, Timetable};

use crate::render;

fn parse_id(kind: &str, raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).with_context(|| format!("invalid {kind} ID: {raw}"))
}

fn today_or_now(today: Option<NaiveDate>) -> NaiveDate {
    today.unwrap_or_else(|| SystemClock.today())
}

/// `timetable class-schedule`: print the matrix of one class group.
pub async fn run_class_schedule(
    pool: &PgPool,
    class_group_id: &str,
    today: Option<NaiveDate>,
    json: bool,
) -> Result<()> {
    let id = parse_id("class group", class_group_id)?;
    let today = today_or_now(today);
    debug!(class_group_id = %id, %today, "reading class schedule");
    let tt = Timetable::new(pool.clone());

    let Some(schedule) = tt.get_class_group_schedule(id, today).await? else {
        if json {
            println!("null");
        } else {
            println!("No schedule for class group {id} on {today}.");
        }
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&schedule)?);
    } else {
        print!("{}", render::render_class_schedule(&schedule));
    }
    Ok(())
}

/// `timetable teacher-schedule`: print the matrix of one teacher.
pub async fn run_teacher_schedule(
    pool: &PgPool,
    teacher_id: &str,
    today: Option<NaiveDate>,
    json: bool,
) -> Result<()> {
    let id = parse_id("teacher", teacher_id)?;
    let today = today_or_now(today);
    debug!(teacher_id = %id, %today, "reading teacher schedule");
    let tt = Timetable::new(pool.clone());

    let schedule = tt.get_teacher_schedule(id, today).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&schedule)?);
    } else {
        print!("{}", render::render_teacher_schedule(&schedule));
    }
    Ok(())
}

/// `timetable rebuild`: recompute every cache of a school year.
pub async fn run_rebuild(pool: &PgPool, school_year: i32, today: Option<NaiveDate>) -> Result<()> {
    let summary = match today {
        Some(day) => {
            Timetable::new(pool.clone())
                .with_clock(FixedClock::new(day))
                .rebuild_school_year(school_year)
                .await?
        }
        None => {
            Timetable::new(pool.clone())
                .rebuild_school_year(school_year)
                .await?
        }
    };

    println!(
        "Rebuilt school year {school_year}: {} class groups, {} teachers.",
        summary.class_groups.len(),
        summary.teachers.len()
    );
    Ok(())
}

/// `timetable slots`: list the time slots of a school year.
pub async fn run_slots(pool: &PgPool, school_year: i32) -> Result<()> {
    let tt = Timetable::new(pool.clone());
    let slots = tt.list_time_slots(school_year).await?;

    if slots.is_empty() {
        println!("No time slots for school year {school_year}.");
        return Ok(());
    }

    println!("Time slots for {school_year}:");
    for slot in &slots {
        println!(
            "  {} #{} {}-{} ({})",
            slot.weekday.short_name(),
            slot.sequence_number,
            slot.start_time.format("%H:%M"),
            slot.end_time.format("%H:%M"),
            slot.id
        );
    }
    Ok(())
}
