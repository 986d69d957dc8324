//! Bulk loader for every scheduling fact of one school year.

use anyhow::{Context, Result};
use sqlx::PgConnection;

use crate::models::{
    ClassGroup, Course, ScheduleEntry, Subject, SubjectClassLink, Teacher, TeacherAssignment,
    TimeSlot, ValidityPeriod, YearData,
};

/// Load [`YearData`] for `school_year` with one query per table.
pub async fn load_year(conn: &mut PgConnection, school_year: i32) -> Result<YearData> {
    let time_slots = sqlx::query_as::<_, TimeSlot>(
        "SELECT * FROM time_slots WHERE school_year = $1 ORDER BY start_time, id",
    )
    .bind(school_year)
    .fetch_all(&mut *conn)
    .await
    .context("failed to load time slots")?;

    let class_groups = sqlx::query_as::<_, ClassGroup>(
        "SELECT * FROM class_groups WHERE school_year = $1 ORDER BY id",
    )
    .bind(school_year)
    .fetch_all(&mut *conn)
    .await
    .context("failed to load class groups")?;

    let courses = sqlx::query_as::<_, Course>(
        "SELECT * FROM courses WHERE id IN \
             (SELECT course_id FROM class_groups WHERE school_year = $1) \
         ORDER BY code, id",
    )
    .bind(school_year)
    .fetch_all(&mut *conn)
    .await
    .context("failed to load courses")?;

    let validity_periods = sqlx::query_as::<_, ValidityPeriod>(
        "SELECT * FROM validity_periods WHERE school_year = $1 ORDER BY date_start, id",
    )
    .bind(school_year)
    .fetch_all(&mut *conn)
    .await
    .context("failed to load validity periods")?;

    let schedule_entries = sqlx::query_as::<_, ScheduleEntry>(
        "SELECT se.* FROM schedule_entries se \
         JOIN validity_periods vp ON vp.id = se.validity_period_id \
         WHERE vp.school_year = $1 \
         ORDER BY se.created_at, se.id",
    )
    .bind(school_year)
    .fetch_all(&mut *conn)
    .await
    .context("failed to load schedule entries")?;

    let subject_links = sqlx::query_as::<_, SubjectClassLink>(
        "SELECT l.* FROM subject_class_links l \
         JOIN class_groups cg ON cg.id = l.class_group_id \
         WHERE cg.school_year = $1 \
         ORDER BY l.created_at, l.id",
    )
    .bind(school_year)
    .fetch_all(&mut *conn)
    .await
    .context("failed to load subject links")?;

    let subjects = sqlx::query_as::<_, Subject>(
        "SELECT * FROM subjects WHERE id IN ( \
             SELECT l.subject_id FROM subject_class_links l \
             JOIN class_groups cg ON cg.id = l.class_group_id \
             WHERE cg.school_year = $1 \
             UNION \
             SELECT se.subject_id FROM schedule_entries se \
             JOIN validity_periods vp ON vp.id = se.validity_period_id \
             WHERE vp.school_year = $1) \
         ORDER BY code",
    )
    .bind(school_year)
    .fetch_all(&mut *conn)
    .await
    .context("failed to load subjects")?;

    let assignments = sqlx::query_as::<_, TeacherAssignment>(
        "SELECT ta.* FROM teacher_assignments ta \
         JOIN subject_class_links l ON l.id = ta.subject_class_link_id \
         JOIN class_groups cg ON cg.id = l.class_group_id \
         WHERE cg.school_year = $1 \
         ORDER BY ta.created_at, ta.id",
    )
    .bind(school_year)
    .fetch_all(&mut *conn)
    .await
    .context("failed to load teacher assignments")?;

    let teachers = sqlx::query_as::<_, Teacher>(
        "SELECT * FROM teachers WHERE id IN ( \
             SELECT ta.teacher_id FROM teacher_assignments ta \
             JOIN subject_class_links l ON l.id = ta.subject_class_link_id \
             JOIN class_groups cg ON cg.id = l.class_group_id \
             WHERE cg.school_year = $1) \
         ORDER BY name, id",
    )
    .bind(school_year)
    .fetch_all(&mut *conn)
    .await
    .context("failed to load teachers")?;

    Ok(YearData {
        school_year,
        time_slots,
        courses,
        class_groups,
        subjects,
        teachers,
        validity_periods,
        schedule_entries,
        subject_links,
        assignments,
    })
}
