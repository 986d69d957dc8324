//! Plain-text rendering of weekly matrices.
//!
//! One row per slot number, one column per weekday with at least one lesson.
//! The first column shows the slot number and its time range from the legend.

use timetable_core::{ClassCell, ClassSchedule, ScheduleMatrix, TeacherCell, TeacherSchedule};

/// Render `matrix` as a grid, formatting each filled cell with `cell_text`.
pub fn render_grid<C>(matrix: &ScheduleMatrix<C>, cell_text: impl Fn(&C) -> String) -> String {
    let weekdays = matrix.weekdays();
    if weekdays.is_empty() {
        return "(no lessons)\n".to_string();
    }

    let mut slots: Vec<i32> = matrix.legend.keys().copied().collect();
    slots.extend(matrix.rows.keys().copied());
    slots.sort_unstable();
    slots.dedup();

    let mut table: Vec<Vec<String>> = Vec::with_capacity(slots.len() + 1);
    let mut header = vec!["#".to_string()];
    header.extend(weekdays.iter().map(|day| day.short_name().to_string()));
    table.push(header);

    for slot in &slots {
        let label = match matrix.legend.get(slot) {
            Some(times) => format!(
                "{slot} {}-{}",
                times.start_time.format("%H:%M"),
                times.end_time.format("%H:%M")
            ),
            None => slot.to_string(),
        };
        let mut row = vec![label];
        row.extend(
            weekdays
                .iter()
                .map(|day| matrix.get(*slot, *day).map(&cell_text).unwrap_or_default()),
        );
        table.push(row);
    }

    let widths: Vec<usize> = (0..table[0].len())
        .map(|col| {
            table
                .iter()
                .map(|row| row[col].chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    for row in &table {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(text, width)| format!("{text:<width$}"))
            .collect();
        out.push_str(line.join(" | ").trim_end());
        out.push('\n');
    }
    out
}

pub fn class_cell_text(cell: &ClassCell) -> String {
    match &cell.teacher_name {
        Some(teacher) => format!("{} ({teacher})", cell.subject_code),
        None => cell.subject_code.clone(),
    }
}

pub fn teacher_cell_text(cell: &TeacherCell) -> String {
    let classes: Vec<String> = cell
        .classes
        .iter()
        .map(|class| format!("{} {}", class.label, class.course_code))
        .collect();
    format!("{} {}", cell.subject_code, classes.join(", "))
}

pub fn render_class_schedule(schedule: &ClassSchedule) -> String {
    let mut out = format!(
        "Class {} ({} to {})\n",
        schedule.label, schedule.period_start, schedule.period_end
    );
    if !schedule.siblings.is_empty() {
        let names: Vec<&str> = schedule
            .siblings
            .values()
            .map(|s| s.display_name.as_str())
            .collect();
        out.push_str(&format!("Siblings: {}\n", names.join(", ")));
    }
    out.push('\n');
    out.push_str(&render_grid(&schedule.matrix, class_cell_text));
    out
}

pub fn render_teacher_schedule(schedule: &TeacherSchedule) -> String {
    let name = schedule.teacher_name.as_deref().unwrap_or("(unnamed)");
    let mut out = format!("Teacher {name}, school year {}\n\n", schedule.school_year);
    out.push_str(&render_grid(&schedule.matrix, teacher_cell_text));
    out
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;
    use timetable_core::{ClassRef, SlotTimes};
    use timetable_db::models::Weekday;
    use uuid::Uuid;

    use super::*;

    fn times(start: (u32, u32), end: (u32, u32)) -> SlotTimes {
        SlotTimes {
            start_time: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
        }
    }

    fn class_cell(code: &str, teacher: Option<&str>) -> ClassCell {
        ClassCell {
            subject_id: Uuid::new_v4(),
            subject_code: code.to_string(),
            subject_name: code.to_string(),
            course_id: Uuid::new_v4(),
            teacher_id: teacher.map(|_| Uuid::new_v4()),
            teacher_name: teacher.map(str::to_string),
        }
    }

    #[test]
    fn empty_matrix_renders_placeholder() {
        let matrix: ScheduleMatrix<ClassCell> = ScheduleMatrix::new();
        assert_eq!(render_grid(&matrix, class_cell_text), "(no lessons)\n");
    }

    #[test]
    fn grid_has_one_column_per_weekday_in_use() {
        let mut matrix: ScheduleMatrix<ClassCell> = ScheduleMatrix::new();
        matrix.legend.insert(1, times((7, 0), (7, 50)));
        matrix.legend.insert(2, times((7, 50), (8, 40)));
        matrix
            .rows
            .entry(1)
            .or_default()
            .insert(Weekday::Monday, class_cell("MAT", Some("Ana")));
        matrix
            .rows
            .entry(2)
            .or_default()
            .insert(Weekday::Wednesday, class_cell("PHY", None));

        let grid = render_grid(&matrix, class_cell_text);
        let lines: Vec<&str> = grid.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with('#'));
        assert!(lines[0].contains("Mon") && lines[0].contains("Wed"));
        assert!(!lines[0].contains("Tue"));
        assert!(lines[1].starts_with("1 07:00-07:50"));
        assert!(lines[1].contains("MAT (Ana)"));
        assert!(lines[2].starts_with("2 07:50-08:40"));
        assert!(lines[2].ends_with("PHY"));
    }

    #[test]
    fn merged_teacher_cell_lists_every_class() {
        let cell = TeacherCell {
            subject_id: None,
            subject_code: "MAT/PHY".to_string(),
            subject_name: "Mathematics / Physics".to_string(),
            classes: vec![
                ClassRef {
                    label: "1A".to_string(),
                    course_code: "EM".to_string(),
                },
                ClassRef {
                    label: "1A".to_string(),
                    course_code: "TEC".to_string(),
                },
            ],
            class_group_id: None,
        };
        assert_eq!(teacher_cell_text(&cell), "MAT/PHY 1A EM, 1A TEC");
    }

    #[test]
    fn teacher_header_falls_back_when_unnamed() {
        let schedule = TeacherSchedule::empty(Uuid::new_v4(), 2026);
        let text = render_teacher_schedule(&schedule);
        assert!(text.starts_with("Teacher (unnamed), school year 2026"));
        assert!(text.ends_with("(no lessons)\n"));
    }
}
