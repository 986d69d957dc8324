//! Weekly matrix of one teacher.

use chrono::NaiveDate;
use tracing::debug;
use uuid::Uuid;

use crate::matrix::{ClassRef, ScheduleMatrix, TeacherCell, TeacherSchedule};
use crate::snapshot::YearSnapshot;

/// Build the matrix of `teacher_id` for `today` from every assignment the
/// teacher holds in the snapshot's year.
///
/// Assignments whose class key has no period covering `today` contribute
/// nothing. Lessons of several assignments that land on the same slot and
/// weekday are merged into one cell.
pub fn build_teacher_schedule(
    snapshot: &YearSnapshot,
    teacher_id: Uuid,
    today: NaiveDate,
) -> TeacherSchedule {
    let mut lessons = Vec::new();

    for assignment in snapshot
        .assignments_of_teacher(teacher_id)
        .filter(|a| a.is_active_on(today))
    {
        let Some(link) = snapshot.link(assignment.subject_class_link_id) else {
            continue;
        };
        let Some(class_group) = snapshot.class_groups.get(&link.class_group_id) else {
            continue;
        };
        let key = class_group.key();
        let Some(period) = snapshot.period_covering(&key, today) else {
            debug!(%teacher_id, %key, "assignment has no period covering today");
            continue;
        };

        for entry in snapshot
            .entries_of(period.id)
            .iter()
            .filter(|e| e.subject_id == link.subject_id)
        {
            let (Some(slot), Some(subject)) = (
                snapshot.time_slots.get(&entry.time_slot_id),
                snapshot.subjects.get(&entry.subject_id),
            ) else {
                continue;
            };
            lessons.push((
                slot,
                TeacherCell {
                    subject_id: Some(subject.id),
                    subject_code: subject.code.clone(),
                    subject_name: subject.name.clone(),
                    classes: vec![ClassRef {
                        label: key.label(),
                        course_code: snapshot.course_code(class_group.course_id).to_owned(),
                    }],
                    class_group_id: Some(class_group.id),
                },
            ));
        }
    }

    lessons.sort_by_key(|(slot, cell)| (slot.weekday, slot.start_time, slot.id, cell.class_group_id));

    let mut matrix: ScheduleMatrix<TeacherCell> = ScheduleMatrix::new();
    matrix.note_slots(snapshot.slots_in_week_order());
    for (slot, cell) in lessons {
        match matrix.cell_mut(slot.sequence_number, slot.weekday) {
            Some(existing) => existing.merge(cell),
            None => matrix.insert(slot.sequence_number, slot.weekday, cell),
        }
    }

    TeacherSchedule {
        teacher_id,
        teacher_name: snapshot.teachers.get(&teacher_id).map(|t| t.name.clone()),
        school_year: snapshot.school_year,
        matrix,
    }
}
