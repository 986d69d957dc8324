//! Weekly matrix of one class group.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::debug;
use uuid::Uuid;

use timetable_db::models::TeacherAssignment;

use crate::matrix::{ClassCell, ClassSchedule, ScheduleMatrix, SiblingInfo};
use crate::snapshot::YearSnapshot;

/// Pick the teacher in charge on `today`: lowest priority tier among the
/// active assignments, then earliest created, then smallest id.
pub fn resolve_active_teacher<'a>(
    assignments: impl IntoIterator<Item = &'a TeacherAssignment>,
    today: NaiveDate,
) -> Option<&'a TeacherAssignment> {
    assignments
        .into_iter()
        .filter(|a| a.is_active_on(today))
        .min_by_key(|a| (a.priority, a.created_at, a.id))
}

/// Build the matrix of `class_group_id` for `today`.
///
/// Returns `None` when the class group is not in the snapshot or when no
/// validity period of its key covers `today`. Entries whose slot or subject
/// is missing from the snapshot are dropped.
pub fn build_class_schedule(
    snapshot: &YearSnapshot,
    class_group_id: Uuid,
    today: NaiveDate,
) -> Option<ClassSchedule> {
    let class_group = snapshot.class_groups.get(&class_group_id)?;
    let key = class_group.key();
    let Some(period) = snapshot.period_covering(&key, today) else {
        debug!(%class_group_id, %key, %today, "no validity period covers today");
        return None;
    };

    let mut lessons: Vec<_> = snapshot
        .entries_of(period.id)
        .iter()
        .filter_map(|entry| {
            let link = snapshot.link_for(entry.subject_id, class_group_id)?;
            let slot = snapshot.time_slots.get(&entry.time_slot_id)?;
            let subject = snapshot.subjects.get(&entry.subject_id)?;
            Some((slot, subject, entry, link))
        })
        .collect();
    lessons.sort_by_key(|(slot, ..)| (slot.weekday, slot.start_time, slot.id));

    let mut matrix: ScheduleMatrix<ClassCell> = ScheduleMatrix::new();
    matrix.note_slots(snapshot.slots_in_week_order());
    for (slot, subject, entry, link) in lessons {
        let teacher = resolve_active_teacher(snapshot.assignments_on_link(link.id), today)
            .and_then(|a| snapshot.teachers.get(&a.teacher_id));

        matrix.insert(
            slot.sequence_number,
            slot.weekday,
            ClassCell {
                subject_id: subject.id,
                subject_code: subject.code.clone(),
                subject_name: subject.name.clone(),
                course_id: entry.course_id,
                teacher_id: teacher.map(|t| t.id),
                teacher_name: teacher.map(|t| t.name.clone()),
            },
        );
    }

    let siblings: BTreeMap<Uuid, SiblingInfo> = snapshot
        .index
        .siblings(&key)
        .iter()
        .filter_map(|id| {
            let sibling = snapshot.class_groups.get(id)?;
            let course = snapshot.courses.get(&sibling.course_id)?;
            Some((
                *id,
                SiblingInfo {
                    course_code: course.code.clone(),
                    course_name: course.name.clone(),
                    display_name: format!("{} {}", key.label(), course.code),
                },
            ))
        })
        .collect();

    Some(ClassSchedule {
        class_group_id,
        label: key.label(),
        validity_period_id: period.id,
        period_start: period.date_start,
        period_end: period.date_end,
        matrix,
        siblings,
    })
}
