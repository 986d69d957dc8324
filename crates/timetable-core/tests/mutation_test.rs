//! Integration tests for write-side validation and invalidation: slot
//! renumbering, period overlap, double booking, course resolution, link
//! removal, and rollback of rejected writes.

mod common;

use timetable_core::{ClassSchedule, ScheduleError};
use timetable_db::models::{
    ClassGroupKey, NewTeacherAssignment, NewTimeSlot, NewValidityPeriod, Priority, Weekday,
};

use common::{Fixture, YEAR, date, entry_input, time, today};

// ===========================================================================
// Time slots
// ===========================================================================

#[tokio::test]
async fn slots_are_numbered_by_start_time() {
    let f = Fixture::new();
    let late = f.slot(Weekday::Monday, time(8, 40), time(9, 30)).await;
    let early = f.slot(Weekday::Monday, time(7, 0), time(7, 50)).await;
    let tuesday = f.slot(Weekday::Tuesday, time(9, 0), time(9, 50)).await;

    let slots = f.tt.list_time_slots(YEAR).await.expect("list");
    let numbered: Vec<(Weekday, i32)> = slots.iter().map(|s| (s.weekday, s.sequence_number)).collect();
    assert_eq!(
        numbered,
        vec![(Weekday::Monday, 1), (Weekday::Monday, 2), (Weekday::Tuesday, 1)]
    );
    assert_eq!(slots[0].id, early.id);
    assert_eq!(slots[1].id, late.id);
    assert_eq!(slots[2].id, tuesday.id);
}

#[tokio::test]
async fn deleting_middle_slot_shifts_last_and_rebuilds_year() {
    let f = Fixture::new();
    let unrelated = f.db.add_class_group(&ClassGroupKey::new(YEAR, 2, "B"), f.em.id);
    let first = f.slot(Weekday::Monday, time(7, 0), time(7, 50)).await;
    let middle = f.slot(Weekday::Monday, time(7, 50), time(8, 40)).await;
    let last = f.slot(Weekday::Monday, time(8, 40), time(9, 30)).await;
    assert_eq!(
        [first.sequence_number, middle.sequence_number, last.sequence_number],
        [1, 2, 3]
    );

    let period = f.school_term().await;
    f.link(&f.mat, &f.class_em).await;
    f.book(&period, &last, &f.mat).await;
    let unrelated_generation = f.db.class_cache(unrelated.id).expect("row").generation;

    let applied = f.tt.delete_time_slot(middle.id).await.expect("delete");
    assert_eq!(applied.record.id, middle.id);

    let slots = f.db.time_slots(YEAR);
    let shifted = slots.iter().find(|s| s.id == last.id).expect("last kept");
    assert_eq!(shifted.sequence_number, 2);

    // Full-year rebuild reaches class groups the slot never touched.
    assert!(applied.rebuilt.class_groups.contains(&unrelated.id));
    assert_eq!(
        f.db.class_cache(unrelated.id).expect("row").generation,
        unrelated_generation + 1
    );

    let schedule: ClassSchedule = serde_json::from_value(
        f.db.class_cache(f.class_em.id)
            .and_then(|r| r.schedule)
            .expect("schedule"),
    )
    .expect("decode");
    assert!(schedule.matrix.get(3, Weekday::Monday).is_none());
    assert_eq!(
        schedule.matrix.get(2, Weekday::Monday).map(|c| c.subject_code.as_str()),
        Some("MAT")
    );
    assert_eq!(schedule.matrix.legend[&2].start_time, time(8, 40));
    assert_eq!(schedule.matrix.legend.len(), 2);
}

#[tokio::test]
async fn deleting_slot_removes_its_entries() {
    let f = Fixture::new();
    let slot = f.slot(Weekday::Monday, time(7, 0), time(7, 50)).await;
    let period = f.school_term().await;
    f.link(&f.mat, &f.class_em).await;
    f.book(&period, &slot, &f.mat).await;

    f.tt.delete_time_slot(slot.id).await.expect("delete");
    assert!(f.db.schedule_entries().is_empty());
}

#[tokio::test]
async fn moving_slot_renumbers_both_days() {
    let f = Fixture::new();
    let a = f.slot(Weekday::Monday, time(7, 0), time(7, 50)).await;
    let b = f.slot(Weekday::Monday, time(7, 50), time(8, 40)).await;
    let c = f.slot(Weekday::Tuesday, time(9, 0), time(9, 50)).await;

    let moved = f
        .tt
        .update_time_slot(
            a.id,
            NewTimeSlot {
                school_year: YEAR,
                weekday: Weekday::Tuesday,
                start_time: time(7, 0),
                end_time: time(7, 50),
            },
        )
        .await
        .expect("move")
        .record;
    assert_eq!(moved.weekday, Weekday::Tuesday);
    assert_eq!(moved.sequence_number, 1);

    let slots = f.db.time_slots(YEAR);
    let number_of = |id: uuid::Uuid| {
        slots
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.sequence_number)
    };
    assert_eq!(number_of(b.id), Some(1));
    assert_eq!(number_of(c.id), Some(2));
}

#[tokio::test]
async fn booked_slot_cannot_change_school_year() {
    let f = Fixture::new();
    let slot = f.slot(Weekday::Monday, time(7, 0), time(7, 50)).await;
    let period = f.school_term().await;
    f.link(&f.mat, &f.class_em).await;
    f.book(&period, &slot, &f.mat).await;
    let commits = f.db.commits();

    let next_year = NewTimeSlot {
        school_year: YEAR + 1,
        weekday: Weekday::Monday,
        start_time: time(7, 0),
        end_time: time(7, 50),
    };
    let moved = f.tt.update_time_slot(slot.id, next_year.clone()).await;
    assert!(matches!(
        moved,
        Err(ScheduleError::SchoolYearMismatch {
            slot_year: 2027,
            period_year: 2026
        })
    ));
    assert_eq!(f.db.commits(), commits);
    assert_eq!(f.db.time_slots(YEAR).len(), 1);
    assert_eq!(f.db.schedule_entries().len(), 1);

    // Without bookings the move goes through.
    let free = f.slot(Weekday::Friday, time(7, 0), time(7, 50)).await;
    let moved = f
        .tt
        .update_time_slot(free.id, next_year)
        .await
        .expect("unbooked slot moves")
        .record;
    assert_eq!(moved.school_year, YEAR + 1);
}

#[tokio::test]
async fn slot_validation() {
    let f = Fixture::new();
    f.slot(Weekday::Monday, time(7, 0), time(7, 50)).await;
    let commits = f.db.commits();

    let duplicate = f
        .tt
        .create_time_slot(NewTimeSlot {
            school_year: YEAR,
            weekday: Weekday::Monday,
            start_time: time(7, 0),
            end_time: time(8, 0),
        })
        .await;
    assert!(matches!(duplicate, Err(ScheduleError::DuplicateTimeSlot { .. })));

    let reversed = f
        .tt
        .create_time_slot(NewTimeSlot {
            school_year: YEAR,
            weekday: Weekday::Monday,
            start_time: time(9, 0),
            end_time: time(9, 0),
        })
        .await;
    assert!(matches!(reversed, Err(ScheduleError::SlotTimesReversed { .. })));

    assert_eq!(f.db.commits(), commits);
    assert_eq!(f.db.time_slots(YEAR).len(), 1);
}

// ===========================================================================
// Validity periods
// ===========================================================================

#[tokio::test]
async fn overlapping_periods_are_rejected() {
    let f = Fixture::new();
    f.period(&f.key, date(2, 1), date(6, 30)).await;

    let touching = f
        .tt
        .create_validity_period(NewValidityPeriod {
            key: f.key.clone(),
            date_start: date(6, 30),
            date_end: date(12, 15),
        })
        .await;
    assert!(matches!(touching, Err(ScheduleError::OverlappingPeriod { .. })));

    let adjacent = f.period(&f.key, date(7, 1), date(12, 15)).await;
    assert_eq!(adjacent.date_start, date(7, 1));

    // Other keys do not clash.
    f.period(&ClassGroupKey::new(YEAR, 2, "A"), date(2, 1), date(6, 30)).await;
}

#[tokio::test]
async fn period_update_ignores_itself_but_not_others() {
    let f = Fixture::new();
    let first = f.period(&f.key, date(2, 1), date(6, 30)).await;
    f.period(&f.key, date(8, 1), date(12, 15)).await;

    let grown = f
        .tt
        .update_validity_period(
            first.id,
            NewValidityPeriod {
                key: f.key.clone(),
                date_start: date(2, 1),
                date_end: date(7, 31),
            },
        )
        .await
        .expect("grow within gap");
    assert_eq!(grown.record.date_end, date(7, 31));

    let clash = f
        .tt
        .update_validity_period(
            first.id,
            NewValidityPeriod {
                key: f.key.clone(),
                date_start: date(2, 1),
                date_end: date(8, 1),
            },
        )
        .await;
    assert!(matches!(clash, Err(ScheduleError::OverlappingPeriod { .. })));
}

#[tokio::test]
async fn reversed_period_is_rejected() {
    let f = Fixture::new();
    let result = f
        .tt
        .create_validity_period(NewValidityPeriod {
            key: f.key.clone(),
            date_start: date(6, 1),
            date_end: date(5, 31),
        })
        .await;
    assert!(matches!(result, Err(ScheduleError::DateRangeReversed { .. })));
}

#[tokio::test]
async fn period_key_change_revalidates_its_entries() {
    let f = Fixture::new();
    let slot = f.slot(Weekday::Monday, time(7, 0), time(7, 50)).await;
    let period = f.school_term().await;
    f.link(&f.mat, &f.class_em).await;
    f.book(&period, &slot, &f.mat).await;
    let commits = f.db.commits();

    let moved_to = |key: ClassGroupKey| NewValidityPeriod {
        key,
        date_start: date(2, 1),
        date_end: date(12, 15),
    };

    let other_year = f
        .tt
        .update_validity_period(period.id, moved_to(ClassGroupKey::new(YEAR + 1, 9, "Z")))
        .await;
    assert!(matches!(
        other_year,
        Err(ScheduleError::SchoolYearMismatch {
            slot_year: 2026,
            period_year: 2027
        })
    ));

    let key_b = ClassGroupKey::new(YEAR, 1, "B");
    let unlinked = f
        .tt
        .update_validity_period(period.id, moved_to(key_b.clone()))
        .await;
    assert!(matches!(unlinked, Err(ScheduleError::SubjectNotLinked { .. })));

    let class_b_tec = f.db.add_class_group(&key_b, f.tec.id);
    f.link(&f.mat, &class_b_tec).await;
    let wrong_course = f
        .tt
        .update_validity_period(period.id, moved_to(key_b.clone()))
        .await;
    assert!(matches!(wrong_course, Err(ScheduleError::CourseNotLinked { .. })));

    // Only the link committed; the rejected moves left the period alone.
    assert_eq!(f.db.commits(), commits + 1);
    assert_eq!(f.db.schedule_entries()[0].validity_period_id, period.id);

    let class_b_em = f.db.add_class_group(&key_b, f.em.id);
    f.link(&f.mat, &class_b_em).await;
    let applied = f
        .tt
        .update_validity_period(period.id, moved_to(key_b))
        .await
        .expect("entries fit the new key");
    assert!(applied.rebuilt.class_groups.contains(&f.class_em.id));
    assert!(applied.rebuilt.class_groups.contains(&class_b_em.id));

    let schedule: ClassSchedule = f
        .tt
        .get_class_group_schedule(class_b_em.id, today())
        .await
        .expect("read")
        .expect("covered");
    assert_eq!(schedule.matrix.cell_count(), 1);
    assert!(
        f.tt
            .get_class_group_schedule(f.class_em.id, today())
            .await
            .expect("read")
            .is_none()
    );
}

#[tokio::test]
async fn period_without_entries_may_change_key() {
    let f = Fixture::new();
    let period = f.school_term().await;
    let moved = f
        .tt
        .update_validity_period(
            period.id,
            NewValidityPeriod {
                key: ClassGroupKey::new(YEAR + 1, 9, "Z"),
                date_start: date(2, 1),
                date_end: date(12, 15),
            },
        )
        .await
        .expect("empty period moves")
        .record;
    assert_eq!(moved.key(), ClassGroupKey::new(YEAR + 1, 9, "Z"));
}

#[tokio::test]
async fn period_change_rebuilds_siblings_and_their_teachers() {
    let f = Fixture::new();
    let class_tec = f.add_tec_sibling();
    let link = f.link(&f.phy, &class_tec).await;
    f.assign(&f.bruno, &link, Priority::Primary).await;

    let applied = f
        .tt
        .create_validity_period(NewValidityPeriod {
            key: f.key.clone(),
            date_start: date(2, 1),
            date_end: date(12, 15),
        })
        .await
        .expect("create period");

    assert!(applied.rebuilt.class_groups.contains(&f.class_em.id));
    assert!(applied.rebuilt.class_groups.contains(&class_tec.id));
    assert_eq!(applied.rebuilt.teachers, vec![f.bruno.id]);
}

#[tokio::test]
async fn deleting_period_clears_schedule() {
    let f = Fixture::new();
    let slot = f.slot(Weekday::Monday, time(7, 0), time(7, 50)).await;
    let period = f.school_term().await;
    f.link(&f.mat, &f.class_em).await;
    f.book(&period, &slot, &f.mat).await;

    f.tt.delete_validity_period(period.id).await.expect("delete");
    assert!(f.db.schedule_entries().is_empty());
    let row = f.db.class_cache(f.class_em.id).expect("row");
    assert!(row.schedule.is_none());
}

// ===========================================================================
// Schedule entries
// ===========================================================================

#[tokio::test]
async fn double_booking_is_rejected() {
    let f = Fixture::new();
    let slot = f.slot(Weekday::Monday, time(7, 0), time(7, 50)).await;
    let period = f.school_term().await;
    f.link(&f.mat, &f.class_em).await;
    f.link(&f.phy, &f.class_em).await;
    let first = f.book(&period, &slot, &f.mat).await;
    let commits = f.db.commits();

    let second = f
        .tt
        .create_schedule_entry(entry_input(&period, &slot, &f.phy, None))
        .await;
    match second {
        Err(ScheduleError::SlotAlreadyBooked { existing, .. }) => {
            assert_eq!(existing, first.record.id)
        }
        other => panic!("expected SlotAlreadyBooked, got {other:?}"),
    }
    assert_eq!(f.db.commits(), commits);
    assert_eq!(f.db.schedule_entries().len(), 1);
}

#[tokio::test]
async fn rebooking_same_entry_is_not_double_booking() {
    let f = Fixture::new();
    let slot = f.slot(Weekday::Monday, time(7, 0), time(7, 50)).await;
    let period = f.school_term().await;
    f.link(&f.mat, &f.class_em).await;
    f.link(&f.phy, &f.class_em).await;
    let entry = f.book(&period, &slot, &f.mat).await.record;

    let updated = f
        .tt
        .update_schedule_entry(entry.id, entry_input(&period, &slot, &f.phy, None))
        .await
        .expect("swap subject in place")
        .record;
    assert_eq!(updated.subject_id, f.phy.id);
}

#[tokio::test]
async fn unlinked_subject_is_rejected() {
    let f = Fixture::new();
    let slot = f.slot(Weekday::Monday, time(7, 0), time(7, 50)).await;
    let period = f.school_term().await;

    let err = f
        .tt
        .create_schedule_entry(entry_input(&period, &slot, &f.mat, None))
        .await
        .expect_err("no sibling links MAT");
    assert!(matches!(err, ScheduleError::SubjectNotLinked { .. }));
    assert_eq!(err.to_string(), "subject not linked to any sibling class");
}

#[tokio::test]
async fn explicit_course_must_link_subject() {
    let f = Fixture::new();
    let class_tec = f.add_tec_sibling();
    let slot = f.slot(Weekday::Monday, time(7, 0), time(7, 50)).await;
    let other = f.slot(Weekday::Monday, time(8, 0), time(8, 50)).await;
    let period = f.school_term().await;
    f.link(&f.mat, &f.class_em).await;
    f.link(&f.mat, &class_tec).await;
    f.link(&f.phy, &class_tec).await;

    let explicit = f
        .tt
        .create_schedule_entry(entry_input(&period, &slot, &f.mat, Some(f.tec.id)))
        .await
        .expect("TEC links MAT")
        .record;
    assert_eq!(explicit.course_id, f.tec.id);

    let wrong = f
        .tt
        .create_schedule_entry(entry_input(&period, &other, &f.phy, Some(f.em.id)))
        .await;
    assert!(matches!(wrong, Err(ScheduleError::CourseNotLinked { .. })));
}

#[tokio::test]
async fn inferred_course_follows_course_code_order() {
    let f = Fixture::new();
    let class_tec = f.add_tec_sibling();
    let slot = f.slot(Weekday::Monday, time(7, 0), time(7, 50)).await;
    let period = f.school_term().await;
    f.link(&f.mat, &class_tec).await;
    f.link(&f.mat, &f.class_em).await;

    let entry = f.book(&period, &slot, &f.mat).await.record;
    assert_eq!(entry.course_id, f.em.id);
}

#[tokio::test]
async fn slot_and_period_must_share_school_year() {
    let f = Fixture::new();
    let period = f.school_term().await;
    f.link(&f.mat, &f.class_em).await;
    let old_slot = f
        .tt
        .create_time_slot(NewTimeSlot {
            school_year: YEAR - 1,
            weekday: Weekday::Monday,
            start_time: time(7, 0),
            end_time: time(7, 50),
        })
        .await
        .expect("slot")
        .record;

    let result = f
        .tt
        .create_schedule_entry(entry_input(&period, &old_slot, &f.mat, None))
        .await;
    assert!(matches!(
        result,
        Err(ScheduleError::SchoolYearMismatch {
            slot_year: 2025,
            period_year: 2026
        })
    ));
}

#[tokio::test]
async fn entry_change_rebuilds_teachers_of_that_subject_only() {
    let f = Fixture::new();
    let slot = f.slot(Weekday::Monday, time(7, 0), time(7, 50)).await;
    let period = f.school_term().await;
    let mat_link = f.link(&f.mat, &f.class_em).await;
    let phy_link = f.link(&f.phy, &f.class_em).await;
    f.assign(&f.ana, &mat_link, Priority::Primary).await;
    f.assign(&f.bruno, &phy_link, Priority::Primary).await;

    let applied = f.book(&period, &slot, &f.mat).await;
    assert_eq!(applied.rebuilt.teachers, vec![f.ana.id]);
    assert_eq!(applied.rebuilt.class_groups, vec![f.class_em.id]);
}

// ===========================================================================
// Links and assignments
// ===========================================================================

#[tokio::test]
async fn removing_link_reports_stale_entries() {
    let f = Fixture::new();
    let slot = f.slot(Weekday::Monday, time(7, 0), time(7, 50)).await;
    let period = f.school_term().await;
    let link = f.link(&f.mat, &f.class_em).await;
    f.assign(&f.ana, &link, Priority::Primary).await;
    let entry = f.book(&period, &slot, &f.mat).await.record;

    let applied = f.tt.delete_subject_link(link.id).await.expect("unlink");
    assert_eq!(applied.stale_entries.len(), 1);
    assert_eq!(applied.stale_entries[0].id, entry.id);
    assert!(applied.rebuilt.teachers.contains(&f.ana.id));

    // The entry stays with its recorded course; the assignment is gone.
    assert_eq!(f.db.schedule_entries()[0].course_id, f.em.id);
    assert!(f.db.assignments().is_empty());

    let class = f
        .tt
        .get_class_group_schedule(f.class_em.id, today())
        .await
        .expect("read")
        .expect("period still covers today");
    assert!(class.matrix.is_empty());

    let teacher = f.tt.get_teacher_schedule(f.ana.id, today()).await.expect("read");
    assert!(teacher.matrix.is_empty());
}

#[tokio::test]
async fn removing_link_with_another_linking_sibling_is_not_stale() {
    let f = Fixture::new();
    let class_tec = f.add_tec_sibling();
    let slot = f.slot(Weekday::Monday, time(7, 0), time(7, 50)).await;
    let period = f.school_term().await;
    f.link(&f.mat, &f.class_em).await;
    let tec_link = f.link(&f.mat, &class_tec).await;
    f.book(&period, &slot, &f.mat).await;

    let applied = f.tt.delete_subject_link(tec_link.id).await.expect("unlink");
    assert!(applied.stale_entries.is_empty());
}

#[tokio::test]
async fn link_validation() {
    let f = Fixture::new();
    f.link(&f.mat, &f.class_em).await;

    let duplicate = f
        .tt
        .create_subject_link(timetable_db::models::NewSubjectClassLink {
            subject_id: f.mat.id,
            class_group_id: f.class_em.id,
            weekly_lessons: 2,
        })
        .await;
    assert!(matches!(duplicate, Err(ScheduleError::DuplicateLink { .. })));

    let negative = f
        .tt
        .create_subject_link(timetable_db::models::NewSubjectClassLink {
            subject_id: f.phy.id,
            class_group_id: f.class_em.id,
            weekly_lessons: -1,
        })
        .await;
    assert!(matches!(negative, Err(ScheduleError::NegativeWeeklyLessons(-1))));
}

#[tokio::test]
async fn assignment_window_must_not_be_reversed() {
    let f = Fixture::new();
    let link = f.link(&f.mat, &f.class_em).await;

    let result = f
        .tt
        .create_teacher_assignment(NewTeacherAssignment {
            teacher_id: f.ana.id,
            subject_class_link_id: link.id,
            priority: Priority::Primary,
            active_from: date(5, 1),
            active_to: Some(date(4, 30)),
        })
        .await;
    assert!(matches!(result, Err(ScheduleError::DateRangeReversed { .. })));
    assert!(f.db.assignments().is_empty());
}

#[tokio::test]
async fn reassigning_rebuilds_old_and_new_teacher() {
    let f = Fixture::new();
    let link = f.link(&f.mat, &f.class_em).await;
    let assignment = f.assign(&f.ana, &link, Priority::Primary).await;

    let applied = f
        .tt
        .update_teacher_assignment(
            assignment.id,
            NewTeacherAssignment {
                teacher_id: f.bruno.id,
                subject_class_link_id: link.id,
                priority: Priority::Primary,
                active_from: date(2, 1),
                active_to: None,
            },
        )
        .await
        .expect("reassign");

    let mut teachers = applied.rebuilt.teachers.clone();
    teachers.sort();
    let mut expected = vec![f.ana.id, f.bruno.id];
    expected.sort();
    assert_eq!(teachers, expected);
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let f = Fixture::new();
    let missing = uuid::Uuid::new_v4();

    assert!(matches!(
        f.tt.delete_time_slot(missing).await,
        Err(ScheduleError::NotFound { entity: "time slot", .. })
    ));
    assert!(matches!(
        f.tt.delete_subject_link(missing).await,
        Err(ScheduleError::NotFound { entity: "subject link", .. })
    ));
    assert!(matches!(
        f.tt.get_teacher_schedule(missing, today()).await,
        Err(ScheduleError::NotFound { entity: "teacher", .. })
    ));
}
