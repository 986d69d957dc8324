//! Subject-to-class links. A link decides which booked subjects show up in
//! a class group's own matrix, and carries its teacher assignments.

use std::collections::HashSet;

use tracing::warn;
use uuid::Uuid;

use timetable_db::models::{ClassGroup, NewSubjectClassLink, ScheduleEntry, SubjectClassLink};
use timetable_db::store::{Database, ScheduleStore};

use crate::clock::{Clock, SchoolYearResolver};
use crate::error::{ScheduleError, ScheduleResult};
use crate::invalidation::{Invalidation, teachers_on_links};
use crate::service::{Applied, Timetable};

fn check_lessons(weekly_lessons: i32) -> ScheduleResult<()> {
    if weekly_lessons < 0 {
        return Err(ScheduleError::NegativeWeeklyLessons(weekly_lessons));
    }
    Ok(())
}

async fn load_link<S: ScheduleStore>(
    store: &mut S,
    id: Uuid,
) -> ScheduleResult<(SubjectClassLink, ClassGroup)> {
    let link = store
        .get_subject_link(id)
        .await?
        .ok_or_else(|| ScheduleError::not_found("subject link", id))?;
    let class_group = store
        .get_class_group(link.class_group_id)
        .await?
        .ok_or_else(|| ScheduleError::not_found("class group", link.class_group_id))?;
    Ok((link, class_group))
}

/// Entries of `class_group`'s key booking `subject_id` whose course no longer
/// belongs to a sibling that links the subject.
async fn stale_entries<S: ScheduleStore>(
    store: &mut S,
    class_group: &ClassGroup,
    subject_id: Uuid,
) -> ScheduleResult<Vec<ScheduleEntry>> {
    let key = class_group.key();
    let entries = store.list_entries_for_key_subject(&key, subject_id).await?;
    if entries.is_empty() {
        return Ok(entries);
    }

    let siblings = store.list_siblings(&key).await?;
    let sibling_ids: Vec<Uuid> = siblings.iter().map(|cg| cg.id).collect();
    let links = store.list_links_for_class_groups(&sibling_ids).await?;
    let linked_courses: HashSet<Uuid> = siblings
        .iter()
        .filter(|cg| {
            links
                .iter()
                .any(|l| l.subject_id == subject_id && l.class_group_id == cg.id)
        })
        .map(|cg| cg.course_id)
        .collect();

    Ok(entries
        .into_iter()
        .filter(|e| !linked_courses.contains(&e.course_id))
        .collect())
}

impl<D, C, R> Timetable<D, C, R>
where
    D: Database,
    C: Clock,
    R: SchoolYearResolver,
{
    pub async fn create_subject_link(
        &self,
        new: NewSubjectClassLink,
    ) -> ScheduleResult<Applied<SubjectClassLink>> {
        check_lessons(new.weekly_lessons)?;
        let mut store = self.begin().await?;
        let class_group = store
            .get_class_group(new.class_group_id)
            .await?
            .ok_or_else(|| ScheduleError::not_found("class group", new.class_group_id))?;
        if store
            .find_subject_link(new.subject_id, new.class_group_id)
            .await?
            .is_some()
        {
            return Err(ScheduleError::DuplicateLink {
                subject_id: new.subject_id,
                class_group_id: new.class_group_id,
            });
        }

        let link = store.insert_subject_link(&new).await?;

        let mut invalidation = Invalidation::new();
        invalidation.class_group(class_group.school_year, class_group.id);
        self.finish(store, link, invalidation).await
    }

    pub async fn update_weekly_lessons(
        &self,
        id: Uuid,
        weekly_lessons: i32,
    ) -> ScheduleResult<Applied<SubjectClassLink>> {
        check_lessons(weekly_lessons)?;
        let mut store = self.begin().await?;
        let (_, class_group) = load_link(&mut store, id).await?;

        let link = store
            .update_weekly_lessons(id, weekly_lessons)
            .await?
            .ok_or_else(|| ScheduleError::not_found("subject link", id))?;
        let teachers = teachers_on_links(&mut store, &[id]).await?;

        let mut invalidation = Invalidation::new();
        invalidation
            .class_group(class_group.school_year, class_group.id)
            .teachers(class_group.school_year, teachers);
        self.finish(store, link, invalidation).await
    }

    /// Remove a link and its assignments.
    ///
    /// Entries booked for this class group's course on the unlinked subject
    /// are left in place and returned in [`Applied::stale_entries`].
    pub async fn delete_subject_link(&self, id: Uuid) -> ScheduleResult<Applied<SubjectClassLink>> {
        let mut store = self.begin().await?;
        let (link, class_group) = load_link(&mut store, id).await?;
        let teachers = teachers_on_links(&mut store, &[id]).await?;

        store.delete_subject_link(id).await?;
        let stale = stale_entries(&mut store, &class_group, link.subject_id).await?;
        for entry in &stale {
            warn!(
                entry_id = %entry.id,
                course_id = %entry.course_id,
                subject_id = %entry.subject_id,
                key = %class_group.key(),
                "schedule entry course no longer links its subject"
            );
        }

        let mut invalidation = Invalidation::new();
        invalidation
            .class_group(class_group.school_year, class_group.id)
            .teachers(class_group.school_year, teachers);
        let mut applied = self.finish(store, link, invalidation).await?;
        applied.stale_entries = stale;
        Ok(applied)
    }
}
