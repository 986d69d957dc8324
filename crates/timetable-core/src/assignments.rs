//! Teacher assignments on subject links.

use uuid::Uuid;

use timetable_db::models::{NewTeacherAssignment, TeacherAssignment};
use timetable_db::store::{Database, ScheduleStore};

use crate::clock::{Clock, SchoolYearResolver};
use crate::error::{ScheduleError, ScheduleResult};
use crate::invalidation::Invalidation;
use crate::service::{Applied, Timetable};

fn check_window(new: &NewTeacherAssignment) -> ScheduleResult<()> {
    match new.active_to {
        Some(to) if to < new.active_from => Err(ScheduleError::DateRangeReversed {
            start: new.active_from,
            end: to,
        }),
        _ => Ok(()),
    }
}

/// School year of the class group behind `link_id`, if both still exist.
async fn link_year<S: ScheduleStore>(store: &mut S, link_id: Uuid) -> ScheduleResult<Option<(i32, Uuid)>> {
    let Some(link) = store.get_subject_link(link_id).await? else {
        return Ok(None);
    };
    Ok(store
        .get_class_group(link.class_group_id)
        .await?
        .map(|cg| (cg.school_year, cg.id)))
}

/// Validate the references of `new`; returns the school year and class
/// group the assignment lands in.
async fn check_refs<S: ScheduleStore>(
    store: &mut S,
    new: &NewTeacherAssignment,
) -> ScheduleResult<(i32, Uuid)> {
    let target = link_year(store, new.subject_class_link_id)
        .await?
        .ok_or_else(|| ScheduleError::not_found("subject link", new.subject_class_link_id))?;
    if store.get_teacher(new.teacher_id).await?.is_none() {
        return Err(ScheduleError::not_found("teacher", new.teacher_id));
    }
    Ok(target)
}

impl<D, C, R> Timetable<D, C, R>
where
    D: Database,
    C: Clock,
    R: SchoolYearResolver,
{
    pub async fn create_teacher_assignment(
        &self,
        new: NewTeacherAssignment,
    ) -> ScheduleResult<Applied<TeacherAssignment>> {
        check_window(&new)?;
        let mut store = self.begin().await?;
        let (school_year, class_group_id) = check_refs(&mut store, &new).await?;

        let assignment = store.insert_assignment(&new).await?;

        let mut invalidation = Invalidation::new();
        invalidation
            .class_group(school_year, class_group_id)
            .teacher(school_year, assignment.teacher_id);
        self.finish(store, assignment, invalidation).await
    }

    /// Change an assignment. The class group and teacher it used to point at
    /// are rebuilt along with the new ones.
    pub async fn update_teacher_assignment(
        &self,
        id: Uuid,
        new: NewTeacherAssignment,
    ) -> ScheduleResult<Applied<TeacherAssignment>> {
        check_window(&new)?;
        let mut store = self.begin().await?;
        let old = store
            .get_assignment(id)
            .await?
            .ok_or_else(|| ScheduleError::not_found("teacher assignment", id))?;
        let old_target = link_year(&mut store, old.subject_class_link_id).await?;
        let (school_year, class_group_id) = check_refs(&mut store, &new).await?;

        let assignment = store
            .update_assignment(id, &new)
            .await?
            .ok_or_else(|| ScheduleError::not_found("teacher assignment", id))?;

        let mut invalidation = Invalidation::new();
        if let Some((old_year, old_class_group)) = old_target {
            invalidation
                .class_group(old_year, old_class_group)
                .teacher(old_year, old.teacher_id);
        }
        invalidation
            .class_group(school_year, class_group_id)
            .teacher(school_year, assignment.teacher_id);
        self.finish(store, assignment, invalidation).await
    }

    pub async fn delete_teacher_assignment(
        &self,
        id: Uuid,
    ) -> ScheduleResult<Applied<TeacherAssignment>> {
        let mut store = self.begin().await?;
        let assignment = store
            .get_assignment(id)
            .await?
            .ok_or_else(|| ScheduleError::not_found("teacher assignment", id))?;
        let target = link_year(&mut store, assignment.subject_class_link_id).await?;

        store.delete_assignment(id).await?;

        let mut invalidation = Invalidation::new();
        if let Some((school_year, class_group_id)) = target {
            invalidation
                .class_group(school_year, class_group_id)
                .teacher(school_year, assignment.teacher_id);
        }
        self.finish(store, assignment, invalidation).await
    }
}
