//! Pure state transitions over a single [`Task`].
//!
//! Every function takes the current value by reference and returns a new one;
//! none of them see the collection or touch storage.

use chrono::{DateTime, Duration, Utc};
use ulid::Ulid;

use crate::error::{ValidationError, ValidationIssue};
use crate::model::{NewTask, Placement, Quadrant, Task, TaskPatch};

pub const TITLE_MAX_CHARS: usize = 200;

/// Title rule shared by creation and updates: 1 to 200 characters once trimmed.
pub fn validate_title(title: &str) -> Result<&str, ValidationError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new("title", ValidationIssue::Empty));
    }
    let actual = trimmed.chars().count();
    if actual > TITLE_MAX_CHARS {
        return Err(ValidationError::new(
            "title",
            ValidationIssue::TooLong {
                max: TITLE_MAX_CHARS,
                actual,
            },
        ));
    }
    Ok(trimmed)
}

/// Next `updated_at`: `now`, unless the clock has not moved past `previous`.
pub fn advance(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}

pub fn create_task(data: NewTask, now: DateTime<Utc>) -> Result<Task, ValidationError> {
    let title = validate_title(&data.title)?.to_string();

    Ok(Task {
        id: Ulid::new().to_string(),
        title,
        description: data.description,
        quadrant: data.quadrant,
        is_pinned_to_today: false,
        due_date: data.due_date,
        tags: data.tags,
        created_at: now,
        updated_at: now,
        completed_at: None,
    })
}

pub fn update_task(
    task: &Task,
    patch: &TaskPatch,
    now: DateTime<Utc>,
) -> Result<Task, ValidationError> {
    let title = match patch.title.as_deref() {
        Some(title) => validate_title(title)?.to_string(),
        None => task.title.clone(),
    };

    let mut updated = task.clone();
    updated.title = title;
    if let Some(description) = &patch.description {
        updated.description = description.clone();
    }
    if let Some(quadrant) = patch.quadrant {
        updated.quadrant = quadrant;
    }
    if let Some(pinned) = patch.is_pinned_to_today {
        updated.is_pinned_to_today = pinned;
    }
    if let Some(due_date) = patch.due_date {
        updated.due_date = due_date;
    }
    if let Some(tags) = &patch.tags {
        updated.tags = tags.clone();
    }
    updated.updated_at = advance(task.updated_at, now);
    Ok(updated)
}

pub fn move_task_to_quadrant(task: &Task, quadrant: Quadrant, now: DateTime<Utc>) -> Task {
    Task {
        quadrant: Some(quadrant),
        updated_at: advance(task.updated_at, now),
        ..task.clone()
    }
}

pub fn pin_task_to_today(task: &Task, now: DateTime<Utc>) -> Task {
    Task {
        is_pinned_to_today: true,
        updated_at: advance(task.updated_at, now),
        ..task.clone()
    }
}

pub fn unpin_task_from_today(task: &Task, now: DateTime<Utc>) -> Task {
    Task {
        is_pinned_to_today: false,
        updated_at: advance(task.updated_at, now),
        ..task.clone()
    }
}

/// Drop a task on a target. Today pins it; the inbox and a quadrant both unpin it.
pub fn place_task(task: &Task, placement: Placement, now: DateTime<Utc>) -> Task {
    let (quadrant, pinned) = match placement {
        Placement::Today => (task.quadrant, true),
        Placement::Inbox => (None, false),
        Placement::Quadrant(quadrant) => (Some(quadrant), false),
    };
    Task {
        quadrant,
        is_pinned_to_today: pinned,
        updated_at: advance(task.updated_at, now),
        ..task.clone()
    }
}

/// Quadrant and pin survive completion so the log can show where the task lived.
pub fn complete_task(task: &Task, now: DateTime<Utc>) -> Task {
    Task {
        completed_at: Some(now),
        updated_at: advance(task.updated_at, now),
        ..task.clone()
    }
}

pub fn uncomplete_task(task: &Task, now: DateTime<Utc>) -> Task {
    Task {
        completed_at: None,
        updated_at: advance(task.updated_at, now),
        ..task.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 11, 9, minute, 0).unwrap()
    }

    fn sample() -> Task {
        create_task(NewTask::titled("Write report"), at(0)).unwrap()
    }

    #[test]
    fn create_sets_defaults() {
        let task = sample();
        assert_eq!(task.title, "Write report");
        assert_eq!(task.quadrant, None);
        assert!(!task.is_pinned_to_today);
        assert_eq!(task.completed_at, None);
        assert!(task.tags.is_empty());
        assert_eq!(task.created_at, task.updated_at);
        assert!(Ulid::from_string(&task.id).is_ok());
    }

    #[test]
    fn create_keeps_quadrant_tags_and_trims_title() {
        let data = NewTask {
            title: "  Plan sprint ".into(),
            quadrant: Some(Quadrant::ImportantNotUrgent),
            tags: vec!["work".into(), "work".into()],
            due_date: NaiveDate::from_ymd_opt(2026, 2, 14),
            ..NewTask::default()
        };
        let task = create_task(data, at(0)).unwrap();
        assert_eq!(task.title, "Plan sprint");
        assert_eq!(task.quadrant, Some(Quadrant::ImportantNotUrgent));
        assert_eq!(task.tags, vec!["work", "work"]);
        assert_eq!(task.due_date, NaiveDate::from_ymd_opt(2026, 2, 14));
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("\t\n")]
    fn blank_titles_are_rejected(#[case] title: &str) {
        let err = create_task(NewTask::titled(title), at(0)).unwrap_err();
        assert_eq!(err.field, "title");
        assert_eq!(err.issue, ValidationIssue::Empty);

        let task = sample();
        assert!(update_task(&task, &TaskPatch::title(title), at(1)).is_err());
        assert_eq!(task.title, "Write report");
    }

    #[test]
    fn title_length_limit_counts_characters() {
        assert!(create_task(NewTask::titled("x".repeat(200)), at(0)).is_ok());
        assert!(create_task(NewTask::titled("あ".repeat(200)), at(0)).is_ok());
        assert!(create_task(NewTask::titled(format!("  {}  ", "x".repeat(200))), at(0)).is_ok());

        let err = create_task(NewTask::titled("x".repeat(201)), at(0)).unwrap_err();
        assert_eq!(
            err.issue,
            ValidationIssue::TooLong {
                max: 200,
                actual: 201
            }
        );
    }

    #[test]
    fn update_overwrites_and_clears_fields() {
        let mut task = sample();
        task.description = Some("draft".into());
        task.due_date = NaiveDate::from_ymd_opt(2026, 2, 12);

        let patch = TaskPatch {
            title: Some(" Final report ".into()),
            description: Some(None),
            due_date: Some(None),
            tags: Some(vec!["q1".into()]),
            ..TaskPatch::default()
        };
        let updated = update_task(&task, &patch, at(5)).unwrap();
        assert_eq!(updated.title, "Final report");
        assert_eq!(updated.description, None);
        assert_eq!(updated.due_date, None);
        assert_eq!(updated.tags, vec!["q1"]);
        assert_eq!(updated.updated_at, at(5));
        assert_eq!(updated.id, task.id);
        assert_eq!(updated.created_at, task.created_at);
        assert_eq!(task.description.as_deref(), Some("draft"));
    }

    #[test]
    fn transitions_leave_input_untouched() {
        let task = sample();
        let moved = move_task_to_quadrant(&task, Quadrant::NotImportantUrgent, at(1));
        assert_eq!(moved.quadrant, Some(Quadrant::NotImportantUrgent));
        assert_eq!(task.quadrant, None);

        let pinned = pin_task_to_today(&moved, at(2));
        assert!(pinned.is_pinned_to_today);
        assert!(!moved.is_pinned_to_today);
    }

    #[test]
    fn placement_sets_quadrant_and_pin_together() {
        let task = move_task_to_quadrant(&sample(), Quadrant::ImportantUrgent, at(1));

        let today = place_task(&task, Placement::Today, at(2));
        assert!(today.is_pinned_to_today);
        assert_eq!(today.quadrant, Some(Quadrant::ImportantUrgent));

        let back = place_task(&today, Placement::Quadrant(Quadrant::ImportantNotUrgent), at(3));
        assert!(!back.is_pinned_to_today);
        assert_eq!(back.quadrant, Some(Quadrant::ImportantNotUrgent));

        let inbox = place_task(&today, Placement::Inbox, at(4));
        assert!(!inbox.is_pinned_to_today);
        assert!(inbox.is_in_inbox());
        assert_eq!(inbox.updated_at, at(4));
    }

    #[test]
    fn pinning_is_idempotent_but_still_touches() {
        let task = sample();
        let once = unpin_task_from_today(&task, at(1));
        let twice = unpin_task_from_today(&once, at(2));
        assert!(!once.is_pinned_to_today);
        assert!(!twice.is_pinned_to_today);
        assert!(twice.updated_at > once.updated_at);

        let pinned = pin_task_to_today(&pin_task_to_today(&task, at(3)), at(4));
        assert!(pinned.is_pinned_to_today);
    }

    #[test]
    fn complete_then_uncomplete_restores_and_advances() {
        let task = move_task_to_quadrant(&sample(), Quadrant::ImportantUrgent, at(1));
        let task = pin_task_to_today(&task, at(1));

        let completed = complete_task(&task, at(2));
        assert_eq!(completed.completed_at, Some(at(2)));
        assert_eq!(completed.quadrant, Some(Quadrant::ImportantUrgent));
        assert!(completed.is_pinned_to_today);

        let restored = uncomplete_task(&completed, at(3));
        assert_eq!(restored.completed_at, None);
        assert!(completed.updated_at > task.updated_at);
        assert!(restored.updated_at > completed.updated_at);
    }

    #[test]
    fn updated_at_never_regresses_on_a_stalled_clock() {
        let task = sample();
        let first = complete_task(&task, at(0));
        let second = uncomplete_task(&first, at(0));
        assert!(first.updated_at > task.updated_at);
        assert!(second.updated_at > first.updated_at);

        let backwards = pin_task_to_today(&second, task.created_at - Duration::hours(1));
        assert!(backwards.updated_at > second.updated_at);
    }
}
