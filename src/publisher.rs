//! Publication lifecycle for assignments.
//!
//! `Draft` has neither flag nor schedule, `Scheduled` waits for its
//! `scheduled_at`, `Published` is terminal. Nothing here owns a clock or a
//! timer; callers pass `now` and decide how often to `tick`.

use crate::model::{parse_tag, Assignment, UnknownTag};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishState {
    Draft,
    Scheduled,
    Published,
}

impl PublishState {
    pub fn of(a: &Assignment) -> Self {
        if a.is_published {
            PublishState::Published
        } else if a.scheduled_at.is_some() {
            PublishState::Scheduled
        } else {
            PublishState::Draft
        }
    }

}

impl FromStr for PublishState {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_tag(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PublishError {
    #[error("scheduled time {when} must be after {now}")]
    ScheduleInPast {
        when: DateTime<Utc>,
        now: DateTime<Utc>,
    },
    #[error("assignment {0} is not scheduled")]
    NotScheduled(String),
    #[error("assignment {0} is already published")]
    AlreadyPublished(String),
}

impl PublishError {
    pub fn code(&self) -> &'static str {
        match self {
            PublishError::ScheduleInPast { .. } => "schedule_in_past",
            PublishError::NotScheduled(_) => "not_scheduled",
            PublishError::AlreadyPublished(_) => "already_published",
        }
    }
}

/// Sets the initial state: published immediately, or scheduled for `schedule`.
pub fn create(
    mut assignment: Assignment,
    schedule: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<Assignment, PublishError> {
    match schedule {
        None => {
            assignment.is_published = true;
            assignment.scheduled_at = None;
        }
        Some(when) => {
            if when <= now {
                return Err(PublishError::ScheduleInPast { when, now });
            }
            assignment.is_published = false;
            assignment.scheduled_at = Some(when);
        }
    }
    Ok(assignment)
}

/// Publishes every scheduled assignment that is due. Returns the ids it
/// flipped; already-published and draft assignments are left alone.
pub fn tick(now: DateTime<Utc>, assignments: &mut [Assignment]) -> Vec<String> {
    let mut published = Vec::new();
    for a in assignments.iter_mut() {
        if PublishState::of(a) != PublishState::Scheduled {
            continue;
        }
        if a.scheduled_at.is_some_and(|when| when <= now) {
            a.is_published = true;
            info!(assignment_id = %a.id, title = %a.title, "scheduled assignment published");
            published.push(a.id.clone());
        }
    }
    published
}

pub fn reschedule(
    assignment: &mut Assignment,
    new_when: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), PublishError> {
    if PublishState::of(assignment) != PublishState::Scheduled {
        return Err(PublishError::NotScheduled(assignment.id.clone()));
    }
    if new_when <= now {
        return Err(PublishError::ScheduleInPast {
            when: new_when,
            now,
        });
    }
    assignment.scheduled_at = Some(new_when);
    Ok(())
}

pub fn publish_now(assignment: &mut Assignment) -> Result<(), PublishError> {
    if assignment.is_published {
        return Err(PublishError::AlreadyPublished(assignment.id.clone()));
    }
    assignment.is_published = true;
    assignment.scheduled_at = None;
    Ok(())
}
