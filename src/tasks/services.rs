use tracing::warn;
use uuid::Uuid;

use crate::state::AppState;
use crate::tasks::repo::{self, Task, TaskPatch};

/// Create a task and send the best-effort "created" email. A mail failure
/// never fails the creation.
pub async fn create_task(
    state: &AppState,
    user_id: Uuid,
    title: &str,
    description: Option<&str>,
    due_at: time::OffsetDateTime,
    reminder_at: time::OffsetDateTime,
) -> anyhow::Result<Task> {
    let task = repo::create(&state.db, user_id, title, description, due_at, reminder_at).await?;

    match owner_email(state, user_id).await {
        Some(email) => {
            if let Err(e) = state.notifier().task_created(&email, &task).await {
                warn!(error = %e, task_id = %task.id, "created email failed");
            }
        }
        None => warn!(%user_id, "no owner email, created email skipped"),
    }

    Ok(task)
}

/// Apply an owner-scoped partial update. Returns `None` for a missing or
/// foreign task. The "completed" email fires only on the false → true
/// transition of `is_completed`, detected against the fetched prior state.
pub async fn update_task(
    state: &AppState,
    user_id: Uuid,
    task_id: Uuid,
    patch: TaskPatch,
) -> anyhow::Result<Option<Task>> {
    let Some(prior) = repo::find_owned(&state.db, user_id, task_id).await? else {
        return Ok(None);
    };

    let Some(updated) = repo::update(&state.db, user_id, task_id, &patch).await? else {
        return Ok(None);
    };

    if completion_transition(prior.is_completed, patch.is_completed) {
        match owner_email(state, user_id).await {
            Some(email) => {
                if let Err(e) = state.notifier().task_completed(&email, &prior.title).await {
                    warn!(error = %e, task_id = %task_id, "completed email failed");
                }
            }
            None => warn!(%user_id, "no owner email, completed email skipped"),
        }
    }

    Ok(Some(updated))
}

/// True only for the false → true completion transition.
pub(crate) fn completion_transition(prior_completed: bool, patched: Option<bool>) -> bool {
    !prior_completed && patched == Some(true)
}

/// Best-effort email lookup: a store error here is logged, not escalated,
/// because it only guards a notification.
async fn owner_email(state: &AppState, user_id: Uuid) -> Option<String> {
    match repo::find_owner_email(&state.db, user_id).await {
        Ok(email) => email,
        Err(e) => {
            warn!(error = %e, %user_id, "owner email lookup failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::completion_transition;

    #[test]
    fn fires_only_on_false_to_true() {
        assert!(completion_transition(false, Some(true)));
    }

    #[test]
    fn silent_when_already_completed() {
        assert!(!completion_transition(true, Some(true)));
    }

    #[test]
    fn silent_when_patch_omits_the_flag() {
        assert!(!completion_transition(false, None));
        assert!(!completion_transition(true, None));
    }

    #[test]
    fn silent_on_revert() {
        assert!(!completion_transition(true, Some(false)));
        assert!(!completion_transition(false, Some(false)));
    }
}
