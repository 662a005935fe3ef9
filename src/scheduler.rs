use std::time::Duration;

use time::OffsetDateTime;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::notify::Notifier;
use crate::state::AppState;
use crate::tasks::repo::{self, PendingTask};

/// Background reminder/overdue scheduler. Owned by the composition root;
/// ticks on a fixed interval until `stop()` is called. An in-flight scan
/// cycle finishes before the task exits.
pub struct Scheduler {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Scheduler {
    pub fn start(state: AppState) -> Self {
        let (shutdown, mut rx) = watch::channel(false);
        let interval = Duration::from_secs(state.config.scan_interval_secs);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // interval() fires immediately; the first scan waits one period,
            // matching a scheduler started at process boot.
            ticker.tick().await;
            info!(interval_secs = interval.as_secs(), "scheduler started");
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        run_scan_cycle(&state).await;
                    }
                    _ = rx.changed() => {
                        info!("scheduler stopping");
                        break;
                    }
                }
            }
        });

        Self { shutdown, handle }
    }

    /// Signal shutdown and wait for the background task to exit.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.handle.await {
            error!(error = %e, "scheduler task join failed");
        }
    }
}

/// One tick: both scanners, store failures logged and swallowed so the
/// loop lives on to the next interval.
pub async fn run_scan_cycle(state: &AppState) {
    match run_reminder_scan(state).await {
        Ok(fired) => debug!(fired, "reminder scan done"),
        Err(e) => error!(error = %e, "reminder scan failed"),
    }
    match run_overdue_scan(state).await {
        Ok(fired) => debug!(fired, "overdue scan done"),
        Err(e) => error!(error = %e, "overdue scan failed"),
    }
}

/// Fetch incomplete tasks and fire a reminder for each whose reminder time
/// has passed. Returns the number of notifications attempted.
pub async fn run_reminder_scan(state: &AppState) -> anyhow::Result<usize> {
    let rows = repo::list_incomplete_with_owner_email(&state.db).await?;
    Ok(fire_reminders(&rows, OffsetDateTime::now_utc(), &state.notifier()).await)
}

/// Fetch incomplete tasks and fire an overdue notice for each past its due
/// time. Returns the number of notifications attempted.
pub async fn run_overdue_scan(state: &AppState) -> anyhow::Result<usize> {
    let rows = repo::list_incomplete_with_owner_email(&state.db).await?;
    Ok(fire_overdue(&rows, OffsetDateTime::now_utc(), &state.notifier()).await)
}

// No "already notified" flag is persisted, so a qualifying task fires again
// on every cycle until completed or deleted. Intentional source behavior.
pub async fn fire_reminders(rows: &[PendingTask], now: OffsetDateTime, notifier: &Notifier) -> usize {
    let mut fired = 0;
    for task in rows {
        if !reminder_due(task, now) {
            continue;
        }
        fired += 1;
        match notifier.reminder(task).await {
            Ok(()) => debug!(task_id = %task.id, to = %task.owner_email, "reminder sent"),
            Err(e) => warn!(error = %e, task_id = %task.id, "reminder send failed"),
        }
    }
    fired
}

pub async fn fire_overdue(rows: &[PendingTask], now: OffsetDateTime, notifier: &Notifier) -> usize {
    let mut fired = 0;
    for task in rows {
        if !is_overdue(task, now) {
            continue;
        }
        fired += 1;
        match notifier.overdue(task).await {
            Ok(()) => debug!(task_id = %task.id, to = %task.owner_email, "overdue notice sent"),
            Err(e) => warn!(error = %e, task_id = %task.id, "overdue send failed"),
        }
    }
    fired
}

/// Reminder fires at or after its timestamp; tasks without one are skipped.
fn reminder_due(task: &PendingTask, now: OffsetDateTime) -> bool {
    match task.reminder_at {
        Some(at) => at <= now,
        None => false,
    }
}

/// Overdue is strictly past the deadline; `due_at == now` does not fire.
fn is_overdue(task: &PendingTask, now: OffsetDateTime) -> bool {
    task.due_at < now
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use time::Duration as TimeDuration;
    use uuid::Uuid;

    use crate::notify::testing::RecordingMailer;

    use super::*;

    fn pending(
        reminder_at: Option<OffsetDateTime>,
        due_at: OffsetDateTime,
    ) -> PendingTask {
        PendingTask {
            id: Uuid::new_v4(),
            title: "Water plants".into(),
            description: None,
            due_at,
            reminder_at,
            owner_email: "owner@example.com".into(),
        }
    }

    #[tokio::test]
    async fn reminder_fires_for_past_and_exact_timestamps() {
        let now = OffsetDateTime::now_utc();
        let rows = vec![
            pending(Some(now - TimeDuration::hours(2)), now + TimeDuration::hours(1)),
            pending(Some(now), now + TimeDuration::hours(1)),
            pending(Some(now + TimeDuration::minutes(5)), now + TimeDuration::hours(1)),
        ];
        let mailer = Arc::new(RecordingMailer::new());
        let notifier = Notifier::new(mailer.clone());

        let fired = fire_reminders(&rows, now, &notifier).await;

        assert_eq!(fired, 2);
        assert_eq!(mailer.sent().len(), 2);
    }

    #[tokio::test]
    async fn reminder_skips_tasks_without_reminder_time() {
        let now = OffsetDateTime::now_utc();
        let rows = vec![pending(None, now - TimeDuration::hours(1))];
        let mailer = Arc::new(RecordingMailer::new());
        let notifier = Notifier::new(mailer.clone());

        let fired = fire_reminders(&rows, now, &notifier).await;

        assert_eq!(fired, 0);
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn reminder_fires_again_on_every_scan() {
        let now = OffsetDateTime::now_utc();
        let rows = vec![pending(Some(now - TimeDuration::days(3)), now + TimeDuration::hours(1))];
        let mailer = Arc::new(RecordingMailer::new());
        let notifier = Notifier::new(mailer.clone());

        // no suppression between cycles
        fire_reminders(&rows, now, &notifier).await;
        fire_reminders(&rows, now, &notifier).await;
        fire_reminders(&rows, now, &notifier).await;

        assert_eq!(mailer.sent().len(), 3);
    }

    #[tokio::test]
    async fn overdue_boundary_is_strict() {
        let now = OffsetDateTime::now_utc();
        let rows = vec![
            pending(None, now - TimeDuration::seconds(1)),
            pending(None, now),
            pending(None, now + TimeDuration::seconds(1)),
        ];
        let mailer = Arc::new(RecordingMailer::new());
        let notifier = Notifier::new(mailer.clone());

        let fired = fire_overdue(&rows, now, &notifier).await;

        assert_eq!(fired, 1);
        assert_eq!(mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn send_failures_do_not_stop_the_cycle() {
        let now = OffsetDateTime::now_utc();
        let rows = vec![
            pending(Some(now - TimeDuration::hours(1)), now + TimeDuration::hours(1)),
            pending(Some(now - TimeDuration::hours(2)), now + TimeDuration::hours(1)),
        ];
        let mailer = Arc::new(RecordingMailer::failing());
        let notifier = Notifier::new(mailer.clone());

        let fired = fire_reminders(&rows, now, &notifier).await;

        // every qualifying task was still attempted
        assert_eq!(fired, 2);
        assert_eq!(mailer.sent().len(), 2);
    }

    #[tokio::test]
    async fn scheduler_stop_joins_the_background_task() {
        let state = AppState::fake();
        let scheduler = Scheduler::start(state);
        scheduler.stop().await;
    }
}
