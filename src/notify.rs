use std::sync::Arc;

use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::mailer::{Mailer, SendError};
use crate::tasks::repo::{PendingTask, Task};

/// Formats task notifications and pushes them through the mail transport.
/// Every call is best-effort from the caller's point of view: the caller
/// logs a returned error and carries on with its own unit of work.
#[derive(Clone)]
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
}

fn fmt_ts(ts: OffsetDateTime) -> String {
    ts.format(&Rfc3339).unwrap_or_else(|_| ts.to_string())
}

fn fmt_opt_ts(ts: Option<OffsetDateTime>) -> String {
    ts.map(fmt_ts).unwrap_or_else(|| "-".into())
}

impl Notifier {
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        Self { mailer }
    }

    pub async fn task_created(&self, to: &str, task: &Task) -> Result<(), SendError> {
        let body = format!(
            "A new task has been created.\n\n\
             Title: {}\n\
             Description: {}\n\
             Due: {}\n\
             Reminder: {}\n\n\
             Stay productive!",
            task.title,
            task.description.as_deref().unwrap_or("-"),
            fmt_ts(task.due_at),
            fmt_opt_ts(task.reminder_at),
        );
        self.mailer.send(to, "New Task Created", &body).await
    }

    pub async fn task_completed(&self, to: &str, title: &str) -> Result<(), SendError> {
        let body = format!(
            "Great job! You completed a task:\n\n\
             Task: {title}\n\n\
             Keep going!"
        );
        self.mailer.send(to, "Task Completed", &body).await
    }

    pub async fn reminder(&self, task: &PendingTask) -> Result<(), SendError> {
        let body = format!(
            "Your task is due soon.\n\n\
             Title: {}\n\
             Description: {}\n\
             Reminder Time: {}",
            task.title,
            task.description.as_deref().unwrap_or("-"),
            fmt_opt_ts(task.reminder_at),
        );
        let subject = format!("Reminder: {}", task.title);
        self.mailer.send(&task.owner_email, &subject, &body).await
    }

    pub async fn overdue(&self, task: &PendingTask) -> Result<(), SendError> {
        let body = format!(
            "Your task deadline has passed!\n\n\
             Title: {}\n\
             Description: {}\n\
             Due Date: {}",
            task.title,
            task.description.as_deref().unwrap_or("-"),
            fmt_ts(task.due_at),
        );
        let subject = format!("Overdue Task: {}", task.title);
        self.mailer.send(&task.owner_email, &subject, &body).await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use axum::async_trait;

    use crate::mailer::{Mailer, SendError};

    /// Records every send; optionally fails each one.
    pub struct RecordingMailer {
        pub sent: Mutex<Vec<(String, String, String)>>,
        pub fail: bool,
    }

    impl RecordingMailer {
        pub fn new() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail: false,
            }
        }

        pub fn failing() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        pub fn sent(&self) -> Vec<(String, String, String)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), SendError> {
            self.sent
                .lock()
                .unwrap()
                .push((to.into(), subject.into(), body.into()));
            if self.fail {
                Err(SendError::Address("@".parse::<lettre::Address>().unwrap_err()))
            } else {
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use time::OffsetDateTime;
    use uuid::Uuid;

    use super::testing::RecordingMailer;
    use super::*;

    fn sample_task(description: Option<&str>) -> Task {
        let now = OffsetDateTime::now_utc();
        Task {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Pay rent".into(),
            description: description.map(Into::into),
            due_at: now + time::Duration::hours(1),
            reminder_at: Some(now + time::Duration::minutes(30)),
            is_completed: false,
            created_at: now,
        }
    }

    #[tokio::test]
    async fn created_mail_goes_to_owner_with_title() {
        let mailer = Arc::new(RecordingMailer::new());
        let notifier = Notifier::new(mailer.clone());
        let task = sample_task(Some("transfer before the 1st"));

        notifier
            .task_created("owner@example.com", &task)
            .await
            .expect("send ok");

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        let (to, subject, body) = &sent[0];
        assert_eq!(to, "owner@example.com");
        assert_eq!(subject, "New Task Created");
        assert!(body.contains("Pay rent"));
        assert!(body.contains("transfer before the 1st"));
    }

    #[tokio::test]
    async fn created_mail_uses_placeholder_for_missing_description() {
        let mailer = Arc::new(RecordingMailer::new());
        let notifier = Notifier::new(mailer.clone());
        let task = sample_task(None);

        notifier.task_created("a@b.com", &task).await.expect("send ok");

        let (_, _, body) = &mailer.sent()[0];
        assert!(body.contains("Description: -"));
    }

    #[tokio::test]
    async fn completed_mail_contains_title() {
        let mailer = Arc::new(RecordingMailer::new());
        let notifier = Notifier::new(mailer.clone());

        notifier
            .task_completed("a@b.com", "Pay rent")
            .await
            .expect("send ok");

        let (_, subject, body) = &mailer.sent()[0];
        assert_eq!(subject, "Task Completed");
        assert!(body.contains("Pay rent"));
    }

    #[tokio::test]
    async fn reminder_and_overdue_subjects_carry_title() {
        let mailer = Arc::new(RecordingMailer::new());
        let notifier = Notifier::new(mailer.clone());
        let now = OffsetDateTime::now_utc();
        let pending = PendingTask {
            id: Uuid::new_v4(),
            title: "File taxes".into(),
            description: None,
            due_at: now,
            reminder_at: Some(now),
            owner_email: "owner@example.com".into(),
        };

        notifier.reminder(&pending).await.expect("send ok");
        notifier.overdue(&pending).await.expect("send ok");

        let sent = mailer.sent();
        assert_eq!(sent[0].1, "Reminder: File taxes");
        assert_eq!(sent[1].1, "Overdue Task: File taxes");
        assert_eq!(sent[0].0, "owner@example.com");
    }

    #[tokio::test]
    async fn send_failure_surfaces_as_error() {
        let mailer = Arc::new(RecordingMailer::failing());
        let notifier = Notifier::new(mailer.clone());

        let err = notifier.task_completed("a@b.com", "x").await.unwrap_err();
        assert!(!err.to_string().is_empty());
        // the attempt itself is still recorded
        assert_eq!(mailer.sent().len(), 1);
    }
}
