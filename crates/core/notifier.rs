//! Toast notifications for jobs that just finished.
//!
//! A [`Notifier`] watches the store and raises at most one success and one
//! failure notification per change event, each describing the most
//! recently finished job of that kind. It does not track individual jobs:
//! it remembers how many completed and failed jobs it has already seen and
//! reacts when either count goes up.

use std::sync::{Arc, Mutex, PoisonError};

use crate::config::NotifierConfig;
use crate::error::Result;
use crate::events::{StoreEvent, Subscription};
use crate::format::preview;
use crate::job::{Job, JobId, JobStatus};
use crate::snapshot::StoreSnapshot;
use crate::store::JobStore;

/// Whether a notification reports a success or a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Failure,
}

/// The button attached to a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationAction {
    /// Open the job's detail view.
    View { job_id: JobId },
    /// Queue the job's prompt again as a new job.
    Retry { job_id: JobId },
}

impl NotificationAction {
    pub fn label(&self) -> &'static str {
        match self {
            NotificationAction::View { .. } => "View",
            NotificationAction::Retry { .. } => "Retry",
        }
    }

    pub fn job_id(&self) -> JobId {
        match *self {
            NotificationAction::View { job_id } | NotificationAction::Retry { job_id } => job_id,
        }
    }
}

/// A user-facing toast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub job_id: JobId,
    pub title: String,
    pub description: String,
    pub action: NotificationAction,
}

impl Notification {
    /// Toast for a completed job.
    pub fn success(job: &Job, preview_len: usize) -> Self {
        Self {
            kind: NotificationKind::Success,
            job_id: job.id,
            title: format!("Report completed: {}", preview(&job.prompt, preview_len)),
            description: "Click to view the report details".to_string(),
            action: NotificationAction::View { job_id: job.id },
        }
    }

    /// Toast for a failed job.
    pub fn failure(job: &Job, preview_len: usize) -> Self {
        Self {
            kind: NotificationKind::Failure,
            job_id: job.id,
            title: format!("Report failed: {}", preview(&job.prompt, preview_len)),
            description: "There was an error generating your report".to_string(),
            action: NotificationAction::Retry { job_id: job.id },
        }
    }

    /// Run the retry action against `store`.
    ///
    /// Returns `Ok(None)` for notifications without a retry action.
    pub fn retry(&self, store: &JobStore) -> Result<Option<JobId>> {
        match self.action {
            NotificationAction::Retry { job_id } => store.resubmit(job_id),
            NotificationAction::View { .. } => Ok(None),
        }
    }
}

/// Where notifications go.
pub trait NotificationSink: Send + Sync + 'static {
    fn notify(&self, notification: Notification);
}

impl<F> NotificationSink for F
where
    F: Fn(Notification) + Send + Sync + 'static,
{
    fn notify(&self, notification: Notification) {
        self(notification)
    }
}

/// Which terminal counts went up since the previous observation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct TerminalDelta {
    pub completed: bool,
    pub failed: bool,
}

/// Last seen completed/failed counts and snapshot version.
#[derive(Debug, Clone, Default)]
pub(crate) struct TerminalTracker {
    version: u64,
    completed: usize,
    failed: usize,
}

impl TerminalTracker {
    pub(crate) fn baseline(snapshot: &StoreSnapshot) -> Self {
        Self {
            version: snapshot.version(),
            completed: snapshot.completed_count(),
            failed: snapshot.failed_count(),
        }
    }

    /// Compare `snapshot` with the last one seen and move the baseline.
    ///
    /// Snapshots not newer than the baseline are ignored.
    pub(crate) fn observe(&mut self, snapshot: &StoreSnapshot) -> Option<TerminalDelta> {
        if snapshot.version() <= self.version {
            return None;
        }
        let completed = snapshot.completed_count();
        let failed = snapshot.failed_count();
        let delta = TerminalDelta {
            completed: completed > self.completed,
            failed: failed > self.failed,
        };

        self.version = snapshot.version();
        self.completed = completed;
        self.failed = failed;
        Some(delta)
    }
}

/// Raises toasts for newly finished jobs until detached.
#[derive(Debug)]
pub struct Notifier {
    subscription: Subscription,
}

impl Notifier {
    /// Attach with default settings.
    pub fn attach(store: &JobStore, sink: impl NotificationSink) -> Self {
        Self::with_config(store, NotifierConfig::default(), sink)
    }

    pub fn with_config(store: &JobStore, config: NotifierConfig, sink: impl NotificationSink) -> Self {
        let tracker = Arc::new(Mutex::new(TerminalTracker::default()));
        let preview_len = config.preview_len;

        // Hold the tracker until the baseline is in place so an event
        // delivered on another thread cannot observe the empty default.
        let mut guard = tracker.lock().unwrap_or_else(PoisonError::into_inner);
        let listener_tracker = tracker.clone();
        let (subscription, baseline) = store.subscribe_with_snapshot(move |event: &StoreEvent| {
            let delta = listener_tracker
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .observe(&event.snapshot);
            let Some(delta) = delta else {
                return;
            };

            if delta.completed {
                if let Some(job) = event.snapshot.latest_finished(JobStatus::Completed) {
                    tracing::debug!(job_id = %job.id, "Raising completion notification");
                    sink.notify(Notification::success(job, preview_len));
                }
            }
            if delta.failed {
                if let Some(job) = event.snapshot.latest_finished(JobStatus::Failed) {
                    tracing::debug!(job_id = %job.id, "Raising failure notification");
                    sink.notify(Notification::failure(job, preview_len));
                }
            }
        });
        *guard = TerminalTracker::baseline(&baseline);
        drop(guard);

        Self { subscription }
    }

    pub fn is_attached(&self) -> bool {
        self.subscription.is_active()
    }

    /// Stop raising notifications.
    pub fn detach(self) {
        self.subscription.unsubscribe();
    }
}
