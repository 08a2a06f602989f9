//! Inline alert shown on the report page after a job finishes.
//!
//! Unlike the [`Notifier`](crate::Notifier), the banner holds a single alert
//! and a success wins over a failure that lands in the same change.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

use crate::config::NotifierConfig;
use crate::events::{StoreEvent, Subscription};
use crate::notifier::TerminalTracker;
use crate::store::JobStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    Success,
    Error,
}

/// The alert currently raised by a [`Banner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BannerAlert {
    pub kind: AlertKind,
    pub title: &'static str,
    pub description: &'static str,
    pub raised_at: Instant,
}

impl BannerAlert {
    fn new(kind: AlertKind, raised_at: Instant) -> Self {
        let (title, description) = match kind {
            AlertKind::Success => ("Success!", "Your report has been successfully generated."),
            AlertKind::Error => ("Error", "Failed to generate your report. Please try again."),
        };
        Self {
            kind,
            title,
            description,
            raised_at,
        }
    }
}

#[derive(Debug)]
struct BannerState {
    tracker: TerminalTracker,
    alert: Option<BannerAlert>,
}

/// Single-slot alert driven by store events.
#[derive(Debug)]
pub struct Banner {
    state: Arc<Mutex<BannerState>>,
    visibility: Duration,
    subscription: Subscription,
}

impl Banner {
    pub fn attach(store: &JobStore) -> Self {
        Self::with_config(store, &NotifierConfig::default())
    }

    pub fn with_config(store: &JobStore, config: &NotifierConfig) -> Self {
        let state = Arc::new(Mutex::new(BannerState {
            tracker: TerminalTracker::default(),
            alert: None,
        }));

        let mut guard = lock(&state);
        let listener_state = state.clone();
        let (subscription, baseline) = store.subscribe_with_snapshot(move |event: &StoreEvent| {
            let mut state = lock(&listener_state);
            let Some(delta) = state.tracker.observe(&event.snapshot) else {
                return;
            };

            let kind = if delta.completed {
                AlertKind::Success
            } else if delta.failed {
                AlertKind::Error
            } else {
                return;
            };
            tracing::debug!(kind = ?kind, "Banner alert raised");
            state.alert = Some(BannerAlert::new(kind, Instant::now()));
        });
        guard.tracker = TerminalTracker::baseline(&baseline);
        drop(guard);

        Self {
            state,
            visibility: config.banner_visibility,
            subscription,
        }
    }

    /// The alert to show right now, if one is still within its visibility
    /// window.
    pub fn current(&self) -> Option<BannerAlert> {
        let state = lock(&self.state);
        state
            .alert
            .clone()
            .filter(|alert| alert.raised_at.elapsed() < self.visibility)
    }

    /// Hide the current alert.
    pub fn dismiss(&self) {
        lock(&self.state).alert = None;
    }

    /// Stop reacting to store events.
    pub fn detach(self) {
        self.subscription.unsubscribe();
    }
}

fn lock(state: &Mutex<BannerState>) -> MutexGuard<'_, BannerState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
