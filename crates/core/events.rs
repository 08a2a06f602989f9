//! Change events emitted by the job store and the handles that receive them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use crate::job::{JobId, JobStatus};
use crate::snapshot::StoreSnapshot;
use crate::store::StoreInner;

/// What a single store mutation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobChange {
    /// A new job was queued.
    Submitted(JobId),
    /// A queued job took a processing slot.
    Started(JobId),
    /// A processing job reached a terminal status.
    Finished(JobId, JobStatus),
}

impl JobChange {
    pub fn job_id(&self) -> JobId {
        match *self {
            JobChange::Submitted(id) | JobChange::Started(id) | JobChange::Finished(id, _) => id,
        }
    }
}

/// Delivered to every listener after each mutation.
#[derive(Debug, Clone)]
pub struct StoreEvent {
    pub change: JobChange,
    /// State right after this change.
    pub snapshot: Arc<StoreSnapshot>,
}

/// Callback registered with [`JobStore::subscribe`](crate::JobStore::subscribe).
pub type Listener = Arc<dyn Fn(&StoreEvent) + Send + Sync>;

/// Handle for a registered listener.
///
/// Dropping the handle (or calling [`unsubscribe`](Self::unsubscribe))
/// detaches the listener. It only holds a weak reference to the store.
pub struct Subscription {
    id: u64,
    active: Arc<AtomicBool>,
    store: Weak<StoreInner>,
}

impl Subscription {
    pub(crate) fn new(id: u64, active: Arc<AtomicBool>, store: Weak<StoreInner>) -> Self {
        Self { id, active, store }
    }

    /// Whether the listener will still be called.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Detach the listener.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.active.store(false, Ordering::SeqCst);
        if let Some(store) = self.store.upgrade() {
            store.remove_listener(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
