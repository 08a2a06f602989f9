//! The job store: job list, state machine and bounded-concurrency dispatcher.

use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::task::AbortHandle;

use crate::config::{DispatchOrder, StoreConfig};
use crate::error::{Result, RqError};
use crate::events::{JobChange, Listener, StoreEvent, Subscription};
use crate::executor::{SharedExecutor, WorkError, WorkExecutor, WorkResult};
use crate::job::{Job, JobId, JobStatus};
use crate::snapshot::StoreSnapshot;

/// In-memory report job queue.
///
/// Jobs are kept newest first and never removed. At most
/// `concurrency_limit` of them run at once; the next queued job is started
/// whenever a job is submitted or a running one finishes.
///
/// `JobStore` is a cheap handle: clones share the same queue.
#[derive(Clone)]
pub struct JobStore {
    inner: Arc<StoreInner>,
}

pub(crate) struct StoreInner {
    config: StoreConfig,
    executor: SharedExecutor,
    runtime: Handle,
    state: Mutex<StoreState>,
    idle_notify: Notify,
}

struct ListenerEntry {
    id: u64,
    /// Store version at registration; older events are not delivered.
    since: u64,
    active: Arc<AtomicBool>,
    callback: Listener,
}

struct StoreState {
    jobs: Vec<Job>,
    processing: usize,
    version: u64,
    current: Arc<StoreSnapshot>,
    listeners: Vec<ListenerEntry>,
    next_listener_id: u64,
    /// Events not yet handed to listeners, oldest first.
    pending: VecDeque<StoreEvent>,
    /// Set while one caller drains `pending`.
    delivering: bool,
    in_flight: HashMap<JobId, AbortHandle>,
    disposed: bool,
}

impl StoreState {
    fn new() -> Self {
        Self {
            jobs: Vec::new(),
            processing: 0,
            version: 0,
            current: Arc::new(StoreSnapshot::default()),
            listeners: Vec::new(),
            next_listener_id: 0,
            pending: VecDeque::new(),
            delivering: false,
            in_flight: HashMap::new(),
            disposed: false,
        }
    }

    fn next_queued(&self, order: DispatchOrder) -> Option<usize> {
        let queued = |job: &Job| job.status == JobStatus::Queued;
        match order {
            DispatchOrder::ScanOrder => self.jobs.iter().position(queued),
            DispatchOrder::Fifo => self.jobs.iter().rposition(queued),
        }
    }

    fn is_idle(&self) -> bool {
        if self.disposed {
            return true;
        }
        self.processing == 0
            && !self.delivering
            && self.pending.is_empty()
            && !self.jobs.iter().any(|j| j.status == JobStatus::Queued)
    }
}

impl JobStore {
    /// Create a store on the current tokio runtime.
    ///
    /// Work units are spawned on that runtime, so this fails outside one.
    pub fn create(config: StoreConfig, executor: impl WorkExecutor + 'static) -> Result<Self> {
        Self::with_shared_executor(config, Arc::new(executor))
    }

    /// Create a store around an already shared executor.
    pub fn with_shared_executor(config: StoreConfig, executor: SharedExecutor) -> Result<Self> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|e| RqError::Runtime(e.to_string()))?;

        tracing::info!(
            concurrency_limit = config.concurrency_limit,
            dispatch_order = ?config.dispatch_order,
            "Job store created"
        );

        Ok(Self {
            inner: Arc::new(StoreInner {
                config,
                executor,
                runtime,
                state: Mutex::new(StoreState::new()),
                idle_notify: Notify::new(),
            }),
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Queue a new job and try to start it right away.
    ///
    /// A blank prompt is ignored and yields `Ok(None)`.
    pub fn submit(&self, prompt: impl Into<String>) -> Result<Option<JobId>> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            tracing::debug!("Ignoring blank prompt");
            return Ok(None);
        }

        let inner = &self.inner;
        inner.mutate(|state, events| {
            if state.disposed {
                return Err(RqError::Disposed);
            }

            let job = Job::new(prompt);
            let job_id = job.id;
            state.jobs.insert(0, job);
            tracing::debug!(job_id = %job_id, "Job queued");
            inner.publish(state, JobChange::Submitted(job_id), events);

            inner.try_dispatch_next(state, events);
            Ok(Some(job_id))
        })
    }

    /// Queue a fresh job with the prompt of an existing one.
    ///
    /// The existing job is left as it is.
    pub fn resubmit(&self, job_id: JobId) -> Result<Option<JobId>> {
        let prompt = self
            .job(job_id)
            .map(|job| job.prompt)
            .ok_or_else(|| RqError::JobNotFound(job_id.to_string()))?;

        tracing::debug!(job_id = %job_id, "Resubmitting job");
        self.submit(prompt)
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<StoreSnapshot> {
        self.inner.lock().current.clone()
    }

    /// A copy of one job.
    pub fn job(&self, job_id: JobId) -> Option<Job> {
        self.snapshot().job(job_id).cloned()
    }

    /// Register a listener called after every mutation.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&StoreEvent) + Send + Sync + 'static,
    {
        self.subscribe_with_snapshot(listener).0
    }

    /// Register a listener and read the snapshot it starts from, atomically.
    pub fn subscribe_with_snapshot<F>(&self, listener: F) -> (Subscription, Arc<StoreSnapshot>)
    where
        F: Fn(&StoreEvent) + Send + Sync + 'static,
    {
        let mut state = self.inner.lock();
        let id = state.next_listener_id;
        state.next_listener_id += 1;

        let active = Arc::new(AtomicBool::new(!state.disposed));
        if !state.disposed {
            let since = state.version;
            state.listeners.push(ListenerEntry {
                id,
                since,
                active: active.clone(),
                callback: Arc::new(listener),
            });
        }

        let subscription = Subscription::new(id, active, Arc::downgrade(&self.inner));
        (subscription, state.current.clone())
    }

    /// Wait until no job is queued or processing and every change has
    /// reached the listeners.
    ///
    /// Also returns once the store is disposed, even if queued jobs remain.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle_notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.inner.lock().is_idle() {
                return;
            }
            notified.await;
        }
    }

    /// Whether `dispose` has been called.
    pub fn is_disposed(&self) -> bool {
        self.inner.lock().disposed
    }

    /// Shut the store down.
    ///
    /// Stops accepting and dispatching jobs, waits up to
    /// `shutdown_timeout` for processing jobs to finish, then aborts the
    /// rest and detaches every listener. Queued jobs stay queued.
    pub async fn dispose(&self) {
        {
            let mut state = self.inner.lock();
            if state.disposed {
                return;
            }
            state.disposed = true;
        }
        self.inner.idle_notify.notify_waiters();
        tracing::info!("Disposing job store, draining in-flight jobs");

        let deadline = tokio::time::Instant::now() + self.inner.config.shutdown_timeout;
        loop {
            let notified = self.inner.idle_notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let in_progress = self.inner.lock().processing;
            if in_progress == 0 {
                break;
            }
            if tokio::time::Instant::now() >= deadline {
                tracing::warn!(in_progress, "Shutdown timeout reached, aborting jobs");
                break;
            }

            tokio::select! {
                _ = notified.as_mut() => {}
                _ = tokio::time::sleep_until(deadline) => {}
            }
        }

        let (handles, listeners) = {
            let mut state = self.inner.lock();
            let handles: Vec<AbortHandle> = state.in_flight.drain().map(|(_, h)| h).collect();
            (handles, std::mem::take(&mut state.listeners))
        };
        for handle in handles {
            handle.abort();
        }
        for entry in &listeners {
            entry.active.store(false, Ordering::SeqCst);
        }
        drop(listeners);

        tracing::info!("Job store disposed");
    }
}

impl StoreInner {
    fn lock(&self) -> MutexGuard<'_, StoreState> {
        // Listeners run outside the lock, so a poisoned state is still consistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run one mutation under the lock, then deliver its events.
    ///
    /// Events go through a single queue so listeners see them in version
    /// order. Whoever finds the queue idle drains it; concurrent and
    /// re-entrant callers only enqueue.
    fn mutate<R>(&self, f: impl FnOnce(&mut StoreState, &mut Vec<StoreEvent>) -> R) -> R {
        let mut events = Vec::new();
        let mut state = self.lock();
        let result = f(&mut *state, &mut events);
        state.pending.extend(events);
        if state.delivering || state.pending.is_empty() {
            return result;
        }
        state.delivering = true;
        drop(state);

        self.deliver_pending();
        result
    }

    fn deliver_pending(&self) {
        let _reset = DeliveryReset(self);
        loop {
            let (event, listeners) = {
                let mut state = self.lock();
                let Some(event) = state.pending.pop_front() else {
                    state.delivering = false;
                    break;
                };
                let version = event.snapshot.version();
                let listeners: Vec<(Arc<AtomicBool>, Listener)> = state
                    .listeners
                    .iter()
                    .filter(|entry| entry.since < version)
                    .map(|entry| (entry.active.clone(), entry.callback.clone()))
                    .collect();
                (event, listeners)
            };

            for (active, callback) in &listeners {
                if active.load(Ordering::SeqCst) {
                    callback(&event);
                }
            }
        }
        self.idle_notify.notify_waiters();
    }

    fn publish(&self, state: &mut StoreState, change: JobChange, events: &mut Vec<StoreEvent>) {
        debug_assert_eq!(
            state.processing,
            state
                .jobs
                .iter()
                .filter(|j| j.status == JobStatus::Processing)
                .count()
        );

        state.version += 1;
        let snapshot = Arc::new(StoreSnapshot::new(
            state.version,
            state.jobs.clone(),
            state.processing,
        ));
        state.current = snapshot.clone();
        events.push(StoreEvent { change, snapshot });
    }

    fn try_dispatch_next(self: &Arc<Self>, state: &mut StoreState, events: &mut Vec<StoreEvent>) {
        if state.disposed {
            return;
        }
        if state.processing >= self.config.concurrency_limit {
            tracing::trace!(
                processing = state.processing,
                limit = self.config.concurrency_limit,
                "Concurrency limit reached, job stays queued"
            );
            return;
        }

        if let Some(index) = state.next_queued(self.config.dispatch_order) {
            self.begin_processing(state, events, index);
        }
    }

    fn begin_processing(
        self: &Arc<Self>,
        state: &mut StoreState,
        events: &mut Vec<StoreEvent>,
        index: usize,
    ) {
        let job = &mut state.jobs[index];
        if let Err(e) = job.begin(Utc::now()) {
            tracing::warn!(error = %e, "Refusing to start job");
            return;
        }
        let job = job.clone();
        let job_id = job.id;

        state.processing += 1;
        tracing::debug!(job_id = %job_id, processing = state.processing, "Processing job");
        self.publish(state, JobChange::Started(job_id), events);

        let executor = self.executor.clone();
        let work = self
            .runtime
            .spawn(async move { executor.execute(&job).await });
        state.in_flight.insert(job_id, work.abort_handle());

        let inner = Arc::clone(self);
        self.runtime.spawn(async move {
            let outcome = match work.await {
                Ok(outcome) => outcome,
                Err(e) if e.is_panic() => {
                    tracing::error!(job_id = %job_id, "Work unit panicked");
                    Err(WorkError::new("work unit panicked"))
                }
                // Aborted by dispose.
                Err(_) => return,
            };
            inner.complete_processing(job_id, outcome);
        });
    }

    fn complete_processing(self: &Arc<Self>, job_id: JobId, outcome: WorkResult) {
        self.mutate(|state, events| {
            state.in_flight.remove(&job_id);

            let Some(job) = state.jobs.iter_mut().find(|j| j.id == job_id) else {
                tracing::warn!(job_id = %job_id, "Finished job is not in the store");
                return;
            };

            let now = Utc::now();
            let applied = match &outcome {
                Ok(()) => job.complete(now),
                Err(err) => {
                    tracing::warn!(job_id = %job_id, error = %err.message, "Job failed");
                    job.fail(now)
                }
            };
            if let Err(e) = applied {
                tracing::warn!(error = %e, "Ignoring job outcome");
                return;
            }
            let status = job.status;

            state.processing -= 1;
            tracing::debug!(job_id = %job_id, status = %status, "Job finished");
            self.publish(state, JobChange::Finished(job_id, status), events);

            self.try_dispatch_next(state, events);
        });

        self.idle_notify.notify_waiters();
    }

    pub(crate) fn remove_listener(&self, id: u64) {
        let removed: Vec<ListenerEntry> = {
            let mut state = self.lock();
            let (removed, kept): (Vec<ListenerEntry>, Vec<ListenerEntry>) =
                std::mem::take(&mut state.listeners)
                    .into_iter()
                    .partition(|entry| entry.id == id);
            state.listeners = kept;
            removed
        };
        // Callbacks may own subscriptions whose drop locks the store again.
        drop(removed);
    }
}

/// Releases the delivery role if a listener panics mid-drain.
struct DeliveryReset<'a>(&'a StoreInner);

impl Drop for DeliveryReset<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.lock().delivering = false;
        }
    }
}
