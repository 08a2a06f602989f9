//! # rq-core - In-memory report job queue
//!
//! This crate provides the pieces behind the report generator's job feed:
//! - `JobStore`: job list, state machine and bounded-concurrency dispatcher
//! - `Job`, `JobId`, `JobStatus` types and versioned `StoreSnapshot`s
//! - `WorkExecutor` trait with a randomized `SimulatedExecutor`
//! - `Notifier` and `Banner` observers that turn finished jobs into alerts
//! - Display helpers for report tables and badges
//! - Error types
//!
//! ```rust,ignore
//! use rq_core::{JobStore, Notifier, SimulatedExecutor, StoreConfig};
//!
//! let store = JobStore::create(StoreConfig::default(), SimulatedExecutor::default())?;
//! let _notifier = Notifier::attach(&store, |n| println!("{}", n.title));
//! store.submit("Monthly revenue by region")?;
//! store.wait_idle().await;
//! store.dispose().await;
//! ```

mod banner;
mod config;
mod error;
mod events;
mod executor;
pub mod format;
mod job;
mod notifier;
mod snapshot;
mod store;

// Re-export main types
pub use banner::{AlertKind, Banner, BannerAlert};
pub use config::{
    DispatchOrder, NotifierConfig, SimulationConfig, SimulationConfigBuilder, StoreConfig,
    StoreConfigBuilder, CONCURRENT_JOBS_LIMIT,
};
pub use error::{Result, RqError};
pub use events::{JobChange, Listener, StoreEvent, Subscription};
pub use executor::{FnExecutor, SharedExecutor, SimulatedExecutor, WorkError, WorkExecutor, WorkResult};
pub use job::{success_summary, Job, JobId, JobStatus, FAILURE_MESSAGE, SUMMARY_PREVIEW_LEN};
pub use notifier::{Notification, NotificationAction, NotificationKind, NotificationSink, Notifier};
pub use snapshot::StoreSnapshot;
pub use store::JobStore;
