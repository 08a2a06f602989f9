//! Report feed demo.
//!
//! This demo:
//! - Creates a job store backed by the simulated report generator
//! - Attaches a toast notifier and an inline banner
//! - Queues a handful of reports, retrying the first failure once
//! - Prints the generation history when the queue drains
//!
//! Run with: `cargo run -p rq-demo-feed`
//! Set `RQ_TIME_SCALE=10` to run the simulation ten times faster.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rq_core::format::{activity_label, queue_summary, ReportRow};
use rq_core::{
    Banner, JobStore, Notification, NotificationKind, Notifier, SimulatedExecutor,
    SimulationConfig, StoreConfig, StoreEvent,
};
use tracing_subscriber::EnvFilter;

const PROMPTS: &[&str] = &[
    "Monthly revenue by region with year-over-year comparison",
    "Top 20 customers by lifetime value",
    "Support ticket volume per product area, last quarter",
    "Inventory turnover for the three largest warehouses",
    "Churn drivers among enterprise accounts",
];

fn time_scale() -> u32 {
    std::env::var("RQ_TIME_SCALE")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(1)
}

#[tokio::main]
async fn main() -> rq_core::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("rq report feed demo\n");

    let executor = SimulatedExecutor::new(SimulationConfig::default().scaled(time_scale()))?;
    let config = StoreConfig::builder()
        .shutdown_timeout(Duration::from_secs(5))
        .build();
    let store = JobStore::create(config, executor)?;

    let retried = Arc::new(AtomicBool::new(false));
    let retry_store = store.clone();
    let retry_flag = retried.clone();
    let notifier = Notifier::attach(&store, move |n: Notification| {
        println!("[toast] {} ({}) [{}]", n.title, n.description, n.action.label());
        if n.kind == NotificationKind::Failure && !retry_flag.swap(true, Ordering::SeqCst) {
            match n.retry(&retry_store) {
                Ok(Some(id)) => println!("[toast] retry queued as {}", id),
                Ok(None) => {}
                Err(e) => tracing::warn!(error = %e, "Retry failed"),
            }
        }
    });
    let banner = Banner::attach(&store);

    let _badge = store.subscribe(|event: &StoreEvent| {
        let snapshot = &event.snapshot;
        tracing::info!(
            version = snapshot.version(),
            job_id = %event.change.job_id(),
            change = ?event.change,
            "{} | {}",
            activity_label(snapshot.active_count()),
            queue_summary(snapshot.processing_count(), snapshot.queued_count())
        );
    });

    println!("Queueing {} reports...\n", PROMPTS.len());
    for prompt in PROMPTS {
        if let Some(id) = store.submit(*prompt)? {
            println!("  queued: {}", id);
        }
    }
    // Ignored: blank prompts never create a job.
    store.submit("   ")?;
    println!();

    store.wait_idle().await;

    if let Some(alert) = banner.current() {
        println!("\n[banner] {} {}", alert.title, alert.description);
    }

    let snapshot = store.snapshot();
    let now = Utc::now();
    println!("\nGeneration history ({} jobs)", snapshot.len());
    println!("{:<10} {:<12} {:<8} Prompt", "Start", "Status", "Time");
    for job in snapshot.jobs() {
        let row = ReportRow::new(job, 40, now);
        println!(
            "{:<10} {:<12} {:<8} {}",
            row.start_time, row.status, row.duration, row.prompt
        );
    }
    println!("\n{}", snapshot.to_json()?);

    notifier.detach();
    banner.detach();
    store.dispose().await;

    Ok(())
}
