//! Display helpers for job consumers (report tables, badges, toasts).

use chrono::{DateTime, Local, Utc};

use crate::job::{Job, JobStatus};

/// Placeholder shown for a timestamp or duration that is not set yet.
pub const UNSET: &str = "-";

/// First `max_chars` characters of `text`, with `...` appended when cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

/// Local wall-clock time as `HH:MM:SS`.
pub fn format_time(time: Option<DateTime<Utc>>) -> String {
    match time {
        Some(t) => t.with_timezone(&Local).format("%H:%M:%S").to_string(),
        None => UNSET.to_string(),
    }
}

/// Renders an elapsed time as `42s` below a minute and `3m 7s` above.
pub fn format_duration(elapsed: Option<chrono::Duration>) -> String {
    let Some(elapsed) = elapsed else {
        return UNSET.to_string();
    };
    let seconds = elapsed.num_seconds().max(0);
    let minutes = seconds / 60;
    if minutes > 0 {
        format!("{}m {}s", minutes, seconds % 60)
    } else {
        format!("{}s", seconds)
    }
}

/// Navigation badge text for the number of queued plus processing jobs.
pub fn activity_label(active: usize) -> String {
    match active {
        0 => "no process running".to_string(),
        1 => "1 process running".to_string(),
        n => format!("{} processes running", n),
    }
}

/// Footer text under the submission form, e.g. `2 reports processing, 1 job queued`.
///
/// Empty when nothing is active.
pub fn queue_summary(processing: usize, queued: usize) -> String {
    let mut parts = Vec::new();
    if processing > 0 {
        let plural = if processing > 1 { "s" } else { "" };
        parts.push(format!("{} report{} processing", processing, plural));
    }
    if queued > 0 {
        let plural = if queued > 1 { "s" } else { "" };
        parts.push(format!("{} job{} queued", queued, plural));
    }
    parts.join(", ")
}

/// Capitalized status badge text.
pub fn status_label(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Queued => "Queued",
        JobStatus::Processing => "Processing",
        JobStatus::Completed => "Completed",
        JobStatus::Failed => "Failed",
    }
}

/// One line of the generation history table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub start_time: String,
    pub prompt: String,
    pub status: &'static str,
    pub duration: String,
}

impl ReportRow {
    /// Render `job` as of `now`, quoting at most `preview_len` prompt characters.
    pub fn new(job: &Job, preview_len: usize, now: DateTime<Utc>) -> Self {
        Self {
            start_time: format_time(job.start_time),
            prompt: preview(&job.prompt, preview_len),
            status: status_label(job.status),
            duration: format_duration(job.duration(now)),
        }
    }
}
