//! Job definition and related types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, RqError};
use crate::format::preview;

/// Number of prompt characters quoted in a completed job's result.
pub const SUMMARY_PREVIEW_LEN: usize = 30;

/// Result text stored on every failed job.
pub const FAILURE_MESSAGE: &str = "Failed to generate report";

/// Unique identifier for a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    /// Generate a new random JobId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The status of a job.
///
/// Jobs only move forward: `Queued -> Processing -> Completed | Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Waiting for a free processing slot.
    Queued,
    /// Work unit is running.
    Processing,
    /// Work unit succeeded.
    Completed,
    /// Work unit failed. Never retried in place.
    Failed,
}

impl JobStatus {
    /// Whether this is a final state.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Whether a job in this status may move to `next`.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Queued, JobStatus::Processing)
                | (JobStatus::Processing, JobStatus::Completed)
                | (JobStatus::Processing, JobStatus::Failed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A report-generation job and its lifecycle timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Unique job identifier.
    pub id: JobId,
    /// The user's request text.
    pub prompt: String,
    /// Current job status.
    pub status: JobStatus,
    /// When the job was submitted.
    pub created_at: DateTime<Utc>,
    /// Set once, when the job starts processing.
    pub start_time: Option<DateTime<Utc>>,
    /// Set once, when the job reaches a terminal state.
    pub end_time: Option<DateTime<Utc>>,
    /// Summary on success, [`FAILURE_MESSAGE`] on failure.
    pub result: Option<String>,
}

impl Job {
    /// Create a new queued job for the given prompt.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            id: JobId::new(),
            prompt: prompt.into(),
            status: JobStatus::Queued,
            created_at: Utc::now(),
            start_time: None,
            end_time: None,
            result: None,
        }
    }

    /// Elapsed processing time, measured up to `now` while still running.
    ///
    /// `None` until the job has started.
    pub fn duration(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        let start = self.start_time?;
        Some(self.end_time.unwrap_or(now) - start)
    }

    /// Serialize the job to JSON.
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub(crate) fn begin(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.transition(JobStatus::Processing)?;
        self.start_time = Some(now);
        Ok(())
    }

    pub(crate) fn complete(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.transition(JobStatus::Completed)?;
        self.end_time = Some(now);
        self.result = Some(success_summary(&self.prompt));
        Ok(())
    }

    pub(crate) fn fail(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.transition(JobStatus::Failed)?;
        self.end_time = Some(now);
        self.result = Some(FAILURE_MESSAGE.to_string());
        Ok(())
    }

    fn transition(&mut self, next: JobStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(RqError::InvalidTransition {
                job_id: self.id.to_string(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}

/// Result text for a completed job.
pub fn success_summary(prompt: &str) -> String {
    format!(
        "Generated report based on: \"{}\"",
        preview(prompt, SUMMARY_PREVIEW_LEN)
    )
}
