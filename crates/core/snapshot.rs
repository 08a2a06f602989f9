//! Immutable, versioned views of the job store.

use serde::Serialize;

use crate::job::{Job, JobId, JobStatus};

/// The store's state at one version.
///
/// Every mutation of the store produces a new snapshot with a higher
/// `version`. Snapshots are shared behind `Arc` and never change.
#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    version: u64,
    jobs: Vec<Job>,
    processing_count: usize,
}

#[derive(Serialize)]
struct SnapshotView<'a> {
    version: u64,
    jobs: &'a [Job],
    queued_count: usize,
    processing_count: usize,
}

impl StoreSnapshot {
    pub(crate) fn new(version: u64, jobs: Vec<Job>, processing_count: usize) -> Self {
        Self {
            version,
            jobs,
            processing_count,
        }
    }

    /// Monotonic version; 0 for an empty, never-mutated store.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Every job ever submitted, newest first.
    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Look up a job by id.
    pub fn job(&self, id: JobId) -> Option<&Job> {
        self.jobs.iter().find(|job| job.id == id)
    }

    /// Number of jobs in `status`.
    pub fn count(&self, status: JobStatus) -> usize {
        self.jobs.iter().filter(|job| job.status == status).count()
    }

    pub fn queued_count(&self) -> usize {
        self.count(JobStatus::Queued)
    }

    /// Jobs currently processing, as tracked by the dispatcher.
    ///
    /// Always equal to `count(JobStatus::Processing)`.
    pub fn processing_count(&self) -> usize {
        self.processing_count
    }

    pub fn completed_count(&self) -> usize {
        self.count(JobStatus::Completed)
    }

    pub fn failed_count(&self) -> usize {
        self.count(JobStatus::Failed)
    }

    /// Queued plus processing jobs.
    pub fn active_count(&self) -> usize {
        self.queued_count() + self.processing_count
    }

    /// The job of the given terminal `status` that finished last.
    pub fn latest_finished(&self, status: JobStatus) -> Option<&Job> {
        self.jobs
            .iter()
            .filter(|job| job.status == status)
            .max_by_key(|job| job.end_time)
    }

    /// Serialize the snapshot, including derived counts, to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&SnapshotView {
            version: self.version,
            jobs: &self.jobs,
            queued_count: self.queued_count(),
            processing_count: self.processing_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn job_with(status: JobStatus, end_offset_secs: Option<i64>) -> Job {
        let base = Utc::now();
        let mut job = Job::new(format!("{:?}", status));
        job.status = status;
        if status != JobStatus::Queued {
            job.start_time = Some(base);
        }
        job.end_time = end_offset_secs.map(|s| base + Duration::seconds(s));
        job
    }

    fn sample() -> StoreSnapshot {
        let jobs = vec![
            job_with(JobStatus::Queued, None),
            job_with(JobStatus::Processing, None),
            job_with(JobStatus::Completed, Some(5)),
            job_with(JobStatus::Completed, Some(9)),
            job_with(JobStatus::Failed, Some(3)),
            job_with(JobStatus::Queued, None),
        ];
        StoreSnapshot::new(7, jobs, 1)
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = StoreSnapshot::default();
        assert_eq!(snapshot.version(), 0);
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.active_count(), 0);
        assert!(snapshot.latest_finished(JobStatus::Completed).is_none());
    }

    #[test]
    fn test_counts() {
        let snapshot = sample();
        assert_eq!(snapshot.len(), 6);
        assert_eq!(snapshot.queued_count(), 2);
        assert_eq!(snapshot.processing_count(), 1);
        assert_eq!(snapshot.completed_count(), 2);
        assert_eq!(snapshot.failed_count(), 1);
        assert_eq!(snapshot.active_count(), 3);
    }

    #[test]
    fn test_latest_finished_picks_greatest_end_time() {
        let snapshot = sample();
        let latest = snapshot.latest_finished(JobStatus::Completed).unwrap();
        assert_eq!(latest.id, snapshot.jobs()[3].id);

        let failed = snapshot.latest_finished(JobStatus::Failed).unwrap();
        assert_eq!(failed.id, snapshot.jobs()[4].id);
    }

    #[test]
    fn test_job_lookup() {
        let snapshot = sample();
        let id = snapshot.jobs()[2].id;
        assert_eq!(snapshot.job(id).map(|j| j.status), Some(JobStatus::Completed));
        assert!(snapshot.job(JobId::new()).is_none());
    }

    #[test]
    fn test_to_json_includes_counts() {
        let json = sample().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["version"], 7);
        assert_eq!(value["queued_count"], 2);
        assert_eq!(value["processing_count"], 1);
        assert_eq!(value["jobs"].as_array().map(|a| a.len()), Some(6));
    }
}
