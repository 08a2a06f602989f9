//! Error types for the rq job store.

use thiserror::Error;

use crate::job::JobStatus;

/// The main error type for the rq library.
///
/// A job whose work unit fails is not an error: it ends up in the
/// [`JobStatus::Failed`] state and is reported through the store's events.
#[derive(Error, Debug)]
pub enum RqError {
    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// No async runtime was available.
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// The store has been disposed and accepts no more work.
    #[error("Job store has been disposed")]
    Disposed,

    /// Job not found.
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// A status change that would move a job backwards or skip a state.
    #[error("Invalid transition for job {job_id}: {from} -> {to}")]
    InvalidTransition {
        job_id: String,
        from: JobStatus,
        to: JobStatus,
    },
}

/// Result type alias using RqError.
pub type Result<T> = std::result::Result<T, RqError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_serialization() {
        let json_err: serde_json::Error = serde_json::from_str::<i32>("invalid").unwrap_err();
        let err = RqError::Serialization(json_err);
        assert!(format!("{}", err).starts_with("Serialization error:"));
    }

    #[test]
    fn test_error_display_config() {
        let err = RqError::Config("concurrency limit must be at least 1".to_string());
        assert_eq!(
            format!("{}", err),
            "Configuration error: concurrency limit must be at least 1"
        );
    }

    #[test]
    fn test_error_display_runtime() {
        let err = RqError::Runtime("no reactor running".to_string());
        assert_eq!(format!("{}", err), "Runtime error: no reactor running");
    }

    #[test]
    fn test_error_display_disposed() {
        assert_eq!(format!("{}", RqError::Disposed), "Job store has been disposed");
    }

    #[test]
    fn test_error_display_job_not_found() {
        let err = RqError::JobNotFound("abc-123".to_string());
        assert_eq!(format!("{}", err), "Job not found: abc-123");
    }

    #[test]
    fn test_error_display_invalid_transition() {
        let err = RqError::InvalidTransition {
            job_id: "abc".to_string(),
            from: JobStatus::Completed,
            to: JobStatus::Processing,
        };
        assert_eq!(
            format!("{}", err),
            "Invalid transition for job abc: completed -> processing"
        );
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err: serde_json::Error = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: RqError = json_err.into();
        assert!(matches!(err, RqError::Serialization(_)));
    }
}
