//! Work executors: the asynchronous unit of work behind each job.
//!
//! The store only cares whether a unit of work succeeds or fails. The
//! default [`SimulatedExecutor`] sleeps for a random duration and fails a
//! fixed fraction of the time; [`FnExecutor`] turns any async closure into
//! an executor, which is how tests plug in deterministic work.

use async_trait::async_trait;
use rand::Rng;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::SimulationConfig;
use crate::error::Result;
use crate::job::{Job, FAILURE_MESSAGE};

/// Result type for work units.
pub type WorkResult = std::result::Result<(), WorkError>;

/// Error returned from a work unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkError {
    /// Error message.
    pub message: String,
}

impl WorkError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl<E: std::error::Error> From<E> for WorkError {
    fn from(err: E) -> Self {
        Self::new(err.to_string())
    }
}

/// Performs the work for one job.
///
/// Implementations must be thread-safe; the store runs each call on its
/// own task.
#[async_trait]
pub trait WorkExecutor: Send + Sync {
    /// Run the work for `job` to completion.
    async fn execute(&self, job: &Job) -> WorkResult;
}

/// A type-erased executor that can be shared across tasks.
pub type SharedExecutor = Arc<dyn WorkExecutor>;

/// Randomized stand-in for a long-running report generation.
#[derive(Debug, Clone)]
pub struct SimulatedExecutor {
    config: SimulationConfig,
}

impl SimulatedExecutor {
    /// Create an executor, rejecting an invalid configuration.
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Draw a run duration and outcome from `rng`.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> (Duration, bool) {
        let millis = |d: Duration| u64::try_from(d.as_millis()).unwrap_or(u64::MAX);
        let min = millis(self.config.min_duration);
        let max = millis(self.config.max_duration);
        let delay = Duration::from_millis(rng.gen_range(min..=max));
        let succeeds = rng.gen_bool(self.config.success_rate);
        (delay, succeeds)
    }

    fn draw(&self) -> (Duration, bool) {
        let mut rng = rand::thread_rng();
        self.sample(&mut rng)
    }
}

impl Default for SimulatedExecutor {
    fn default() -> Self {
        Self {
            config: SimulationConfig::default(),
        }
    }
}

#[async_trait]
impl WorkExecutor for SimulatedExecutor {
    async fn execute(&self, job: &Job) -> WorkResult {
        let (delay, succeeds) = self.draw();
        tracing::trace!(job_id = %job.id, delay_ms = delay.as_millis() as u64, "Simulating work");

        tokio::time::sleep(delay).await;

        if succeeds {
            Ok(())
        } else {
            Err(WorkError::new(FAILURE_MESSAGE))
        }
    }
}

/// Executor backed by an async closure.
#[derive(Clone)]
pub struct FnExecutor<F> {
    handler: F,
}

impl<F, Fut> FnExecutor<F>
where
    F: Fn(Job) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = WorkResult> + Send + 'static,
{
    pub fn new(handler: F) -> Self {
        Self { handler }
    }
}

#[async_trait]
impl<F, Fut> WorkExecutor for FnExecutor<F>
where
    F: Fn(Job) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = WorkResult> + Send + 'static,
{
    async fn execute(&self, job: &Job) -> WorkResult {
        (self.handler)(job.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_sample_stays_in_range() {
        let executor = SimulatedExecutor::default();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..1_000 {
            let (delay, _) = executor.sample(&mut rng);
            assert!(delay >= Duration::from_millis(5_000));
            assert!(delay <= Duration::from_millis(15_000));
        }
    }

    #[test]
    fn test_sample_success_rate_is_roughly_ninety_percent() {
        let executor = SimulatedExecutor::default();
        let mut rng = StdRng::seed_from_u64(42);

        let successes = (0..10_000)
            .filter(|_| executor.sample(&mut rng).1)
            .count();
        assert!((8_700..=9_300).contains(&successes), "got {}", successes);
    }

    #[test]
    fn test_sample_extreme_rates() {
        let mut rng = StdRng::seed_from_u64(1);
        let always = SimulatedExecutor::new(
            SimulationConfig::builder().success_rate(1.0).build().unwrap(),
        )
        .unwrap();
        let never = SimulatedExecutor::new(
            SimulationConfig::builder().success_rate(0.0).build().unwrap(),
        )
        .unwrap();

        for _ in 0..100 {
            assert!(always.sample(&mut rng).1);
            assert!(!never.sample(&mut rng).1);
        }
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = SimulationConfig {
            success_rate: -0.1,
            ..SimulationConfig::default()
        };
        assert!(SimulatedExecutor::new(config).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_execute_waits_for_sampled_delay() {
        let executor = SimulatedExecutor::new(
            SimulationConfig::builder()
                .duration_range(Duration::from_secs(5), Duration::from_secs(5))
                .success_rate(1.0)
                .build()
                .unwrap(),
        )
        .unwrap();

        let started = tokio::time::Instant::now();
        let result = executor.execute(&Job::new("p")).await;
        assert!(result.is_ok());
        assert!(started.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_failure_carries_message() {
        let executor = SimulatedExecutor::new(
            SimulationConfig::builder().success_rate(0.0).build().unwrap(),
        )
        .unwrap();
        let err = executor.execute(&Job::new("p")).await.unwrap_err();
        assert_eq!(err.message, FAILURE_MESSAGE);
    }

    #[tokio::test]
    async fn test_fn_executor_receives_job() {
        let executor = FnExecutor::new(|job: Job| async move {
            if job.prompt == "boom" {
                Err(WorkError::new("exploded"))
            } else {
                Ok(())
            }
        });

        assert!(executor.execute(&Job::new("fine")).await.is_ok());
        assert_eq!(
            executor.execute(&Job::new("boom")).await,
            Err(WorkError::new("exploded"))
        );
    }

    #[test]
    fn test_work_error_from_std_error() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let err: WorkError = io.into();
        assert_eq!(err.message, "disk gone");
    }
}
