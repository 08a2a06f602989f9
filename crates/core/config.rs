//! Configuration types for the job store, the simulated executor and
//! the notifiers.

use std::time::Duration;

use crate::error::{Result, RqError};

/// Default number of jobs allowed in `processing` at once.
pub const CONCURRENT_JOBS_LIMIT: usize = 3;

/// Which queued job the dispatcher picks when a slot frees up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchOrder {
    /// First queued job in list order. The list is newest first, so under
    /// load recent submissions can overtake older ones.
    #[default]
    ScanOrder,
    /// Oldest queued job by submission time.
    Fifo,
}

/// Configuration for the JobStore.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Maximum number of jobs processing at the same time.
    pub concurrency_limit: usize,
    /// Selection policy for the next queued job.
    pub dispatch_order: DispatchOrder,
    /// How long `dispose` waits for in-flight work before aborting it.
    pub shutdown_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: CONCURRENT_JOBS_LIMIT,
            dispatch_order: DispatchOrder::default(),
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl StoreConfig {
    /// Create a new builder.
    pub fn builder() -> StoreConfigBuilder {
        StoreConfigBuilder::new()
    }

    /// Reject settings the dispatcher cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.concurrency_limit == 0 {
            return Err(RqError::Config(
                "concurrency limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for StoreConfig.
#[derive(Debug, Default)]
pub struct StoreConfigBuilder {
    config: StoreConfig,
}

impl StoreConfigBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the concurrency limit.
    pub fn concurrency_limit(mut self, limit: usize) -> Self {
        self.config.concurrency_limit = limit;
        self
    }

    /// Set the dispatch order.
    pub fn dispatch_order(mut self, order: DispatchOrder) -> Self {
        self.config.dispatch_order = order;
        self
    }

    /// Set the graceful shutdown timeout.
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.config.shutdown_timeout = timeout;
        self
    }

    /// Build the StoreConfig.
    pub fn build(self) -> StoreConfig {
        self.config
    }
}

/// Parameters of the simulated report generation.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Shortest simulated run.
    pub min_duration: Duration,
    /// Longest simulated run (inclusive).
    pub max_duration: Duration,
    /// Probability in `[0, 1]` that a run succeeds.
    pub success_rate: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            min_duration: Duration::from_millis(5_000),
            max_duration: Duration::from_millis(15_000),
            success_rate: 0.9,
        }
    }
}

impl SimulationConfig {
    /// Create a new builder.
    pub fn builder() -> SimulationConfigBuilder {
        SimulationConfigBuilder::new()
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_duration > self.max_duration {
            return Err(RqError::Config(format!(
                "min_duration {:?} exceeds max_duration {:?}",
                self.min_duration, self.max_duration
            )));
        }
        if u64::try_from(self.max_duration.as_millis()).is_err() {
            return Err(RqError::Config(format!(
                "max_duration {:?} does not fit in u64 milliseconds",
                self.max_duration
            )));
        }
        if !(0.0..=1.0).contains(&self.success_rate) {
            return Err(RqError::Config(format!(
                "success_rate {} is outside [0, 1]",
                self.success_rate
            )));
        }
        Ok(())
    }

    /// Divide both duration bounds by `factor`. Used by demos to speed
    /// the simulation up.
    pub fn scaled(mut self, factor: u32) -> Self {
        let factor = factor.max(1);
        self.min_duration /= factor;
        self.max_duration /= factor;
        self
    }
}

/// Builder for SimulationConfig.
#[derive(Debug, Default)]
pub struct SimulationConfigBuilder {
    config: SimulationConfig,
}

impl SimulationConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the duration range.
    pub fn duration_range(mut self, min: Duration, max: Duration) -> Self {
        self.config.min_duration = min;
        self.config.max_duration = max;
        self
    }

    /// Set the success probability.
    pub fn success_rate(mut self, rate: f64) -> Self {
        self.config.success_rate = rate;
        self
    }

    /// Build and validate the SimulationConfig.
    pub fn build(self) -> Result<SimulationConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Settings shared by the toast notifier and the inline banner.
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    /// Prompt characters shown in a notification title.
    pub preview_len: usize,
    /// How long a banner alert stays visible.
    pub banner_visibility: Duration,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            preview_len: 40,
            banner_visibility: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_config_default() {
        let config = StoreConfig::default();
        assert_eq!(config.concurrency_limit, 3);
        assert_eq!(config.dispatch_order, DispatchOrder::ScanOrder);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_store_config_builder() {
        let config = StoreConfig::builder()
            .concurrency_limit(5)
            .dispatch_order(DispatchOrder::Fifo)
            .shutdown_timeout(Duration::from_secs(2))
            .build();
        assert_eq!(config.concurrency_limit, 5);
        assert_eq!(config.dispatch_order, DispatchOrder::Fifo);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_store_config_rejects_zero_limit() {
        let config = StoreConfig::builder().concurrency_limit(0).build();
        assert!(matches!(config.validate(), Err(RqError::Config(_))));
    }

    #[test]
    fn test_simulation_config_default() {
        let config = SimulationConfig::default();
        assert_eq!(config.min_duration, Duration::from_millis(5000));
        assert_eq!(config.max_duration, Duration::from_millis(15000));
        assert_eq!(config.success_rate, 0.9);
    }

    #[test]
    fn test_simulation_config_builder_validates() {
        let inverted = SimulationConfig::builder()
            .duration_range(Duration::from_secs(2), Duration::from_secs(1))
            .build();
        assert!(inverted.is_err());

        let bad_rate = SimulationConfig::builder().success_rate(1.5).build();
        assert!(bad_rate.is_err());

        let ok = SimulationConfig::builder()
            .duration_range(Duration::ZERO, Duration::from_millis(10))
            .success_rate(1.0)
            .build()
            .unwrap();
        assert_eq!(ok.max_duration, Duration::from_millis(10));
    }

    #[test]
    fn test_simulation_config_rejects_unrepresentable_duration() {
        let huge = SimulationConfig::builder()
            .duration_range(Duration::ZERO, Duration::MAX)
            .build();
        assert!(matches!(huge, Err(RqError::Config(_))));
    }

    #[test]
    fn test_simulation_config_scaled() {
        let config = SimulationConfig::default().scaled(10);
        assert_eq!(config.min_duration, Duration::from_millis(500));
        assert_eq!(config.max_duration, Duration::from_millis(1500));

        let unchanged = SimulationConfig::default().scaled(0);
        assert_eq!(unchanged.min_duration, Duration::from_millis(5000));
    }

    #[test]
    fn test_notifier_config_default() {
        let config = NotifierConfig::default();
        assert_eq!(config.preview_len, 40);
        assert_eq!(config.banner_visibility, Duration::from_secs(5));
    }
}
