//! Simulated probes and recovery executors for demos and soak tests.
//!
//! Each double sleeps for a fixed latency and fails at random with a
//! configurable probability. This is the only place randomness enters the
//! monitor; production deployments inject real probes and executors.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

use super::probe::{Probe, ProbeError, ProbeReport};
use super::recovery::{RecoveryError, RecoveryExecutor};
use crate::types::{Component, RecoveryAction};

/// Roll a failure with probability `rate` (clamped to 0..=1).
fn roll(rate: f64) -> bool {
    rand::thread_rng().gen_bool(rate.clamp(0.0, 1.0))
}

/// Probe that answers after `latency` and fails `failure_rate` of the time.
#[derive(Debug, Clone)]
pub struct SimulatedProbe {
    latency: Duration,
    failure_rate: f64,
    error: String,
    report: ProbeReport,
}

impl SimulatedProbe {
    pub fn new(latency: Duration, failure_rate: f64, error: impl Into<String>) -> Self {
        Self {
            latency,
            failure_rate,
            error: error.into(),
            report: ProbeReport::healthy(),
        }
    }

    /// Latency, failure rate, error text and metadata typical for `component`.
    pub fn for_component(component: Component) -> Self {
        match component {
            Component::Network => Self::new(Duration::from_millis(50), 0.05, "Network timeout"),
            Component::ValidationService => {
                Self::new(Duration::from_millis(30), 0.03, "Validation service unresponsive")
                    .reporting(ProbeReport::healthy().with_metadata("active_validations", 5))
            }
            Component::Database => Self::new(Duration::from_millis(20), 0.02, "Database connection lost")
                .reporting(
                    ProbeReport::healthy()
                        .with_metadata("active_connections", 10)
                        .with_metadata("pool_size", 20),
                ),
            Component::Storage => Self::new(Duration::from_millis(40), 0.01, "Storage service unavailable")
                .reporting(ProbeReport::healthy().with_metadata("disk_usage_percent", 65)),
            Component::Queue => Self::new(Duration::from_millis(20), 0.04, "Queue broker connection failed")
                .reporting(ProbeReport::healthy().with_metadata("pending_messages", 42)),
        }
    }

    /// Report returned on success.
    pub fn reporting(mut self, report: ProbeReport) -> Self {
        self.report = report;
        self
    }
}

#[async_trait]
impl Probe for SimulatedProbe {
    async fn check(&self) -> Result<ProbeReport, ProbeError> {
        tokio::time::sleep(self.latency).await;
        if roll(self.failure_rate) {
            return Err(ProbeError::Unreachable(self.error.clone()));
        }
        Ok(self.report.clone())
    }
}

/// Executor that takes a per-action duration, then a verification pause,
/// and fails with the per-action rate.
#[derive(Debug, Clone)]
pub struct SimulatedExecutor {
    verify_delay: Duration,
    scale: f64,
}

impl Default for SimulatedExecutor {
    fn default() -> Self {
        Self {
            verify_delay: Duration::from_millis(500),
            scale: 1.0,
        }
    }
}

impl SimulatedExecutor {
    /// Multiply every delay by `scale` (e.g. 0.01 in tests).
    pub fn scaled(scale: f64) -> Self {
        let base = Self::default();
        Self {
            verify_delay: base.verify_delay.mul_f64(scale),
            scale,
        }
    }

    /// Duration and failure rate of `action`.
    fn profile(action: RecoveryAction) -> Option<(Duration, f64)> {
        match action {
            RecoveryAction::Reconnect => Some((Duration::from_millis(300), 0.20)),
            RecoveryAction::RestartService => Some((Duration::from_millis(500), 0.15)),
            RecoveryAction::ClearQueue => Some((Duration::from_millis(200), 0.10)),
            RecoveryAction::Failover => Some((Duration::from_millis(400), 0.25)),
            RecoveryAction::ManualIntervention => None,
        }
    }
}

#[async_trait]
impl RecoveryExecutor for SimulatedExecutor {
    async fn execute(&self, component: Component, action: RecoveryAction) -> Result<(), RecoveryError> {
        let (duration, failure_rate) =
            Self::profile(action).ok_or(RecoveryError::ManualInterventionRequired)?;

        tokio::time::sleep(duration.mul_f64(self.scale)).await;
        if roll(failure_rate) {
            let verb = match action {
                RecoveryAction::Reconnect => "Reconnection",
                RecoveryAction::RestartService => "Service restart",
                RecoveryAction::ClearQueue => "Queue clear",
                RecoveryAction::Failover => "Failover",
                RecoveryAction::ManualIntervention => "Manual intervention",
            };
            return Err(RecoveryError::Failed(format!("{verb} failed for {component}")));
        }

        tokio::time::sleep(self.verify_delay).await;
        Ok(())
    }
}
