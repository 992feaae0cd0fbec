//! Shared data structures for pipeline health monitoring
//!
//! - Component / HealthStatus: identity and state of each monitored subsystem
//! - HealthCheckResult: one probe outcome
//! - RecoveryAction / RecoveryAttempt: remediation kinds and their audit records
//! - PipelineStatus / MonitorMetrics / History: derived read-only views

mod health;

pub use health::*;
