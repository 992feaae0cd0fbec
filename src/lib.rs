//! Pipeline Sentinel: health monitoring and auto-recovery for a publishing pipeline
//!
//! ## Architecture
//!
//! - **Types**: components, statuses, check results and recovery records
//! - **Background**: probes, recovery executors, audit trail, alerting and the
//!   [`PipelineMonitor`] that ties them together on a periodic loop
//! - **API**: axum routes exposing status, metrics, history and manual recovery
//! - **Config**: `sentinel.toml` loading with built-in defaults

pub mod api;
pub mod background;
pub mod config;
pub mod types;

// Re-export configuration
pub use config::{ConfigError, MonitorSettings, SentinelConfig};

// Re-export commonly used types
pub use types::{
    Component, HealthCheckResult, HealthStatus, History, HistoryEvent, MonitorMetrics,
    PipelineStatus, RecoveryAction, RecoveryAttempt,
};

// Re-export the monitor and its capabilities
pub use background::{
    AuditEvent, AuditTrail, MonitorBuilder, MonitorError, PipelineMonitor, Probe, ProbeError,
    ProbeReport, RecoveryError, RecoveryExecutor, RecoveryOutcome, RecoveryPlan,
};
