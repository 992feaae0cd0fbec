//! Component health types shared by the monitor, the audit trail and the API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Free-form metadata attached to checks and recovery attempts.
pub type Metadata = BTreeMap<String, serde_json::Value>;

// ============================================================================
// Component
// ============================================================================

/// A monitored subsystem of the publishing pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    Network,
    ValidationService,
    Database,
    Storage,
    Queue,
}

impl Component {
    /// Every monitored component, in a stable order.
    pub const ALL: [Component; 5] = [
        Component::Network,
        Component::ValidationService,
        Component::Database,
        Component::Storage,
        Component::Queue,
    ];

    /// Wire name, as used in URLs, config keys and audit records.
    pub fn as_str(&self) -> &'static str {
        match self {
            Component::Network => "network",
            Component::ValidationService => "validation_service",
            Component::Database => "database",
            Component::Storage => "storage",
            Component::Queue => "queue",
        }
    }

    /// Whether failures of this component may be remediated without a human.
    ///
    /// Fixed policy: the validation service always needs an engineer.
    pub fn is_auto_recoverable(&self) -> bool {
        !matches!(self, Component::ValidationService)
    }

    /// Remediation used when no explicit mapping is configured.
    pub fn default_recovery_action(&self) -> RecoveryAction {
        match self {
            Component::Network => RecoveryAction::Reconnect,
            Component::ValidationService => RecoveryAction::RestartService,
            Component::Database => RecoveryAction::Reconnect,
            Component::Storage => RecoveryAction::Failover,
            Component::Queue => RecoveryAction::ClearQueue,
        }
    }

    /// Operator guidance shown while this component is down.
    pub fn down_guidance(&self) -> &'static str {
        match self {
            Component::Network => {
                "Network is down. Check internet connectivity and firewall rules."
            }
            Component::ValidationService => {
                "Validation service crashed. Contact engineering to restart service."
            }
            Component::Database => {
                "Database connection lost. Check DB server status and credentials."
            }
            Component::Storage => {
                "Storage unavailable. Verify storage service and check disk space."
            }
            Component::Queue => {
                "Message queue down. Check queue broker and clear stuck messages."
            }
        }
    }

    /// Comma-separated list of valid wire names (for rejection messages).
    pub fn valid_names() -> String {
        Self::ALL
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a component name does not match any monitored component.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown component '{name}', expected one of: {valid}")]
pub struct ParseComponentError {
    pub name: String,
    pub valid: String,
}

impl FromStr for Component {
    type Err = ParseComponentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Component::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| ParseComponentError {
                name: s.to_string(),
                valid: Component::valid_names(),
            })
    }
}

// ============================================================================
// Health Status
// ============================================================================

/// Health of a single component, or of the pipeline as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Operating normally
    Healthy,
    /// Running with reduced capability (only produced by probes or injection)
    Degraded,
    /// Not operational
    Down,
    /// A recovery attempt is in flight
    Recovering,
}

impl HealthStatus {
    /// Rank used when folding component statuses into the overall status.
    ///
    /// down > degraded > recovering > healthy
    pub fn precedence(&self) -> u8 {
        match self {
            HealthStatus::Healthy => 0,
            HealthStatus::Recovering => 1,
            HealthStatus::Degraded => 2,
            HealthStatus::Down => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Down => "down",
            HealthStatus::Recovering => "recovering",
        }
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Health Check Result
// ============================================================================

/// Outcome of one probe run. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub component: Component,
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    /// Round-trip time of the probe (milliseconds), present on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl HealthCheckResult {
    /// A passing check.
    pub fn healthy(component: Component, latency_ms: f64, metadata: Option<Metadata>) -> Self {
        Self {
            component,
            status: HealthStatus::Healthy,
            timestamp: Utc::now(),
            latency_ms: Some(latency_ms),
            error_message: None,
            metadata,
        }
    }

    /// A failing check with the reason the component is unreachable.
    pub fn down(component: Component, error: impl Into<String>) -> Self {
        Self {
            component,
            status: HealthStatus::Down,
            timestamp: Utc::now(),
            latency_ms: None,
            error_message: Some(error.into()),
            metadata: None,
        }
    }
}

// ============================================================================
// Recovery
// ============================================================================

/// Kind of remediation applied to a failed component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryAction {
    Reconnect,
    RestartService,
    ClearQueue,
    Failover,
    /// No automated implementation; always fails
    ManualIntervention,
}

impl RecoveryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecoveryAction::Reconnect => "reconnect",
            RecoveryAction::RestartService => "restart_service",
            RecoveryAction::ClearQueue => "clear_queue",
            RecoveryAction::Failover => "failover",
            RecoveryAction::ManualIntervention => "manual_intervention",
        }
    }
}

impl fmt::Display for RecoveryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record of one recovery attempt. Appended to the recovery log, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryAttempt {
    pub attempt_id: String,
    pub component: Component,
    pub action: RecoveryAction,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub duration_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

// ============================================================================
// Derived Views
// ============================================================================

/// A non-healthy check reduced to what operators need to see.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureSummary {
    pub component: Component,
    pub timestamp: DateTime<Utc>,
    pub error: Option<String>,
}

impl From<&HealthCheckResult> for FailureSummary {
    fn from(check: &HealthCheckResult) -> Self {
        Self {
            component: check.component,
            timestamp: check.timestamp,
            error: check.error_message.clone(),
        }
    }
}

/// Aggregated pipeline health, recomputed on every query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineStatus {
    pub overall_status: HealthStatus,
    pub components: BTreeMap<Component, HealthStatus>,
    /// Time the last check round was processed, if any
    pub last_check: Option<DateTime<Utc>>,
    pub uptime_percentage: f64,
    pub recent_failures: Vec<FailureSummary>,
    pub suggested_actions: Vec<String>,
    pub is_auto_recoverable: bool,
}

/// Counters and rates for the metrics endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorMetrics {
    pub total_checks: u64,
    pub failed_checks: u64,
    pub success_rate: f64,
    pub successful_recoveries: u64,
    pub failed_recoveries: u64,
    pub total_recovery_attempts: u64,
    pub recovery_success_rate: f64,
    pub overall_status: HealthStatus,
    pub components: BTreeMap<Component, HealthStatus>,
    pub recent_checks: usize,
}

/// One entry of the merged check/recovery history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HistoryEvent {
    HealthCheck(HealthCheckResult),
    RecoveryAttempt(RecoveryAttempt),
}

impl HistoryEvent {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            HistoryEvent::HealthCheck(check) => check.timestamp,
            HistoryEvent::RecoveryAttempt(attempt) => attempt.timestamp,
        }
    }
}

/// Recent history window returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct History {
    pub events: Vec<HistoryEvent>,
    /// Number of merged events before the limit was applied
    pub total_events: usize,
}
