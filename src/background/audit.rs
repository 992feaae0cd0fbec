//! Audit trail - append-only record of checks, failures, recoveries and alerts
//!
//! The monitor writes one event per health check, per detected failure, per
//! recovery attempt and per alert. Sinks decide where the events go; the
//! decision logic never reads them back.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::types::{Component, HealthCheckResult, HealthStatus, RecoveryAttempt};

/// Tracing target carrying audit events, so subscribers can route them separately.
pub const AUDIT_TARGET: &str = "pipeline_audit";

/// Alert severity derived from the status that raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertSeverity {
    Critical,
    Warning,
}

impl AlertSeverity {
    pub fn for_status(status: HealthStatus) -> Self {
        if status == HealthStatus::Down {
            AlertSeverity::Critical
        } else {
            AlertSeverity::Warning
        }
    }
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertSeverity::Critical => write!(f, "CRITICAL"),
            AlertSeverity::Warning => write!(f, "WARNING"),
        }
    }
}

/// One audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEvent {
    HealthCheck(HealthCheckResult),
    FailureDetected {
        component: Component,
        error: String,
        timestamp: DateTime<Utc>,
    },
    RecoveryAttempt(RecoveryAttempt),
    AlertTriggered {
        component: Component,
        severity: AlertSeverity,
        timestamp: DateTime<Utc>,
    },
}

impl AuditEvent {
    pub fn failure_detected(component: Component, error: impl Into<String>) -> Self {
        AuditEvent::FailureDetected {
            component,
            error: error.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn alert_triggered(component: Component, severity: AlertSeverity) -> Self {
        AuditEvent::AlertTriggered {
            component,
            severity,
            timestamp: Utc::now(),
        }
    }

    pub fn component(&self) -> Component {
        match self {
            AuditEvent::HealthCheck(check) => check.component,
            AuditEvent::FailureDetected { component, .. } => *component,
            AuditEvent::RecoveryAttempt(attempt) => attempt.component,
            AuditEvent::AlertTriggered { component, .. } => *component,
        }
    }
}

/// Destination for audit events. Must not block for long; called inline.
pub trait AuditTrail: Send + Sync {
    fn record(&self, event: AuditEvent);
}

// ============================================================================
// Tracing sink
// ============================================================================

/// Emits each event as a structured `tracing` event on [`AUDIT_TARGET`].
///
/// Levels follow the outcome: checks at info, failures at error, recoveries
/// at info or error, alerts at warn.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditTrail;

impl AuditTrail for TracingAuditTrail {
    fn record(&self, event: AuditEvent) {
        let payload = serde_json::to_string(&event).unwrap_or_else(|e| format!("<unserializable: {e}>"));
        match &event {
            AuditEvent::HealthCheck(check) => {
                info!(target: AUDIT_TARGET, component = %check.component, status = %check.status, payload = %payload, "HEALTH_CHECK");
            }
            AuditEvent::FailureDetected { component, error, .. } => {
                error!(target: AUDIT_TARGET, component = %component, error = %error, "FAILURE_DETECTED");
            }
            AuditEvent::RecoveryAttempt(attempt) if attempt.success => {
                info!(target: AUDIT_TARGET, component = %attempt.component, action = %attempt.action, payload = %payload, "RECOVERY_ATTEMPT");
            }
            AuditEvent::RecoveryAttempt(attempt) => {
                error!(target: AUDIT_TARGET, component = %attempt.component, action = %attempt.action, payload = %payload, "RECOVERY_ATTEMPT");
            }
            AuditEvent::AlertTriggered { component, severity, .. } => {
                warn!(target: AUDIT_TARGET, component = %component, severity = %severity, "ALERT_TRIGGERED");
            }
        }
    }
}

// ============================================================================
// In-memory sink
// ============================================================================

/// Keeps the most recent events in memory (oldest evicted first).
#[derive(Debug)]
pub struct MemoryAuditTrail {
    events: Mutex<VecDeque<AuditEvent>>,
    capacity: usize,
}

impl MemoryAuditTrail {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity: capacity.max(1),
        }
    }

    /// Snapshot of retained events, oldest first.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<AuditEvent>> {
        // A panic while holding the lock leaves the deque intact.
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MemoryAuditTrail {
    fn default() -> Self {
        Self::new(crate::config::defaults::MEMORY_AUDIT_CAPACITY)
    }
}

impl AuditTrail for MemoryAuditTrail {
    fn record(&self, event: AuditEvent) {
        let mut events = self.lock();
        if events.len() >= self.capacity {
            events.pop_front();
        }
        events.push_back(event);
    }
}

/// Fans each event out to several sinks in order.
pub struct CompositeAuditTrail {
    sinks: Vec<Arc<dyn AuditTrail>>,
}

impl CompositeAuditTrail {
    pub fn new(sinks: Vec<Arc<dyn AuditTrail>>) -> Self {
        Self { sinks }
    }
}

impl AuditTrail for CompositeAuditTrail {
    fn record(&self, event: AuditEvent) {
        for sink in &self.sinks {
            sink.record(event.clone());
        }
    }
}
