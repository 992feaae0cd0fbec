//! Alerting - synchronous callback fired for every non-healthy check result

use std::sync::Arc;

use super::audit::{AlertSeverity, AuditEvent, AuditTrail};
use crate::types::{Component, HealthStatus};

/// Invoked synchronously with `(component, status)` whenever a non-healthy
/// result is processed. Runs with no monitor lock held.
pub type AlertCallback = Arc<dyn Fn(Component, HealthStatus) + Send + Sync>;

/// Default alert: one `ALERT_TRIGGERED` audit event plus a console notice.
pub fn default_alert(audit: Arc<dyn AuditTrail>) -> AlertCallback {
    Arc::new(move |component, status| {
        let severity = AlertSeverity::for_status(status);
        audit.record(AuditEvent::alert_triggered(component, severity));
        println!("🚨 ALERT: {component} is {status}");
    })
}
