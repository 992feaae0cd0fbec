//! Status aggregation - folds component statuses into pipeline health
//! and derives operator guidance.
//!
//! Everything here is a pure function of its inputs; the monitor calls it on
//! demand with a snapshot of its state.

use std::collections::BTreeMap;

use crate::config::defaults::EDITOR_MESSAGE_FAILURES;
use crate::types::{Component, FailureSummary, HealthCheckResult, HealthStatus, PipelineStatus};

/// Worst status by fixed precedence: down > degraded > recovering > healthy.
pub fn overall_status<'a>(statuses: impl IntoIterator<Item = &'a HealthStatus>) -> HealthStatus {
    statuses
        .into_iter()
        .copied()
        .max_by_key(HealthStatus::precedence)
        .unwrap_or(HealthStatus::Healthy)
}

/// Share of passing checks in percent; 100 before any check has run.
pub fn uptime_percentage(total_checks: u64, failed_checks: u64) -> f64 {
    if total_checks == 0 {
        return 100.0;
    }
    total_checks.saturating_sub(failed_checks) as f64 / total_checks as f64 * 100.0
}

/// Share of successful recoveries in percent; 0 before any attempt.
pub fn recovery_success_rate(successful: u64, failed: u64) -> f64 {
    let total = successful + failed;
    if total == 0 {
        return 0.0;
    }
    successful as f64 / total as f64 * 100.0
}

/// Non-healthy checks among the last `window` checks, oldest first.
pub fn recent_failures<'a, I>(checks: I, window: usize) -> Vec<FailureSummary>
where
    I: IntoIterator<Item = &'a HealthCheckResult>,
    I::IntoIter: DoubleEndedIterator,
{
    let mut failures: Vec<FailureSummary> = checks
        .into_iter()
        .rev()
        .take(window)
        .filter(|c| !c.status.is_healthy())
        .map(FailureSummary::from)
        .collect();
    failures.reverse();
    failures
}

/// One guidance line per down component, or a single all-clear line.
pub fn suggested_actions(components: &BTreeMap<Component, HealthStatus>) -> Vec<String> {
    let actions: Vec<String> = components
        .iter()
        .filter(|(_, status)| **status == HealthStatus::Down)
        .map(|(component, _)| format!("⚠️ {}", component.down_guidance()))
        .collect();

    if actions.is_empty() {
        vec!["✅ All systems operational. No action needed.".to_string()]
    } else {
        actions
    }
}

/// True when every non-healthy component can be remediated automatically.
pub fn all_auto_recoverable(components: &BTreeMap<Component, HealthStatus>) -> bool {
    components
        .iter()
        .filter(|(_, status)| !status.is_healthy())
        .all(|(component, _)| component.is_auto_recoverable())
}

/// Operator-facing narrative, tiered on the overall status.
///
/// - healthy: operational summary with uptime and last check time
/// - recovering: in-progress notice with the suggested actions
/// - degraded / down: incident report with affected components, next steps
///   and up to three recent failures
pub fn editor_message(status: &PipelineStatus) -> String {
    match status.overall_status {
        HealthStatus::Healthy => {
            let last_check = status
                .last_check
                .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| "no checks run yet".to_string());
            format!(
                "✅ **Publishing Pipeline: OPERATIONAL**\n\n\
                 All systems are running normally. You can publish articles without issues.\n\n\
                 Uptime: {:.2}%\n\
                 Last Check: {}",
                status.uptime_percentage, last_check
            )
        }
        HealthStatus::Recovering => format!(
            "🔄 **Publishing Pipeline: RECOVERING**\n\n\
             The system detected issues and is attempting automatic recovery.\n\
             Please wait 1-2 minutes before trying to publish.\n\n\
             {}\n\n\
             If the issue persists, contact engineering.",
            status.suggested_actions.join("\n")
        ),
        HealthStatus::Degraded | HealthStatus::Down => {
            let next_steps = if status.is_auto_recoverable {
                "Automatic recovery in progress."
            } else {
                "Manual intervention required - contact engineering immediately."
            };
            let issues = status
                .components
                .iter()
                .filter(|(_, s)| !s.is_healthy())
                .map(|(c, s)| format!("- {c}: {s}"))
                .collect::<Vec<_>>()
                .join("\n");
            let skip = status.recent_failures.len().saturating_sub(EDITOR_MESSAGE_FAILURES);
            let failures = status.recent_failures[skip..]
                .iter()
                .map(|f| {
                    format!(
                        "- {}: {}",
                        f.component,
                        f.error.as_deref().unwrap_or("Unknown error")
                    )
                })
                .collect::<Vec<_>>()
                .join("\n");
            let headline = if status.overall_status == HealthStatus::Down {
                "🚨 **Publishing Pipeline: DOWN**\n\nThe publishing system is currently unavailable."
            } else {
                "⚠️ **Publishing Pipeline: DEGRADED**\n\nThe publishing system is running with reduced capability."
            };

            format!(
                "{headline}\n\n\
                 **Issues Detected:**\n{issues}\n\n\
                 **Next Steps:**\n{next_steps}\n\n\
                 **Recent Failures:**\n{failures}\n\n\
                 For immediate assistance, contact the engineering team with this error report."
            )
        }
    }
}
