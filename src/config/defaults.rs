//! System-wide default constants.
//!
//! Grouped by subsystem. Each value is the fallback used when the TOML
//! config omits the corresponding key.

// ============================================================================
// Monitor Loop
// ============================================================================

/// Seconds between health-check rounds.
pub const CHECK_INTERVAL_SECS: u64 = 30;

/// Upper bound on a single probe before it is reported as down (ms).
pub const PROBE_TIMEOUT_MS: u64 = 5_000;

/// Upper bound on a single recovery action before it is reported as failed (seconds).
pub const RECOVERY_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Retention
// ============================================================================

/// Health-check results kept in memory (oldest evicted first).
pub const RECENT_CHECKS_RETENTION: usize = 100;

/// Recovery attempts kept in memory (oldest evicted first).
pub const RECOVERY_LOG_RETENTION: usize = 100;

/// Most recent checks scanned for failures in the pipeline status.
pub const RECENT_FAILURES_WINDOW: usize = 10;

/// Failures listed in the editor incident report.
pub const EDITOR_MESSAGE_FAILURES: usize = 3;

/// Audit events kept by the in-memory audit trail.
pub const MEMORY_AUDIT_CAPACITY: usize = 1_000;

// ============================================================================
// HTTP
// ============================================================================

/// Bind address for the status API.
pub const SERVER_ADDR: &str = "0.0.0.0:8000";

/// Events returned by the history endpoint when no limit is given.
pub const HISTORY_DEFAULT_LIMIT: usize = 50;
