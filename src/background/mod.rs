//! Background services - health checks and self-healing
//!
//! Runs as a background tokio task that checks every pipeline component on a
//! fixed interval and performs automatic recovery where possible.

pub mod aggregator;
pub mod alert;
pub mod audit;
pub mod monitor;
pub mod probe;
pub mod recovery;
pub mod simulated;

pub use alert::{default_alert, AlertCallback};
pub use audit::{AlertSeverity, AuditEvent, AuditTrail, CompositeAuditTrail, MemoryAuditTrail, TracingAuditTrail};
pub use monitor::{MonitorBuilder, MonitorError, PipelineMonitor, RecoveryOutcome};
pub use probe::{run_probe, Probe, ProbeError, ProbeReport, TcpProbe};
pub use recovery::{RecoveryError, RecoveryExecutor, RecoveryPlan};
pub use simulated::{SimulatedExecutor, SimulatedProbe};
