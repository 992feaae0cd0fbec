//! Probe capability - one asynchronous health check per component
//!
//! A [`Probe`] only reports what it observed. [`run_probe`] owns the
//! contract the monitor relies on: every run yields a [`HealthCheckResult`]
//! within the configured timeout, and any fault (error, timeout, panic)
//! becomes a `down` result carrying the reason.

use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::FutureExt;
use tracing::debug;

use crate::types::{Component, HealthCheckResult, HealthStatus, Metadata};

/// What a probe saw when the component answered.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeReport {
    /// `Healthy` or `Degraded`; use [`ProbeError`] for unreachable components.
    pub status: HealthStatus,
    pub metadata: Option<Metadata>,
}

impl ProbeReport {
    pub fn healthy() -> Self {
        Self { status: HealthStatus::Healthy, metadata: None }
    }

    /// Component answered but with reduced capability.
    pub fn degraded() -> Self {
        Self { status: HealthStatus::Degraded, metadata: None }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata
            .get_or_insert_with(Metadata::new)
            .insert(key.into(), value.into());
        self
    }
}

/// Why a component could not be checked.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("{0}")]
    Unreachable(String),
    #[error("connection failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Health check for one pipeline component.
///
/// Implementations are injected per component when the monitor is built
/// and may be swapped freely (TCP checks, pool checks, query checks, test
/// doubles).
#[async_trait]
pub trait Probe: Send + Sync {
    /// Run one check against the component.
    async fn check(&self) -> Result<ProbeReport, ProbeError>;
}

/// Run `probe` for `component`, converting every outcome into a result.
pub async fn run_probe(component: Component, probe: &dyn Probe, timeout: Duration) -> HealthCheckResult {
    let started = Instant::now();
    let outcome = tokio::time::timeout(timeout, AssertUnwindSafe(probe.check()).catch_unwind()).await;
    let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

    match outcome {
        Ok(Ok(Ok(report))) => HealthCheckResult {
            status: report.status,
            ..HealthCheckResult::healthy(component, latency_ms, report.metadata)
        },
        Ok(Ok(Err(e))) => {
            debug!(component = %component, error = %e, "probe reported failure");
            HealthCheckResult::down(component, e.to_string())
        }
        Ok(Err(_panic)) => {
            debug!(component = %component, "probe panicked");
            HealthCheckResult::down(component, "probe panicked")
        }
        Err(_) => {
            debug!(component = %component, timeout_ms = timeout.as_millis() as u64, "probe timed out");
            HealthCheckResult::down(
                component,
                format!("health check timed out after {}ms", timeout.as_millis()),
            )
        }
    }
}

// ============================================================================
// TCP Probe
// ============================================================================

/// Healthy when a TCP connection to `address` can be established.
///
/// Suitable for network, database, queue broker and storage endpoints where
/// an accepting socket is a reasonable liveness signal.
pub struct TcpProbe {
    address: String,
}

impl TcpProbe {
    pub fn new(address: impl Into<String>) -> Self {
        Self { address: address.into() }
    }
}

#[async_trait]
impl Probe for TcpProbe {
    async fn check(&self) -> Result<ProbeReport, ProbeError> {
        let stream = tokio::net::TcpStream::connect(&self.address).await?;
        let peer = stream.peer_addr().map(|a| a.to_string()).unwrap_or_default();
        Ok(ProbeReport::healthy().with_metadata("peer", peer))
    }
}
