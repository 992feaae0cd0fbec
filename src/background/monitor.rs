//! Pipeline Monitor - periodic health checks with automatic recovery
//!
//! Owns the per-component status map, the check/recovery counters and the
//! two bounded logs. A background task runs one check round per interval:
//!
//! 1. all probes run concurrently and every result is audited
//! 2. counters, the recent-checks log and component statuses are updated
//! 3. each failure is audited and raised through the alert callback
//! 4. auto-recoverable failures are remediated one after another
//!
//! At most one recovery runs per component at any time, whether it was
//! started by the loop or requested by an operator.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::aggregator;
use super::alert::{default_alert, AlertCallback};
use super::audit::{AuditEvent, AuditTrail, TracingAuditTrail};
use super::probe::{run_probe, Probe};
use super::recovery::{RecoveryError, RecoveryExecutor, RecoveryPlan};
use crate::config::{MonitorSettings, SentinelConfig};
use crate::types::{
    Component, HealthCheckResult, HealthStatus, History, HistoryEvent, Metadata, MonitorMetrics,
    ParseComponentError, PipelineStatus, RecoveryAction, RecoveryAttempt,
};

/// Errors surfaced to callers of the monitor's boundary operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MonitorError {
    #[error(transparent)]
    UnknownComponent(#[from] ParseComponentError),
    #[error("recovery already in progress for {0}")]
    RecoveryInProgress(Component),
    #[error("status '{0}' can only be set by the monitor's own recovery")]
    ReservedStatus(HealthStatus),
}

/// Result of an operator-requested recovery.
#[derive(Debug, Clone, PartialEq)]
pub enum RecoveryOutcome {
    /// Component was healthy; nothing was executed.
    AlreadyHealthy(Component),
    Attempted(RecoveryAttempt),
}

// ============================================================================
// State
// ============================================================================

#[derive(Debug)]
struct MonitorState {
    component_status: BTreeMap<Component, HealthStatus>,
    /// Components with a recovery currently executing
    in_flight: BTreeSet<Component>,
    recent_checks: VecDeque<HealthCheckResult>,
    recovery_attempts: VecDeque<RecoveryAttempt>,
    total_checks: u64,
    failed_checks: u64,
    successful_recoveries: u64,
    failed_recoveries: u64,
    last_check: Option<DateTime<Utc>>,
}

impl MonitorState {
    fn new() -> Self {
        Self {
            component_status: Component::ALL
                .into_iter()
                .map(|c| (c, HealthStatus::Healthy))
                .collect(),
            in_flight: BTreeSet::new(),
            recent_checks: VecDeque::new(),
            recovery_attempts: VecDeque::new(),
            total_checks: 0,
            failed_checks: 0,
            successful_recoveries: 0,
            failed_recoveries: 0,
            last_check: None,
        }
    }

    fn status(&self, component: Component) -> HealthStatus {
        self.component_status
            .get(&component)
            .copied()
            .unwrap_or(HealthStatus::Healthy)
    }

    fn push_check(&mut self, check: HealthCheckResult, retention: usize) {
        while self.recent_checks.len() >= retention {
            self.recent_checks.pop_front();
        }
        self.recent_checks.push_back(check);
    }

    fn push_attempt(&mut self, attempt: RecoveryAttempt, retention: usize) {
        while self.recovery_attempts.len() >= retention {
            self.recovery_attempts.pop_front();
        }
        self.recovery_attempts.push_back(attempt);
    }
}

struct MonitorTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

struct MonitorInner {
    settings: MonitorSettings,
    plan: RecoveryPlan,
    probes: Vec<(Component, Arc<dyn Probe>)>,
    executors: BTreeMap<Component, Arc<dyn RecoveryExecutor>>,
    default_executor: Option<Arc<dyn RecoveryExecutor>>,
    audit: Arc<dyn AuditTrail>,
    alert: AlertCallback,
    state: RwLock<MonitorState>,
    task: Mutex<Option<MonitorTask>>,
    attempt_seq: AtomicU64,
}

// ============================================================================
// Builder
// ============================================================================

/// Collects the injected capabilities for a [`PipelineMonitor`].
pub struct MonitorBuilder {
    settings: MonitorSettings,
    plan: RecoveryPlan,
    probes: BTreeMap<Component, Arc<dyn Probe>>,
    executors: BTreeMap<Component, Arc<dyn RecoveryExecutor>>,
    default_executor: Option<Arc<dyn RecoveryExecutor>>,
    audit: Option<Arc<dyn AuditTrail>>,
    alert: Option<AlertCallback>,
}

impl MonitorBuilder {
    pub fn new(settings: MonitorSettings) -> Self {
        Self {
            settings,
            plan: RecoveryPlan::default(),
            probes: BTreeMap::new(),
            executors: BTreeMap::new(),
            default_executor: None,
            audit: None,
            alert: None,
        }
    }

    /// Settings and recovery overrides from a loaded config.
    pub fn from_config(config: &SentinelConfig) -> Self {
        Self::new(config.monitor.clone())
            .recovery_plan(RecoveryPlan::with_overrides(&config.recovery.actions))
    }

    pub fn probe(mut self, component: Component, probe: impl Probe + 'static) -> Self {
        self.probes.insert(component, Arc::new(probe));
        self
    }

    pub fn shared_probe(mut self, component: Component, probe: Arc<dyn Probe>) -> Self {
        self.probes.insert(component, probe);
        self
    }

    /// Executor used for `component` only.
    pub fn executor(mut self, component: Component, executor: Arc<dyn RecoveryExecutor>) -> Self {
        self.executors.insert(component, executor);
        self
    }

    /// Executor used for components without a dedicated one.
    pub fn default_executor(mut self, executor: Arc<dyn RecoveryExecutor>) -> Self {
        self.default_executor = Some(executor);
        self
    }

    pub fn recovery_plan(mut self, plan: RecoveryPlan) -> Self {
        self.plan = plan;
        self
    }

    /// Audit sink (defaults to [`TracingAuditTrail`]).
    pub fn audit(mut self, audit: Arc<dyn AuditTrail>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Alert callback (defaults to [`default_alert`] over the audit sink).
    pub fn alert(mut self, alert: AlertCallback) -> Self {
        self.alert = Some(alert);
        self
    }

    pub fn build(self) -> PipelineMonitor {
        for component in Component::ALL {
            if !self.probes.contains_key(&component) {
                warn!(component = %component, "No probe registered, component will never be checked");
            }
        }

        let audit = self
            .audit
            .unwrap_or_else(|| Arc::new(TracingAuditTrail) as Arc<dyn AuditTrail>);
        let alert = self.alert.unwrap_or_else(|| default_alert(audit.clone()));

        PipelineMonitor {
            inner: Arc::new(MonitorInner {
                settings: self.settings,
                plan: self.plan,
                probes: self.probes.into_iter().collect(),
                executors: self.executors,
                default_executor: self.default_executor,
                audit,
                alert,
                state: RwLock::new(MonitorState::new()),
                task: Mutex::new(None),
                attempt_seq: AtomicU64::new(0),
            }),
        }
    }
}

// ============================================================================
// Monitor
// ============================================================================

/// Health monitor for the publishing pipeline.
///
/// Cheap to clone; clones share the same state. Call [`stop`](Self::stop)
/// before dropping the last handle, the background task holds one too.
#[derive(Clone)]
pub struct PipelineMonitor {
    inner: Arc<MonitorInner>,
}

impl PipelineMonitor {
    pub fn builder(settings: MonitorSettings) -> MonitorBuilder {
        MonitorBuilder::new(settings)
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.inner.settings
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Spawn the background check loop. No-op when already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) {
        let mut task = self.lock_task();
        if task.as_ref().is_some_and(|t| !t.handle.is_finished()) {
            debug!("Pipeline monitor already running");
            return;
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(self.clone().run(cancel.clone()));
        *task = Some(MonitorTask { cancel, handle });
    }

    /// Cancel the background loop. Idempotent.
    ///
    /// An in-flight recovery is not aborted; its outcome is still recorded.
    pub fn stop(&self) {
        if let Some(task) = self.lock_task().take() {
            task.cancel.cancel();
            info!("Pipeline monitoring stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock_task()
            .as_ref()
            .is_some_and(|t| !t.handle.is_finished())
    }

    fn lock_task(&self) -> std::sync::MutexGuard<'_, Option<MonitorTask>> {
        self.inner.task.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn run(self, cancel: CancellationToken) {
        let interval = self.inner.settings.check_interval();
        info!(
            probes = self.inner.probes.len(),
            interval_secs = interval.as_secs(),
            "Pipeline monitoring started"
        );

        loop {
            let cycle = AssertUnwindSafe(self.run_cycle()).catch_unwind();
            tokio::select! {
                _ = cancel.cancelled() => break,
                outcome = cycle => {
                    if outcome.is_err() {
                        error!("Monitor loop error: check cycle panicked, retrying next interval");
                    }
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }

        debug!("Pipeline monitor loop exited");
    }

    /// One check round: probe, record, alert, then recover what can be recovered.
    async fn run_cycle(&self) {
        let results = self.perform_health_checks().await;
        let failing = self.process_results(&results).await;

        for component in failing {
            if self.is_auto_recoverable(component) {
                self.recover_detached(component).await;
            }
        }
    }

    // ------------------------------------------------------------------------
    // Checks
    // ------------------------------------------------------------------------

    /// Run every probe concurrently and audit each result.
    ///
    /// Probe faults are already converted to `down` results, so there is one
    /// result per registered probe.
    pub async fn perform_health_checks(&self) -> Vec<HealthCheckResult> {
        let timeout = self.inner.settings.probe_timeout();
        let checks = self
            .inner
            .probes
            .iter()
            .map(|(component, probe)| run_probe(*component, probe.as_ref(), timeout));
        let results = futures::future::join_all(checks).await;

        for result in &results {
            self.inner.audit.record(AuditEvent::HealthCheck(result.clone()));
        }
        results
    }

    /// Update counters, logs and statuses; audit and alert each failure.
    ///
    /// Returns the failing components in result order.
    async fn process_results(&self, results: &[HealthCheckResult]) -> Vec<Component> {
        let retention = self.inner.settings.recent_checks_retention;
        let failures: Vec<&HealthCheckResult> =
            results.iter().filter(|r| !r.status.is_healthy()).collect();

        {
            let mut state = self.inner.state.write().await;
            state.total_checks += results.len() as u64;
            state.last_check = Some(Utc::now());
            for result in results {
                state.push_check(result.clone(), retention);
            }
            for failure in &failures {
                state.failed_checks += 1;
                // An executing recovery decides the final status.
                if !state.in_flight.contains(&failure.component) {
                    state.component_status.insert(failure.component, failure.status);
                }
            }
        }

        for failure in &failures {
            let error = failure
                .error_message
                .clone()
                .unwrap_or_else(|| "Unknown error".to_string());
            self.inner
                .audit
                .record(AuditEvent::failure_detected(failure.component, error));

            let alert = &self.inner.alert;
            let raised = std::panic::catch_unwind(AssertUnwindSafe(|| {
                alert(failure.component, failure.status)
            }));
            if raised.is_err() {
                error!(component = %failure.component, "Alert callback panicked");
            }
        }

        failures.iter().map(|f| f.component).collect()
    }

    /// Out-of-cycle probe round. Results are audited and returned; counters,
    /// statuses and alerts are left to the loop, which also owns recovery.
    pub async fn force_check(&self) -> Vec<HealthCheckResult> {
        info!("Forced health check requested");
        self.perform_health_checks().await
    }

    // ------------------------------------------------------------------------
    // Recovery
    // ------------------------------------------------------------------------

    /// Every component except the validation service may self-heal.
    pub fn is_auto_recoverable(&self, component: Component) -> bool {
        component.is_auto_recoverable()
    }

    /// Run a recovery in its own task so cancelling the loop cannot abort it.
    async fn recover_detached(&self, component: Component) -> Option<RecoveryAttempt> {
        let monitor = self.clone();
        match tokio::spawn(async move { monitor.attempt_recovery(component).await }).await {
            Ok(Ok(attempt)) => Some(attempt),
            Ok(Err(e)) => {
                debug!(component = %component, error = %e, "Automatic recovery skipped");
                None
            }
            Err(e) => {
                error!(component = %component, error = %e, "Recovery task failed");
                None
            }
        }
    }

    /// Remediate `component` with its mapped action.
    ///
    /// The component is `recovering` while the executor runs, then `healthy`
    /// or `down`. The attempt is appended to the recovery log and audited
    /// exactly once. Executor failures are reported in the returned record;
    /// the only error is a rejection when a recovery for the same component
    /// is already executing.
    pub async fn attempt_recovery(&self, component: Component) -> Result<RecoveryAttempt, MonitorError> {
        let action = self.inner.plan.action_for(component);

        let previous = {
            let mut state = self.inner.state.write().await;
            if !state.in_flight.insert(component) {
                return Err(MonitorError::RecoveryInProgress(component));
            }
            let previous = state.status(component);
            state.component_status.insert(component, HealthStatus::Recovering);
            previous
        };

        let attempt_id = self.next_attempt_id(component);
        info!(component = %component, action = %action, attempt_id = %attempt_id, "Attempting recovery");

        let started = Instant::now();
        let outcome = self.execute(component, action).await;
        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;

        let mut metadata = Metadata::new();
        metadata.insert("previous_status".to_string(), previous.as_str().into());

        let attempt = RecoveryAttempt {
            attempt_id,
            component,
            action,
            timestamp: Utc::now(),
            success: outcome.is_ok(),
            duration_ms,
            error_message: outcome.as_ref().err().map(ToString::to_string),
            metadata: Some(metadata),
        };

        {
            let mut state = self.inner.state.write().await;
            state.in_flight.remove(&component);
            if attempt.success {
                state.component_status.insert(component, HealthStatus::Healthy);
                state.successful_recoveries += 1;
            } else {
                state.component_status.insert(component, HealthStatus::Down);
                state.failed_recoveries += 1;
            }
            state.push_attempt(attempt.clone(), self.inner.settings.recovery_log_retention);
        }

        if attempt.success {
            info!(component = %component, duration_ms = attempt.duration_ms, "Recovery succeeded");
        } else {
            warn!(
                component = %component,
                error = attempt.error_message.as_deref().unwrap_or_default(),
                "Recovery failed"
            );
        }
        self.inner.audit.record(AuditEvent::RecoveryAttempt(attempt.clone()));

        Ok(attempt)
    }

    async fn execute(&self, component: Component, action: RecoveryAction) -> Result<(), RecoveryError> {
        if action == RecoveryAction::ManualIntervention {
            return Err(RecoveryError::ManualInterventionRequired);
        }

        let executor = self
            .inner
            .executors
            .get(&component)
            .or(self.inner.default_executor.as_ref())
            .ok_or(RecoveryError::NoExecutor(component))?;

        let timeout = self.inner.settings.recovery_timeout();
        let run = AssertUnwindSafe(executor.execute(component, action)).catch_unwind();
        match tokio::time::timeout(timeout, run).await {
            Ok(Ok(result)) => result,
            Ok(Err(_panic)) => Err(RecoveryError::Panicked),
            Err(_) => Err(RecoveryError::TimedOut {
                action,
                timeout_secs: timeout.as_secs(),
            }),
        }
    }

    fn next_attempt_id(&self, component: Component) -> String {
        let seq = self.inner.attempt_seq.fetch_add(1, Ordering::Relaxed);
        format!("{}_{}_{}", component, Utc::now().timestamp_micros(), seq)
    }

    /// Operator-requested recovery by component name.
    ///
    /// Unknown names are rejected; a healthy component short-circuits
    /// without touching the executor.
    pub async fn trigger_recovery(&self, name: &str) -> Result<RecoveryOutcome, MonitorError> {
        let component: Component = name.parse()?;

        if self.component_status(component).await.is_healthy() {
            info!(component = %component, "Manual recovery requested but component is already healthy");
            return Ok(RecoveryOutcome::AlreadyHealthy(component));
        }

        info!(component = %component, "Manual recovery requested");
        self.attempt_recovery(component)
            .await
            .map(RecoveryOutcome::Attempted)
    }

    /// Set a component's status from outside (e.g. `degraded` from an
    /// external signal). `recovering` is reserved for in-flight recoveries.
    pub async fn inject_status(&self, component: Component, status: HealthStatus) -> Result<(), MonitorError> {
        if status == HealthStatus::Recovering {
            return Err(MonitorError::ReservedStatus(status));
        }
        let mut state = self.inner.state.write().await;
        if state.in_flight.contains(&component) {
            return Err(MonitorError::RecoveryInProgress(component));
        }
        state.component_status.insert(component, status);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub async fn component_status(&self, component: Component) -> HealthStatus {
        self.inner.state.read().await.status(component)
    }

    /// Aggregated pipeline health, derived from current state.
    pub async fn pipeline_status(&self) -> PipelineStatus {
        let state = self.inner.state.read().await;
        let components = state.component_status.clone();

        PipelineStatus {
            overall_status: aggregator::overall_status(components.values()),
            uptime_percentage: aggregator::uptime_percentage(state.total_checks, state.failed_checks),
            recent_failures: aggregator::recent_failures(
                &state.recent_checks,
                self.inner.settings.recent_failures_window,
            ),
            suggested_actions: aggregator::suggested_actions(&components),
            is_auto_recoverable: aggregator::all_auto_recoverable(&components),
            last_check: state.last_check,
            components,
        }
    }

    /// Human-readable status for editors.
    pub async fn editor_message(&self) -> String {
        aggregator::editor_message(&self.pipeline_status().await)
    }

    pub async fn metrics(&self) -> MonitorMetrics {
        let state = self.inner.state.read().await;
        MonitorMetrics {
            total_checks: state.total_checks,
            failed_checks: state.failed_checks,
            success_rate: aggregator::uptime_percentage(state.total_checks, state.failed_checks),
            successful_recoveries: state.successful_recoveries,
            failed_recoveries: state.failed_recoveries,
            total_recovery_attempts: state.successful_recoveries + state.failed_recoveries,
            recovery_success_rate: aggregator::recovery_success_rate(
                state.successful_recoveries,
                state.failed_recoveries,
            ),
            overall_status: aggregator::overall_status(state.component_status.values()),
            components: state.component_status.clone(),
            recent_checks: state.recent_checks.len(),
        }
    }

    /// Checks and recovery attempts merged newest first, at most `limit` events.
    pub async fn history(&self, limit: usize) -> History {
        let state = self.inner.state.read().await;
        let checks = state
            .recent_checks
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .map(HistoryEvent::HealthCheck);
        let attempts = state
            .recovery_attempts
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .map(HistoryEvent::RecoveryAttempt);

        let mut events: Vec<HistoryEvent> = checks.chain(attempts).collect();
        events.sort_by_key(|e| std::cmp::Reverse(e.timestamp()));
        let total_events = events.len();
        events.truncate(limit);

        History { events, total_events }
    }

    /// Snapshot of the recent-checks log, oldest first.
    pub async fn recent_checks(&self) -> Vec<HealthCheckResult> {
        self.inner.state.read().await.recent_checks.iter().cloned().collect()
    }

    /// Snapshot of the recovery log, oldest first.
    pub async fn recovery_attempts(&self) -> Vec<RecoveryAttempt> {
        self.inner.state.read().await.recovery_attempts.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::background::audit::MemoryAuditTrail;
    use crate::background::probe::{ProbeError, ProbeReport};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize};
    use std::time::Duration;

    /// Probe whose outcome can be flipped at runtime.
    #[derive(Clone, Default)]
    struct SwitchProbe {
        failing: Arc<AtomicBool>,
    }

    impl SwitchProbe {
        fn failing() -> Self {
            let probe = Self::default();
            probe.failing.store(true, Ordering::SeqCst);
            probe
        }
    }

    #[async_trait]
    impl Probe for SwitchProbe {
        async fn check(&self) -> Result<ProbeReport, ProbeError> {
            if self.failing.load(Ordering::SeqCst) {
                Err(ProbeError::Unreachable("simulated outage".to_string()))
            } else {
                Ok(ProbeReport::healthy())
            }
        }
    }

    /// Executor that records calls and concurrency.
    #[derive(Default)]
    struct RecordingExecutor {
        fail: bool,
        delay: Duration,
        calls: AtomicUsize,
        running: AtomicUsize,
        max_running: AtomicUsize,
    }

    impl RecordingExecutor {
        fn succeeding() -> Arc<Self> {
            Arc::new(Self::default())
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self { fail: true, ..Self::default() })
        }

        fn slow(delay: Duration) -> Arc<Self> {
            Arc::new(Self { delay, ..Self::default() })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RecoveryExecutor for RecordingExecutor {
        async fn execute(&self, _component: Component, _action: RecoveryAction) -> Result<(), RecoveryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_running.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.running.fetch_sub(1, Ordering::SeqCst);
            if self.fail {
                Err(RecoveryError::Failed("Reconnection failed".to_string()))
            } else {
                Ok(())
            }
        }
    }

    type Alerts = Arc<Mutex<Vec<(Component, HealthStatus)>>>;

    struct Harness {
        monitor: PipelineMonitor,
        probes: BTreeMap<Component, SwitchProbe>,
        executor: Arc<RecordingExecutor>,
        audit: Arc<MemoryAuditTrail>,
        alerts: Alerts,
    }

    fn settings() -> MonitorSettings {
        MonitorSettings {
            check_interval_secs: 1,
            probe_timeout_ms: 500,
            ..MonitorSettings::default()
        }
    }

    fn harness_with(settings: MonitorSettings, executor: Arc<RecordingExecutor>, failing: &[Component]) -> Harness {
        let audit = Arc::new(MemoryAuditTrail::default());
        let alerts: Alerts = Arc::default();
        let recorded = alerts.clone();

        let mut builder = PipelineMonitor::builder(settings)
            .default_executor(executor.clone())
            .audit(audit.clone())
            .alert(Arc::new(move |c: Component, s: HealthStatus| {
                recorded.lock().unwrap().push((c, s))
            }));

        let mut probes = BTreeMap::new();
        for component in Component::ALL {
            let probe = if failing.contains(&component) {
                SwitchProbe::failing()
            } else {
                SwitchProbe::default()
            };
            builder = builder.probe(component, probe.clone());
            probes.insert(component, probe);
        }

        Harness {
            monitor: builder.build(),
            probes,
            executor,
            audit,
            alerts,
        }
    }

    fn harness(executor: Arc<RecordingExecutor>, failing: &[Component]) -> Harness {
        harness_with(settings(), executor, failing)
    }

    fn count_events(audit: &MemoryAuditTrail, pred: impl Fn(&AuditEvent) -> bool) -> usize {
        audit.events().iter().filter(|e| pred(e)).count()
    }

    #[tokio::test]
    async fn every_component_starts_healthy() {
        let h = harness(RecordingExecutor::succeeding(), &[]);
        for component in Component::ALL {
            assert_eq!(h.monitor.component_status(component).await, HealthStatus::Healthy);
        }
        let status = h.monitor.pipeline_status().await;
        assert_eq!(status.overall_status, HealthStatus::Healthy);
        assert_eq!(status.uptime_percentage, 100.0);
        assert!(status.last_check.is_none());
    }

    #[tokio::test]
    async fn health_checks_cover_each_component_once() {
        let h = harness(RecordingExecutor::succeeding(), &[]);
        let results = h.monitor.perform_health_checks().await;

        let seen: BTreeSet<Component> = results.iter().map(|r| r.component).collect();
        assert_eq!(results.len(), Component::ALL.len());
        assert_eq!(seen.len(), Component::ALL.len());
        assert_eq!(
            count_events(&h.audit, |e| matches!(e, AuditEvent::HealthCheck(_))),
            Component::ALL.len()
        );
    }

    #[tokio::test]
    async fn failing_network_is_alerted_and_recovered() {
        let h = harness(RecordingExecutor::succeeding(), &[Component::Network]);
        h.monitor.run_cycle().await;

        let metrics = h.monitor.metrics().await;
        assert_eq!(metrics.total_checks, 5);
        assert_eq!(metrics.failed_checks, 1);
        assert_eq!(metrics.successful_recoveries, 1);
        assert_eq!(metrics.failed_recoveries, 0);
        assert_eq!(h.monitor.component_status(Component::Network).await, HealthStatus::Healthy);
        assert_eq!(*h.alerts.lock().unwrap(), vec![(Component::Network, HealthStatus::Down)]);
        assert_eq!(h.executor.calls(), 1);
        assert_eq!(
            count_events(&h.audit, |e| matches!(e, AuditEvent::FailureDetected { .. })),
            1
        );
        assert_eq!(
            count_events(&h.audit, |e| matches!(e, AuditEvent::RecoveryAttempt(_))),
            1
        );
    }

    #[tokio::test]
    async fn validation_service_is_left_for_humans() {
        let h = harness(RecordingExecutor::succeeding(), &[Component::ValidationService]);
        h.monitor.run_cycle().await;

        assert_eq!(
            h.monitor.component_status(Component::ValidationService).await,
            HealthStatus::Down
        );
        assert_eq!(h.executor.calls(), 0);
        assert!(h.monitor.recovery_attempts().await.is_empty());

        let status = h.monitor.pipeline_status().await;
        assert!(!status.is_auto_recoverable);
        assert!(h.monitor.editor_message().await.contains("Manual intervention required"));
    }

    #[tokio::test]
    async fn auto_recoverable_predicate() {
        let h = harness(RecordingExecutor::succeeding(), &[]);
        assert!(!h.monitor.is_auto_recoverable(Component::ValidationService));
        for component in [Component::Network, Component::Database, Component::Storage, Component::Queue] {
            assert!(h.monitor.is_auto_recoverable(component));
        }
    }

    #[tokio::test]
    async fn successful_recovery_transitions_to_healthy() {
        let h = harness(RecordingExecutor::succeeding(), &[]);
        h.monitor.inject_status(Component::Queue, HealthStatus::Down).await.unwrap();

        let attempt = h.monitor.attempt_recovery(Component::Queue).await.unwrap();

        assert!(attempt.success);
        assert_eq!(attempt.action, RecoveryAction::ClearQueue);
        assert!(attempt.attempt_id.starts_with("queue_"));
        assert_eq!(attempt.metadata.as_ref().unwrap()["previous_status"], "down");
        assert_eq!(h.monitor.component_status(Component::Queue).await, HealthStatus::Healthy);
        assert_eq!(h.monitor.recovery_attempts().await.len(), 1);
        assert_eq!(h.monitor.metrics().await.successful_recoveries, 1);
    }

    #[tokio::test]
    async fn failed_recovery_transitions_to_down() {
        let h = harness(RecordingExecutor::failing(), &[]);
        h.monitor.inject_status(Component::Storage, HealthStatus::Degraded).await.unwrap();

        let attempt = h.monitor.attempt_recovery(Component::Storage).await.unwrap();

        assert!(!attempt.success);
        assert_eq!(attempt.error_message.as_deref(), Some("Reconnection failed"));
        assert_eq!(h.monitor.component_status(Component::Storage).await, HealthStatus::Down);
        let metrics = h.monitor.metrics().await;
        assert_eq!(metrics.failed_recoveries, 1);
        assert_eq!(metrics.recovery_success_rate, 0.0);
        assert_eq!(h.monitor.recovery_attempts().await.len(), 1);
    }

    #[tokio::test]
    async fn status_is_recovering_while_executor_runs() {
        let h = harness(RecordingExecutor::slow(Duration::from_millis(150)), &[]);
        h.monitor.inject_status(Component::Database, HealthStatus::Down).await.unwrap();

        let monitor = h.monitor.clone();
        let pending = tokio::spawn(async move { monitor.attempt_recovery(Component::Database).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(
            h.monitor.component_status(Component::Database).await,
            HealthStatus::Recovering
        );
        assert_eq!(h.monitor.pipeline_status().await.overall_status, HealthStatus::Recovering);

        pending.await.unwrap().unwrap();
        assert_eq!(h.monitor.component_status(Component::Database).await, HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn manual_intervention_fails_without_executor() {
        let audit = Arc::new(MemoryAuditTrail::default());
        let executor = RecordingExecutor::succeeding();
        let monitor = PipelineMonitor::builder(settings())
            .recovery_plan(RecoveryPlan::empty())
            .default_executor(executor.clone())
            .audit(audit.clone())
            .build();
        monitor.inject_status(Component::Network, HealthStatus::Down).await.unwrap();

        let attempt = monitor.attempt_recovery(Component::Network).await.unwrap();

        assert_eq!(attempt.action, RecoveryAction::ManualIntervention);
        assert!(!attempt.success);
        assert_eq!(attempt.error_message.as_deref(), Some("Manual intervention required"));
        assert_eq!(executor.calls(), 0);
        assert_eq!(audit.len(), 1);
    }

    #[tokio::test]
    async fn missing_executor_is_a_failed_attempt() {
        let monitor = PipelineMonitor::builder(settings()).build();
        monitor.inject_status(Component::Queue, HealthStatus::Down).await.unwrap();

        let attempt = monitor.attempt_recovery(Component::Queue).await.unwrap();
        assert!(!attempt.success);
        assert!(attempt.error_message.unwrap().contains("no recovery executor"));
    }

    #[tokio::test]
    async fn manual_recovery_of_healthy_component_is_a_no_op() {
        let h = harness(RecordingExecutor::succeeding(), &[]);
        let outcome = h.monitor.trigger_recovery("network").await.unwrap();

        assert_eq!(outcome, RecoveryOutcome::AlreadyHealthy(Component::Network));
        assert_eq!(h.executor.calls(), 0);
        assert!(h.monitor.recovery_attempts().await.is_empty());
    }

    #[tokio::test]
    async fn manual_recovery_rejects_unknown_names() {
        let h = harness(RecordingExecutor::succeeding(), &[]);
        let err = h.monitor.trigger_recovery("printer").await.unwrap_err();
        assert!(matches!(err, MonitorError::UnknownComponent(_)));
        assert!(err.to_string().contains("validation_service"));
    }

    #[tokio::test]
    async fn concurrent_manual_recoveries_never_overlap() {
        let executor = RecordingExecutor::slow(Duration::from_millis(100));
        let h = harness(executor.clone(), &[]);
        h.monitor.inject_status(Component::Network, HealthStatus::Down).await.unwrap();

        let (first, second) = tokio::join!(
            h.monitor.trigger_recovery("network"),
            h.monitor.trigger_recovery("network"),
        );

        let outcomes = [first, second];
        let attempted = outcomes
            .iter()
            .filter(|o| matches!(o, Ok(RecoveryOutcome::Attempted(_))))
            .count();
        let rejected = outcomes
            .iter()
            .filter(|o| matches!(o, Err(MonitorError::RecoveryInProgress(Component::Network))))
            .count();
        assert_eq!((attempted, rejected), (1, 1));
        assert_eq!(executor.max_running.load(Ordering::SeqCst), 1);
        assert_eq!(h.monitor.recovery_attempts().await.len(), 1);
    }

    #[tokio::test]
    async fn different_components_may_recover_together() {
        let executor = RecordingExecutor::slow(Duration::from_millis(100));
        let h = harness(executor.clone(), &[]);
        h.monitor.inject_status(Component::Network, HealthStatus::Down).await.unwrap();
        h.monitor.inject_status(Component::Queue, HealthStatus::Down).await.unwrap();

        let (a, b) = tokio::join!(
            h.monitor.attempt_recovery(Component::Network),
            h.monitor.attempt_recovery(Component::Queue),
        );
        assert!(a.unwrap().success);
        assert!(b.unwrap().success);
        assert_eq!(executor.max_running.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn logs_respect_retention() {
        let settings = MonitorSettings {
            recent_checks_retention: 7,
            recovery_log_retention: 3,
            ..settings()
        };
        let h = harness_with(settings, RecordingExecutor::failing(), &[Component::Network]);

        for _ in 0..10 {
            h.monitor.run_cycle().await;
        }

        assert_eq!(h.monitor.recent_checks().await.len(), 7);
        assert_eq!(h.monitor.recovery_attempts().await.len(), 3);
        let metrics = h.monitor.metrics().await;
        assert_eq!(metrics.total_checks, 50);
        assert_eq!(metrics.failed_checks, 10);
        assert_eq!(metrics.failed_recoveries, 10);
        assert_eq!(h.monitor.pipeline_status().await.uptime_percentage, 80.0);
    }

    #[tokio::test]
    async fn failed_network_recovery_reports_automatic_guidance() {
        let h = harness(RecordingExecutor::failing(), &[Component::Network]);
        h.monitor.run_cycle().await;

        let status = h.monitor.pipeline_status().await;
        assert_eq!(status.overall_status, HealthStatus::Down);
        assert!(status.is_auto_recoverable);
        assert_eq!(status.recent_failures.len(), 1);
        assert_eq!(status.recent_failures[0].error.as_deref(), Some("simulated outage"));

        let message = h.monitor.editor_message().await;
        assert!(message.contains("Automatic recovery in progress."));
        assert!(message.contains("- network: down"));
    }

    #[tokio::test]
    async fn healthy_editor_message_reports_uptime() {
        let h = harness(RecordingExecutor::succeeding(), &[]);
        h.monitor.run_cycle().await;

        let message = h.monitor.editor_message().await;
        assert!(message.contains("OPERATIONAL"));
        assert!(message.contains("Uptime: 100.00%"));
    }

    #[tokio::test]
    async fn forced_check_failure_does_not_stick() {
        let h = harness(RecordingExecutor::succeeding(), &[Component::Database]);
        let results = h.monitor.force_check().await;

        assert_eq!(results.len(), 5);
        assert!(results
            .iter()
            .any(|r| r.component == Component::Database && r.status == HealthStatus::Down));
        assert_eq!(
            count_events(&h.audit, |e| matches!(e, AuditEvent::HealthCheck(_))),
            5
        );
        assert_eq!(h.monitor.component_status(Component::Database).await, HealthStatus::Healthy);
        assert_eq!(h.monitor.metrics().await.total_checks, 0);
        assert!(h.alerts.lock().unwrap().is_empty());

        h.probes[&Component::Database].failing.store(false, Ordering::SeqCst);
        h.monitor.run_cycle().await;

        let status = h.monitor.pipeline_status().await;
        assert_eq!(status.overall_status, HealthStatus::Healthy);
        assert_eq!(h.executor.calls(), 0);
        assert!(h.monitor.editor_message().await.contains("OPERATIONAL"));
    }

    #[tokio::test]
    async fn recent_failures_only_look_at_latest_checks() {
        let settings = MonitorSettings {
            recent_failures_window: 4,
            ..settings()
        };
        let h = harness_with(
            settings,
            RecordingExecutor::failing(),
            &[Component::Network, Component::ValidationService],
        );

        for _ in 0..3 {
            h.monitor.run_cycle().await;
        }

        // Last four checks: validation_service, database, storage, queue.
        let status = h.monitor.pipeline_status().await;
        assert_eq!(status.recent_failures.len(), 1);
        assert_eq!(status.recent_failures[0].component, Component::ValidationService);
        assert_eq!(status.recent_failures[0].error.as_deref(), Some("simulated outage"));
        assert!((status.uptime_percentage - 60.0).abs() < 1e-9);

        h.probes[&Component::Network].failing.store(false, Ordering::SeqCst);
        h.probes[&Component::ValidationService].failing.store(false, Ordering::SeqCst);
        h.monitor.run_cycle().await;
        assert!(h.monitor.pipeline_status().await.recent_failures.is_empty());
    }

    #[tokio::test]
    async fn panicking_alert_does_not_stop_recovery() {
        let executor = RecordingExecutor::succeeding();
        let monitor = PipelineMonitor::builder(settings())
            .probe(Component::Queue, SwitchProbe::failing())
            .default_executor(executor.clone())
            .audit(Arc::new(MemoryAuditTrail::default()))
            .alert(Arc::new(|_: Component, _: HealthStatus| panic!("pager offline")))
            .build();

        monitor.run_cycle().await;

        assert_eq!(executor.calls(), 1);
        assert_eq!(monitor.component_status(Component::Queue).await, HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn injected_degraded_drives_overall_status() {
        let h = harness(RecordingExecutor::succeeding(), &[]);
        h.monitor.inject_status(Component::Storage, HealthStatus::Degraded).await.unwrap();
        assert_eq!(h.monitor.pipeline_status().await.overall_status, HealthStatus::Degraded);

        let err = h
            .monitor
            .inject_status(Component::Storage, HealthStatus::Recovering)
            .await
            .unwrap_err();
        assert_eq!(err, MonitorError::ReservedStatus(HealthStatus::Recovering));
    }

    #[tokio::test]
    async fn history_is_newest_first_and_limited() {
        let h = harness(RecordingExecutor::succeeding(), &[Component::Queue]);
        h.monitor.run_cycle().await;

        let history = h.monitor.history(50).await;
        assert_eq!(history.total_events, 6);
        assert!(matches!(history.events[0], HistoryEvent::RecoveryAttempt(_)));
        assert!(history
            .events
            .windows(2)
            .all(|w| w[0].timestamp() >= w[1].timestamp()));

        let limited = h.monitor.history(2).await;
        assert_eq!(limited.events.len(), 2);
        assert_eq!(limited.total_events, 3);
    }

    #[tokio::test]
    async fn start_is_idempotent_and_stop_cancels() {
        let h = harness(RecordingExecutor::succeeding(), &[]);

        h.monitor.start();
        h.monitor.start();
        assert!(h.monitor.is_running());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(h.monitor.metrics().await.total_checks, 5);

        h.monitor.stop();
        h.monitor.stop();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!h.monitor.is_running());
    }

    #[tokio::test]
    async fn stop_lets_in_flight_recovery_finish() {
        let h = harness(RecordingExecutor::slow(Duration::from_millis(150)), &[Component::Network]);

        h.monitor.start();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(
            h.monitor.component_status(Component::Network).await,
            HealthStatus::Recovering
        );

        h.monitor.stop();
        tokio::time::sleep(Duration::from_millis(250)).await;

        assert_eq!(h.monitor.recovery_attempts().await.len(), 1);
        assert_eq!(h.monitor.component_status(Component::Network).await, HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn loop_defers_to_in_flight_manual_recovery() {
        let executor = RecordingExecutor::slow(Duration::from_millis(150));
        let h = harness(executor.clone(), &[Component::Network]);
        h.monitor.inject_status(Component::Network, HealthStatus::Down).await.unwrap();

        let monitor = h.monitor.clone();
        let manual = tokio::spawn(async move { monitor.trigger_recovery("network").await });
        tokio::time::sleep(Duration::from_millis(30)).await;

        h.monitor.run_cycle().await;
        assert_eq!(
            h.monitor.component_status(Component::Network).await,
            HealthStatus::Recovering
        );
        assert_eq!(h.monitor.metrics().await.failed_checks, 1);

        let outcome = manual.await.unwrap().unwrap();
        let RecoveryOutcome::Attempted(attempt) = outcome else {
            panic!("expected an attempted recovery, got {outcome:?}");
        };
        assert!(attempt.success);
        assert_eq!(executor.calls(), 1);
        assert_eq!(executor.max_running.load(Ordering::SeqCst), 1);
        assert_eq!(h.monitor.recovery_attempts().await.len(), 1);
        assert_eq!(h.monitor.component_status(Component::Network).await, HealthStatus::Healthy);
    }
}
