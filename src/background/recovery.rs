//! Recovery actions - remediation capability and the component → action table

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::types::{Component, RecoveryAction};

/// Why a remediation did not bring the component back.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecoveryError {
    #[error("Manual intervention required")]
    ManualInterventionRequired,
    #[error("no recovery executor registered for {0}")]
    NoExecutor(Component),
    #[error("{action} timed out after {timeout_secs}s")]
    TimedOut { action: RecoveryAction, timeout_secs: u64 },
    #[error("recovery executor panicked")]
    Panicked,
    #[error("{0}")]
    Failed(String),
}

/// Performs a remediation for one component.
///
/// Completing with `Ok(())` means the component is back. Calls for distinct
/// components may run concurrently; the monitor never runs two calls for the
/// same component at once.
#[async_trait]
pub trait RecoveryExecutor: Send + Sync {
    async fn execute(&self, component: Component, action: RecoveryAction) -> Result<(), RecoveryError>;
}

/// Static mapping from component to the remediation applied when it fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryPlan {
    actions: BTreeMap<Component, RecoveryAction>,
}

impl Default for RecoveryPlan {
    fn default() -> Self {
        Self {
            actions: Component::ALL
                .into_iter()
                .map(|c| (c, c.default_recovery_action()))
                .collect(),
        }
    }
}

impl RecoveryPlan {
    /// A plan with no mappings; every component resolves to manual intervention.
    pub fn empty() -> Self {
        Self { actions: BTreeMap::new() }
    }

    /// Defaults with `overrides` applied on top.
    pub fn with_overrides(overrides: &BTreeMap<Component, RecoveryAction>) -> Self {
        let mut plan = Self::default();
        plan.actions.extend(overrides.iter().map(|(c, a)| (*c, *a)));
        plan
    }

    pub fn set(&mut self, component: Component, action: RecoveryAction) {
        self.actions.insert(component, action);
    }

    pub fn remove(&mut self, component: Component) {
        self.actions.remove(&component);
    }

    /// Action for `component`, or manual intervention when unmapped.
    pub fn action_for(&self, component: Component) -> RecoveryAction {
        self.actions
            .get(&component)
            .copied()
            .unwrap_or(RecoveryAction::ManualIntervention)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_plan_matches_component_defaults() {
        let plan = RecoveryPlan::default();
        assert_eq!(plan.action_for(Component::Network), RecoveryAction::Reconnect);
        assert_eq!(plan.action_for(Component::ValidationService), RecoveryAction::RestartService);
        assert_eq!(plan.action_for(Component::Database), RecoveryAction::Reconnect);
        assert_eq!(plan.action_for(Component::Storage), RecoveryAction::Failover);
        assert_eq!(plan.action_for(Component::Queue), RecoveryAction::ClearQueue);
    }

    #[test]
    fn unmapped_component_needs_manual_intervention() {
        let mut plan = RecoveryPlan::default();
        plan.remove(Component::Queue);
        assert_eq!(plan.action_for(Component::Queue), RecoveryAction::ManualIntervention);
        assert_eq!(
            RecoveryPlan::empty().action_for(Component::Network),
            RecoveryAction::ManualIntervention
        );
    }

    #[test]
    fn overrides_replace_defaults_only_where_given() {
        let mut overrides = BTreeMap::new();
        overrides.insert(Component::Storage, RecoveryAction::ManualIntervention);
        let plan = RecoveryPlan::with_overrides(&overrides);

        assert_eq!(plan.action_for(Component::Storage), RecoveryAction::ManualIntervention);
        assert_eq!(plan.action_for(Component::Network), RecoveryAction::Reconnect);
    }
}
