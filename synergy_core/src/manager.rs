//! The synergy manager: registry, evaluation and application of rules.
//!
//! Dispatching one event runs a fixed pipeline:
//! 1. **Trigger**: keep enabled synergies whose trigger set matches the event
//! 2. **Activation**: optionally keep only synergies activated for the subject
//! 3. **Chain**: keep synergies whose module chain the subject satisfies
//! 4. **Conditions**: keep synergies whose conditions all pass (AND, short-circuit)
//! 5. **Order**: sort ascending by priority, ties by registration order
//! 6. **Apply**: run each synergy's effects in declaration order

use module_framework::{canonical_id, panic_message, Subject, SubjectId};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::activation::ActivationState;
use crate::condition::Condition;
use crate::config::SynergyConfig;
use crate::context::EventContext;
use crate::definition::SynergyDefinition;
use crate::effect::Effect;
use crate::error::{SynergyError, SynergyResult};

/// Owns the synergy definitions and per-subject activations.
///
/// All methods take `&self`; the registry and the activation table sit
/// behind their own locks. Locks are never held while condition or effect
/// code runs.
pub struct SynergyManager {
    /// Definitions in registration order.
    registry: RwLock<Vec<Arc<SynergyDefinition>>>,
    activations: RwLock<ActivationState>,
    config: SynergyConfig,
}

impl Default for SynergyManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SynergyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ids: Vec<String> = self.read_registry().iter().map(|d| d.id().to_string()).collect();
        f.debug_struct("SynergyManager")
            .field("synergies", &ids)
            .field("config", &self.config)
            .finish()
    }
}

impl SynergyManager {
    pub fn new() -> Self {
        Self::with_config(SynergyConfig::default())
    }

    pub fn with_config(config: SynergyConfig) -> Self {
        Self {
            registry: RwLock::new(Vec::new()),
            activations: RwLock::new(ActivationState::new()),
            config,
        }
    }

    pub fn config(&self) -> &SynergyConfig {
        &self.config
    }

    fn read_registry(&self) -> RwLockReadGuard<'_, Vec<Arc<SynergyDefinition>>> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_registry(&self) -> RwLockWriteGuard<'_, Vec<Arc<SynergyDefinition>>> {
        self.registry.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn read_activations(&self) -> RwLockReadGuard<'_, ActivationState> {
        self.activations.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write_activations(&self) -> RwLockWriteGuard<'_, ActivationState> {
        self.activations.write().unwrap_or_else(PoisonError::into_inner)
    }

    // ---------------------------------------------------------------------
    // Registry
    // ---------------------------------------------------------------------

    /// Register a definition. Returns `false` and keeps the existing one if
    /// the id is taken.
    pub fn register_synergy(&self, definition: SynergyDefinition) -> bool {
        match self.try_register_synergy(definition) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "synergy registration rejected");
                false
            }
        }
    }

    pub fn try_register_synergy(&self, definition: SynergyDefinition) -> SynergyResult<()> {
        let mut registry = self.write_registry();
        if registry.iter().any(|d| d.id() == definition.id()) {
            return Err(SynergyError::DuplicateSynergy(definition.id().to_string()));
        }
        if definition.chain().is_empty() {
            tracing::warn!(synergy_id = definition.id(), "synergy has an empty chain and will never match");
        }
        tracing::debug!(
            synergy_id = definition.id(),
            chain = ?definition.chain().modules(),
            priority = definition.priority(),
            "synergy registered"
        );
        registry.push(Arc::new(definition));
        Ok(())
    }

    /// Remove a definition and every activation of it.
    pub fn unregister_synergy(&self, synergy_id: &str) -> bool {
        let id = canonical_id(synergy_id);
        let removed = {
            let mut registry = self.write_registry();
            let before = registry.len();
            registry.retain(|d| d.id() != id);
            registry.len() != before
        };
        if removed {
            self.write_activations().forget_synergy(&id);
        }
        removed
    }

    /// Snapshot of every definition, in registration order.
    pub fn all_synergies(&self) -> Vec<Arc<SynergyDefinition>> {
        self.read_registry().clone()
    }

    pub fn get(&self, synergy_id: &str) -> Option<Arc<SynergyDefinition>> {
        let id = canonical_id(synergy_id);
        self.read_registry().iter().find(|d| d.id() == id).cloned()
    }

    pub fn synergy_count(&self) -> usize {
        self.read_registry().len()
    }

    /// Definitions whose chain includes `module_id`.
    pub fn synergies_with_module(&self, module_id: &str) -> Vec<Arc<SynergyDefinition>> {
        self.read_registry()
            .iter()
            .filter(|d| d.chain().contains(module_id))
            .cloned()
            .collect()
    }

    /// Enabled definitions whose chain `subject` currently satisfies,
    /// regardless of triggers and conditions.
    pub fn available_for(&self, subject: &Subject) -> Vec<Arc<SynergyDefinition>> {
        self.read_registry()
            .iter()
            .filter(|d| d.is_enabled() && d.is_chain_satisfied(&subject.modules))
            .cloned()
            .collect()
    }

    // ---------------------------------------------------------------------
    // Activation
    // ---------------------------------------------------------------------

    /// Switch a registered synergy on for a subject. `Ok(false)` if it already was.
    pub fn activate_for(&self, subject: SubjectId, synergy_id: &str) -> SynergyResult<bool> {
        if self.get(synergy_id).is_none() {
            return Err(SynergyError::UnknownSynergy(canonical_id(synergy_id)));
        }
        Ok(self.write_activations().activate(subject, synergy_id))
    }

    pub fn deactivate_for(&self, subject: SubjectId, synergy_id: &str) -> bool {
        self.write_activations().deactivate(subject, synergy_id)
    }

    pub fn deactivate_all_for(&self, subject: SubjectId) -> usize {
        self.write_activations().deactivate_all(subject)
    }

    pub fn is_activated_for(&self, subject: SubjectId, synergy_id: &str) -> bool {
        self.read_activations().is_active(subject, synergy_id)
    }

    pub fn activated_for(&self, subject: SubjectId) -> Vec<String> {
        self.read_activations().active_for(subject)
    }

    /// Forget everything about a subject that left.
    pub fn cleanup_subject(&self, subject: SubjectId) {
        self.write_activations().cleanup(subject);
    }

    // ---------------------------------------------------------------------
    // Dispatch
    // ---------------------------------------------------------------------

    /// Definitions that match the event in `ctx`, in registration order.
    pub fn evaluate(&self, ctx: &EventContext<'_>) -> Vec<Arc<SynergyDefinition>> {
        let activated = self
            .config
            .require_activation
            .then(|| self.activated_for(ctx.subject().id));

        self.all_synergies()
            .into_iter()
            .filter(|definition| Self::matches(definition, ctx, activated.as_deref()))
            .collect()
    }

    fn matches(
        definition: &SynergyDefinition,
        ctx: &EventContext<'_>,
        activated: Option<&[String]>,
    ) -> bool {
        if !definition.is_enabled() || !definition.is_triggered_by(ctx.event_type()) {
            return false;
        }
        if let Some(activated) = activated {
            if !activated.iter().any(|id| id == definition.id()) {
                return false;
            }
        }
        if !definition.is_chain_satisfied(&ctx.subject().modules) {
            return false;
        }
        definition
            .conditions()
            .iter()
            .all(|condition| check_condition(definition.id(), condition.as_ref(), ctx))
    }

    /// Sort `matched` into application order.
    fn ordered(&self, matched: &[Arc<SynergyDefinition>]) -> Vec<Arc<SynergyDefinition>> {
        let registry = self.read_registry();
        let position = |definition: &SynergyDefinition| {
            registry
                .iter()
                .position(|d| d.id() == definition.id())
                .unwrap_or(usize::MAX)
        };
        let mut keyed: Vec<_> = matched
            .iter()
            .map(|d| ((d.priority(), position(d)), Arc::clone(d)))
            .collect();
        keyed.sort_by_key(|(key, _)| *key);
        keyed.into_iter().map(|(_, d)| d).collect()
    }

    /// Apply the effects of `matched` synergies to `ctx`. Returns the number
    /// of effects that ran successfully.
    pub fn apply(&self, matched: &[Arc<SynergyDefinition>], ctx: &mut EventContext<'_>) -> usize {
        self.ordered(matched)
            .iter()
            .map(|definition| apply_definition(definition, ctx))
            .sum()
    }

    /// Evaluate and apply in one step. Returns the ids of the applied
    /// synergies in application order.
    pub fn process_event(&self, ctx: &mut EventContext<'_>) -> Vec<String> {
        let matched = self.evaluate(ctx);
        if matched.is_empty() {
            return Vec::new();
        }
        let ordered = self.ordered(&matched);
        for definition in &ordered {
            apply_definition(definition, ctx);
        }
        ordered.iter().map(|d| d.id().to_string()).collect()
    }
}

fn check_condition(synergy_id: &str, condition: &dyn Condition, ctx: &EventContext<'_>) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(|| condition.test(ctx))) {
        Ok(Ok(passed)) => passed,
        Ok(Err(e)) => {
            tracing::warn!(synergy_id, condition = %condition.describe(), error = %e, "condition failed");
            false
        }
        Err(payload) => {
            tracing::error!(
                synergy_id,
                condition = %condition.describe(),
                panic = %panic_message(payload.as_ref()),
                "condition panicked"
            );
            false
        }
    }
}

fn apply_definition(definition: &SynergyDefinition, ctx: &mut EventContext<'_>) -> usize {
    let synergy_id = definition.id();
    let mut applied = 0;

    for effect in definition.effects() {
        if run_effect(synergy_id, effect.as_ref(), ctx) {
            applied += 1;
        }
    }

    tracing::debug!(
        synergy_id,
        event = %ctx.event_type(),
        subject = %ctx.subject().name,
        applied,
        "synergy applied"
    );
    applied
}

fn run_effect(synergy_id: &str, effect: &dyn Effect, ctx: &mut EventContext<'_>) -> bool {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        if effect.can_apply(ctx) {
            effect.apply(ctx).map(|()| true)
        } else {
            Ok(false)
        }
    }));
    match outcome {
        Ok(Ok(ran)) => ran,
        Ok(Err(e)) => {
            tracing::warn!(synergy_id, effect = %effect.describe(), error = %e, "effect failed");
            false
        }
        Err(payload) => {
            tracing::error!(
                synergy_id,
                effect = %effect.describe(),
                panic = %panic_message(payload.as_ref()),
                "effect panicked"
            );
            false
        }
    }
}
