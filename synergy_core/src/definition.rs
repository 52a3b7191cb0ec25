//! Synergy definitions: a module chain plus the rules it unlocks.

use module_framework::{canonical_id, ModuleData};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::condition::Condition;
use crate::effect::Effect;
use crate::events::SynergyEventType;

/// Priority given to synergies that do not declare one.
pub const DEFAULT_SYNERGY_PRIORITY: i32 = 100;

/// The modules a synergy needs. Order is for display only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleChain {
    modules: Vec<String>,
}

impl ModuleChain {
    pub fn new<I, S>(modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut chain = Self::default();
        for module in modules {
            chain.push(module.as_ref());
        }
        chain
    }

    /// Append a module; duplicates are ignored.
    pub fn push(&mut self, module_id: &str) {
        let id = canonical_id(module_id);
        if !self.modules.contains(&id) {
            self.modules.push(id);
        }
    }

    pub fn contains(&self, module_id: &str) -> bool {
        self.modules.contains(&canonical_id(module_id))
    }

    pub fn modules(&self) -> &[String] {
        &self.modules
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Every module is installed. An empty chain is never installed.
    pub fn is_installed_in(&self, data: &ModuleData) -> bool {
        !self.is_empty() && self.modules.iter().all(|id| data.is_installed(id))
    }

    /// Every module is installed and active. An empty chain is never active.
    pub fn is_active_in(&self, data: &ModuleData) -> bool {
        !self.is_empty() && self.modules.iter().all(|id| data.is_active(id))
    }
}

/// A labelled connection between two chain modules, shown in guides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleLink {
    pub from: String,
    pub to: String,
    pub kind: String,
}

impl ModuleLink {
    pub fn new(from: &str, to: &str, kind: impl Into<String>) -> Self {
        Self {
            from: canonical_id(from),
            to: canonical_id(to),
            kind: kind.into(),
        }
    }
}

/// One synergy rule.
///
/// Built with `with_*` methods and registered once; the manager shares it
/// behind an `Arc` from then on.
pub struct SynergyDefinition {
    id: String,
    display_name: String,
    description: String,
    category: String,
    chain: ModuleChain,
    links: Vec<ModuleLink>,
    conditions: Vec<Arc<dyn Condition>>,
    effects: Vec<Arc<dyn Effect>>,
    trigger_events: Vec<SynergyEventType>,
    require_all_active: bool,
    priority: i32,
    enabled: bool,
}

impl std::fmt::Debug for SynergyDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SynergyDefinition")
            .field("id", &self.id)
            .field("chain", &self.chain)
            .field("trigger_events", &self.trigger_events)
            .field("conditions", &self.condition_descriptions())
            .field("effects", &self.effect_descriptions())
            .field("priority", &self.priority)
            .field("enabled", &self.enabled)
            .finish()
    }
}

impl SynergyDefinition {
    /// Create an enabled definition with an empty chain. The id is upper-cased.
    pub fn new(id: &str) -> Self {
        let id = canonical_id(id);
        Self {
            display_name: id.clone(),
            id,
            description: String::new(),
            category: "misc".to_string(),
            chain: ModuleChain::default(),
            links: Vec::new(),
            conditions: Vec::new(),
            effects: Vec::new(),
            trigger_events: Vec::new(),
            require_all_active: true,
            priority: DEFAULT_SYNERGY_PRIORITY,
            enabled: true,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Add modules to the chain.
    pub fn requires<I, S>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for module in modules {
            self.chain.push(module.as_ref());
        }
        self
    }

    pub fn with_link(mut self, from: &str, to: &str, kind: impl Into<String>) -> Self {
        self.links.push(ModuleLink::new(from, to, kind));
        self
    }

    pub fn with_condition(mut self, condition: impl Condition + 'static) -> Self {
        self.conditions.push(Arc::new(condition));
        self
    }

    pub fn with_effect(mut self, effect: impl Effect + 'static) -> Self {
        self.effects.push(Arc::new(effect));
        self
    }

    /// Restrict the synergy to an event type. Without any trigger it reacts
    /// to every event.
    pub fn triggered_on(mut self, event: SynergyEventType) -> Self {
        if !self.trigger_events.contains(&event) {
            self.trigger_events.push(event);
        }
        self
    }

    /// Whether chain modules must be active, not just installed. Defaults to `true`.
    pub fn require_all_active(mut self, required: bool) -> Self {
        self.require_all_active = required;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn chain(&self) -> &ModuleChain {
        &self.chain
    }

    pub fn links(&self) -> &[ModuleLink] {
        &self.links
    }

    pub fn conditions(&self) -> &[Arc<dyn Condition>] {
        &self.conditions
    }

    pub fn effects(&self) -> &[Arc<dyn Effect>] {
        &self.effects
    }

    pub fn trigger_events(&self) -> &[SynergyEventType] {
        &self.trigger_events
    }

    pub fn requires_all_active(&self) -> bool {
        self.require_all_active
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_triggered_by(&self, event: SynergyEventType) -> bool {
        self.trigger_events.is_empty() || self.trigger_events.iter().any(|t| t.matches(event))
    }

    /// Whether `data` satisfies the chain under this definition's active rule.
    pub fn is_chain_satisfied(&self, data: &ModuleData) -> bool {
        if self.require_all_active {
            self.chain.is_active_in(data)
        } else {
            self.chain.is_installed_in(data)
        }
    }

    pub fn condition_descriptions(&self) -> Vec<String> {
        self.conditions.iter().map(|c| c.describe()).collect()
    }

    pub fn effect_descriptions(&self) -> Vec<String> {
        self.effects.iter().map(|e| e.describe()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::MessageEffect;

    fn data() -> ModuleData {
        let mut data = ModuleData::new();
        data.install("A", 1);
        data.install("B", 0);
        data
    }

    #[test]
    fn test_chain_normalises_and_dedups() {
        let chain = ModuleChain::new(["a", "B", "A"]);
        assert_eq!(chain.modules(), ["A".to_string(), "B".to_string()]);
        assert!(chain.contains("b"));
    }

    #[test]
    fn test_empty_chain_never_satisfied() {
        let definition = SynergyDefinition::new("empty");
        assert!(!definition.is_chain_satisfied(&data()));
        assert!(!definition.require_all_active(false).is_chain_satisfied(&data()));
    }

    #[test]
    fn test_inactive_member_blocks_chain() {
        let definition = SynergyDefinition::new("pair").requires(["A", "B"]);
        assert!(!definition.is_chain_satisfied(&data()));

        let relaxed = SynergyDefinition::new("pair")
            .requires(["A", "B"])
            .require_all_active(false);
        assert!(relaxed.is_chain_satisfied(&data()));
    }

    #[test]
    fn test_missing_member_blocks_chain() {
        let definition = SynergyDefinition::new("pair")
            .requires(["A", "C"])
            .require_all_active(false);
        assert!(!definition.is_chain_satisfied(&data()));
    }

    #[test]
    fn test_triggers() {
        let any = SynergyDefinition::new("any");
        assert!(any.is_triggered_by(SynergyEventType::Jump));

        let hurt = SynergyDefinition::new("hurt").triggered_on(SynergyEventType::Hurt);
        assert!(hurt.is_triggered_by(SynergyEventType::Hurt));
        assert!(!hurt.is_triggered_by(SynergyEventType::Attack));

        let wildcard = SynergyDefinition::new("wild").triggered_on(SynergyEventType::Any);
        assert!(wildcard.is_triggered_by(SynergyEventType::Sneak));
    }

    #[test]
    fn test_builder_and_defaults() {
        let definition = SynergyDefinition::new("energy_loop")
            .with_display_name("Energy Loop")
            .with_category("energy")
            .requires(["KINETIC_GENERATOR", "SOLAR_GENERATOR"])
            .with_link("kinetic_generator", "solar_generator", "synergy")
            .with_effect(MessageEffect::new("+energy"));

        assert_eq!(definition.id(), "ENERGY_LOOP");
        assert_eq!(definition.priority(), DEFAULT_SYNERGY_PRIORITY);
        assert!(definition.is_enabled());
        assert!(definition.requires_all_active());
        assert_eq!(definition.links()[0].from, "KINETIC_GENERATOR");
        assert_eq!(definition.effect_descriptions(), vec!["message \"+energy\""]);
        assert_eq!(SynergyDefinition::new("misc").category(), "misc");
    }
}
