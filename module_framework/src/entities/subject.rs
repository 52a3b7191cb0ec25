//! The subject: a game entity that owns modules.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{
    ActiveStatusEffect, EnergyStore, EnvironmentReading, StatusEffectComponent, SubjectId,
    VitalsComponent,
};
use crate::capability::ModuleData;
use crate::mechanics::StatusEffectKind;

/// A subject with everything the module and synergy layers read or mutate.
///
/// The host owns subjects; the framework only borrows them for the duration of
/// a tick or an event dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    pub id: SubjectId,
    pub name: String,
    pub is_player: bool,

    pub vitals: VitalsComponent,
    pub energy: EnergyStore,
    pub status_effects: StatusEffectComponent,
    pub environment: EnvironmentReading,

    /// Persisted module levels, active flags and metadata.
    pub modules: ModuleData,

    /// Cooldown key -> world time at which it expires.
    #[serde(default)]
    pub cooldowns: HashMap<String, u64>,

    /// Messages queued for the host to deliver (chat or action bar).
    #[serde(skip)]
    outbox: Vec<String>,
}

impl Subject {
    /// Create a new player subject with the given name and no energy capacity.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: SubjectId::new(),
            name: name.into(),
            is_player: true,
            vitals: VitalsComponent::default(),
            energy: EnergyStore::default(),
            status_effects: StatusEffectComponent::default(),
            environment: EnvironmentReading::default(),
            modules: ModuleData::new(),
            cooldowns: HashMap::new(),
            outbox: Vec::new(),
        }
    }

    /// Set energy capacity and current charge.
    pub fn with_energy(mut self, current: u32, max: u32) -> Self {
        self.energy = EnergyStore::new(current, max);
        self
    }

    /// Install a module at the given level.
    pub fn with_module(mut self, module_id: &str, level: i32) -> Self {
        self.modules.install(module_id, level);
        self
    }

    pub fn is_alive(&self) -> bool {
        self.vitals.health > 0.0
    }

    pub fn health_fraction(&self) -> f32 {
        self.vitals.health_fraction()
    }

    pub fn has_status(&self, kind: StatusEffectKind) -> bool {
        self.status_effects.get(kind).is_some()
    }

    pub fn apply_status(&mut self, kind: StatusEffectKind, duration_ticks: u32, amplifier: u8) {
        self.status_effects.apply(ActiveStatusEffect {
            kind,
            remaining_ticks: duration_ticks,
            amplifier,
        });
    }

    /// Queue a message for the host.
    pub fn send_message(&mut self, message: impl Into<String>) {
        self.outbox.push(message.into());
    }

    /// Messages queued since the last drain.
    pub fn pending_messages(&self) -> &[String] {
        &self.outbox
    }

    /// Take all queued messages.
    pub fn drain_messages(&mut self) -> Vec<String> {
        std::mem::take(&mut self.outbox)
    }

    pub fn set_cooldown(&mut self, key: impl Into<String>, now: u64, duration_ticks: u64) {
        self.cooldowns.insert(key.into(), now + duration_ticks);
    }

    /// Ticks left on a cooldown, zero if none.
    pub fn cooldown_remaining(&self, key: &str, now: u64) -> u64 {
        self.cooldowns
            .get(key)
            .map(|end| end.saturating_sub(now))
            .unwrap_or(0)
    }

    pub fn is_on_cooldown(&self, key: &str, now: u64) -> bool {
        self.cooldown_remaining(key, now) > 0
    }

    /// Advance per-tick bookkeeping: status effect timers and expired cooldowns.
    pub fn tick(&mut self, now: u64) {
        self.status_effects.tick();
        self.cooldowns.retain(|_, end| *end > now);
    }
}
