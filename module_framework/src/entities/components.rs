//! Component definitions for subjects.

use serde::{Deserialize, Serialize};

use crate::mechanics::StatusEffectKind;

/// Health and absorption shield of a subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VitalsComponent {
    pub health: f32,
    pub max_health: f32,
    /// Extra hit points that are consumed before health.
    pub absorption: f32,
}

impl Default for VitalsComponent {
    fn default() -> Self {
        Self {
            health: 20.0,
            max_health: 20.0,
            absorption: 0.0,
        }
    }
}

impl VitalsComponent {
    /// Current health as a fraction of max health (0.0 - 1.0).
    pub fn health_fraction(&self) -> f32 {
        if self.max_health > 0.0 {
            (self.health / self.max_health).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Heal up to max health. Returns the amount actually restored.
    pub fn heal(&mut self, amount: f32) -> f32 {
        if amount <= 0.0 {
            return 0.0;
        }
        let before = self.health;
        self.health = (self.health + amount).min(self.max_health);
        self.health - before
    }
}

/// The subject's energy budget.
///
/// Every debit goes through [`EnergyStore::try_consume`], which either takes
/// the full amount or nothing. `current` never exceeds `max`, including
/// after deserialization.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(from = "StoredEnergy")]
pub struct EnergyStore {
    current: u32,
    max: u32,
}

/// Wire shape of [`EnergyStore`], clamped on the way in.
#[derive(Deserialize)]
struct StoredEnergy {
    current: u32,
    max: u32,
}

impl From<StoredEnergy> for EnergyStore {
    fn from(stored: StoredEnergy) -> Self {
        EnergyStore::new(stored.current, stored.max)
    }
}

impl EnergyStore {
    /// Create a store with the given capacity, starting full.
    pub fn full(max: u32) -> Self {
        Self { current: max, max }
    }

    /// Create a store with explicit current and max values. `current` is clamped.
    pub fn new(current: u32, max: u32) -> Self {
        Self {
            current: current.min(max),
            max,
        }
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    /// Fill level from 0.0 to 1.0.
    pub fn fraction(&self) -> f32 {
        if self.max > 0 {
            self.current as f32 / self.max as f32
        } else {
            0.0
        }
    }

    pub fn has(&self, amount: u32) -> bool {
        self.current >= amount
    }

    /// Debit exactly `amount` or leave the store untouched.
    pub fn try_consume(&mut self, amount: u32) -> bool {
        if self.current < amount {
            return false;
        }
        self.current -= amount;
        true
    }

    /// Debit up to `amount`, stopping at zero. Returns the amount taken.
    pub fn drain(&mut self, amount: u32) -> u32 {
        let taken = amount.min(self.current);
        self.current -= taken;
        taken
    }

    /// Credit up to capacity. Returns the amount actually stored.
    pub fn recharge(&mut self, amount: u32) -> u32 {
        let room = self.max.saturating_sub(self.current);
        let stored = amount.min(room);
        self.current += stored;
        stored
    }

    pub fn is_full(&self) -> bool {
        self.current == self.max
    }
}

/// Status effects currently applied to a subject.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StatusEffectComponent {
    pub active_effects: Vec<ActiveStatusEffect>,
}

/// A timed buff or debuff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveStatusEffect {
    pub kind: StatusEffectKind,
    pub remaining_ticks: u32,
    pub amplifier: u8,
}

impl StatusEffectComponent {
    /// Apply an effect. An existing effect of the same kind is replaced only
    /// when the new one is stronger or lasts longer.
    pub fn apply(&mut self, effect: ActiveStatusEffect) {
        match self
            .active_effects
            .iter_mut()
            .find(|e| e.kind == effect.kind)
        {
            Some(existing) => {
                if effect.amplifier > existing.amplifier
                    || (effect.amplifier == existing.amplifier
                        && effect.remaining_ticks > existing.remaining_ticks)
                {
                    *existing = effect;
                }
            }
            None => self.active_effects.push(effect),
        }
    }

    pub fn get(&self, kind: StatusEffectKind) -> Option<&ActiveStatusEffect> {
        self.active_effects.iter().find(|e| e.kind == kind)
    }

    /// Count down all effects by one tick and drop the expired ones.
    pub fn tick(&mut self) {
        for effect in &mut self.active_effects {
            effect.remaining_ticks = effect.remaining_ticks.saturating_sub(1);
        }
        self.active_effects.retain(|e| e.remaining_ticks > 0);
    }
}

/// Environmental readings the host samples at the subject's position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentReading {
    /// Relative humidity from 0.0 to 1.0.
    pub humidity: f32,
    pub in_water: bool,
    pub raining: bool,
}

impl Default for EnvironmentReading {
    fn default() -> Self {
        Self {
            humidity: 0.5,
            in_water: false,
            raining: false,
        }
    }
}
