//! The per-dispatch event context handed to conditions and effects.

use module_framework::{DamageCause, Subject, SubjectId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;

use crate::error::{SynergyError, SynergyResult};
use crate::events::SynergyEventType;

/// Damage carried by combat and survival events.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamagePayload {
    /// Amount when the event was raised; never changed by effects.
    pub original: f32,
    /// Amount after the effects applied so far.
    pub amount: f32,
    pub cause: DamageCause,
}

/// What the host knows about the other party of a combat event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetSnapshot {
    pub id: Option<SubjectId>,
    pub name: String,
    pub is_player: bool,
    pub is_hostile: bool,
    pub health: f32,
    pub max_health: f32,
}

impl TargetSnapshot {
    pub fn new(name: impl Into<String>, health: f32, max_health: f32) -> Self {
        Self {
            id: None,
            name: name.into(),
            is_player: false,
            is_hostile: true,
            health,
            max_health,
        }
    }

    pub fn player(mut self) -> Self {
        self.is_player = true;
        self.is_hostile = false;
        self
    }

    pub fn with_id(mut self, id: SubjectId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn health_fraction(&self) -> f32 {
        if self.max_health > 0.0 {
            (self.health / self.max_health).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Everything a synergy rule can see and change while one event is dispatched.
///
/// The context mutably borrows its subject for the whole dispatch, so all
/// energy and health changes made by effects on one subject are serialised.
/// Randomness comes from an owned `StdRng`; seed it with
/// [`with_seed`](Self::with_seed) for reproducible rolls.
pub struct EventContext<'a> {
    subject: &'a mut Subject,
    event_type: SynergyEventType,
    trigger_module: Option<String>,
    trigger_level: i32,
    damage: Option<DamagePayload>,
    target: Option<TargetSnapshot>,
    world_time: u64,
    rng: RefCell<StdRng>,
}

impl std::fmt::Debug for EventContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventContext")
            .field("subject", &self.subject.name)
            .field("event_type", &self.event_type)
            .field("trigger_module", &self.trigger_module)
            .field("trigger_level", &self.trigger_level)
            .field("damage", &self.damage)
            .field("target", &self.target)
            .field("world_time", &self.world_time)
            .finish()
    }
}

impl<'a> EventContext<'a> {
    pub fn new(subject: &'a mut Subject, event_type: SynergyEventType) -> Self {
        Self {
            subject,
            event_type,
            trigger_module: None,
            trigger_level: 0,
            damage: None,
            target: None,
            world_time: 0,
            rng: RefCell::new(StdRng::from_entropy()),
        }
    }

    /// Name the module that raised the event and its level.
    pub fn with_trigger_module(mut self, module_id: impl Into<String>, level: i32) -> Self {
        self.trigger_module = Some(module_id.into());
        self.trigger_level = level;
        self
    }

    pub fn with_damage(mut self, amount: f32, cause: DamageCause) -> Self {
        let amount = amount.max(0.0);
        self.damage = Some(DamagePayload {
            original: amount,
            amount,
            cause,
        });
        self
    }

    pub fn with_target(mut self, target: TargetSnapshot) -> Self {
        self.target = Some(target);
        self
    }

    pub fn at_time(mut self, world_time: u64) -> Self {
        self.world_time = world_time;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = RefCell::new(StdRng::seed_from_u64(seed));
        self
    }

    // ---------------------------------------------------------------------
    // Event
    // ---------------------------------------------------------------------

    pub fn event_type(&self) -> SynergyEventType {
        self.event_type
    }

    pub fn trigger_module(&self) -> Option<&str> {
        self.trigger_module.as_deref()
    }

    pub fn trigger_level(&self) -> i32 {
        self.trigger_level
    }

    pub fn world_time(&self) -> u64 {
        self.world_time
    }

    pub fn target(&self) -> Option<&TargetSnapshot> {
        self.target.as_ref()
    }

    // ---------------------------------------------------------------------
    // Subject
    // ---------------------------------------------------------------------

    pub fn subject(&self) -> &Subject {
        &*self.subject
    }

    pub fn subject_mut(&mut self) -> &mut Subject {
        &mut *self.subject
    }

    /// Effective level of an installed module; zero if absent or inactive.
    pub fn module_level(&self, module_id: &str) -> i32 {
        self.subject.modules.effective_level(module_id)
    }

    // ---------------------------------------------------------------------
    // Energy
    // ---------------------------------------------------------------------

    pub fn energy(&self) -> u32 {
        self.subject.energy.current()
    }

    pub fn max_energy(&self) -> u32 {
        self.subject.energy.max()
    }

    /// Take exactly `amount` energy, or nothing if the subject has less.
    pub fn consume_energy(&mut self, amount: u32) -> bool {
        self.subject.energy.try_consume(amount)
    }

    /// Add energy up to capacity. Returns the amount actually stored.
    pub fn add_energy(&mut self, amount: u32) -> u32 {
        self.subject.energy.recharge(amount)
    }

    // ---------------------------------------------------------------------
    // Damage
    // ---------------------------------------------------------------------

    pub fn damage(&self) -> Option<&DamagePayload> {
        self.damage.as_ref()
    }

    /// Current damage amount, zero for events without damage.
    pub fn damage_amount(&self) -> f32 {
        self.damage.map(|d| d.amount).unwrap_or(0.0)
    }

    pub fn original_damage(&self) -> f32 {
        self.damage.map(|d| d.original).unwrap_or(0.0)
    }

    pub fn damage_cause(&self) -> Option<DamageCause> {
        self.damage.map(|d| d.cause)
    }

    /// Overwrite the damage amount, clamped at zero.
    pub fn set_damage(&mut self, amount: f32) -> SynergyResult<()> {
        let payload = self.damage.as_mut().ok_or(SynergyError::MissingDamage)?;
        payload.amount = amount.max(0.0);
        Ok(())
    }

    pub fn scale_damage(&mut self, factor: f32) -> SynergyResult<()> {
        let current = self.damage.ok_or(SynergyError::MissingDamage)?.amount;
        self.set_damage(current * factor)
    }

    pub fn add_damage(&mut self, delta: f32) -> SynergyResult<()> {
        let current = self.damage.ok_or(SynergyError::MissingDamage)?.amount;
        self.set_damage(current + delta)
    }

    // ---------------------------------------------------------------------
    // Randomness
    // ---------------------------------------------------------------------

    /// True with probability `chance` (0.0 - 1.0).
    pub fn roll(&self, chance: f32) -> bool {
        if chance <= 0.0 {
            return false;
        }
        if chance >= 1.0 {
            return true;
        }
        self.rng.borrow_mut().gen::<f32>() < chance
    }

    /// Uniform integer in `low..=high`.
    pub fn random_between(&self, low: u32, high: u32) -> u32 {
        if low >= high {
            return low;
        }
        self.rng.borrow_mut().gen_range(low..=high)
    }
}
