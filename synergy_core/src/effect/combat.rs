//! Damage-shaping effects.

use serde::{Deserialize, Serialize};

use super::Effect;
use crate::context::EventContext;
use crate::error::SynergyResult;

/// Which side of a damage exchange an effect applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DamageDirection {
    /// Damage the subject deals.
    Outgoing,
    /// Damage the subject takes.
    Incoming,
}

impl DamageDirection {
    fn applies_to(self, ctx: &EventContext<'_>) -> bool {
        if ctx.damage().is_none() {
            return false;
        }
        let event = ctx.event_type();
        match self {
            DamageDirection::Outgoing => event.is_outgoing_damage(),
            DamageDirection::Incoming => event.is_incoming_damage(),
        }
    }
}

/// Multiplies the event's damage.
///
/// An incoming multiplier above 1.0 is a drawback: the subject takes more
/// damage. Below 1.0 it is damage reduction.
#[derive(Debug, Clone, Copy)]
pub struct DamageMultiplierEffect {
    factor: f32,
    direction: DamageDirection,
}

impl DamageMultiplierEffect {
    pub fn outgoing(factor: f32) -> Self {
        Self {
            factor,
            direction: DamageDirection::Outgoing,
        }
    }

    pub fn incoming(factor: f32) -> Self {
        Self {
            factor,
            direction: DamageDirection::Incoming,
        }
    }
}

impl Effect for DamageMultiplierEffect {
    fn can_apply(&self, ctx: &EventContext<'_>) -> bool {
        self.direction.applies_to(ctx)
    }

    fn apply(&self, ctx: &mut EventContext<'_>) -> SynergyResult<()> {
        ctx.scale_damage(self.factor)
    }

    fn describe(&self) -> String {
        match self.direction {
            DamageDirection::Outgoing => format!("deal x{:.2} damage", self.factor),
            DamageDirection::Incoming => format!("take x{:.2} damage", self.factor),
        }
    }
}

/// Adds a flat amount to the event's damage (negative values reduce it).
#[derive(Debug, Clone, Copy)]
pub struct FlatDamageEffect {
    amount: f32,
    direction: DamageDirection,
}

impl FlatDamageEffect {
    pub fn outgoing(amount: f32) -> Self {
        Self {
            amount,
            direction: DamageDirection::Outgoing,
        }
    }

    pub fn incoming(amount: f32) -> Self {
        Self {
            amount,
            direction: DamageDirection::Incoming,
        }
    }
}

impl Effect for FlatDamageEffect {
    fn can_apply(&self, ctx: &EventContext<'_>) -> bool {
        self.direction.applies_to(ctx)
    }

    fn apply(&self, ctx: &mut EventContext<'_>) -> SynergyResult<()> {
        ctx.add_damage(self.amount)
    }

    fn describe(&self) -> String {
        format!("{:+.1} damage", self.amount)
    }
}

/// Heals the subject for a share of the damage it deals, up to a cap per hit.
#[derive(Debug, Clone, Copy)]
pub struct LifestealEffect {
    fraction: f32,
    max_heal: f32,
}

impl LifestealEffect {
    pub fn new(fraction: f32, max_heal: f32) -> Self {
        Self {
            fraction: fraction.max(0.0),
            max_heal: max_heal.max(0.0),
        }
    }
}

impl Effect for LifestealEffect {
    fn can_apply(&self, ctx: &EventContext<'_>) -> bool {
        DamageDirection::Outgoing.applies_to(ctx) && ctx.damage_amount() > 0.0
    }

    fn apply(&self, ctx: &mut EventContext<'_>) -> SynergyResult<()> {
        let heal = (ctx.damage_amount() * self.fraction).min(self.max_heal);
        let healed = ctx.subject_mut().vitals.heal(heal);
        tracing::trace!(healed, "lifesteal");
        Ok(())
    }

    fn describe(&self) -> String {
        format!(
            "heal {:.0}% of damage dealt (max {:.1})",
            self.fraction * 100.0,
            self.max_heal
        )
    }
}
