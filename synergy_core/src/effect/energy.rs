//! Effects that move energy in or out of the subject's store.

use module_framework::{canonical_id, StatusEffectKind};
use serde::{Deserialize, Serialize};

use super::{on_interval, Effect};
use crate::context::EventContext;
use crate::error::SynergyResult;

/// Restores energy with some probability.
///
/// The amount is `base + per_level * (sum of the listed modules' levels)`,
/// bounded by `max_amount` and by free capacity in the store.
#[derive(Debug, Clone)]
pub struct EnergyRefundEffect {
    base: u32,
    per_level: u32,
    level_modules: Vec<String>,
    chance: f32,
    max_amount: u32,
}

impl EnergyRefundEffect {
    pub fn new(base: u32) -> Self {
        Self {
            base,
            per_level: 0,
            level_modules: Vec::new(),
            chance: 1.0,
            max_amount: u32::MAX,
        }
    }

    pub fn with_chance(mut self, chance: f32) -> Self {
        self.chance = chance.clamp(0.0, 1.0);
        self
    }

    pub fn with_level_bonus<I, S>(mut self, modules: I, per_level: u32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.level_modules = modules.into_iter().map(|m| canonical_id(m.as_ref())).collect();
        self.per_level = per_level;
        self
    }

    pub fn with_max(mut self, max_amount: u32) -> Self {
        self.max_amount = max_amount;
        self
    }

    /// Amount this effect would restore in `ctx`, before the capacity bound.
    pub fn amount(&self, ctx: &EventContext<'_>) -> u32 {
        let levels: i32 = self
            .level_modules
            .iter()
            .map(|id| ctx.module_level(id))
            .sum();
        let bonus = self.per_level.saturating_mul(levels.max(0) as u32);
        self.base.saturating_add(bonus).min(self.max_amount)
    }
}

impl Effect for EnergyRefundEffect {
    fn can_apply(&self, ctx: &EventContext<'_>) -> bool {
        !ctx.subject().energy.is_full()
    }

    fn apply(&self, ctx: &mut EventContext<'_>) -> SynergyResult<()> {
        if !ctx.roll(self.chance) {
            return Ok(());
        }
        let amount = self.amount(ctx);
        let stored = ctx.add_energy(amount);
        tracing::trace!(amount, stored, "energy refund");
        Ok(())
    }

    fn describe(&self) -> String {
        if self.chance < 1.0 {
            format!("{:.0}% chance to restore energy", self.chance * 100.0)
        } else {
            "restore energy".to_string()
        }
    }
}

/// What a periodic drain does when the store cannot cover it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrainPolicy {
    /// Take nothing this time and try again next interval.
    PauseWhenInsufficient,
    /// Take whatever is left.
    DrainToZero,
}

/// Takes energy every `interval` world ticks.
#[derive(Debug, Clone, Copy)]
pub struct EnergyDrainEffect {
    amount: u32,
    interval: u64,
    policy: DrainPolicy,
}

impl EnergyDrainEffect {
    pub fn new(amount: u32, interval: u64, policy: DrainPolicy) -> Self {
        Self {
            amount,
            interval,
            policy,
        }
    }
}

impl Effect for EnergyDrainEffect {
    fn can_apply(&self, ctx: &EventContext<'_>) -> bool {
        on_interval(ctx, self.interval)
    }

    fn apply(&self, ctx: &mut EventContext<'_>) -> SynergyResult<()> {
        match self.policy {
            DrainPolicy::PauseWhenInsufficient => {
                if !ctx.consume_energy(self.amount) {
                    tracing::debug!(
                        needed = self.amount,
                        available = ctx.energy(),
                        "energy drain paused"
                    );
                }
            }
            DrainPolicy::DrainToZero => {
                ctx.subject_mut().energy.drain(self.amount);
            }
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("drain {} energy every {} ticks", self.amount, self.interval)
    }
}

/// Takes a fixed amount of energy, all or nothing.
#[derive(Debug, Clone, Copy)]
pub struct EnergyConsumeEffect {
    amount: u32,
}

impl EnergyConsumeEffect {
    pub fn new(amount: u32) -> Self {
        Self { amount }
    }
}

impl Effect for EnergyConsumeEffect {
    fn can_apply(&self, ctx: &EventContext<'_>) -> bool {
        ctx.subject().energy.has(self.amount)
    }

    fn apply(&self, ctx: &mut EventContext<'_>) -> SynergyResult<()> {
        ctx.consume_energy(self.amount);
        Ok(())
    }

    fn describe(&self) -> String {
        format!("consume {} energy", self.amount)
    }
}

/// Converts ambient humidity into energy on an interval, at a price.
///
/// Every conversion yields `humidity * energy_per_unit` energy (doubled in
/// water or rain), then charges `health_cost` health and applies the penalty
/// status effect, if any. Nothing happens below `min_humidity`.
#[derive(Debug, Clone)]
pub struct ResourceConversionEffect {
    interval: u64,
    min_humidity: f32,
    energy_per_unit: f32,
    health_cost: f32,
    penalty: Option<(StatusEffectKind, u32, u8)>,
}

impl ResourceConversionEffect {
    pub fn humidity(energy_per_unit: f32, interval: u64) -> Self {
        Self {
            interval,
            min_humidity: 0.0,
            energy_per_unit: energy_per_unit.max(0.0),
            health_cost: 0.0,
            penalty: None,
        }
    }

    pub fn with_min_humidity(mut self, humidity: f32) -> Self {
        self.min_humidity = humidity;
        self
    }

    pub fn with_health_cost(mut self, health: f32) -> Self {
        self.health_cost = health.max(0.0);
        self
    }

    pub fn with_penalty(mut self, kind: StatusEffectKind, duration_ticks: u32, amplifier: u8) -> Self {
        self.penalty = Some((kind, duration_ticks, amplifier));
        self
    }

    fn yield_for(&self, ctx: &EventContext<'_>) -> u32 {
        let env = &ctx.subject().environment;
        let wet = if env.in_water || env.raining { 2.0 } else { 1.0 };
        (env.humidity.clamp(0.0, 1.0) * self.energy_per_unit * wet).round() as u32
    }
}

impl Effect for ResourceConversionEffect {
    fn can_apply(&self, ctx: &EventContext<'_>) -> bool {
        on_interval(ctx, self.interval)
            && ctx.subject().environment.humidity >= self.min_humidity
            && !ctx.subject().energy.is_full()
    }

    fn apply(&self, ctx: &mut EventContext<'_>) -> SynergyResult<()> {
        let gained = self.yield_for(ctx);
        let stored = ctx.add_energy(gained);

        let subject = ctx.subject_mut();
        if self.health_cost > 0.0 {
            // Conversion never kills on its own.
            subject.vitals.health = (subject.vitals.health - self.health_cost).max(1.0);
        }
        if let Some((kind, duration, amplifier)) = self.penalty {
            subject.apply_status(kind, duration, amplifier);
        }
        tracing::trace!(gained, stored, "humidity converted to energy");
        Ok(())
    }

    fn describe(&self) -> String {
        format!(
            "convert humidity to energy every {} ticks (costs {:.1} health)",
            self.interval, self.health_cost
        )
    }
}
