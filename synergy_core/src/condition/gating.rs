//! Conditions that gate how often a synergy fires.

use super::Condition;
use crate::context::EventContext;
use crate::error::SynergyResult;

/// Passes with a fixed probability, rolled on the context's RNG.
#[derive(Debug, Clone, Copy)]
pub struct RandomChanceCondition {
    chance: f32,
}

impl RandomChanceCondition {
    /// `chance` in 0.0 - 1.0; values outside are clamped.
    pub fn new(chance: f32) -> Self {
        Self {
            chance: chance.clamp(0.0, 1.0),
        }
    }

    pub fn percent(percent: u32) -> Self {
        Self::new(percent as f32 / 100.0)
    }

    pub fn chance(&self) -> f32 {
        self.chance
    }
}

impl Condition for RandomChanceCondition {
    fn test(&self, ctx: &EventContext<'_>) -> SynergyResult<bool> {
        Ok(ctx.roll(self.chance))
    }

    fn describe(&self) -> String {
        format!("{:.0}% chance", self.chance * 100.0)
    }
}

/// Passes while the named cooldown is not running on the subject.
///
/// Pair with [`CooldownEffect`](crate::effect::CooldownEffect) using the same key.
#[derive(Debug, Clone)]
pub struct CooldownCondition {
    key: String,
}

impl CooldownCondition {
    pub fn ready(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl Condition for CooldownCondition {
    fn test(&self, ctx: &EventContext<'_>) -> SynergyResult<bool> {
        Ok(!ctx.subject().is_on_cooldown(&self.key, ctx.world_time()))
    }

    fn describe(&self) -> String {
        format!("cooldown `{}` ready", self.key)
    }
}
