//! Effects on the subject itself: status effects, shields, healing, messages
//! and cooldowns.

use module_framework::{canonical_id, StatusEffectKind};
use serde::{Deserialize, Serialize};

use super::Effect;
use crate::context::EventContext;
use crate::error::SynergyResult;

/// Applies a timed status effect to the subject. Works for buffs and debuffs.
#[derive(Debug, Clone, Copy)]
pub struct StatusEffectGrant {
    kind: StatusEffectKind,
    duration_ticks: u32,
    amplifier: u8,
}

impl StatusEffectGrant {
    pub fn new(kind: StatusEffectKind, duration_ticks: u32, amplifier: u8) -> Self {
        Self {
            kind,
            duration_ticks,
            amplifier,
        }
    }
}

impl Effect for StatusEffectGrant {
    fn apply(&self, ctx: &mut EventContext<'_>) -> SynergyResult<()> {
        ctx.subject_mut()
            .apply_status(self.kind, self.duration_ticks, self.amplifier);
        Ok(())
    }

    fn describe(&self) -> String {
        let verb = if self.kind.is_debuff() { "suffer" } else { "gain" };
        format!(
            "{} {:?} {} for {}s",
            verb,
            self.kind,
            self.amplifier + 1,
            self.duration_ticks / 20
        )
    }
}

/// How a shield grant combines with absorption the subject already has.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ShieldMode {
    /// Always add the full amount.
    Additive,
    /// Add up to a ceiling; existing absorption above it is left alone.
    Capped(f32),
}

/// Grants absorption shield, optionally scaled by module levels and paid
/// for with energy.
#[derive(Debug, Clone)]
pub struct ShieldGrantEffect {
    base: f32,
    per_level: f32,
    level_modules: Vec<String>,
    mode: ShieldMode,
    energy_cost: u32,
}

impl ShieldGrantEffect {
    pub fn new(base: f32, mode: ShieldMode) -> Self {
        Self {
            base,
            per_level: 0.0,
            level_modules: Vec::new(),
            mode,
            energy_cost: 0,
        }
    }

    pub fn with_level_bonus<I, S>(mut self, modules: I, per_level: f32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.level_modules = modules.into_iter().map(|m| canonical_id(m.as_ref())).collect();
        self.per_level = per_level;
        self
    }

    pub fn with_energy_cost(mut self, cost: u32) -> Self {
        self.energy_cost = cost;
        self
    }

    pub fn amount(&self, ctx: &EventContext<'_>) -> f32 {
        let levels: i32 = self
            .level_modules
            .iter()
            .map(|id| ctx.module_level(id))
            .sum();
        (self.base + self.per_level * levels as f32).max(0.0)
    }
}

impl Effect for ShieldGrantEffect {
    fn can_apply(&self, ctx: &EventContext<'_>) -> bool {
        if !ctx.subject().energy.has(self.energy_cost) {
            return false;
        }
        match self.mode {
            ShieldMode::Additive => true,
            ShieldMode::Capped(max) => ctx.subject().vitals.absorption < max,
        }
    }

    fn apply(&self, ctx: &mut EventContext<'_>) -> SynergyResult<()> {
        if self.energy_cost > 0 && !ctx.consume_energy(self.energy_cost) {
            return Ok(());
        }
        let amount = self.amount(ctx);
        let vitals = &mut ctx.subject_mut().vitals;
        vitals.absorption = match self.mode {
            ShieldMode::Additive => vitals.absorption + amount,
            ShieldMode::Capped(max) => (vitals.absorption + amount).min(max).max(vitals.absorption),
        };
        Ok(())
    }

    fn describe(&self) -> String {
        match self.mode {
            ShieldMode::Additive => format!("gain {:.1} shield", self.base),
            ShieldMode::Capped(max) => format!("gain {:.1} shield (max {:.1})", self.base, max),
        }
    }
}

/// Restores health up to max health.
#[derive(Debug, Clone, Copy)]
pub struct HealEffect {
    amount: f32,
}

impl HealEffect {
    pub fn new(amount: f32) -> Self {
        Self { amount }
    }
}

impl Effect for HealEffect {
    fn can_apply(&self, ctx: &EventContext<'_>) -> bool {
        let vitals = &ctx.subject().vitals;
        vitals.health < vitals.max_health
    }

    fn apply(&self, ctx: &mut EventContext<'_>) -> SynergyResult<()> {
        ctx.subject_mut().vitals.heal(self.amount);
        Ok(())
    }

    fn describe(&self) -> String {
        format!("heal {:.1}", self.amount)
    }
}

/// Queues a message for the subject.
#[derive(Debug, Clone)]
pub struct MessageEffect {
    text: String,
}

impl MessageEffect {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl Effect for MessageEffect {
    fn apply(&self, ctx: &mut EventContext<'_>) -> SynergyResult<()> {
        let text = self.text.clone();
        ctx.subject_mut().send_message(text);
        Ok(())
    }

    fn describe(&self) -> String {
        format!("message \"{}\"", self.text)
    }
}

/// Starts a named cooldown on the subject.
#[derive(Debug, Clone)]
pub struct CooldownEffect {
    key: String,
    duration_ticks: u64,
}

impl CooldownEffect {
    pub fn new(key: impl Into<String>, duration_ticks: u64) -> Self {
        Self {
            key: key.into(),
            duration_ticks,
        }
    }
}

impl Effect for CooldownEffect {
    fn apply(&self, ctx: &mut EventContext<'_>) -> SynergyResult<()> {
        let now = ctx.world_time();
        ctx.subject_mut()
            .set_cooldown(self.key.clone(), now, self.duration_ticks);
        Ok(())
    }

    fn describe(&self) -> String {
        format!("{}s cooldown", self.duration_ticks / 20)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::SynergyEventType;
    use module_framework::Subject;

    #[test]
    fn test_status_grant() {
        let mut subject = Subject::new("Alex");
        let mut ctx = EventContext::new(&mut subject, SynergyEventType::Hurt);
        let grant = StatusEffectGrant::new(StatusEffectKind::Resistance, 100, 1);
        grant.apply(&mut ctx).unwrap();
        drop(ctx);

        assert!(subject.has_status(StatusEffectKind::Resistance));
        assert_eq!(grant.describe(), "gain Resistance 2 for 5s");
    }

    #[test]
    fn test_additive_shield() {
        let mut subject = Subject::new("Alex");
        subject.vitals.absorption = 10.0;
        let mut ctx = EventContext::new(&mut subject, SynergyEventType::Hurt);

        ShieldGrantEffect::new(4.0, ShieldMode::Additive)
            .apply(&mut ctx)
            .unwrap();
        assert!((ctx.subject().vitals.absorption - 14.0).abs() < 1e-6);
    }

    #[test]
    fn test_capped_shield() {
        let mut subject = Subject::new("Alex").with_module("YELLOW_SHIELD", 2);
        subject.vitals.absorption = 6.0;
        let mut ctx = EventContext::new(&mut subject, SynergyEventType::EnvironmentalDamage);

        let shield = ShieldGrantEffect::new(2.0, ShieldMode::Capped(8.0))
            .with_level_bonus(["YELLOW_SHIELD"], 1.0);
        assert!((shield.amount(&ctx) - 4.0).abs() < 1e-6);
        shield.apply(&mut ctx).unwrap();
        assert!((ctx.subject().vitals.absorption - 8.0).abs() < 1e-6);
        assert!(!shield.can_apply(&ctx));
    }

    #[test]
    fn test_capped_shield_never_lowers_existing() {
        let mut subject = Subject::new("Alex");
        subject.vitals.absorption = 12.0;
        let mut ctx = EventContext::new(&mut subject, SynergyEventType::Hurt);
        ShieldGrantEffect::new(2.0, ShieldMode::Capped(8.0))
            .apply(&mut ctx)
            .unwrap();
        assert!((ctx.subject().vitals.absorption - 12.0).abs() < 1e-6);
    }

    #[test]
    fn test_shield_energy_cost() {
        let mut subject = Subject::new("Alex").with_energy(40, 100);
        let mut ctx = EventContext::new(&mut subject, SynergyEventType::Hurt);
        let shield = ShieldGrantEffect::new(2.0, ShieldMode::Additive).with_energy_cost(30);

        assert!(shield.can_apply(&ctx));
        shield.apply(&mut ctx).unwrap();
        assert_eq!(ctx.energy(), 10);
        assert!(!shield.can_apply(&ctx));
    }

    #[test]
    fn test_heal_and_message() {
        let mut subject = Subject::new("Alex");
        subject.vitals.health = 15.0;
        let mut ctx = EventContext::new(&mut subject, SynergyEventType::Kill);

        HealEffect::new(10.0).apply(&mut ctx).unwrap();
        MessageEffect::new("Vampiric Edge").apply(&mut ctx).unwrap();
        drop(ctx);

        assert_eq!(subject.vitals.health, 20.0);
        assert_eq!(subject.pending_messages(), ["Vampiric Edge".to_string()]);
    }

    #[test]
    fn test_cooldown_effect() {
        let mut subject = Subject::new("Alex");
        let mut ctx = EventContext::new(&mut subject, SynergyEventType::Hurt).at_time(500);
        CooldownEffect::new("kinetic_barrier", 200)
            .apply(&mut ctx)
            .unwrap();
        drop(ctx);

        assert!(subject.is_on_cooldown("kinetic_barrier", 699));
        assert!(!subject.is_on_cooldown("kinetic_barrier", 700));
    }
}
