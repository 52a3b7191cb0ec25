//! Host-facing adapter that turns game happenings into synergy events.
//!
//! The host calls one method per happening and gets back the final damage
//! (for combat) and the ids of the synergies that fired. Damage dealt by
//! synergies themselves ([`DamageCause::Synergy`]) is passed through
//! untouched so effects never trigger each other recursively.

use module_framework::{DamageCause, Subject};

use crate::context::{EventContext, TargetSnapshot};
use crate::events::SynergyEventType;
use crate::manager::SynergyManager;

/// One damage exchange as seen by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub damage: f32,
    pub cause: DamageCause,
    pub critical: bool,
    /// The victim for outgoing hits, the attacker for incoming ones.
    pub other: Option<TargetSnapshot>,
}

impl Hit {
    pub fn new(damage: f32, cause: DamageCause) -> Self {
        Self {
            damage,
            cause,
            critical: false,
            other: None,
        }
    }

    pub fn critical(mut self) -> Self {
        self.critical = true;
        self
    }

    pub fn with_other(mut self, other: TargetSnapshot) -> Self {
        self.other = Some(other);
        self
    }
}

/// Final damage after synergies, and which synergies fired along the way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DamageOutcome {
    pub damage: f32,
    pub applied: Vec<String>,
}

/// Raises synergy events for one subject at a time.
#[derive(Debug, Clone, Copy)]
pub struct SynergyDispatcher<'m> {
    manager: &'m SynergyManager,
    seed: Option<u64>,
}

impl<'m> SynergyDispatcher<'m> {
    pub fn new(manager: &'m SynergyManager) -> Self {
        Self {
            manager,
            seed: None,
        }
    }

    /// Derive every context's RNG from `seed` and the world time.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn context<'s>(
        &self,
        subject: &'s mut Subject,
        event: SynergyEventType,
        world_time: u64,
    ) -> EventContext<'s> {
        let ctx = EventContext::new(subject, event).at_time(world_time);
        match self.seed {
            Some(seed) => ctx.with_seed(seed ^ world_time),
            None => ctx,
        }
    }

    /// Raise a payload-free event (movement, death, ...).
    pub fn raise(
        &self,
        subject: &mut Subject,
        event: SynergyEventType,
        world_time: u64,
    ) -> Vec<String> {
        if !self.manager.config().enabled {
            return Vec::new();
        }
        let mut ctx = self.context(subject, event, world_time);
        self.manager.process_event(&mut ctx)
    }

    /// Per-world-tick entry point.
    ///
    /// Raises `Tick` every `tick_interval` ticks and charges maintenance every
    /// `maintenance_interval` ticks. Dead subjects are skipped.
    pub fn on_tick(&self, subject: &mut Subject, world_time: u64) -> Vec<String> {
        let config = self.manager.config();
        if !config.enabled || !subject.is_alive() {
            return Vec::new();
        }

        let mut applied = Vec::new();
        if every(world_time, config.tick_interval) {
            applied = self.raise(subject, SynergyEventType::Tick, world_time);
        }
        if every(world_time, config.maintenance_interval) {
            self.manager.run_maintenance(subject);
            self.manager.check_low_energy(subject);
        }
        applied
    }

    fn raise_damage(
        &self,
        subject: &mut Subject,
        event: SynergyEventType,
        hit: &Hit,
        damage: f32,
        world_time: u64,
        applied: &mut Vec<String>,
    ) -> f32 {
        let mut ctx = self
            .context(subject, event, world_time)
            .with_damage(damage, hit.cause);
        if let Some(other) = &hit.other {
            ctx = ctx.with_target(other.clone());
        }
        applied.extend(self.manager.process_event(&mut ctx));
        ctx.damage_amount()
    }

    /// The subject hits something.
    ///
    /// Raises `Attack`, then `CriticalHit` for critical hits, then `Kill`
    /// when the damage reaches the victim's remaining health. Each stage sees
    /// the damage left by the previous one.
    pub fn on_attack(&self, subject: &mut Subject, hit: Hit, world_time: u64) -> DamageOutcome {
        if !self.manager.config().enabled || hit.cause.is_synergy() {
            return DamageOutcome {
                damage: hit.damage,
                applied: Vec::new(),
            };
        }

        let mut applied = Vec::new();
        let mut damage = self.raise_damage(
            subject,
            SynergyEventType::Attack,
            &hit,
            hit.damage,
            world_time,
            &mut applied,
        );
        if hit.critical {
            damage = self.raise_damage(
                subject,
                SynergyEventType::CriticalHit,
                &hit,
                damage,
                world_time,
                &mut applied,
            );
        }
        if hit.other.as_ref().is_some_and(|victim| damage >= victim.health) {
            damage = self.raise_damage(
                subject,
                SynergyEventType::Kill,
                &hit,
                damage,
                world_time,
                &mut applied,
            );
        }

        DamageOutcome { damage, applied }
    }

    /// The subject takes damage.
    ///
    /// Environmental causes raise `EnvironmentalDamage`, everything else
    /// `Hurt`. If the remaining damage would then kill the subject,
    /// `FatalDamage` is raised; otherwise `LowHealth` is raised when health
    /// would drop below the configured fraction.
    pub fn on_hurt(&self, subject: &mut Subject, hit: Hit, world_time: u64) -> DamageOutcome {
        let config = self.manager.config();
        if !config.enabled || hit.cause.is_synergy() {
            return DamageOutcome {
                damage: hit.damage,
                applied: Vec::new(),
            };
        }

        let event = if hit.cause.is_environmental() {
            SynergyEventType::EnvironmentalDamage
        } else {
            SynergyEventType::Hurt
        };
        let mut applied = Vec::new();
        let mut damage = self.raise_damage(subject, event, &hit, hit.damage, world_time, &mut applied);

        let remaining = health_after(subject, damage);
        if remaining <= 0.0 {
            damage = self.raise_damage(
                subject,
                SynergyEventType::FatalDamage,
                &hit,
                damage,
                world_time,
                &mut applied,
            );
        } else if subject.vitals.max_health > 0.0
            && remaining / subject.vitals.max_health < config.low_health_fraction
        {
            damage = self.raise_damage(
                subject,
                SynergyEventType::LowHealth,
                &hit,
                damage,
                world_time,
                &mut applied,
            );
        }

        DamageOutcome { damage, applied }
    }

    /// Report an energy change the host made outside the synergy engine.
    ///
    /// Raises `EnergyRecharge` or `EnergyConsume`, followed by `EnergyFull`
    /// when the store just filled up or `EnergyLow` when it just crossed the
    /// warning threshold.
    pub fn on_energy_changed(
        &self,
        subject: &mut Subject,
        before: u32,
        world_time: u64,
    ) -> Vec<String> {
        let config = self.manager.config();
        let now = subject.energy.current();
        if !config.enabled || now == before {
            return Vec::new();
        }

        let mut applied = Vec::new();
        if now > before {
            applied.extend(self.raise(subject, SynergyEventType::EnergyRecharge, world_time));
            if subject.energy.is_full() {
                applied.extend(self.raise(subject, SynergyEventType::EnergyFull, world_time));
            }
        } else {
            applied.extend(self.raise(subject, SynergyEventType::EnergyConsume, world_time));
            let max = subject.energy.max() as f32;
            let threshold = max * config.low_energy_warning_percent / 100.0;
            let (before_f, now_f) = (before as f32, subject.energy.current() as f32);
            if max > 0.0 && before_f >= threshold && now_f < threshold {
                applied.extend(self.raise(subject, SynergyEventType::EnergyLow, world_time));
            }
        }
        applied
    }
}

fn every(world_time: u64, interval: u64) -> bool {
    interval > 0 && world_time % interval == 0
}

/// Health left after `damage`, absorption first.
fn health_after(subject: &Subject, damage: f32) -> f32 {
    let through_shield = (damage - subject.vitals.absorption).max(0.0);
    subject.vitals.health - through_shield
}
