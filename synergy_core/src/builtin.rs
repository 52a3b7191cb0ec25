//! Built-in synergy rules.
//!
//! The numbers here are tuning data, not part of the engine contract.

use module_framework::StatusEffectKind;

use crate::condition::{
    CooldownCondition, EnergyCondition, PlayerStateCondition, RandomChanceCondition,
    TargetCondition,
};
use crate::definition::SynergyDefinition;
use crate::effect::{
    CooldownEffect, DamageMultiplierEffect, DrainPolicy, EnergyConsumeEffect, EnergyDrainEffect,
    EnergyRefundEffect, LifestealEffect, MessageEffect, ResourceConversionEffect,
    ShieldGrantEffect, ShieldMode, StatusEffectGrant,
};
use crate::events::SynergyEventType;
use crate::manager::SynergyManager;

/// Register every built-in synergy. Returns how many were newly registered.
pub fn register_all(manager: &SynergyManager) -> usize {
    let registered = all()
        .into_iter()
        .map(|definition| manager.register_synergy(definition))
        .filter(|registered| *registered)
        .count();
    tracing::info!(registered, total = manager.synergy_count(), "built-in synergies registered");
    registered
}

/// Every built-in definition, unregistered.
pub fn all() -> Vec<SynergyDefinition> {
    vec![
        energy_loop(),
        combat_echo(),
        survival_shield(),
        glass_cannon(),
        vampiric_edge(),
        humidity_condenser(),
        kinetic_barrier(),
        overclock(),
    ]
}

/// Two generators feeding each other: a chance each tick to restore energy.
pub fn energy_loop() -> SynergyDefinition {
    SynergyDefinition::new("energy_loop")
        .with_display_name("Energy Loop")
        .with_description("Kinetic and solar generators cycle surplus charge back into the core.")
        .with_category("energy")
        .requires(["KINETIC_GENERATOR", "SOLAR_GENERATOR"])
        .with_link("KINETIC_GENERATOR", "SOLAR_GENERATOR", "synergy")
        .triggered_on(SynergyEventType::Tick)
        .with_condition(RandomChanceCondition::percent(20))
        .with_effect(
            EnergyRefundEffect::new(50)
                .with_level_bonus(["KINETIC_GENERATOR", "SOLAR_GENERATOR"], 25),
        )
        .with_effect(MessageEffect::new("Energy Loop +"))
        .with_priority(100)
}

/// Critical hits on monsters land harder.
pub fn combat_echo() -> SynergyDefinition {
    SynergyDefinition::new("combat_echo")
        .with_display_name("Combat Echo")
        .with_description("Critical strikes echo through the damage amplifier.")
        .with_category("combat")
        .requires(["CRITICAL_STRIKE", "DAMAGE_BOOST"])
        .with_link("CRITICAL_STRIKE", "DAMAGE_BOOST", "synergy")
        .triggered_on(SynergyEventType::CriticalHit)
        .with_condition(TargetCondition::is_not_player())
        .with_effect(DamageMultiplierEffect::outgoing(1.25))
        .with_effect(MessageEffect::new("Combat Echo!"))
        .with_priority(50)
}

/// Environmental damage raises a capped shield, paid for with energy.
pub fn survival_shield() -> SynergyDefinition {
    SynergyDefinition::new("survival_shield")
        .with_display_name("Survival Shield")
        .with_description("The shield projector hardens against fire, lava and drowning.")
        .with_category("defense")
        .requires(["YELLOW_SHIELD", "FIRE_EXTINGUISH"])
        .with_link("YELLOW_SHIELD", "FIRE_EXTINGUISH", "synergy")
        .triggered_on(SynergyEventType::EnvironmentalDamage)
        .with_effect(
            ShieldGrantEffect::new(2.0, ShieldMode::Capped(12.0))
                .with_level_bonus(["YELLOW_SHIELD", "FIRE_EXTINGUISH"], 0.5)
                .with_energy_cost(30),
        )
        .with_priority(80)
}

/// More damage dealt, more damage taken.
pub fn glass_cannon() -> SynergyDefinition {
    SynergyDefinition::new("glass_cannon")
        .with_display_name("Glass Cannon")
        .with_description("Overdriven weapons at the cost of structural integrity.")
        .with_category("combat")
        .requires(["DAMAGE_BOOST", "ATTACK_SPEED"])
        .triggered_on(SynergyEventType::Attack)
        .triggered_on(SynergyEventType::Hurt)
        .with_effect(DamageMultiplierEffect::outgoing(1.5))
        .with_effect(DamageMultiplierEffect::incoming(1.25))
}

/// Heal for part of the damage dealt, with a short internal cooldown.
pub fn vampiric_edge() -> SynergyDefinition {
    SynergyDefinition::new("vampiric_edge")
        .with_display_name("Vampiric Edge")
        .with_category("combat")
        .requires(["DAMAGE_BOOST", "HEALTH_REGEN"])
        .triggered_on(SynergyEventType::Attack)
        .with_condition(CooldownCondition::ready("vampiric_edge"))
        .with_condition(PlayerStateCondition::health_below(1.0))
        .with_effect(LifestealEffect::new(0.15, 4.0))
        .with_effect(CooldownEffect::new("vampiric_edge", 10))
}

/// Condense humidity into energy. Thirsty work.
pub fn humidity_condenser() -> SynergyDefinition {
    SynergyDefinition::new("humidity_condenser")
        .with_display_name("Humidity Condenser")
        .with_description("Condense moisture from the air into charge, at a cost to the body.")
        .with_category("energy")
        .requires(["WATERPROOF", "SOLAR_GENERATOR"])
        .triggered_on(SynergyEventType::Tick)
        .with_effect(
            ResourceConversionEffect::humidity(60.0, 100)
                .with_min_humidity(0.4)
                .with_health_cost(0.5)
                .with_penalty(StatusEffectKind::Hunger, 100, 0),
        )
}

/// Absorb a hit by spending stored kinetic energy.
pub fn kinetic_barrier() -> SynergyDefinition {
    SynergyDefinition::new("kinetic_barrier")
        .with_display_name("Kinetic Barrier")
        .with_category("defense")
        .requires(["KINETIC_GENERATOR", "YELLOW_SHIELD"])
        .triggered_on(SynergyEventType::Hurt)
        .with_condition(CooldownCondition::ready("kinetic_barrier"))
        .with_condition(EnergyCondition::at_least(100))
        .with_effect(EnergyConsumeEffect::new(100))
        .with_effect(DamageMultiplierEffect::incoming(0.6))
        .with_effect(StatusEffectGrant::new(StatusEffectKind::Resistance, 60, 0))
        .with_effect(CooldownEffect::new("kinetic_barrier", 200))
        .with_priority(60)
}

/// Permanent speed while energy lasts.
pub fn overclock() -> SynergyDefinition {
    SynergyDefinition::new("overclock")
        .with_display_name("Overclock")
        .with_category("mobility")
        .requires(["SPEED_BOOST", "ENERGY_EFFICIENCY"])
        .triggered_on(SynergyEventType::Tick)
        .with_condition(EnergyCondition::at_least(20))
        .with_effect(EnergyDrainEffect::new(20, 40, DrainPolicy::PauseWhenInsufficient))
        .with_effect(StatusEffectGrant::new(StatusEffectKind::Speed, 40, 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{EventContext, TargetSnapshot};
    use module_framework::{DamageCause, Subject};

    #[test]
    fn test_register_all_is_idempotent() {
        let manager = SynergyManager::new();
        let count = register_all(&manager);
        assert_eq!(count, all().len());
        assert_eq!(register_all(&manager), 0);
        assert_eq!(manager.synergy_count(), count);
    }

    #[test]
    fn test_every_builtin_has_a_chain() {
        for definition in all() {
            assert!(definition.chain().len() >= 2, "{}", definition.id());
            assert!(!definition.effects().is_empty(), "{}", definition.id());
        }
    }

    #[test]
    fn test_energy_loop_restores_energy() {
        let manager = SynergyManager::new();
        manager.register_synergy(energy_loop());
        let mut subject = Subject::new("Alex")
            .with_energy(0, 10_000)
            .with_module("KINETIC_GENERATOR", 1)
            .with_module("SOLAR_GENERATOR", 1);

        for time in 0..200 {
            let mut ctx = EventContext::new(&mut subject, SynergyEventType::Tick)
                .at_time(time)
                .with_seed(time);
            manager.process_event(&mut ctx);
        }
        // Each success restores 100; some of 200 rolls at 20% must succeed.
        assert!(subject.energy.current() > 0);
        assert_eq!(subject.energy.current() % 100, 0);
    }

    #[test]
    fn test_combat_echo_ignores_players() {
        let manager = SynergyManager::new();
        manager.register_synergy(combat_echo());
        let mut subject = Subject::new("Alex")
            .with_module("CRITICAL_STRIKE", 1)
            .with_module("DAMAGE_BOOST", 1);

        let mut ctx = EventContext::new(&mut subject, SynergyEventType::CriticalHit)
            .with_damage(8.0, DamageCause::Melee)
            .with_target(TargetSnapshot::new("Steve", 20.0, 20.0).player());
        assert!(manager.process_event(&mut ctx).is_empty());
        assert_eq!(ctx.damage_amount(), 8.0);
    }

    #[test]
    fn test_kinetic_barrier_cooldown() {
        let manager = SynergyManager::new();
        manager.register_synergy(kinetic_barrier());
        let mut subject = Subject::new("Alex")
            .with_energy(1000, 1000)
            .with_module("KINETIC_GENERATOR", 1)
            .with_module("YELLOW_SHIELD", 1);

        let mut first = EventContext::new(&mut subject, SynergyEventType::Hurt)
            .at_time(10)
            .with_damage(10.0, DamageCause::Melee);
        assert_eq!(manager.process_event(&mut first), vec!["KINETIC_BARRIER"]);
        assert!((first.damage_amount() - 6.0).abs() < 1e-6);
        drop(first);

        let mut second = EventContext::new(&mut subject, SynergyEventType::Hurt)
            .at_time(20)
            .with_damage(10.0, DamageCause::Melee);
        assert!(manager.process_event(&mut second).is_empty());
        drop(second);

        assert_eq!(subject.energy.current(), 900);
        assert!(subject.has_status(StatusEffectKind::Resistance));
    }
}
