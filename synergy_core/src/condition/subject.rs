//! Conditions on the subject, its energy, and the event target.

use module_framework::{StatusEffectKind, Subject};

use super::Condition;
use crate::context::{EventContext, TargetSnapshot};
use crate::error::SynergyResult;

type SubjectPredicate = Box<dyn Fn(&Subject) -> bool + Send + Sync>;

/// A predicate over the subject's own state (health, status effects, environment).
pub struct PlayerStateCondition {
    description: String,
    predicate: SubjectPredicate,
}

impl std::fmt::Debug for PlayerStateCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerStateCondition")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl PlayerStateCondition {
    pub fn new(
        description: impl Into<String>,
        predicate: impl Fn(&Subject) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            description: description.into(),
            predicate: Box::new(predicate),
        }
    }

    /// Health strictly below `fraction` of max health.
    pub fn health_below(fraction: f32) -> Self {
        Self::new(format!("health below {:.0}%", fraction * 100.0), move |s| {
            s.health_fraction() < fraction
        })
    }

    pub fn health_above(fraction: f32) -> Self {
        Self::new(format!("health above {:.0}%", fraction * 100.0), move |s| {
            s.health_fraction() > fraction
        })
    }

    pub fn has_status(kind: StatusEffectKind) -> Self {
        Self::new(format!("has {:?}", kind), move |s| s.has_status(kind))
    }

    pub fn lacks_status(kind: StatusEffectKind) -> Self {
        Self::new(format!("lacks {:?}", kind), move |s| !s.has_status(kind))
    }

    pub fn humidity_at_least(humidity: f32) -> Self {
        Self::new(format!("humidity >= {:.2}", humidity), move |s| {
            s.environment.humidity >= humidity
        })
    }

    pub fn in_water() -> Self {
        Self::new("in water", |s| s.environment.in_water)
    }
}

impl Condition for PlayerStateCondition {
    fn test(&self, ctx: &EventContext<'_>) -> SynergyResult<bool> {
        Ok((self.predicate)(ctx.subject()))
    }

    fn describe(&self) -> String {
        self.description.clone()
    }
}

#[derive(Debug, Clone, Copy)]
enum EnergyRequirement {
    AtLeast(u32),
    AbovePercent(f32),
    BelowPercent(f32),
}

/// A requirement on the subject's stored energy.
#[derive(Debug, Clone, Copy)]
pub struct EnergyCondition {
    requirement: EnergyRequirement,
}

impl EnergyCondition {
    pub fn at_least(amount: u32) -> Self {
        Self {
            requirement: EnergyRequirement::AtLeast(amount),
        }
    }

    pub fn above_percent(percent: f32) -> Self {
        Self {
            requirement: EnergyRequirement::AbovePercent(percent),
        }
    }

    pub fn below_percent(percent: f32) -> Self {
        Self {
            requirement: EnergyRequirement::BelowPercent(percent),
        }
    }
}

impl Condition for EnergyCondition {
    fn test(&self, ctx: &EventContext<'_>) -> SynergyResult<bool> {
        let percent = ctx.subject().energy.fraction() * 100.0;
        Ok(match self.requirement {
            EnergyRequirement::AtLeast(amount) => ctx.energy() >= amount,
            EnergyRequirement::AbovePercent(p) => percent > p,
            EnergyRequirement::BelowPercent(p) => percent < p,
        })
    }

    fn describe(&self) -> String {
        match self.requirement {
            EnergyRequirement::AtLeast(amount) => format!("energy >= {}", amount),
            EnergyRequirement::AbovePercent(p) => format!("energy above {:.0}%", p),
            EnergyRequirement::BelowPercent(p) => format!("energy below {:.0}%", p),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum TargetRequirement {
    Present,
    Player,
    NotPlayer,
    Hostile,
    HealthBelow(f32),
}

/// A requirement on the other party of a combat event. Events without a
/// target never pass.
#[derive(Debug, Clone, Copy)]
pub struct TargetCondition {
    requirement: TargetRequirement,
}

impl TargetCondition {
    pub fn exists() -> Self {
        Self {
            requirement: TargetRequirement::Present,
        }
    }

    pub fn is_player() -> Self {
        Self {
            requirement: TargetRequirement::Player,
        }
    }

    pub fn is_not_player() -> Self {
        Self {
            requirement: TargetRequirement::NotPlayer,
        }
    }

    pub fn is_hostile() -> Self {
        Self {
            requirement: TargetRequirement::Hostile,
        }
    }

    pub fn health_below(fraction: f32) -> Self {
        Self {
            requirement: TargetRequirement::HealthBelow(fraction),
        }
    }

    fn check(&self, target: &TargetSnapshot) -> bool {
        match self.requirement {
            TargetRequirement::Present => true,
            TargetRequirement::Player => target.is_player,
            TargetRequirement::NotPlayer => !target.is_player,
            TargetRequirement::Hostile => target.is_hostile,
            TargetRequirement::HealthBelow(fraction) => target.health_fraction() < fraction,
        }
    }
}

impl Condition for TargetCondition {
    fn test(&self, ctx: &EventContext<'_>) -> SynergyResult<bool> {
        Ok(ctx.target().is_some_and(|target| self.check(target)))
    }

    fn describe(&self) -> String {
        match self.requirement {
            TargetRequirement::Present => "has a target".to_string(),
            TargetRequirement::Player => "target is a player".to_string(),
            TargetRequirement::NotPlayer => "target is not a player".to_string(),
            TargetRequirement::Hostile => "target is hostile".to_string(),
            TargetRequirement::HealthBelow(f) => {
                format!("target health below {:.0}%", f * 100.0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::SynergyEventType;

    #[test]
    fn test_health_thresholds() {
        let mut subject = Subject::new("Alex");
        subject.vitals.health = 4.0;
        let ctx = EventContext::new(&mut subject, SynergyEventType::Hurt);

        assert!(PlayerStateCondition::health_below(0.3).test(&ctx).unwrap());
        assert!(!PlayerStateCondition::health_above(0.5).test(&ctx).unwrap());
        assert_eq!(PlayerStateCondition::health_below(0.3).describe(), "health below 30%");
    }

    #[test]
    fn test_status_and_custom_predicates() {
        let mut subject = Subject::new("Alex");
        subject.apply_status(StatusEffectKind::Poison, 100, 0);
        subject.environment.humidity = 0.8;
        let ctx = EventContext::new(&mut subject, SynergyEventType::Tick);

        assert!(PlayerStateCondition::has_status(StatusEffectKind::Poison).test(&ctx).unwrap());
        assert!(PlayerStateCondition::lacks_status(StatusEffectKind::Wither).test(&ctx).unwrap());
        assert!(PlayerStateCondition::humidity_at_least(0.7).test(&ctx).unwrap());
        assert!(!PlayerStateCondition::in_water().test(&ctx).unwrap());

        let named = PlayerStateCondition::new("named Alex", |s| s.name == "Alex");
        assert!(named.test(&ctx).unwrap());
    }

    #[test]
    fn test_energy_condition() {
        let mut subject = Subject::new("Alex").with_energy(50, 1000);
        let ctx = EventContext::new(&mut subject, SynergyEventType::Tick);

        assert!(EnergyCondition::at_least(50).test(&ctx).unwrap());
        assert!(!EnergyCondition::at_least(51).test(&ctx).unwrap());
        assert!(EnergyCondition::below_percent(10.0).test(&ctx).unwrap());
        assert!(!EnergyCondition::above_percent(10.0).test(&ctx).unwrap());
    }

    #[test]
    fn test_target_condition() {
        let mut subject = Subject::new("Alex");
        let zombie = TargetSnapshot::new("Zombie", 5.0, 20.0);
        let ctx = EventContext::new(&mut subject, SynergyEventType::Attack).with_target(zombie);

        assert!(TargetCondition::is_not_player().test(&ctx).unwrap());
        assert!(TargetCondition::is_hostile().test(&ctx).unwrap());
        assert!(TargetCondition::health_below(0.5).test(&ctx).unwrap());
        assert!(!TargetCondition::is_player().test(&ctx).unwrap());
    }

    #[test]
    fn test_target_condition_without_target() {
        let mut subject = Subject::new("Alex");
        let ctx = EventContext::new(&mut subject, SynergyEventType::Attack);
        assert!(!TargetCondition::exists().test(&ctx).unwrap());
        assert!(!TargetCondition::is_not_player().test(&ctx).unwrap());
    }
}
