//! Event taxonomy raised by the host and matched by synergy triggers.

use serde::{Deserialize, Serialize};

/// The kinds of event a synergy can react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SynergyEventType {
    /// Periodic update, raised every configured tick interval.
    Tick,

    // Combat
    Attack,
    Hurt,
    Kill,
    Death,
    CriticalHit,

    // Energy
    EnergyConsume,
    EnergyRecharge,
    EnergyFull,
    EnergyLow,

    // Survival
    EnvironmentalDamage,
    LowHealth,
    FatalDamage,

    // Movement
    Sprint,
    Jump,
    Sneak,

    /// Wildcard used as a trigger; matches every event.
    Any,
}

impl SynergyEventType {
    pub const ALL: [SynergyEventType; 17] = [
        SynergyEventType::Tick,
        SynergyEventType::Attack,
        SynergyEventType::Hurt,
        SynergyEventType::Kill,
        SynergyEventType::Death,
        SynergyEventType::CriticalHit,
        SynergyEventType::EnergyConsume,
        SynergyEventType::EnergyRecharge,
        SynergyEventType::EnergyFull,
        SynergyEventType::EnergyLow,
        SynergyEventType::EnvironmentalDamage,
        SynergyEventType::LowHealth,
        SynergyEventType::FatalDamage,
        SynergyEventType::Sprint,
        SynergyEventType::Jump,
        SynergyEventType::Sneak,
        SynergyEventType::Any,
    ];

    /// Whether a trigger of this type fires for `event`.
    pub fn matches(self, event: SynergyEventType) -> bool {
        self == SynergyEventType::Any || self == event
    }

    /// Events where the subject deals damage.
    pub fn is_outgoing_damage(self) -> bool {
        matches!(
            self,
            SynergyEventType::Attack | SynergyEventType::CriticalHit | SynergyEventType::Kill
        )
    }

    /// Events where the subject takes damage.
    pub fn is_incoming_damage(self) -> bool {
        matches!(
            self,
            SynergyEventType::Hurt
                | SynergyEventType::EnvironmentalDamage
                | SynergyEventType::LowHealth
                | SynergyEventType::FatalDamage
        )
    }
}

impl std::fmt::Display for SynergyEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}
