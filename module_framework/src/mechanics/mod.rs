//! Game mechanics shared by modules and synergy effects: status effect kinds
//! and damage causes.

use serde::{Deserialize, Serialize};

/// Status effects that can be applied to a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusEffectKind {
    // Buffs
    Strength,
    Resistance,
    Speed,
    JumpBoost,
    Regeneration,
    FireResistance,
    Invisibility,
    NightVision,

    // Debuffs
    Weakness,
    Slowness,
    MiningFatigue,
    Hunger,
    Nausea,
    Wither,
    Poison,
    Malfunction,
}

impl StatusEffectKind {
    /// Whether this effect is harmful to the subject.
    pub fn is_debuff(&self) -> bool {
        matches!(
            self,
            StatusEffectKind::Weakness
                | StatusEffectKind::Slowness
                | StatusEffectKind::MiningFatigue
                | StatusEffectKind::Hunger
                | StatusEffectKind::Nausea
                | StatusEffectKind::Wither
                | StatusEffectKind::Poison
                | StatusEffectKind::Malfunction
        )
    }
}

/// What caused a damage event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DamageCause {
    // Combat
    Melee,
    Projectile,
    Magic,
    Explosion,

    // Environment
    InFire,
    OnFire,
    Lava,
    Drown,
    Fall,
    InWall,
    Cactus,
    Lightning,
    HotFloor,
    Freeze,

    /// Damage dealt by a synergy effect itself.
    Synergy,
    Other,
}

impl DamageCause {
    /// Damage that comes from the world rather than an attacker.
    pub fn is_environmental(&self) -> bool {
        matches!(
            self,
            DamageCause::InFire
                | DamageCause::OnFire
                | DamageCause::Lava
                | DamageCause::Drown
                | DamageCause::Fall
                | DamageCause::InWall
                | DamageCause::Cactus
                | DamageCause::Lightning
                | DamageCause::HotFloor
                | DamageCause::Freeze
        )
    }

    /// Damage produced by the synergy engine; never re-dispatched.
    pub fn is_synergy(&self) -> bool {
        matches!(self, DamageCause::Synergy)
    }
}
