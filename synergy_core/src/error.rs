//! Error types for the synergy engine.

use thiserror::Error;

/// Errors raised while registering synergies or running their rules.
///
/// Condition and effect errors never escape [`SynergyManager`](crate::SynergyManager):
/// a failing condition counts as "not met" and a failing effect is skipped.
#[derive(Debug, Error)]
pub enum SynergyError {
    #[error("synergy `{0}` is already registered")]
    DuplicateSynergy(String),

    #[error("synergy `{0}` is not registered")]
    UnknownSynergy(String),

    #[error("condition `{condition}` failed: {message}")]
    Condition { condition: String, message: String },

    #[error("effect `{effect}` failed: {message}")]
    Effect { effect: String, message: String },

    #[error("event carries no damage payload")]
    MissingDamage,

    #[error("failed to parse synergy config: {0}")]
    Config(#[from] toml::de::Error),
}

impl SynergyError {
    pub fn condition(condition: impl Into<String>, message: impl Into<String>) -> Self {
        SynergyError::Condition {
            condition: condition.into(),
            message: message.into(),
        }
    }

    pub fn effect(effect: impl Into<String>, message: impl Into<String>) -> Self {
        SynergyError::Effect {
            effect: effect.into(),
            message: message.into(),
        }
    }
}

/// Result type for synergy operations.
pub type SynergyResult<T> = Result<T, SynergyError>;
