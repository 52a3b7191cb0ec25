//! Error types for the module framework.

use thiserror::Error;

use crate::module::LifecyclePhase;

/// Errors raised by modules and the container that drives them.
///
/// The container never lets these escape a lifecycle pass; they are logged
/// with the owning module id and the pass moves on to the next module.
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("module `{0}` is already registered")]
    DuplicateModule(String),

    #[error("module `{0}` is not registered")]
    UnknownModule(String),

    #[error("module `{module_id}` failed during {phase}: {message}")]
    Lifecycle {
        module_id: String,
        phase: LifecyclePhase,
        message: String,
    },

    #[error("module `{module_id}` has unresolved dependencies: {missing:?}")]
    UnresolvedDependencies {
        module_id: String,
        missing: Vec<String>,
    },

    #[error("module `{module_id}` could not handle message `{topic}`: {message}")]
    Message {
        module_id: String,
        topic: String,
        message: String,
    },

    #[error(transparent)]
    Capability(#[from] CapabilityError),
}

impl ModuleError {
    /// Shorthand for a failed lifecycle hook.
    pub fn lifecycle(
        module_id: impl Into<String>,
        phase: LifecyclePhase,
        message: impl Into<String>,
    ) -> Self {
        ModuleError::Lifecycle {
            module_id: module_id.into(),
            phase,
            message: message.into(),
        }
    }
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config key `{key}` has an unsupported value: {reason}")]
    UnsupportedValue { key: String, reason: String },
}

/// Errors raised while encoding or decoding persisted capability data.
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("failed to encode capability data: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode capability data: {0}")]
    Decode(#[source] serde_json::Error),
}

pub type ModuleResult<T> = Result<T, ModuleError>;
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type CapabilityResult<T> = Result<T, CapabilityError>;
