//! Subjects: the game entities that own modules.

mod components;
mod subject;

pub use components::*;
pub use subject::*;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a subject (the entity that owns a module set).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubjectId(pub Uuid);

impl SubjectId {
    /// Create a new random subject ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID, e.g. a player's persistent id supplied by the host.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn nil() -> Self {
        Self(Uuid::nil())
    }
}

impl Default for SubjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
