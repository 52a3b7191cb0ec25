//! Persisted per-subject module data.
//!
//! The document has three top-level maps keyed by module id:
//!
//! ```text
//! { "LEVELS": { "SHIELD": 2 }, "ACTIVE": { "SHIELD": true }, "META": { "SHIELD": {...} } }
//! ```
//!
//! Ids absent from the document read back as level 0, inactive, with an empty
//! meta object.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::{CapabilityError, CapabilityResult};

/// Normalise a module id to the form used as a key everywhere in capability data.
pub fn canonical_id(id: &str) -> String {
    id.trim().to_ascii_uppercase()
}

/// Snapshot of one module's persisted state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleRecord {
    pub level: i32,
    pub active: bool,
    pub meta: Value,
}

impl Default for ModuleRecord {
    fn default() -> Self {
        Self {
            level: 0,
            active: false,
            meta: Value::Object(Map::new()),
        }
    }
}

/// The capability document holding every installed module's level, active flag
/// and free-form metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleData {
    #[serde(rename = "LEVELS", default)]
    levels: BTreeMap<String, i32>,

    #[serde(rename = "ACTIVE", default)]
    active: BTreeMap<String, bool>,

    #[serde(rename = "META", default)]
    meta: BTreeMap<String, Value>,
}

impl ModuleData {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a module at the given level. A level above zero also marks it active.
    pub fn install(&mut self, module_id: &str, level: i32) {
        let id = canonical_id(module_id);
        let level = level.max(0);
        self.levels.insert(id.clone(), level);
        self.active.insert(id, level > 0);
    }

    /// Remove every trace of a module. Returns the removed record if it was installed.
    pub fn uninstall(&mut self, module_id: &str) -> Option<ModuleRecord> {
        let id = canonical_id(module_id);
        let level = self.levels.remove(&id)?;
        let active = self.active.remove(&id).unwrap_or(false);
        let meta = self
            .meta
            .remove(&id)
            .unwrap_or_else(|| Value::Object(Map::new()));
        Some(ModuleRecord {
            level,
            active,
            meta,
        })
    }

    pub fn is_installed(&self, module_id: &str) -> bool {
        self.levels.contains_key(&canonical_id(module_id))
    }

    pub fn level(&self, module_id: &str) -> i32 {
        self.levels
            .get(&canonical_id(module_id))
            .copied()
            .unwrap_or(0)
    }

    pub fn set_level(&mut self, module_id: &str, level: i32) {
        self.levels.insert(canonical_id(module_id), level.max(0));
    }

    /// The raw persisted active flag.
    pub fn active_flag(&self, module_id: &str) -> bool {
        self.active
            .get(&canonical_id(module_id))
            .copied()
            .unwrap_or(false)
    }

    pub fn set_active(&mut self, module_id: &str, active: bool) {
        self.active.insert(canonical_id(module_id), active);
    }

    /// Whether a module is working: installed, switched on, and above level 0.
    pub fn is_active(&self, module_id: &str) -> bool {
        self.active_flag(module_id) && self.level(module_id) > 0
    }

    /// Level that counts for effects: zero unless the module is active.
    pub fn effective_level(&self, module_id: &str) -> i32 {
        if self.is_active(module_id) {
            self.level(module_id)
        } else {
            0
        }
    }

    pub fn meta(&self, module_id: &str) -> Value {
        self.meta
            .get(&canonical_id(module_id))
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()))
    }

    pub fn set_meta(&mut self, module_id: &str, meta: Value) {
        self.meta.insert(canonical_id(module_id), meta);
    }

    /// Full record for a module, with defaults for unknown ids.
    pub fn record(&self, module_id: &str) -> ModuleRecord {
        ModuleRecord {
            level: self.level(module_id),
            active: self.active_flag(module_id),
            meta: self.meta(module_id),
        }
    }

    /// Ids of all installed modules in sorted order.
    pub fn installed_ids(&self) -> Vec<String> {
        self.levels.keys().cloned().collect()
    }

    /// Ids of all active modules in sorted order.
    pub fn active_ids(&self) -> Vec<String> {
        self.levels
            .keys()
            .filter(|id| self.is_active(id))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn to_json(&self) -> CapabilityResult<String> {
        serde_json::to_string(self).map_err(CapabilityError::Encode)
    }

    pub fn from_json(json: &str) -> CapabilityResult<Self> {
        serde_json::from_str(json).map_err(CapabilityError::Decode)
    }
}
