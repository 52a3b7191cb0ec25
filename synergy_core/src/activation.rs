//! Per-subject record of which synergies have been switched on.

use module_framework::{canonical_id, SubjectId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Activated synergy ids per subject, plus the low-energy warning latch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivationState {
    activated: HashMap<SubjectId, BTreeSet<String>>,
    #[serde(default)]
    warned_low_energy: HashSet<SubjectId>,
}

impl ActivationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the synergy was already active for the subject.
    pub fn activate(&mut self, subject: SubjectId, synergy_id: &str) -> bool {
        self.activated
            .entry(subject)
            .or_default()
            .insert(canonical_id(synergy_id))
    }

    /// Returns `false` if the synergy was not active for the subject.
    pub fn deactivate(&mut self, subject: SubjectId, synergy_id: &str) -> bool {
        let Some(set) = self.activated.get_mut(&subject) else {
            return false;
        };
        let removed = set.remove(&canonical_id(synergy_id));
        if set.is_empty() {
            self.activated.remove(&subject);
        }
        removed
    }

    /// Deactivate everything for a subject. Returns how many were active.
    pub fn deactivate_all(&mut self, subject: SubjectId) -> usize {
        self.activated
            .remove(&subject)
            .map(|set| set.len())
            .unwrap_or(0)
    }

    pub fn is_active(&self, subject: SubjectId, synergy_id: &str) -> bool {
        self.activated
            .get(&subject)
            .is_some_and(|set| set.contains(&canonical_id(synergy_id)))
    }

    /// Sorted ids of the subject's active synergies.
    pub fn active_for(&self, subject: SubjectId) -> Vec<String> {
        self.activated
            .get(&subject)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn active_count(&self, subject: SubjectId) -> usize {
        self.activated.get(&subject).map(|set| set.len()).unwrap_or(0)
    }

    /// Drop a synergy id from every subject, e.g. after unregistering it.
    pub fn forget_synergy(&mut self, synergy_id: &str) {
        let id = canonical_id(synergy_id);
        for set in self.activated.values_mut() {
            set.remove(&id);
        }
        self.activated.retain(|_, set| !set.is_empty());
    }

    /// Set the warning latch. Returns `true` only on the first call since the
    /// last [`clear_low_energy_warning`](Self::clear_low_energy_warning).
    pub fn mark_low_energy_warned(&mut self, subject: SubjectId) -> bool {
        self.warned_low_energy.insert(subject)
    }

    pub fn clear_low_energy_warning(&mut self, subject: SubjectId) {
        self.warned_low_energy.remove(&subject);
    }

    /// Remove all state for a subject that left the game.
    pub fn cleanup(&mut self, subject: SubjectId) {
        self.activated.remove(&subject);
        self.warned_low_energy.remove(&subject);
    }

    /// Number of subjects with at least one active synergy.
    pub fn subject_count(&self) -> usize {
        self.activated.len()
    }

    pub fn clear(&mut self) {
        self.activated.clear();
        self.warned_low_energy.clear();
    }
}
