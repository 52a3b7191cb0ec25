//! Engine tuning loaded from TOML.

use serde::{Deserialize, Serialize};

use crate::error::SynergyResult;

/// Tunables for the dispatcher and energy maintenance.
///
/// Every field has a default, so a config file only lists what it changes:
///
/// ```toml
/// tick_interval = 10
/// base_cost_per_synergy = 40
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynergyConfig {
    /// Master switch; when off the dispatcher raises no events.
    pub enabled: bool,

    /// Only consider synergies explicitly activated for the subject.
    pub require_activation: bool,

    /// World ticks between `Tick` events.
    pub tick_interval: u64,

    /// World ticks between maintenance charges.
    pub maintenance_interval: u64,

    pub base_cost_per_synergy: u32,
    pub scaling_cost_per_synergy: u32,

    /// Deactivate every synergy when maintenance cannot be paid.
    pub auto_deactivate_on_low_energy: bool,

    /// Energy percentage below which the subject is warned once.
    pub low_energy_warning_percent: f32,

    /// Health fraction below which `LowHealth` is raised on incoming damage.
    pub low_health_fraction: f32,
}

impl Default for SynergyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            require_activation: false,
            tick_interval: 20,
            maintenance_interval: 100,
            base_cost_per_synergy: 25,
            scaling_cost_per_synergy: 5,
            auto_deactivate_on_low_energy: true,
            low_energy_warning_percent: 10.0,
            low_health_fraction: 0.3,
        }
    }
}

impl SynergyConfig {
    pub fn from_toml_str(source: &str) -> SynergyResult<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Energy charged per maintenance interval for `active` activated synergies.
    ///
    /// Grows quadratically so stacking many synergies gets expensive.
    pub fn maintenance_cost(&self, active: usize) -> u32 {
        let n = u32::try_from(active).unwrap_or(u32::MAX);
        n.saturating_mul(
            self.base_cost_per_synergy
                .saturating_add(n.saturating_mul(self.scaling_cost_per_synergy)),
        )
    }
}
