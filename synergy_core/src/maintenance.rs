//! Energy upkeep for activated synergies.

use module_framework::Subject;

use crate::manager::SynergyManager;

/// Result of one maintenance charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaintenanceOutcome {
    /// No synergies activated; nothing charged.
    Idle,
    Paid { active: usize, cost: u32 },
    /// The subject could not pay. Nothing was charged.
    Shortfall {
        active: usize,
        cost: u32,
        deactivated: usize,
    },
}

impl SynergyManager {
    /// Charge the subject for its activated synergies.
    ///
    /// The cost is all-or-nothing. When it cannot be paid and
    /// `auto_deactivate_on_low_energy` is set, every synergy is deactivated
    /// for the subject and it is told why.
    pub fn run_maintenance(&self, subject: &mut Subject) -> MaintenanceOutcome {
        let active = self.read_activations().active_count(subject.id);
        if active == 0 {
            return MaintenanceOutcome::Idle;
        }

        let cost = self.config().maintenance_cost(active);
        if subject.energy.try_consume(cost) {
            tracing::trace!(subject = %subject.name, active, cost, "synergy maintenance paid");
            return MaintenanceOutcome::Paid { active, cost };
        }

        let deactivated = if self.config().auto_deactivate_on_low_energy {
            self.deactivate_all_for(subject.id)
        } else {
            0
        };
        tracing::info!(
            subject = %subject.name,
            active,
            cost,
            available = subject.energy.current(),
            deactivated,
            "synergy maintenance unpaid"
        );
        if deactivated > 0 {
            subject.send_message(format!(
                "Not enough energy to sustain synergies ({} needed). {} synergies deactivated.",
                cost, deactivated
            ));
        } else {
            subject.send_message(format!(
                "Not enough energy to sustain synergies ({} needed).",
                cost
            ));
        }

        MaintenanceOutcome::Shortfall {
            active,
            cost,
            deactivated,
        }
    }

    /// Warn a subject with active synergies once when its energy falls below
    /// the configured percentage. The warning re-arms once energy recovers.
    /// Returns `true` if a warning was sent.
    pub fn check_low_energy(&self, subject: &mut Subject) -> bool {
        if subject.energy.max() == 0 {
            return false;
        }
        let percent = subject.energy.fraction() * 100.0;
        if percent >= self.config().low_energy_warning_percent {
            self.write_activations().clear_low_energy_warning(subject.id);
            return false;
        }

        let active = self.read_activations().active_count(subject.id);
        if active == 0 || !self.write_activations().mark_low_energy_warned(subject.id) {
            return false;
        }
        subject.send_message(format!(
            "Energy low ({:.0}%). {} active synergies may shut down.",
            percent, active
        ));
        true
    }
}
