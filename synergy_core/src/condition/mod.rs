//! Conditions: predicates a synergy must pass before its effects run.
//!
//! All conditions of a synergy are combined with AND and evaluated in
//! declaration order, stopping at the first one that fails.

mod gating;
mod subject;

pub use gating::*;
pub use subject::*;

use module_framework::canonical_id;

use crate::context::EventContext;
use crate::error::SynergyResult;
use crate::events::SynergyEventType;

/// A predicate over an event context.
///
/// Conditions only read the context. An `Err` is treated the same as
/// `Ok(false)` by the manager, and logged.
pub trait Condition: Send + Sync {
    fn test(&self, ctx: &EventContext<'_>) -> SynergyResult<bool>;

    /// Short human-readable summary, used in logs and tooltips.
    fn describe(&self) -> String;
}

/// Whether the subject has a set of modules installed, with optional
/// active and minimum-level requirements.
#[derive(Debug, Clone)]
pub struct ModuleCombinationCondition {
    modules: Vec<String>,
    require_all: bool,
    require_active: bool,
    min_level: i32,
}

impl ModuleCombinationCondition {
    /// Every listed module must be installed and active.
    pub fn all_of<I, S>(modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            modules: modules.into_iter().map(|m| canonical_id(m.as_ref())).collect(),
            require_all: true,
            require_active: true,
            min_level: 1,
        }
    }

    /// At least one listed module must be installed and active.
    pub fn any_of<I, S>(modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            require_all: false,
            ..Self::all_of(modules)
        }
    }

    pub fn with_min_level(mut self, level: i32) -> Self {
        self.min_level = level;
        self
    }

    /// Count installed modules even when switched off.
    pub fn installed_only(mut self) -> Self {
        self.require_active = false;
        self
    }

    fn module_ok(&self, ctx: &EventContext<'_>, module_id: &str) -> bool {
        let modules = &ctx.subject().modules;
        if !modules.is_installed(module_id) {
            return false;
        }
        if self.require_active && !modules.is_active(module_id) {
            return false;
        }
        modules.level(module_id) >= self.min_level
    }
}

impl Condition for ModuleCombinationCondition {
    fn test(&self, ctx: &EventContext<'_>) -> SynergyResult<bool> {
        if self.modules.is_empty() {
            return Ok(false);
        }
        let mut results = self.modules.iter().map(|id| self.module_ok(ctx, id));
        Ok(if self.require_all {
            results.all(|ok| ok)
        } else {
            results.any(|ok| ok)
        })
    }

    fn describe(&self) -> String {
        let joiner = if self.require_all { " + " } else { " | " };
        format!("modules {} (level >= {})", self.modules.join(joiner), self.min_level)
    }
}

/// Whether the event being dispatched is one of a set of types.
#[derive(Debug, Clone)]
pub struct EventTypeCondition {
    events: Vec<SynergyEventType>,
}

impl EventTypeCondition {
    pub fn new(events: impl IntoIterator<Item = SynergyEventType>) -> Self {
        Self {
            events: events.into_iter().collect(),
        }
    }

    pub fn only(event: SynergyEventType) -> Self {
        Self::new([event])
    }
}

impl Condition for EventTypeCondition {
    fn test(&self, ctx: &EventContext<'_>) -> SynergyResult<bool> {
        let event = ctx.event_type();
        Ok(self.events.iter().any(|e| e.matches(event)))
    }

    fn describe(&self) -> String {
        let names: Vec<String> = self.events.iter().map(|e| e.to_string()).collect();
        format!("event is {}", names.join(" or "))
    }
}
