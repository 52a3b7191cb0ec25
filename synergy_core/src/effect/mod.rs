//! Effects: what a matched synergy does to the event or the subject.
//!
//! Effects of one synergy run in declaration order. Each sees the changes
//! made by the effects before it, including those of lower-priority synergies
//! applied earlier in the same dispatch.

mod combat;
mod energy;
mod support;

pub use combat::*;
pub use energy::*;
pub use support::*;

use crate::context::EventContext;
use crate::error::SynergyResult;

/// A mutation of the event context or the subject.
pub trait Effect: Send + Sync {
    /// Cheap pre-check; an effect that returns `false` is skipped silently.
    fn can_apply(&self, _ctx: &EventContext<'_>) -> bool {
        true
    }

    fn apply(&self, ctx: &mut EventContext<'_>) -> SynergyResult<()>;

    /// Short human-readable summary, used in logs and tooltips.
    fn describe(&self) -> String;
}

/// Gate for effects that fire once every `interval` world ticks.
pub(crate) fn on_interval(ctx: &EventContext<'_>, interval: u64) -> bool {
    interval <= 1 || ctx.world_time() % interval == 0
}
