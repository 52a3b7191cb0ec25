//! Module lifecycle contract and the container that drives it.
//!
//! A module moves through
//!
//! ```text
//! Registered -> Initialized -> Loaded -> Attached
//!     ^              |            ^  |        |
//!     |              |            |  +--------+  detach
//!     +--------------+------------+-----------   unload (reverse order)
//! ```
//!
//! and only ticks while `Attached` and reporting itself active.

mod container;
mod context;
mod descriptor;

pub use container::*;
pub use context::*;
pub use descriptor::*;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ModuleResult;

/// Where a module is in its lifecycle within one container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModuleState {
    Registered,
    Initialized,
    Loaded,
    Attached,
}

impl std::fmt::Display for ModuleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ModuleState::Registered => "registered",
            ModuleState::Initialized => "initialized",
            ModuleState::Loaded => "loaded",
            ModuleState::Attached => "attached",
        };
        f.write_str(name)
    }
}

/// Lifecycle entry points, used to label log records and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecyclePhase {
    Init,
    Load,
    Unload,
    Attach,
    Detach,
    Tick,
    Message,
}

impl std::fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LifecyclePhase::Init => "init",
            LifecyclePhase::Load => "load",
            LifecyclePhase::Unload => "unload",
            LifecyclePhase::Attach => "attach",
            LifecyclePhase::Detach => "detach",
            LifecyclePhase::Tick => "tick",
            LifecyclePhase::Message => "message",
        };
        f.write_str(name)
    }
}

/// A message passed between modules through the container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleMessage {
    pub topic: String,
    #[serde(default)]
    pub payload: Value,
}

impl ModuleMessage {
    pub fn new(topic: impl Into<String>, payload: Value) -> Self {
        Self {
            topic: topic.into(),
            payload,
        }
    }

    /// A message with no payload.
    pub fn signal(topic: impl Into<String>) -> Self {
        Self::new(topic, Value::Null)
    }

    pub fn is(&self, topic: &str) -> bool {
        self.topic == topic
    }
}

/// A named capability unit attached to a host of type `H`.
///
/// Every hook has a no-op default so a module only implements what it uses.
/// Hooks that return `Ok(false)` decline the transition; the container keeps
/// the module in its previous state.
pub trait Module<H: ?Sized>: Send + Sync {
    fn descriptor(&self) -> &ModuleDescriptor;

    fn module_id(&self) -> &str {
        self.descriptor().id()
    }

    /// Whether the module currently wants ticks and messages.
    fn is_active(&self) -> bool {
        true
    }

    fn init(&mut self, _ctx: &ModuleContext) -> ModuleResult<bool> {
        Ok(true)
    }

    fn load(&mut self, _ctx: &ModuleContext) -> ModuleResult<bool> {
        Ok(true)
    }

    fn unload(&mut self, _ctx: &ModuleContext) -> ModuleResult<()> {
        Ok(())
    }

    fn attach(&mut self, _host: &mut H, _ctx: &ModuleContext) -> ModuleResult<bool> {
        Ok(true)
    }

    fn detach(&mut self, _host: &mut H, _ctx: &ModuleContext) -> ModuleResult<()> {
        Ok(())
    }

    fn on_tick(&mut self, _host: &mut H, _ctx: &ModuleContext) -> ModuleResult<()> {
        Ok(())
    }

    /// Answer a message from `sender_id`. `Ok(None)` means "not for me".
    fn handle_message(
        &mut self,
        _sender_id: &str,
        _message: &ModuleMessage,
        _ctx: &ModuleContext,
    ) -> ModuleResult<Option<ModuleMessage>> {
        Ok(None)
    }
}
