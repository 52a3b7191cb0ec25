//! Runs the synergy engine as an ordinary module inside a subject's container.

use module_framework::{
    LogLevel, Module, ModuleContext, ModuleDescriptor, ModuleMessage, ModuleResult, Subject,
};
use serde_json::json;
use std::sync::Arc;

use crate::dispatcher::SynergyDispatcher;
use crate::manager::SynergyManager;

pub const ENGINE_MODULE_ID: &str = "SYNERGY_ENGINE";

/// Topic answered with the ids of every registered synergy.
pub const TOPIC_LIST: &str = "synergy.list";

/// Topic answered with the number of registered synergies.
pub const TOPIC_COUNT: &str = "synergy.count";

/// A module that forwards container ticks to a shared [`SynergyManager`].
///
/// It counts its own ticks, so the world time seen by synergies starts at
/// zero when the module is attached. Setting `synergy.enabled = false` in the
/// context config leaves the module registered but inactive.
pub struct SynergyEngineModule {
    descriptor: ModuleDescriptor,
    manager: Arc<SynergyManager>,
    enabled: bool,
    ticks: u64,
}

impl SynergyEngineModule {
    pub fn new(manager: Arc<SynergyManager>) -> Self {
        Self {
            descriptor: ModuleDescriptor::new(ENGINE_MODULE_ID)
                .with_name("Synergy Engine")
                .with_description("Applies synergy rules for module combinations")
                // Tick after every capability module has updated the subject.
                .with_priority(i32::MAX),
            manager,
            enabled: true,
            ticks: 0,
        }
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

impl Module<Subject> for SynergyEngineModule {
    fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    fn is_active(&self) -> bool {
        self.enabled
    }

    fn init(&mut self, ctx: &ModuleContext) -> ModuleResult<bool> {
        self.enabled = ctx.config_or("synergy.enabled", true);
        ctx.log(
            LogLevel::Info,
            &format!(
                "synergy engine initialized with {} synergies",
                self.manager.synergy_count()
            ),
        );
        Ok(true)
    }

    fn attach(&mut self, _host: &mut Subject, _ctx: &ModuleContext) -> ModuleResult<bool> {
        self.ticks = 0;
        Ok(true)
    }

    fn detach(&mut self, host: &mut Subject, _ctx: &ModuleContext) -> ModuleResult<()> {
        self.manager.cleanup_subject(host.id);
        Ok(())
    }

    fn on_tick(&mut self, host: &mut Subject, _ctx: &ModuleContext) -> ModuleResult<()> {
        SynergyDispatcher::new(&self.manager).on_tick(host, self.ticks);
        self.ticks += 1;
        Ok(())
    }

    fn handle_message(
        &mut self,
        _sender_id: &str,
        message: &ModuleMessage,
        _ctx: &ModuleContext,
    ) -> ModuleResult<Option<ModuleMessage>> {
        let reply = match message.topic.as_str() {
            TOPIC_LIST => {
                let ids: Vec<String> = self
                    .manager
                    .all_synergies()
                    .iter()
                    .map(|d| d.id().to_string())
                    .collect();
                Some(ModuleMessage::new(TOPIC_LIST, json!(ids)))
            }
            TOPIC_COUNT => Some(ModuleMessage::new(
                TOPIC_COUNT,
                json!(self.manager.synergy_count()),
            )),
            _ => None,
        };
        Ok(reply)
    }
}
