//! The module container: registry, lifecycle driver and message broker.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, TryLockError,
};

use super::{LifecyclePhase, Module, ModuleContext, ModuleMessage, ModuleState};
use crate::capability::canonical_id;
use crate::error::{ModuleError, ModuleResult};

/// Outcome of one lifecycle pass over the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseReport {
    pub phase: LifecyclePhase,
    /// Modules that completed the hook, in call order.
    pub advanced: Vec<String>,
    /// Modules whose hook declined, failed, panicked or found the module busy, in call order.
    pub failed: Vec<String>,
}

impl PhaseReport {
    fn new(phase: LifecyclePhase) -> Self {
        Self {
            phase,
            advanced: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

type SharedModule<H> = Arc<Mutex<Box<dyn Module<H>>>>;

struct ModuleEntry<H: ?Sized> {
    module: SharedModule<H>,
    state: ModuleState,
    /// Registration sequence number; tie-breaker for equal priorities.
    seq: u64,
    priority: i32,
    optional: bool,
    dependencies: Vec<String>,
}

struct Registry<H: ?Sized> {
    entries: HashMap<String, ModuleEntry<H>>,
    next_seq: u64,
    /// Modules in the order `initialize_all` moved them to `Initialized`.
    init_order: Vec<String>,
    /// Modules in the order `load_all` moved them to `Loaded`.
    load_order: Vec<String>,
    /// Modules in the order `attach_all` moved them to `Attached`.
    attach_order: Vec<String>,
}

impl<H: ?Sized> Registry<H> {
    /// Registered ids sorted ascending by priority, then registration order.
    fn ordered_ids(&self) -> Vec<String> {
        let mut keyed: Vec<_> = self
            .entries
            .iter()
            .map(|(id, entry)| (entry.priority, entry.seq, id.clone()))
            .collect();
        keyed.sort();
        keyed.into_iter().map(|(_, _, id)| id).collect()
    }

    /// Handles of the modules in `ids` that are currently in `state`, keeping order.
    fn in_state(&self, ids: &[String], state: ModuleState) -> Vec<(String, SharedModule<H>)> {
        ids.iter()
            .filter_map(|id| {
                let entry = self.entries.get(id)?;
                (entry.state == state).then(|| (id.clone(), Arc::clone(&entry.module)))
            })
            .collect()
    }

    fn missing_dependencies(&self, entry: &ModuleEntry<H>) -> Vec<String> {
        entry
            .dependencies
            .iter()
            .filter(|dep| !self.entries.contains_key(dep.as_str()))
            .cloned()
            .collect()
    }
}

/// Owns a set of modules for one host and drives them through their lifecycle.
///
/// Every call into module code is wrapped individually: an `Err`, a declined
/// transition or a panic is logged with the module id and only affects that
/// module.
///
/// The registry lock is never held while module code runs. Each module sits
/// behind its own mutex instead, so a hook may call back into the container
/// (typically `send_message`, with the container handed out as a
/// [`ModuleContext`] service). A module that is already inside a hook is
/// busy: messages to it get no response and lifecycle passes report it as
/// failed.
pub struct ModuleContainer<H: ?Sized> {
    registry: RwLock<Registry<H>>,
}

impl<H: ?Sized> Default for ModuleContainer<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: ?Sized> std::fmt::Debug for ModuleContainer<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registry = self.read();
        let states: HashMap<&str, ModuleState> = registry
            .entries
            .iter()
            .map(|(id, entry)| (id.as_str(), entry.state))
            .collect();
        f.debug_struct("ModuleContainer")
            .field("modules", &states)
            .finish()
    }
}

impl<H: ?Sized> ModuleContainer<H> {
    /// Create an empty container.
    pub fn new() -> Self {
        Self {
            registry: RwLock::new(Registry {
                entries: HashMap::new(),
                next_seq: 0,
                init_order: Vec::new(),
                load_order: Vec::new(),
                attach_order: Vec::new(),
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Registry<H>> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Registry<H>> {
        self.registry.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn handle(&self, module_id: &str) -> Option<SharedModule<H>> {
        self.read()
            .entries
            .get(&canonical_id(module_id))
            .map(|entry| Arc::clone(&entry.module))
    }

    // ---------------------------------------------------------------------
    // Registry
    // ---------------------------------------------------------------------

    /// Register a module. Returns `false` and keeps the existing entry if the
    /// id is already taken.
    pub fn register_module(&self, module: Box<dyn Module<H>>) -> bool {
        match self.try_register_module(module) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "module registration rejected");
                false
            }
        }
    }

    /// Register a module, reporting a duplicate id as an error.
    pub fn try_register_module(&self, module: Box<dyn Module<H>>) -> ModuleResult<()> {
        let descriptor = module.descriptor();
        let id = canonical_id(descriptor.id());
        let priority = descriptor.priority();
        let optional = descriptor.is_optional();
        let dependencies: Vec<String> =
            descriptor.dependencies().iter().map(|dep| canonical_id(dep)).collect();

        let mut registry = self.write();
        if registry.entries.contains_key(&id) {
            return Err(ModuleError::DuplicateModule(id));
        }
        let seq = registry.next_seq;
        registry.next_seq += 1;
        registry.entries.insert(
            id.clone(),
            ModuleEntry {
                module: Arc::new(Mutex::new(module)),
                state: ModuleState::Registered,
                seq,
                priority,
                optional,
                dependencies,
            },
        );
        tracing::info!(module_id = %id, "module registered");
        Ok(())
    }

    /// Remove a module and its state. Returns `false` if it was not registered.
    ///
    /// A hook already running in the removed module finishes, but its outcome
    /// is not recorded.
    pub fn unregister_module(&self, module_id: &str) -> bool {
        let id = canonical_id(module_id);
        let mut registry = self.write();
        if registry.entries.remove(&id).is_none() {
            return false;
        }
        registry.init_order.retain(|other| other != &id);
        registry.load_order.retain(|other| other != &id);
        registry.attach_order.retain(|other| other != &id);
        tracing::info!(module_id = %id, "module unregistered");
        true
    }

    pub fn has_module(&self, module_id: &str) -> bool {
        self.read().entries.contains_key(&canonical_id(module_id))
    }

    pub fn module_state(&self, module_id: &str) -> Option<ModuleState> {
        self.read()
            .entries
            .get(&canonical_id(module_id))
            .map(|entry| entry.state)
    }

    /// All module ids in lifecycle order (ascending priority, then registration).
    pub fn module_ids(&self) -> Vec<String> {
        self.read().ordered_ids()
    }

    /// Ids of modules that currently report themselves active. Busy modules
    /// are left out.
    pub fn active_module_ids(&self) -> Vec<String> {
        let handles: Vec<(String, SharedModule<H>)> = {
            let registry = self.read();
            registry
                .ordered_ids()
                .into_iter()
                .filter_map(|id| {
                    let module = Arc::clone(&registry.entries.get(&id)?.module);
                    Some((id, module))
                })
                .collect()
        };
        handles
            .into_iter()
            .filter(|(_, module)| acquire(module).is_some_and(|guard| guard.is_active()))
            .map(|(id, _)| id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().entries.is_empty()
    }

    /// Run a read-only closure against one module. `None` if the module is
    /// unknown or busy.
    pub fn with_module<R>(&self, module_id: &str, f: impl FnOnce(&dyn Module<H>) -> R) -> Option<R> {
        let module = self.handle(module_id)?;
        let guard = acquire(&module)?;
        Some(f(&**guard))
    }

    /// Declared dependencies of `module_id` that are not registered.
    pub fn unresolved_dependencies(&self, module_id: &str) -> ModuleResult<Vec<String>> {
        let id = canonical_id(module_id);
        let registry = self.read();
        let entry = registry
            .entries
            .get(&id)
            .ok_or(ModuleError::UnknownModule(id.clone()))?;
        Ok(registry.missing_dependencies(entry))
    }

    // ---------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------

    /// Move `Registered` modules to `Initialized`, ascending by priority.
    pub fn initialize_all(&self, ctx: &ModuleContext) -> PhaseReport {
        let mut report = PhaseReport::new(LifecyclePhase::Init);
        let pending = {
            let registry = self.read();
            registry.in_state(&registry.ordered_ids(), ModuleState::Registered)
        };

        for (id, module) in pending {
            let missing = {
                let registry = self.read();
                match registry.entries.get(&id) {
                    Some(entry) => registry.missing_dependencies(entry),
                    None => continue,
                }
            };
            if !missing.is_empty() {
                let e = ModuleError::UnresolvedDependencies {
                    module_id: id.clone(),
                    missing,
                };
                tracing::warn!(module_id = %id, error = %e, "skipping module initialization");
                report.failed.push(id);
                continue;
            }
            self.step(
                &id,
                &module,
                ModuleState::Registered,
                ModuleState::Initialized,
                &mut report,
                |m| m.init(ctx),
            );
        }

        report
    }

    /// Move `Initialized` modules to `Loaded`, ascending by priority.
    pub fn load_all(&self, ctx: &ModuleContext) -> PhaseReport {
        let mut report = PhaseReport::new(LifecyclePhase::Load);
        let pending = {
            let registry = self.read();
            registry.in_state(&registry.ordered_ids(), ModuleState::Initialized)
        };

        for (id, module) in pending {
            self.step(
                &id,
                &module,
                ModuleState::Initialized,
                ModuleState::Loaded,
                &mut report,
                |m| m.load(ctx),
            );
        }

        report
    }

    /// Shut down every `Loaded` and `Initialized` module, returning it to
    /// `Registered`.
    ///
    /// Loaded modules go first, in reverse load order, then modules that were
    /// initialized but never loaded, in reverse initialization order. Attached
    /// modules must be detached first and are reported as failed.
    pub fn unload_all(&self, ctx: &ModuleContext) -> PhaseReport {
        let mut report = PhaseReport::new(LifecyclePhase::Unload);
        let (loaded, initialized, attached) = {
            let registry = self.read();
            (
                registry.in_state(&reversed(&registry.load_order), ModuleState::Loaded),
                registry.in_state(&reversed(&registry.init_order), ModuleState::Initialized),
                registry.in_state(&reversed(&registry.attach_order), ModuleState::Attached),
            )
        };

        for (id, _) in attached {
            tracing::warn!(module_id = %id, "module is still attached, not unloading");
            report.failed.push(id);
        }
        for (pending, from) in [
            (loaded, ModuleState::Loaded),
            (initialized, ModuleState::Initialized),
        ] {
            for (id, module) in pending {
                self.step(&id, &module, from, ModuleState::Registered, &mut report, |m| {
                    m.unload(ctx).map(|()| true)
                });
            }
        }

        report
    }

    /// Move `Loaded` modules to `Attached` on `host`, ascending by priority.
    pub fn attach_all(&self, host: &mut H, ctx: &ModuleContext) -> PhaseReport {
        let mut report = PhaseReport::new(LifecyclePhase::Attach);
        let pending = {
            let registry = self.read();
            registry.in_state(&registry.ordered_ids(), ModuleState::Loaded)
        };

        for (id, module) in pending {
            self.step(
                &id,
                &module,
                ModuleState::Loaded,
                ModuleState::Attached,
                &mut report,
                |m| m.attach(&mut *host, ctx),
            );
        }

        report
    }

    /// Move `Attached` modules back to `Loaded`, in exact reverse attach order.
    pub fn detach_all(&self, host: &mut H, ctx: &ModuleContext) -> PhaseReport {
        let mut report = PhaseReport::new(LifecyclePhase::Detach);
        let pending = {
            let registry = self.read();
            registry.in_state(&reversed(&registry.attach_order), ModuleState::Attached)
        };

        for (id, module) in pending {
            self.step(
                &id,
                &module,
                ModuleState::Attached,
                ModuleState::Loaded,
                &mut report,
                |m| m.detach(&mut *host, ctx).map(|()| true),
            );
        }

        report
    }

    /// Tick every attached, active module once.
    pub fn tick_all(&self, host: &mut H, ctx: &ModuleContext) -> PhaseReport {
        let mut report = PhaseReport::new(LifecyclePhase::Tick);
        let attached = {
            let registry = self.read();
            registry.in_state(&registry.ordered_ids(), ModuleState::Attached)
        };

        for (id, module) in attached {
            let Some(mut guard) = acquire(&module) else {
                tracing::warn!(module_id = %id, "module is busy, skipping tick");
                report.failed.push(id);
                continue;
            };
            if self.module_state(&id) != Some(ModuleState::Attached) || !guard.is_active() {
                continue;
            }
            match guarded(&id, LifecyclePhase::Tick, || guard.on_tick(&mut *host, ctx)) {
                Some(()) => report.advanced.push(id),
                None => report.failed.push(id),
            }
        }

        report
    }

    /// Run one lifecycle hook on one module and record the transition.
    ///
    /// The module's own mutex is held for the call; the registry lock is not.
    fn step(
        &self,
        id: &str,
        module: &SharedModule<H>,
        from: ModuleState,
        to: ModuleState,
        report: &mut PhaseReport,
        call: impl FnOnce(&mut Box<dyn Module<H>>) -> ModuleResult<bool>,
    ) {
        let Some(mut guard) = acquire(module) else {
            tracing::warn!(module_id = id, phase = %report.phase, "module is busy in another hook");
            report.failed.push(id.to_string());
            return;
        };
        // Another pass may have moved the module while we waited.
        if self.module_state(id) != Some(from) {
            return;
        }
        tracing::debug!(module_id = id, phase = %report.phase, "running lifecycle hook");
        let outcome = guarded(id, report.phase, || call(&mut *guard));
        drop(guard);
        self.settle(id, module, outcome, to, report);
    }

    /// Record the result of one hook call and advance the module on success.
    fn settle(
        &self,
        id: &str,
        module: &SharedModule<H>,
        outcome: Option<bool>,
        next: ModuleState,
        report: &mut PhaseReport,
    ) {
        let mut registry = self.write();
        let Some(entry) = registry
            .entries
            .get_mut(id)
            .filter(|entry| Arc::ptr_eq(&entry.module, module))
        else {
            tracing::debug!(module_id = id, "module unregistered during its hook");
            return;
        };

        match outcome {
            Some(true) => {
                entry.state = next;
                tracing::debug!(module_id = id, state = %next, "module advanced");
                report.advanced.push(id.to_string());
                let id = id.to_string();
                match report.phase {
                    LifecyclePhase::Init => registry.init_order.push(id),
                    LifecyclePhase::Load => registry.load_order.push(id),
                    LifecyclePhase::Attach => registry.attach_order.push(id),
                    LifecyclePhase::Detach => registry.attach_order.retain(|other| other != &id),
                    LifecyclePhase::Unload => {
                        registry.load_order.retain(|other| other != &id);
                        registry.init_order.retain(|other| other != &id);
                    }
                    LifecyclePhase::Tick | LifecyclePhase::Message => {}
                }
            }
            Some(false) => {
                if entry.optional {
                    tracing::info!(module_id = id, phase = %report.phase, "optional module declined transition");
                } else {
                    tracing::warn!(module_id = id, phase = %report.phase, "module declined transition");
                }
                report.failed.push(id.to_string());
            }
            None => report.failed.push(id.to_string()),
        }
    }

    // ---------------------------------------------------------------------
    // Messaging
    // ---------------------------------------------------------------------

    /// Deliver `message` from `sender_id`.
    ///
    /// With a target, the message goes to that module if it exists and is
    /// active. Without one, it is offered to every active module except the
    /// sender in lifecycle order, and the first response wins. Failing or
    /// busy handlers count as no response, so a module may message the
    /// container from inside its own hooks.
    pub fn send_message(
        &self,
        sender_id: &str,
        target_id: Option<&str>,
        message: &ModuleMessage,
        ctx: &ModuleContext,
    ) -> Option<ModuleMessage> {
        let sender = canonical_id(sender_id);

        match target_id {
            Some(target) => {
                let target = canonical_id(target);
                let module = self.handle(&target)?;
                deliver(&target, &module, sender_id, message, ctx)
            }
            None => {
                let recipients: Vec<(String, SharedModule<H>)> = {
                    let registry = self.read();
                    registry
                        .ordered_ids()
                        .into_iter()
                        .filter(|id| *id != sender)
                        .filter_map(|id| {
                            let module = Arc::clone(&registry.entries.get(&id)?.module);
                            Some((id, module))
                        })
                        .collect()
                };
                recipients
                    .iter()
                    .find_map(|(id, module)| deliver(id, module, sender_id, message, ctx))
            }
        }
    }
}

fn reversed(order: &[String]) -> Vec<String> {
    order.iter().rev().cloned().collect()
}

/// Hand one message to one module, if it is free and active.
fn deliver<H: ?Sized>(
    id: &str,
    module: &SharedModule<H>,
    sender_id: &str,
    message: &ModuleMessage,
    ctx: &ModuleContext,
) -> Option<ModuleMessage> {
    let Some(mut guard) = acquire(module) else {
        tracing::debug!(module_id = id, topic = %message.topic, "module busy, message not delivered");
        return None;
    };
    if !guard.is_active() {
        return None;
    }
    guarded(id, LifecyclePhase::Message, || {
        guard.handle_message(sender_id, message, ctx)
    })
    .flatten()
}

/// Lock one module for a call. `None` while it is already inside a hook.
fn acquire<H: ?Sized>(module: &SharedModule<H>) -> Option<MutexGuard<'_, Box<dyn Module<H>>>> {
    match module.try_lock() {
        Ok(guard) => Some(guard),
        Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
        Err(TryLockError::WouldBlock) => None,
    }
}

/// Call into module code, turning errors and panics into `None`.
fn guarded<T>(
    module_id: &str,
    phase: LifecyclePhase,
    call: impl FnOnce() -> ModuleResult<T>,
) -> Option<T> {
    match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            tracing::warn!(module_id, %phase, error = %e, "module hook failed");
            None
        }
        Err(payload) => {
            tracing::error!(
                module_id,
                %phase,
                panic = %panic_message(payload.as_ref()),
                "module hook panicked"
            );
            None
        }
    }
}

/// Best-effort text of a caught panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::ModuleDescriptor;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    type Log = Arc<Mutex<Vec<String>>>;

    #[derive(Default)]
    struct TestHost {
        ticks: Vec<String>,
    }

    #[derive(Default, Clone, Copy)]
    enum Fault {
        #[default]
        None,
        Decline,
        Error,
        Panic,
    }

    struct Stub {
        descriptor: ModuleDescriptor,
        log: Log,
        active: bool,
        init_fault: Fault,
        load_fault: Fault,
        tick_fault: Fault,
        reply: Option<ModuleMessage>,
    }

    impl Stub {
        fn new(id: &str, priority: i32, log: &Log) -> Self {
            Self {
                descriptor: ModuleDescriptor::new(id).with_priority(priority),
                log: Arc::clone(log),
                active: true,
                init_fault: Fault::None,
                load_fault: Fault::None,
                tick_fault: Fault::None,
                reply: None,
            }
        }

        fn record(&self, what: &str) {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}:{}", what, self.descriptor.id()));
        }

        fn fault(&self, fault: Fault, phase: LifecyclePhase) -> ModuleResult<bool> {
            match fault {
                Fault::None => Ok(true),
                Fault::Decline => Ok(false),
                Fault::Error => Err(ModuleError::lifecycle(self.descriptor.id(), phase, "boom")),
                Fault::Panic => panic!("stub {} panicked", self.descriptor.id()),
            }
        }
    }

    impl Module<TestHost> for Stub {
        fn descriptor(&self) -> &ModuleDescriptor {
            &self.descriptor
        }

        fn is_active(&self) -> bool {
            self.active
        }

        fn init(&mut self, _ctx: &ModuleContext) -> ModuleResult<bool> {
            self.record("init");
            self.fault(self.init_fault, LifecyclePhase::Init)
        }

        fn load(&mut self, _ctx: &ModuleContext) -> ModuleResult<bool> {
            self.record("load");
            self.fault(self.load_fault, LifecyclePhase::Load)
        }

        fn unload(&mut self, _ctx: &ModuleContext) -> ModuleResult<()> {
            self.record("unload");
            Ok(())
        }

        fn attach(&mut self, _host: &mut TestHost, _ctx: &ModuleContext) -> ModuleResult<bool> {
            self.record("attach");
            Ok(true)
        }

        fn detach(&mut self, _host: &mut TestHost, _ctx: &ModuleContext) -> ModuleResult<()> {
            self.record("detach");
            Ok(())
        }

        fn on_tick(&mut self, host: &mut TestHost, _ctx: &ModuleContext) -> ModuleResult<()> {
            self.record("tick");
            self.fault(self.tick_fault, LifecyclePhase::Tick)?;
            host.ticks.push(self.descriptor.id().to_string());
            Ok(())
        }

        fn handle_message(
            &mut self,
            sender_id: &str,
            message: &ModuleMessage,
            _ctx: &ModuleContext,
        ) -> ModuleResult<Option<ModuleMessage>> {
            self.record(&format!("msg[{}]", sender_id));
            if message.is("explode") {
                return Err(ModuleError::Message {
                    module_id: self.descriptor.id().to_string(),
                    topic: message.topic.clone(),
                    message: "refused".to_string(),
                });
            }
            Ok(self.reply.clone())
        }
    }

    fn entries(log: &Log, prefix: &str) -> Vec<String> {
        log.lock()
            .unwrap()
            .iter()
            .filter(|line| line.starts_with(prefix))
            .cloned()
            .collect()
    }

    fn ready_container(log: &Log, stubs: Vec<Stub>) -> (ModuleContainer<TestHost>, TestHost) {
        let container = ModuleContainer::new();
        for stub in stubs {
            assert!(container.register_module(Box::new(stub)));
        }
        let ctx = ModuleContext::default();
        let mut host = TestHost::default();
        container.initialize_all(&ctx);
        container.load_all(&ctx);
        container.attach_all(&mut host, &ctx);
        log.lock().unwrap().clear();
        (container, host)
    }

    #[test]
    fn test_duplicate_registration_keeps_first() {
        let log = Log::default();
        let container = ModuleContainer::<TestHost>::new();

        let mut first = Stub::new("A", 1, &log);
        first.reply = Some(ModuleMessage::signal("first"));
        assert!(container.register_module(Box::new(first)));
        assert!(!container.register_module(Box::new(Stub::new("A", 2, &log))));

        assert_eq!(container.len(), 1);
        assert_eq!(container.with_module("A", |m| m.descriptor().priority()), Some(1));
        assert!(matches!(
            container.try_register_module(Box::new(Stub::new("A", 3, &log))),
            Err(ModuleError::DuplicateModule(id)) if id == "A"
        ));
    }

    #[test]
    fn test_unregister() {
        let log = Log::default();
        let container = ModuleContainer::<TestHost>::new();
        container.register_module(Box::new(Stub::new("A", 1, &log)));

        assert!(container.unregister_module("A"));
        assert!(!container.has_module("A"));
        assert!(container.module_state("A").is_none());
        assert!(!container.unregister_module("A"));
    }

    #[test]
    fn test_initialize_in_ascending_priority() {
        let log = Log::default();
        let container = ModuleContainer::<TestHost>::new();
        container.register_module(Box::new(Stub::new("C", 30, &log)));
        container.register_module(Box::new(Stub::new("A", 10, &log)));
        container.register_module(Box::new(Stub::new("B", 20, &log)));

        let report = container.initialize_all(&ModuleContext::default());

        assert_eq!(entries(&log, "init"), vec!["init:A", "init:B", "init:C"]);
        assert_eq!(report.advanced, vec!["A", "B", "C"]);
        assert_eq!(container.module_state("B"), Some(ModuleState::Initialized));
    }

    #[test]
    fn test_equal_priorities_keep_registration_order() {
        let log = Log::default();
        let container = ModuleContainer::<TestHost>::new();
        for id in ["Z", "M", "A"] {
            container.register_module(Box::new(Stub::new(id, 5, &log)));
        }
        assert_eq!(container.module_ids(), vec!["Z", "M", "A"]);
    }

    #[test]
    fn test_init_failure_is_isolated() {
        let log = Log::default();
        let container = ModuleContainer::<TestHost>::new();

        let mut declines = Stub::new("DECLINE", 1, &log);
        declines.init_fault = Fault::Decline;
        let mut errors = Stub::new("ERROR", 2, &log);
        errors.init_fault = Fault::Error;
        let mut panics = Stub::new("PANIC", 3, &log);
        panics.init_fault = Fault::Panic;

        container.register_module(Box::new(declines));
        container.register_module(Box::new(errors));
        container.register_module(Box::new(panics));
        container.register_module(Box::new(Stub::new("OK", 4, &log)));

        let report = container.initialize_all(&ModuleContext::default());

        assert_eq!(report.failed, vec!["DECLINE", "ERROR", "PANIC"]);
        assert_eq!(report.advanced, vec!["OK"]);
        for id in ["DECLINE", "ERROR", "PANIC"] {
            assert_eq!(container.module_state(id), Some(ModuleState::Registered));
        }
        assert_eq!(container.module_state("OK"), Some(ModuleState::Initialized));
    }

    #[test]
    fn test_missing_dependency_blocks_initialization() {
        let log = Log::default();
        let container = ModuleContainer::<TestHost>::new();
        let mut dependent = Stub::new("JETPACK", 1, &log);
        dependent.descriptor = dependent.descriptor.clone().with_dependency("ENERGY_CORE");
        container.register_module(Box::new(dependent));

        assert_eq!(
            container.unresolved_dependencies("JETPACK").unwrap(),
            vec!["ENERGY_CORE"]
        );
        let report = container.initialize_all(&ModuleContext::default());
        assert_eq!(report.failed, vec!["JETPACK"]);
        assert_eq!(container.module_state("JETPACK"), Some(ModuleState::Registered));

        container.register_module(Box::new(Stub::new("ENERGY_CORE", 0, &log)));
        assert!(container.unresolved_dependencies("JETPACK").unwrap().is_empty());
        container.initialize_all(&ModuleContext::default());
        assert_eq!(container.module_state("JETPACK"), Some(ModuleState::Initialized));

        assert!(matches!(
            container.unresolved_dependencies("NOPE"),
            Err(ModuleError::UnknownModule(_))
        ));
    }

    #[test]
    fn test_load_requires_initialized() {
        let log = Log::default();
        let container = ModuleContainer::<TestHost>::new();
        container.register_module(Box::new(Stub::new("A", 1, &log)));

        let report = container.load_all(&ModuleContext::default());
        assert!(report.advanced.is_empty());
        assert_eq!(container.module_state("A"), Some(ModuleState::Registered));
    }

    #[test]
    fn test_detach_reverses_attach_order() {
        let log = Log::default();
        let container = ModuleContainer::<TestHost>::new();
        container.register_module(Box::new(Stub::new("LATE", 50, &log)));
        container.register_module(Box::new(Stub::new("EARLY", -5, &log)));
        container.register_module(Box::new(Stub::new("MID", 7, &log)));

        let ctx = ModuleContext::default();
        let mut host = TestHost::default();
        container.initialize_all(&ctx);
        container.load_all(&ctx);
        let attached = container.attach_all(&mut host, &ctx);
        let detached = container.detach_all(&mut host, &ctx);

        let mut reversed = attached.advanced.clone();
        reversed.reverse();
        assert_eq!(attached.advanced, vec!["EARLY", "MID", "LATE"]);
        assert_eq!(detached.advanced, reversed);
        assert_eq!(container.module_state("MID"), Some(ModuleState::Loaded));
    }

    #[test]
    fn test_unload_reverses_load_order() {
        let log = Log::default();
        let container = ModuleContainer::<TestHost>::new();
        container.register_module(Box::new(Stub::new("A", 1, &log)));
        container.register_module(Box::new(Stub::new("B", 2, &log)));

        let ctx = ModuleContext::default();
        container.initialize_all(&ctx);
        container.load_all(&ctx);
        let report = container.unload_all(&ctx);

        assert_eq!(report.advanced, vec!["B", "A"]);
        assert_eq!(container.module_state("A"), Some(ModuleState::Registered));

        // Unloaded modules can be brought up again.
        container.initialize_all(&ctx);
        container.load_all(&ctx);
        assert_eq!(container.module_state("A"), Some(ModuleState::Loaded));
    }

    #[test]
    fn test_unload_reaches_initialized_modules_last() {
        let log = Log::default();
        let container = ModuleContainer::<TestHost>::new();
        let mut stalled = Stub::new("STALLED", 1, &log);
        stalled.load_fault = Fault::Decline;
        container.register_module(Box::new(stalled));
        container.register_module(Box::new(Stub::new("A", 2, &log)));
        container.register_module(Box::new(Stub::new("B", 3, &log)));

        let ctx = ModuleContext::default();
        container.initialize_all(&ctx);
        container.load_all(&ctx);
        assert_eq!(container.module_state("STALLED"), Some(ModuleState::Initialized));

        let report = container.unload_all(&ctx);

        assert_eq!(report.advanced, vec!["B", "A", "STALLED"]);
        assert_eq!(
            entries(&log, "unload"),
            vec!["unload:B", "unload:A", "unload:STALLED"]
        );
        for id in ["A", "B", "STALLED"] {
            assert_eq!(container.module_state(id), Some(ModuleState::Registered));
        }
        assert!(container.unload_all(&ctx).advanced.is_empty());
    }

    #[test]
    fn test_ids_are_case_insensitive() {
        let log = Log::default();
        let container = ModuleContainer::<TestHost>::new();
        let mut dependent = Stub::new("boots", 2, &log);
        dependent.descriptor = dependent.descriptor.clone().with_dependency("Energy_Core");
        assert!(container.register_module(Box::new(Stub::new("shield", 1, &log))));
        assert!(!container.register_module(Box::new(Stub::new("SHIELD", 1, &log))));
        container.register_module(Box::new(dependent));
        container.register_module(Box::new(Stub::new("energy_core", 0, &log)));

        assert_eq!(container.len(), 3);
        assert!(container.has_module("Shield"));
        assert!(container.unresolved_dependencies("BOOTS").unwrap().is_empty());
        container.initialize_all(&ModuleContext::default());
        assert_eq!(container.module_state("boots"), Some(ModuleState::Initialized));
        assert!(container.unregister_module("shield"));
        assert!(!container.has_module("SHIELD"));
    }

    #[test]
    fn test_unload_skips_attached_modules() {
        let log = Log::default();
        let (container, _host) = ready_container(&log, vec![Stub::new("A", 1, &log)]);

        let report = container.unload_all(&ModuleContext::default());
        assert_eq!(report.failed, vec!["A"]);
        assert_eq!(container.module_state("A"), Some(ModuleState::Attached));
    }

    #[test]
    fn test_tick_failure_does_not_stop_siblings() {
        let log = Log::default();
        let mut broken = Stub::new("B", 2, &log);
        broken.tick_fault = Fault::Panic;
        let mut erroring = Stub::new("C", 3, &log);
        erroring.tick_fault = Fault::Error;
        let (container, mut host) = ready_container(
            &log,
            vec![Stub::new("A", 1, &log), broken, erroring, Stub::new("D", 4, &log)],
        );

        let report = container.tick_all(&mut host, &ModuleContext::default());

        assert_eq!(host.ticks, vec!["A", "D"]);
        assert_eq!(report.advanced, vec!["A", "D"]);
        assert_eq!(report.failed, vec!["B", "C"]);

        // The next pass still reaches everyone.
        let again = container.tick_all(&mut host, &ModuleContext::default());
        assert_eq!(again.advanced.len() + again.failed.len(), 4);
    }

    #[test]
    fn test_only_attached_active_modules_tick() {
        let log = Log::default();
        let mut idle = Stub::new("IDLE", 2, &log);
        idle.active = false;
        let (container, mut host) = ready_container(&log, vec![Stub::new("A", 1, &log), idle]);
        container.register_module(Box::new(Stub::new("NEW", 0, &log)));

        container.tick_all(&mut host, &ModuleContext::default());

        assert_eq!(host.ticks, vec!["A"]);
        assert_eq!(container.active_module_ids(), vec!["NEW", "A"]);
    }

    #[test]
    fn test_unicast_message() {
        let log = Log::default();
        let mut responder = Stub::new("B", 2, &log);
        responder.reply = Some(ModuleMessage::new("pong", json!({ "ok": true })));
        let mut idle = Stub::new("IDLE", 3, &log);
        idle.active = false;
        idle.reply = Some(ModuleMessage::signal("never"));
        let (container, _host) =
            ready_container(&log, vec![Stub::new("A", 1, &log), responder, idle]);
        let ctx = ModuleContext::default();

        let reply = container.send_message("A", Some("B"), &ModuleMessage::signal("ping"), &ctx);
        assert_eq!(reply, Some(ModuleMessage::new("pong", json!({ "ok": true }))));

        assert!(container
            .send_message("A", Some("IDLE"), &ModuleMessage::signal("ping"), &ctx)
            .is_none());
        assert!(container
            .send_message("A", Some("MISSING"), &ModuleMessage::signal("ping"), &ctx)
            .is_none());
    }

    #[test]
    fn test_broadcast_returns_first_response_and_skips_sender() {
        let log = Log::default();
        let mut sender = Stub::new("SENDER", 0, &log);
        sender.reply = Some(ModuleMessage::signal("from-sender"));
        let silent = Stub::new("SILENT", 1, &log);
        let mut first = Stub::new("FIRST", 2, &log);
        first.reply = Some(ModuleMessage::signal("first"));
        let mut second = Stub::new("SECOND", 3, &log);
        second.reply = Some(ModuleMessage::signal("second"));
        let (container, _host) = ready_container(&log, vec![sender, silent, first, second]);

        let reply = container.send_message(
            "SENDER",
            None,
            &ModuleMessage::signal("who"),
            &ModuleContext::default(),
        );

        assert_eq!(reply, Some(ModuleMessage::signal("first")));
        assert_eq!(
            entries(&log, "msg"),
            vec!["msg[SENDER]:SILENT", "msg[SENDER]:FIRST"]
        );
    }

    #[test]
    fn test_failing_handler_counts_as_no_response() {
        let log = Log::default();
        let mut refuses = Stub::new("REFUSES", 1, &log);
        refuses.reply = Some(ModuleMessage::signal("unreachable"));
        let mut answers = Stub::new("ANSWERS", 2, &log);
        answers.reply = Some(ModuleMessage::signal("ok"));
        let (container, _host) = ready_container(&log, vec![refuses, answers]);

        let reply = container.send_message(
            "HOST",
            None,
            &ModuleMessage::signal("explode"),
            &ModuleContext::default(),
        );
        // Every handler rejects "explode", so nothing answers.
        assert!(reply.is_none());
    }

    /// Talks to other modules through the container it finds in the context.
    struct Relay {
        descriptor: ModuleDescriptor,
        log: Log,
    }

    impl Module<TestHost> for Relay {
        fn descriptor(&self) -> &ModuleDescriptor {
            &self.descriptor
        }

        fn on_tick(&mut self, _host: &mut TestHost, ctx: &ModuleContext) -> ModuleResult<()> {
            let Some(container) = ctx.service::<ModuleContainer<TestHost>>() else {
                return Ok(());
            };
            let ask = ModuleMessage::signal("ping");
            let topic = |reply: Option<ModuleMessage>| {
                reply.map_or_else(|| "none".to_string(), |m| m.topic)
            };
            let direct = topic(container.send_message("RELAY", Some("ANSWERS"), &ask, ctx));
            let broadcast = topic(container.send_message("RELAY", None, &ask, ctx));
            let to_self = topic(container.send_message("OTHER", Some("RELAY"), &ask, ctx));
            let state = container.module_state("RELAY");
            self.log.lock().unwrap().push(format!(
                "relay {} {} {} {:?}",
                direct, broadcast, to_self, state
            ));
            Ok(())
        }

        fn handle_message(
            &mut self,
            _sender_id: &str,
            _message: &ModuleMessage,
            _ctx: &ModuleContext,
        ) -> ModuleResult<Option<ModuleMessage>> {
            Ok(Some(ModuleMessage::signal("relay-reply")))
        }
    }

    #[test]
    fn test_modules_can_message_from_their_hooks() {
        let log = Log::default();
        let container = Arc::new(ModuleContainer::<TestHost>::new());
        let mut answers = Stub::new("ANSWERS", 2, &log);
        answers.reply = Some(ModuleMessage::signal("pong"));
        container.register_module(Box::new(Relay {
            descriptor: ModuleDescriptor::new("RELAY").with_priority(1),
            log: Arc::clone(&log),
        }));
        container.register_module(Box::new(answers));

        let ctx = ModuleContext::builder()
            .with_service(Arc::clone(&container))
            .build();
        let mut host = TestHost::default();
        container.initialize_all(&ctx);
        container.load_all(&ctx);
        container.attach_all(&mut host, &ctx);

        let report = container.tick_all(&mut host, &ctx);

        assert_eq!(report.advanced, vec!["RELAY", "ANSWERS"]);
        // The relay is busy in its own tick, so messages to it go unanswered.
        assert_eq!(
            entries(&log, "relay"),
            vec!["relay pong pong none Some(Attached)"]
        );
        assert_eq!(
            entries(&log, "msg"),
            vec!["msg[RELAY]:ANSWERS", "msg[RELAY]:ANSWERS"]
        );
    }
}
