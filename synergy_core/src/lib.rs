//! # Synergy Core
//!
//! Rule engine that layers extra effects on a subject when it owns particular
//! combinations of modules. Builds on `module_framework` for the subject model
//! and persisted module data.
//!
//! ## Core Components
//!
//! - **definition**: `SynergyDefinition`, its module chain and display links
//! - **condition** / **effect**: the strategy traits and their built-in families
//! - **context**: `EventContext`, the per-dispatch view of subject, damage and target
//! - **manager**: registry, evaluation (trigger, chain, conditions) and ordered application
//! - **dispatcher**: host-facing adapter that classifies damage and raises events
//! - **maintenance** / **activation**: per-subject activations and their energy upkeep
//! - **builtin**: a ready-made rule set
//!
//! ## Ordering
//!
//! Matched synergies apply in ascending priority, ties broken by registration
//! order. Effects inside one synergy apply in declaration order. Applying
//! several multiplicative and additive effects is therefore deterministic but
//! not commutative.

pub mod activation;
pub mod builtin;
pub mod condition;
pub mod config;
pub mod context;
pub mod definition;
pub mod dispatcher;
pub mod effect;
pub mod engine_module;
pub mod error;
pub mod events;
pub mod maintenance;
pub mod manager;

pub use activation::*;
pub use condition::*;
pub use config::*;
pub use context::*;
pub use definition::*;
pub use dispatcher::*;
pub use effect::*;
pub use engine_module::*;
pub use error::*;
pub use events::*;
pub use maintenance::*;
pub use manager::*;
