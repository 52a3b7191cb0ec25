//! # Module Framework
//!
//! Capability modules for game subjects: the lifecycle contract every module
//! implements, the container that drives modules through it, and the
//! persisted per-subject capability data those modules read.
//!
//! ## Core Components
//!
//! - **module**: `Module` trait, descriptors, the read-only `ModuleContext`
//!   and the `ModuleContainer` that registers, orders and isolates modules
//! - **capability**: `ModuleData`, the persisted levels/active/meta document
//! - **entities**: `Subject` and its components (vitals, energy, status effects)
//! - **mechanics**: status effect kinds and damage causes shared with the synergy layer
//!
//! This crate knows nothing about synergies; `synergy_core` builds on top of it.

pub mod capability;
pub mod entities;
pub mod error;
pub mod mechanics;
pub mod module;

pub use capability::*;
pub use entities::*;
pub use error::*;
pub use mechanics::*;
pub use module::*;
