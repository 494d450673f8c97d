//! Engine, registry, and limits.
//!
//! This module hosts the concrete side of the crate: [`ClassRegistry`]
//! holds the analyzed input's classes and method bodies, [`DexVm`] executes
//! against it under [`ExecutionLimits`], and the definition types are
//! assembled through [`ClassDefinitionBuilder`].
//!
//! Registries are populated programmatically; decoding DEX containers into
//! definitions is a separate concern and lives outside this crate.

mod config;
mod local;
mod registry;

pub use config::ExecutionLimits;
pub use local::DexVm;
pub use registry::{
    AccessFlags, ClassDefinition, ClassDefinitionBuilder, ClassRegistry, FieldDefinition,
    MethodDefinition,
};
