//! # dexscope Prelude
//!
//! This module provides a convenient prelude for the most commonly used
//! types from the dexscope library. Import this module to get quick access
//! to everything needed to register classes, execute methods, and read back
//! side-effect classifications.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all dexscope operations
pub use crate::Error;

/// The result type used throughout dexscope
pub use crate::Result;

/// Execution-layer error conditions
pub use crate::execution::ExecutionError;

// ================================================================================================
// Side Effects and Execution State
// ================================================================================================

/// The three-point side-effect classification
pub use crate::execution::SideEffectLevel;

/// Values, object references, and the abstract heap
pub use crate::execution::{Heap, HeapObject, HeapRef, Value};

/// Static field state and the register frame
pub use crate::execution::{ClassState, MethodState};

/// Complete per-path execution state
pub use crate::execution::ExecutionContext;

/// Per-op execution records
pub use crate::execution::{ExecutedOp, ExecutionGraph};

// ================================================================================================
// Ops
// ================================================================================================

/// The op catalog and its execution outcome
pub use crate::execution::{FieldRef, Op, OpKind, OpOutcome};

/// Allow-list query for effect-free external allocations
pub use crate::execution::is_safe_allocation;

// ================================================================================================
// Engine
// ================================================================================================

/// The engine seam and its shared handle
pub use crate::execution::{VirtualMachine, VmRef};

/// The concrete engine and its resource limits
pub use crate::vm::{DexVm, ExecutionLimits};

/// Class and method definitions and their registry
pub use crate::vm::{
    AccessFlags, ClassDefinition, ClassDefinitionBuilder, ClassRegistry, FieldDefinition,
    MethodDefinition,
};

// ================================================================================================
// Type Names
// ================================================================================================

/// Dalvik type-name format conversions
pub use crate::types::{names, TypeFormat};
