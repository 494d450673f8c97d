//! Abstract interpretation state and op execution.
//!
//! This module contains everything a single analyzed path carries while a
//! method executes: values and the heap they live on, per-class static
//! field state, the register frame, and the side-effect bookkeeping that is
//! the point of the whole exercise.
//!
//! # Architecture
//!
//! ```text
//! ExecutionContext ─── owns ──▶ Heap            (objects, stable ids)
//!        │                      ClassState map  (static fields per class)
//!        │                      MethodState     (register frame)
//!        │                      side effects    (level per class)
//!        │
//!        └── drives ──▶ VirtualMachine (trait) ──▶ ExecutionGraph
//! ```
//!
//! [`Op::execute`] mutates a context and reports an [`OpOutcome`]; engines
//! fold outcomes into an [`ExecutionGraph`], whose strongest level is the
//! method's classification. Class initialization threads through
//! [`ExecutionContext::statically_initialize_class_if_necessary`], which is
//! idempotent per path and fail-safe: an initializer the engine cannot run
//! classifies its class as [`SideEffectLevel::Strong`] instead of aborting
//! the analysis.
//!
//! # Key Components
//!
//! - [`SideEffectLevel`] - the three-point ordered classification
//! - [`Value`] / [`HeapRef`] / [`Heap`] / [`HeapObject`] - values and objects
//! - [`ClassState`] / [`MethodState`] - static fields and registers
//! - [`ExecutionContext`] - one path's complete state
//! - [`Op`] / [`OpKind`] / [`OpOutcome`] - the op catalog
//! - [`VirtualMachine`] / [`ExecutionGraph`] - the engine seam and its output
//!
//! # Thread Safety
//!
//! A context is owned by exactly one path and mutated through `&mut`, so
//! none of these types carry locks. Parallelism happens *between* paths:
//! contexts derive via [`ExecutionContext::fork`] in O(1) through
//! structurally-shared collections, and the forks are `Send`, so each can
//! move to its own worker.

mod allowlist;
mod class_state;
mod context;
mod effect;
mod error;
mod graph;
mod heap;
mod machine;
mod method_state;
mod op;
mod value;

pub use allowlist::is_safe_allocation;
pub use class_state::ClassState;
pub use context::ExecutionContext;
pub use effect::SideEffectLevel;
pub use error::ExecutionError;
pub use graph::{ExecutedOp, ExecutionGraph};
pub use heap::{Heap, HeapObject};
pub use machine::{VirtualMachine, VmRef};
pub use method_state::MethodState;
pub use op::{FieldRef, Op, OpKind, OpOutcome};
pub use value::{HeapRef, Value};
