//! Virtual machine seam.
//!
//! [`ExecutionContext`] drives method execution through the
//! [`VirtualMachine`] trait rather than a concrete engine, so the
//! initialization and side-effect machinery can be exercised against test
//! doubles and alternative engines. The crate's own engine is
//! [`DexVm`](crate::vm::DexVm).
//!
//! [`ExecutionContext`]: crate::execution::ExecutionContext

use std::sync::Arc;

use crate::execution::{ExecutionContext, ExecutionGraph};

/// Engine capable of resolving and executing methods.
///
/// Implementations answer two resolution questions and run methods inside a
/// caller-provided context. `is_local_*` distinguishes code defined in the
/// analyzed input from framework and platform code the engine cannot see
/// into.
pub trait VirtualMachine {
    /// Returns true when the class is defined in the analyzed input.
    ///
    /// Array types resolve via their base component, so `[Lcom/foo/Bar;` is
    /// local exactly when `Lcom/foo/Bar;` is.
    fn is_local_class(&self, class_name: &str) -> bool;

    /// Returns true when the method is defined, with a body, in the
    /// analyzed input.
    fn is_local_method(&self, method_descriptor: &str) -> bool;

    /// Executes a method inside `context` and reports what it did.
    ///
    /// Returns `None` when execution failed for any reason: unknown method,
    /// resource limits, malformed code. Callers treat `None` as "anything
    /// could have happened" and classify accordingly; this method never
    /// panics for an unexecutable target.
    ///
    /// State mutations made before a failure remain visible in `context`.
    fn execute(
        &self,
        method_descriptor: &str,
        context: &mut ExecutionContext,
    ) -> Option<ExecutionGraph>;
}

/// Shared handle to a [`VirtualMachine`], as held by every context.
pub type VmRef = Arc<dyn VirtualMachine + Send + Sync>;
