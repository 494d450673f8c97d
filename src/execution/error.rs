//! Errors raised by the abstract execution layer.

use thiserror::Error;

use crate::execution::HeapRef;

/// Structural failures detected while executing abstract operations.
///
/// These errors indicate a malformed or unexpected op stream rather than
/// interesting target-program behavior: behavior the analysis merely cannot
/// model (unknown array lengths, unmodeled external fields) degrades to
/// [`Value::Unknown`](crate::execution::Value::Unknown) instead of erroring.
/// The bundled [`DexVm`](crate::vm::DexVm) converts any of these into a
/// collaborator failure (`None` from `execute`), which callers classify as
/// [`SideEffectLevel::Strong`](crate::execution::SideEffectLevel::Strong).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    /// A heap reference did not resolve to a live object.
    ///
    /// Heap ids are stable across forks, so this means the reference was
    /// fabricated or crossed between unrelated context lineages.
    #[error("invalid heap reference: {reference}")]
    InvalidHeapReference {
        /// The reference that failed to resolve.
        reference: HeapRef,
    },

    /// A heap object had a different shape than the operation expected.
    #[error("heap type mismatch: expected {expected}, found {found}")]
    HeapTypeMismatch {
        /// The object kind the operation required.
        expected: &'static str,
        /// The object kind actually stored.
        found: &'static str,
    },

    /// A register index was outside the current frame.
    #[error("register v{register} out of bounds (frame has {count} registers)")]
    RegisterOutOfBounds {
        /// The register that was accessed.
        register: u16,
        /// The number of registers in the frame.
        count: u16,
    },

    /// A method descriptor did not resolve to a registered method.
    #[error("unknown method: {descriptor}")]
    UnknownMethod {
        /// The descriptor that failed to resolve.
        descriptor: String,
    },

    /// A method body contained no operations.
    #[error("method has an empty body: {descriptor}")]
    EmptyMethodBody {
        /// The descriptor of the empty method.
        descriptor: String,
    },

    /// Control flow reached an address with no operation.
    #[error("no operation at address {address:#06x} in {descriptor}")]
    MissingOpAtAddress {
        /// The descriptor of the method being walked.
        descriptor: String,
        /// The address that had no operation.
        address: u32,
    },

    /// A method body walk exceeded the configured operation budget.
    ///
    /// Guards against cyclic successor chains in malformed op streams.
    #[error("op budget exceeded: executed {executed}, limit {limit}")]
    OpBudgetExceeded {
        /// Operations executed before giving up.
        executed: usize,
        /// The configured budget.
        limit: usize,
    },

    /// Method invocation nesting exceeded the configured depth limit.
    #[error("call depth exceeded: depth {depth}, limit {limit}")]
    CallDepthExceeded {
        /// The call depth at the point of failure.
        depth: u32,
        /// The configured limit.
        limit: u32,
    },
}
