use thiserror::Error;

use crate::execution::ExecutionError;

/// The generic error type covering every failure this library can return.
///
/// Most fallible operations in this crate are execution-layer operations, so
/// today the enum has a single category; keeping it an enum leaves the
/// public signatures stable as categories are added.
///
/// Note the deliberate asymmetry with
/// [`VirtualMachine::execute`](crate::execution::VirtualMachine::execute):
/// an engine failing to analyze a *target* method is an expected analysis
/// outcome and surfaces as `None` plus a conservative classification, never
/// as an `Error`. Errors are for structural misuse of the crate's own state,
/// such as dangling heap references or out-of-range registers.
///
/// # Examples
///
/// ```rust
/// use dexscope::{
///     execution::{ExecutionError, MethodState, Value},
///     Error,
/// };
///
/// let mut state = MethodState::new(1);
/// match state.assign_register(9, Value::Int(1)) {
///     Err(Error::Execution(ExecutionError::RegisterOutOfBounds { register, count })) => {
///         eprintln!("v{register} does not exist in a {count}-register frame");
///     }
///     other => panic!("expected a register error, got {other:?}"),
/// }
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// An execution-layer operation failed. See [`ExecutionError`] for the
    /// individual conditions.
    #[error(transparent)]
    Execution(#[from] ExecutionError),
}
