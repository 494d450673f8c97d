//! Register file for one method invocation.
//!
//! Dalvik methods operate on a fixed-size register file declared by the
//! method. [`MethodState`] models that file for one invocation frame:
//! registers start out as unknown-typed values and are overwritten as ops
//! assign them. Register indices are validated on every access so that a
//! malformed op surfaces as an [`ExecutionError`] instead of corrupting the
//! frame.
//!
//! [`ExecutionError`]: crate::execution::ExecutionError

use std::fmt;

use crate::{
    execution::{ExecutionError, Value},
    Result,
};

/// Register file for one invocation frame.
///
/// # Example
///
/// ```rust
/// use dexscope::execution::{MethodState, Value};
///
/// let mut state = MethodState::new(2);
/// state.assign_register(0, Value::Int(42)).unwrap();
///
/// assert_eq!(state.read_register(0).unwrap(), &Value::Int(42));
/// assert!(!state.read_register(1).unwrap().is_known());
/// assert!(state.read_register(2).is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct MethodState {
    registers: Vec<Value>,
    register_count: u16,
}

impl MethodState {
    /// Creates a frame with `register_count` registers, all unknown.
    #[must_use]
    pub fn new(register_count: u16) -> Self {
        MethodState {
            registers: vec![Value::unknown("?"); usize::from(register_count)],
            register_count,
        }
    }

    /// Returns the number of registers in this frame.
    #[must_use]
    pub fn register_count(&self) -> u16 {
        self.register_count
    }

    /// Writes a register.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::RegisterOutOfBounds`] when `register` is not
    /// below the frame's register count.
    pub fn assign_register(&mut self, register: u16, value: Value) -> Result<()> {
        let slot = self.registers.get_mut(usize::from(register)).ok_or(
            ExecutionError::RegisterOutOfBounds {
                register,
                count: self.register_count,
            },
        )?;
        *slot = value;
        Ok(())
    }

    /// Reads a register.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::RegisterOutOfBounds`] when `register` is not
    /// below the frame's register count.
    pub fn read_register(&self, register: u16) -> Result<&Value> {
        self.registers
            .get(usize::from(register))
            .ok_or_else(|| {
                ExecutionError::RegisterOutOfBounds {
                    register,
                    count: self.register_count,
                }
                .into()
            })
    }

    /// Derives an independent frame for a child path.
    ///
    /// Assignments on either side are invisible to the other.
    #[must_use]
    pub fn child(&self) -> Self {
        self.clone()
    }
}

impl fmt::Display for MethodState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, value) in self.registers.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "v{index}={value}")?;
        }
        Ok(())
    }
}
