//! Record of one method execution.
//!
//! An [`ExecutionGraph`] is produced by [`VirtualMachine::execute`] and
//! captures, per executed op, the address and the side effect the op
//! reported. Its headline query is [`ExecutionGraph::strongest_side_effect`],
//! which folds the per-op levels into the method's overall classification.
//!
//! [`VirtualMachine::execute`]: crate::execution::VirtualMachine::execute

use std::sync::Arc;

use crate::execution::SideEffectLevel;

/// One executed op: where it was and what it did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExecutedOp {
    /// Code address of the op within its method.
    pub address: u32,
    /// Side effect the op reported for this execution.
    pub side_effect: SideEffectLevel,
}

/// Per-op execution record for one method invocation.
///
/// # Example
///
/// ```rust
/// use dexscope::execution::{ExecutionGraph, SideEffectLevel};
///
/// let mut graph = ExecutionGraph::new("Lcom/example/Main;->run()V");
/// graph.record(0, SideEffectLevel::None);
/// graph.record(1, SideEffectLevel::Weak);
///
/// assert_eq!(graph.strongest_side_effect(), SideEffectLevel::Weak);
/// assert_eq!(graph.op_count(), 2);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionGraph {
    method_descriptor: Arc<str>,
    records: Vec<ExecutedOp>,
}

impl ExecutionGraph {
    /// Creates an empty record for the given method descriptor.
    #[must_use]
    pub fn new(method_descriptor: &str) -> Self {
        ExecutionGraph {
            method_descriptor: Arc::from(method_descriptor),
            records: Vec::new(),
        }
    }

    /// Returns the descriptor of the recorded method.
    #[must_use]
    pub fn method_descriptor(&self) -> &str {
        &self.method_descriptor
    }

    /// Records one executed op.
    pub fn record(&mut self, address: u32, side_effect: SideEffectLevel) {
        self.records.push(ExecutedOp {
            address,
            side_effect,
        });
    }

    /// Folds all recorded levels into the method's overall classification.
    ///
    /// An empty record classifies as [`SideEffectLevel::None`]: a method
    /// that executed nothing did nothing.
    #[must_use]
    pub fn strongest_side_effect(&self) -> SideEffectLevel {
        SideEffectLevel::strongest_of(self.records.iter().map(|record| record.side_effect))
    }

    /// Returns the number of recorded ops.
    #[must_use]
    pub fn op_count(&self) -> usize {
        self.records.len()
    }

    /// Returns true when nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the recorded ops in execution order.
    #[must_use]
    pub fn records(&self) -> &[ExecutedOp] {
        &self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_graph() {
        let graph = ExecutionGraph::new("Lcom/example/Main;->run()V");
        assert_eq!(graph.method_descriptor(), "Lcom/example/Main;->run()V");
        assert!(graph.is_empty());
        assert_eq!(graph.op_count(), 0);
        assert_eq!(graph.strongest_side_effect(), SideEffectLevel::None);
    }

    #[test]
    fn test_record_order() {
        let mut graph = ExecutionGraph::new("Lcom/example/Main;->run()V");
        graph.record(0, SideEffectLevel::None);
        graph.record(2, SideEffectLevel::Weak);
        graph.record(3, SideEffectLevel::None);

        let addresses: Vec<u32> = graph.records().iter().map(|record| record.address).collect();
        assert_eq!(addresses, [0, 2, 3]);
    }

    #[test]
    fn test_strongest_side_effect() {
        let mut graph = ExecutionGraph::new("Lcom/example/Main;->run()V");
        graph.record(0, SideEffectLevel::None);
        assert_eq!(graph.strongest_side_effect(), SideEffectLevel::None);

        graph.record(1, SideEffectLevel::Strong);
        graph.record(2, SideEffectLevel::Weak);
        // Strong dominates regardless of what follows.
        assert_eq!(graph.strongest_side_effect(), SideEffectLevel::Strong);
    }
}
