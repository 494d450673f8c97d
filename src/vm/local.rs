//! The concrete execution engine.
//!
//! [`DexVm`] implements [`VirtualMachine`] over a [`ClassRegistry`]. It
//! resolves descriptors, bounds execution with [`ExecutionLimits`], and
//! walks method bodies op by op, folding each op's outcome into an
//! [`ExecutionGraph`].
//!
//! The engine is stateless between runs: all mutable state lives in the
//! [`ExecutionContext`] the caller passes in, so one engine can serve many
//! concurrent analyses. [`DexVm::run_all`] leans on that to classify
//! batches of methods in parallel, one independent root context per
//! method.

use std::sync::{Arc, OnceLock};

use imbl::HashMap as ImHashMap;
use rayon::prelude::*;

use crate::{
    execution::{
        ClassState, ExecutionContext, ExecutionError, ExecutionGraph, MethodState, VirtualMachine,
        VmRef,
    },
    types::names,
    vm::{ClassRegistry, ExecutionLimits, MethodDefinition},
    Result,
};

/// Execution engine over a class registry.
///
/// # Example
///
/// ```rust,ignore
/// let vm = Arc::new(DexVm::new(registry, ExecutionLimits::default()));
/// let graph = DexVm::run_method(&vm, "Lcom/example/Main;->run()V");
/// if let Some(graph) = graph {
///     println!("{}", graph.strongest_side_effect());
/// }
/// ```
#[derive(Debug)]
pub struct DexVm {
    registry: ClassRegistry,
    limits: ExecutionLimits,
    seeds: OnceLock<ImHashMap<String, ClassState>>,
}

impl DexVm {
    /// Creates an engine over a registry with the given limits.
    #[must_use]
    pub fn new(registry: ClassRegistry, limits: ExecutionLimits) -> Self {
        DexVm {
            registry,
            limits,
            seeds: OnceLock::new(),
        }
    }

    /// Returns the engine's class registry.
    #[must_use]
    pub fn registry(&self) -> &ClassRegistry {
        &self.registry
    }

    /// Returns the engine's execution limits.
    #[must_use]
    pub fn limits(&self) -> &ExecutionLimits {
        &self.limits
    }

    /// Creates a root context seeded with every declared initial field
    /// value and carrying a fresh frame of `register_count` registers.
    #[must_use]
    pub fn spawn_root_context(vm: &Arc<Self>, register_count: u16) -> ExecutionContext {
        let handle: VmRef = Arc::<Self>::clone(vm);
        let mut context = ExecutionContext::new(handle);
        for (class_name, state) in vm.seed_states() {
            context.set_class_state(class_name, state.clone());
        }
        context.set_method_state(MethodState::new(register_count));
        context
    }

    /// Executes one method in a fresh root context.
    ///
    /// Returns `None` when the method is unknown or execution failed.
    #[must_use]
    pub fn run_method(vm: &Arc<Self>, method_descriptor: &str) -> Option<ExecutionGraph> {
        let method = vm.registry.method(method_descriptor)?;
        let mut context = Self::spawn_root_context(vm, method.register_count());
        vm.execute(method_descriptor, &mut context)
    }

    /// Executes a batch of methods, each in its own root context, in
    /// parallel. Results come back in input order.
    #[must_use]
    pub fn run_all(
        vm: &Arc<Self>,
        method_descriptors: &[&str],
    ) -> Vec<(String, Option<ExecutionGraph>)> {
        method_descriptors
            .par_iter()
            .map(|descriptor| ((*descriptor).to_string(), Self::run_method(vm, descriptor)))
            .collect()
    }

    /// Initial class states derived from declared field values, built once
    /// per engine. Classes with no declared values get no entry.
    fn seed_states(&self) -> &ImHashMap<String, ClassState> {
        self.seeds.get_or_init(|| {
            let mut seeds = ImHashMap::new();
            for class_name in self.registry.class_names() {
                if let Some(class) = self.registry.class(&class_name) {
                    let mut state = ClassState::new(&class_name);
                    for field in class.static_fields() {
                        if let Some(value) = &field.initial_value {
                            state.poke_field(&field.name, value.clone());
                        }
                    }
                    if !state.is_empty() {
                        seeds.insert(class_name, state);
                    }
                }
            }
            seeds
        })
    }

    fn execute_inner(
        &self,
        method_descriptor: &str,
        context: &mut ExecutionContext,
    ) -> Result<ExecutionGraph> {
        let method = self.registry.method(method_descriptor).ok_or_else(|| {
            ExecutionError::UnknownMethod {
                descriptor: method_descriptor.to_string(),
            }
        })?;

        let depth = context.call_depth();
        if depth >= self.limits.max_call_depth {
            return Err(ExecutionError::CallDepthExceeded {
                depth,
                limit: self.limits.max_call_depth,
            }
            .into());
        }
        let entry_address =
            method
                .entry_address()
                .ok_or_else(|| ExecutionError::EmptyMethodBody {
                    descriptor: method_descriptor.to_string(),
                })?;

        // Push the callee frame over the caller's, walk, then restore the
        // caller's frame and depth whatever the walk produced.
        let caller_frame =
            context.swap_method_state(Some(MethodState::new(method.register_count())));
        context.set_call_depth(depth + 1);

        let walked = self.walk(&method, entry_address, context);

        context.set_call_depth(depth);
        context.swap_method_state(caller_frame);

        walked
    }

    fn walk(
        &self,
        method: &MethodDefinition,
        entry_address: u32,
        context: &mut ExecutionContext,
    ) -> Result<ExecutionGraph> {
        let mut graph = ExecutionGraph::new(method.descriptor());
        let mut executed = 0_usize;
        let mut current = Some(entry_address);

        while let Some(address) = current {
            if executed >= self.limits.max_ops_per_method {
                return Err(ExecutionError::OpBudgetExceeded {
                    executed,
                    limit: self.limits.max_ops_per_method,
                }
                .into());
            }
            let op = method
                .op_at(address)
                .ok_or_else(|| ExecutionError::MissingOpAtAddress {
                    descriptor: method.descriptor().to_string(),
                    address,
                })?;

            let outcome = op.execute(context)?;
            graph.record(address, outcome.side_effect);
            executed += 1;

            // The catalog has no branching ops, so an op has at most one
            // successor.
            current = outcome.successors.first().copied();
        }

        Ok(graph)
    }
}

impl VirtualMachine for DexVm {
    fn is_local_class(&self, class_name: &str) -> bool {
        self.registry
            .contains_class(names::component_base(class_name))
    }

    fn is_local_method(&self, method_descriptor: &str) -> bool {
        self.registry.contains_method(method_descriptor)
    }

    fn execute(
        &self,
        method_descriptor: &str,
        context: &mut ExecutionContext,
    ) -> Option<ExecutionGraph> {
        self.execute_inner(method_descriptor, context).ok()
    }
}
