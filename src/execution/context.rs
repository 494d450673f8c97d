//! Execution state for one analyzed path.
//!
//! [`ExecutionContext`] bundles everything a method execution can read or
//! write: the register frame of the current invocation, per-class static
//! field state, the abstract heap, the set of classes already initialized on
//! this path, and the side-effect classification recorded for each of them.
//!
//! # Initialization Protocol
//!
//! Dalvik runs a class's `<clinit>` lazily, the first time the class is
//! instantiated or its statics are touched. The analysis mirrors that through
//! [`ExecutionContext::statically_initialize_class_if_necessary`]:
//!
//! 1. External classes are ignored; their initializers cannot be analyzed.
//! 2. A class already initialized on this path is left alone, so the
//!    operation is idempotent and initializer cycles terminate.
//! 3. Otherwise the class is marked initialized and given its starting
//!    state *before* the initializer runs; a `<clinit>` that touches its own
//!    class sees itself as initialized instead of recursing.
//! 4. The initializer's strongest side effect is recorded for the class.
//!    When the engine cannot execute it, the class is conservatively
//!    recorded as [`SideEffectLevel::Strong`] and still counts as
//!    initialized, so one broken initializer cannot wedge a whole analysis.
//!
//! The class-state accessors and [`ExecutionContext::class_side_effect_level`]
//! run this protocol themselves, so touching a class's statics initializes
//! the class without an explicit call.
//!
//! # Derivation
//!
//! Contexts derive two ways. [`ExecutionContext::child`] continues the same
//! method on a new path: the child sees everything the parent had and keeps
//! its own copies from then on. [`ExecutionContext::fork`] (also reachable
//! through `Clone`) produces a fully independent context for speculative
//! execution. Both are cheap; class states, heap, and sets all share
//! structure until mutated.

use std::{fmt, sync::Arc};

use imbl::{HashMap as ImHashMap, HashSet as ImHashSet};

use crate::execution::{ClassState, Heap, MethodState, SideEffectLevel, VmRef};

type ClassStateMap = ImHashMap<String, ClassState>;

/// Complete mutable state for one execution path.
///
/// See the module documentation for the initialization protocol and the
/// derivation rules.
///
/// # Example
///
/// ```rust,ignore
/// let mut context = ExecutionContext::new(vm);
/// context.set_method_state(MethodState::new(4));
///
/// // Runs `<clinit>` lazily, then reports its classification.
/// let level = context.class_side_effect_level("Lcom/example/Main;");
/// ```
pub struct ExecutionContext {
    vm: VmRef,
    /// Baseline class states inherited at derivation; `None` means this
    /// context is its own baseline.
    template: Option<ClassStateMap>,
    class_states: ClassStateMap,
    side_effects: ImHashMap<String, SideEffectLevel>,
    initialized: ImHashSet<String>,
    heap: Heap,
    method_state: Option<MethodState>,
    call_depth: u32,
}

impl ExecutionContext {
    /// Creates a root context with no state and no method frame.
    #[must_use]
    pub fn new(vm: VmRef) -> Self {
        ExecutionContext {
            vm,
            template: None,
            class_states: ClassStateMap::new(),
            side_effects: ImHashMap::new(),
            initialized: ImHashSet::new(),
            heap: Heap::new(),
            method_state: None,
            call_depth: 0,
        }
    }

    /// Returns the engine this context executes against.
    #[must_use]
    pub fn vm(&self) -> &VmRef {
        &self.vm
    }

    // ------------------------------------------------------------------
    // Static initialization
    // ------------------------------------------------------------------

    /// Runs the class's static initializer if this path has not already.
    ///
    /// Does nothing for external classes or for classes already initialized
    /// on this path. Otherwise the class is marked initialized and given its
    /// baseline state first, then `<clinit>` (when the class declares one)
    /// is executed inside this context, so its static writes land here. The
    /// initializer's strongest side effect is recorded for the class; a
    /// class without an initializer records [`SideEffectLevel::None`], and a
    /// failed execution records [`SideEffectLevel::Strong`] while leaving
    /// the class initialized.
    pub fn statically_initialize_class_if_necessary(&mut self, class_name: &str) {
        if !self.vm.is_local_class(class_name) || self.initialized.contains(class_name) {
            return;
        }

        // Mark before executing so a self-referential initializer
        // terminates instead of recursing.
        let state = self
            .peek_class_state(class_name)
            .map_or_else(|| ClassState::new(class_name), ClassState::child);
        self.initialize_class_state(class_name, state);

        let initializer = format!("{class_name}-><clinit>()V");
        let level = if self.vm.is_local_method(&initializer) {
            let vm = Arc::clone(&self.vm);
            match vm.execute(&initializer, self) {
                Some(graph) => graph.strongest_side_effect(),
                // Anything could have happened up to the failure.
                None => SideEffectLevel::Strong,
            }
        } else {
            SideEffectLevel::None
        };
        self.side_effects.insert(class_name.to_string(), level);
    }

    /// Returns true when the class has been initialized on this path.
    #[must_use]
    pub fn is_class_initialized(&self, class_name: &str) -> bool {
        self.initialized.contains(class_name)
    }

    /// Returns the side effect recorded for a class's initialization,
    /// running the initializer first if this path has not already.
    ///
    /// A class with no recorded level after that is external; nothing is
    /// known about it, so nothing can be ruled out and it classifies as
    /// [`SideEffectLevel::Strong`].
    pub fn class_side_effect_level(&mut self, class_name: &str) -> SideEffectLevel {
        self.statically_initialize_class_if_necessary(class_name);
        self.peek_class_side_effect(class_name)
            .unwrap_or(SideEffectLevel::Strong)
    }

    /// Returns the side effect recorded for a class, if any was.
    #[must_use]
    pub fn peek_class_side_effect(&self, class_name: &str) -> Option<SideEffectLevel> {
        self.side_effects.get(class_name).copied()
    }

    // ------------------------------------------------------------------
    // Class states
    // ------------------------------------------------------------------

    /// Installs a class state without marking the class initialized.
    ///
    /// This is how engines seed declared field values before execution
    /// begins; initialization later picks the seeded state up as its
    /// baseline.
    pub fn set_class_state(&mut self, class_name: &str, state: ClassState) {
        self.class_states.insert(class_name.to_string(), state);
    }

    /// Installs a class state and marks the class initialized on this path.
    pub fn initialize_class_state(&mut self, class_name: &str, state: ClassState) {
        self.class_states.insert(class_name.to_string(), state);
        self.initialized.insert(class_name.to_string());
    }

    /// Returns the state for a class, running its initializer first if
    /// this path has not already.
    ///
    /// The state is guaranteed present afterwards: initialization installs
    /// one for local classes, and an external class gets an empty state
    /// registered on first access.
    pub fn get_class_state(&mut self, class_name: &str) -> &ClassState {
        self.statically_initialize_class_if_necessary(class_name);
        self.materialize_class_state(class_name)
    }

    /// Returns the state for a class, if this path has one.
    #[must_use]
    pub fn peek_class_state(&self, class_name: &str) -> Option<&ClassState> {
        self.class_states.get(class_name).or_else(|| {
            self.template
                .as_ref()
                .and_then(|template| template.get(class_name))
        })
    }

    /// Returns mutable state for a class, running its initializer first if
    /// this path has not already.
    ///
    /// A state still held only in the inherited baseline is copied into
    /// this context first, so the mutation never reaches other paths.
    pub fn class_state_mut(&mut self, class_name: &str) -> &mut ClassState {
        self.statically_initialize_class_if_necessary(class_name);
        self.materialize_class_state(class_name)
    }

    /// Own-map entry for a class: copies the inherited baseline state in,
    /// or starts an empty one when no path has touched the class.
    fn materialize_class_state(&mut self, class_name: &str) -> &mut ClassState {
        let inherited = self
            .template
            .as_ref()
            .and_then(|template| template.get(class_name))
            .map(ClassState::child);
        self.class_states
            .entry(class_name.to_string())
            .or_insert_with(|| inherited.unwrap_or_else(|| ClassState::new(class_name)))
    }

    // ------------------------------------------------------------------
    // Method frame
    // ------------------------------------------------------------------

    /// Returns the current method frame.
    ///
    /// # Panics
    ///
    /// Panics when no frame has been assigned. Engines assign one with
    /// [`ExecutionContext::set_method_state`] before executing ops.
    #[must_use]
    pub fn method_state(&self) -> &MethodState {
        self.method_state
            .as_ref()
            .expect("no method frame; assign one with set_method_state")
    }

    /// Returns the current method frame for mutation.
    ///
    /// # Panics
    ///
    /// Panics when no frame has been assigned.
    pub fn method_state_mut(&mut self) -> &mut MethodState {
        self.method_state
            .as_mut()
            .expect("no method frame; assign one with set_method_state")
    }

    /// Assigns the current method frame.
    pub fn set_method_state(&mut self, method_state: MethodState) {
        self.method_state = Some(method_state);
    }

    /// Replaces the current frame, returning the previous one.
    ///
    /// Engines use this to push a callee frame over the caller's and restore
    /// it afterwards.
    pub fn swap_method_state(&mut self, method_state: Option<MethodState>) -> Option<MethodState> {
        std::mem::replace(&mut self.method_state, method_state)
    }

    /// Returns true when a method frame is assigned.
    #[must_use]
    pub fn has_method_state(&self) -> bool {
        self.method_state.is_some()
    }

    // ------------------------------------------------------------------
    // Heap and depth
    // ------------------------------------------------------------------

    /// Returns the path's heap.
    #[must_use]
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Returns the path's heap for mutation.
    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    /// Returns the current invocation depth.
    #[must_use]
    pub fn call_depth(&self) -> u32 {
        self.call_depth
    }

    /// Sets the invocation depth. Engines bump this around nested calls and
    /// bound it with their limits.
    pub fn set_call_depth(&mut self, call_depth: u32) {
        self.call_depth = call_depth;
    }

    // ------------------------------------------------------------------
    // Derivation
    // ------------------------------------------------------------------

    /// Derives a context that continues the current method on a new path.
    ///
    /// The child sees every class state, side-effect record, initialized
    /// class, and heap object the parent had, plus a copy of the parent's
    /// register frame, at the parent's call depth. From then on the two are
    /// isolated: neither side's mutations reach the other.
    ///
    /// # Panics
    ///
    /// Panics when this context has no method frame to continue.
    #[must_use]
    pub fn child(&self) -> Self {
        let method_state = self
            .method_state
            .as_ref()
            .expect("child derivation requires a method frame")
            .child();
        ExecutionContext {
            vm: Arc::clone(&self.vm),
            template: Some(self.baseline()),
            class_states: ClassStateMap::new(),
            side_effects: self.side_effects.clone(),
            initialized: self.initialized.clone(),
            heap: self.heap.fork(),
            method_state: Some(method_state),
            call_depth: self.call_depth,
        }
    }

    /// Forks this context into a fully independent copy.
    ///
    /// The fork carries the same state but no link back; it is its own
    /// baseline. `Clone` delegates here.
    #[must_use]
    pub fn fork(&self) -> Self {
        ExecutionContext {
            vm: Arc::clone(&self.vm),
            template: None,
            class_states: self.baseline(),
            side_effects: self.side_effects.clone(),
            initialized: self.initialized.clone(),
            heap: self.heap.fork(),
            method_state: self.method_state.clone(),
            call_depth: self.call_depth,
        }
    }

    /// Effective class-state view: own states overlaid on the inherited
    /// baseline. O(1)-ish through structural sharing.
    fn baseline(&self) -> ClassStateMap {
        match &self.template {
            Some(template) => self.class_states.clone().union(template.clone()),
            None => self.class_states.clone(),
        }
    }
}

impl Clone for ExecutionContext {
    fn clone(&self) -> Self {
        self.fork()
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("class_states", &self.class_states.len())
            .field("initialized", &self.initialized.len())
            .field("heap_objects", &self.heap.len())
            .field("call_depth", &self.call_depth)
            .field("has_method_state", &self.method_state.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    };

    use super::*;
    use crate::execution::{ExecutionGraph, Value, VirtualMachine};

    const CLASS: &str = "Lcom/example/Init;";
    const CLINIT: &str = "Lcom/example/Init;-><clinit>()V";

    /// Scriptable engine double. Counts executions and remembers whether the
    /// class was already flagged initialized when its initializer ran.
    struct StubVm {
        local_classes: Vec<&'static str>,
        initializers: Vec<&'static str>,
        fail: bool,
        level: SideEffectLevel,
        poke: Option<(&'static str, &'static str)>,
        executions: Arc<AtomicUsize>,
        observed_initialized: Arc<AtomicBool>,
    }

    impl StubVm {
        fn new() -> Self {
            StubVm {
                local_classes: vec![CLASS],
                initializers: Vec::new(),
                fail: false,
                level: SideEffectLevel::None,
                poke: None,
                executions: Arc::new(AtomicUsize::new(0)),
                observed_initialized: Arc::new(AtomicBool::new(false)),
            }
        }

        fn with_initializer(mut self) -> Self {
            self.initializers.push(CLINIT);
            self
        }
    }

    impl VirtualMachine for StubVm {
        fn is_local_class(&self, class_name: &str) -> bool {
            self.local_classes.contains(&class_name)
        }

        fn is_local_method(&self, method_descriptor: &str) -> bool {
            self.initializers.contains(&method_descriptor)
        }

        fn execute(
            &self,
            method_descriptor: &str,
            context: &mut ExecutionContext,
        ) -> Option<ExecutionGraph> {
            self.executions.fetch_add(1, Ordering::SeqCst);
            let class_name = method_descriptor
                .split_once("->")
                .map_or(method_descriptor, |(class_name, _)| class_name);
            self.observed_initialized
                .store(context.is_class_initialized(class_name), Ordering::SeqCst);

            if self.fail {
                return None;
            }
            if let Some((class_name, field_name)) = self.poke {
                context
                    .class_state_mut(class_name)
                    .poke_field(field_name, Value::Int(11));
            }
            let mut graph = ExecutionGraph::new(method_descriptor);
            graph.record(0, self.level);
            Some(graph)
        }
    }

    fn context_with(stub: StubVm) -> ExecutionContext {
        ExecutionContext::new(Arc::new(stub))
    }

    #[test]
    fn test_initialize_without_initializer() {
        let mut context = context_with(StubVm::new());
        context.statically_initialize_class_if_necessary(CLASS);

        assert!(context.is_class_initialized(CLASS));
        assert_eq!(
            context.peek_class_side_effect(CLASS),
            Some(SideEffectLevel::None)
        );
        assert!(context.get_class_state(CLASS).is_empty());
    }

    #[test]
    fn test_initialize_runs_initializer_once() {
        let stub = StubVm::new().with_initializer();
        let executions = Arc::clone(&stub.executions);
        let mut context = context_with(stub);

        context.statically_initialize_class_if_necessary(CLASS);
        context.statically_initialize_class_if_necessary(CLASS);
        context.statically_initialize_class_if_necessary(CLASS);

        assert_eq!(executions.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_initialize_adopts_initializer_level() {
        let mut stub = StubVm::new().with_initializer();
        stub.level = SideEffectLevel::Weak;
        let mut context = context_with(stub);

        context.statically_initialize_class_if_necessary(CLASS);
        assert_eq!(
            context.class_side_effect_level(CLASS),
            SideEffectLevel::Weak
        );
    }

    #[test]
    fn test_initialize_marks_before_executing() {
        let stub = StubVm::new().with_initializer();
        let observed = Arc::clone(&stub.observed_initialized);
        let mut context = context_with(stub);

        context.statically_initialize_class_if_necessary(CLASS);
        assert!(observed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_initializer_writes_land_in_context() {
        let mut stub = StubVm::new().with_initializer();
        stub.level = SideEffectLevel::Weak;
        stub.poke = Some((CLASS, "flag"));
        let mut context = context_with(stub);

        context.statically_initialize_class_if_necessary(CLASS);
        assert_eq!(
            context.get_class_state(CLASS).peek_field("flag"),
            Some(&Value::Int(11))
        );
    }

    #[test]
    fn test_failed_initializer_is_strong_and_initialized() {
        let mut stub = StubVm::new().with_initializer();
        stub.fail = true;
        let mut context = context_with(stub);

        context.statically_initialize_class_if_necessary(CLASS);

        assert!(context.is_class_initialized(CLASS));
        assert_eq!(
            context.class_side_effect_level(CLASS),
            SideEffectLevel::Strong
        );
        // Retrying is still a no-op; the failure classification sticks.
        context.statically_initialize_class_if_necessary(CLASS);
        assert_eq!(
            context.class_side_effect_level(CLASS),
            SideEffectLevel::Strong
        );
    }

    #[test]
    fn test_external_class_is_ignored() {
        let mut context = context_with(StubVm::new());
        context.statically_initialize_class_if_necessary("Ljava/lang/System;");

        assert!(!context.is_class_initialized("Ljava/lang/System;"));
        assert_eq!(context.peek_class_side_effect("Ljava/lang/System;"), None);
    }

    #[test]
    fn test_unrecorded_level_reads_strong() {
        let mut context = context_with(StubVm::new());
        assert_eq!(
            context.class_side_effect_level("Lcom/example/Never;"),
            SideEffectLevel::Strong
        );
    }

    #[test]
    fn test_seeded_state_survives_initialization() {
        let mut context = context_with(StubVm::new());
        let mut seed = ClassState::new(CLASS);
        seed.poke_field("VERSION", Value::Int(3));
        context.set_class_state(CLASS, seed);

        // Seeding does not count as initialization.
        assert!(!context.is_class_initialized(CLASS));

        context.statically_initialize_class_if_necessary(CLASS);
        assert_eq!(
            context.get_class_state(CLASS).peek_field("VERSION"),
            Some(&Value::Int(3))
        );
    }

    #[test]
    fn test_get_class_state_initializes_first() {
        let stub = StubVm::new().with_initializer();
        let executions = Arc::clone(&stub.executions);
        let mut context = context_with(stub);

        assert!(context.get_class_state(CLASS).is_empty());
        assert!(context.is_class_initialized(CLASS));
        assert_eq!(executions.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_get_class_state_for_external_is_empty() {
        let mut context = context_with(StubVm::new());
        assert!(context.get_class_state("Ljava/lang/System;").is_empty());

        // Still external: no initializer ran, nothing was classified.
        assert!(!context.is_class_initialized("Ljava/lang/System;"));
        assert_eq!(context.peek_class_side_effect("Ljava/lang/System;"), None);
    }

    #[test]
    fn test_class_state_mut_initializes_first() {
        let mut context = context_with(StubVm::new());
        context.class_state_mut(CLASS).poke_field("x", Value::Int(4));

        assert!(context.is_class_initialized(CLASS));
        assert_eq!(
            context.peek_class_side_effect(CLASS),
            Some(SideEffectLevel::None)
        );
        assert_eq!(
            context.get_class_state(CLASS).peek_field("x"),
            Some(&Value::Int(4))
        );
    }

    #[test]
    fn test_level_query_initializes_first() {
        let mut stub = StubVm::new().with_initializer();
        stub.level = SideEffectLevel::Weak;
        let executions = Arc::clone(&stub.executions);
        let mut context = context_with(stub);

        assert_eq!(
            context.class_side_effect_level(CLASS),
            SideEffectLevel::Weak
        );
        assert_eq!(executions.load(Ordering::SeqCst), 1);
    }

    #[test]
    #[should_panic(expected = "no method frame")]
    fn test_method_state_requires_frame() {
        let context = context_with(StubVm::new());
        let _ = context.method_state();
    }

    #[test]
    fn test_swap_method_state() {
        let mut context = context_with(StubVm::new());
        assert!(!context.has_method_state());

        let previous = context.swap_method_state(Some(MethodState::new(2)));
        assert!(previous.is_none());
        assert_eq!(context.method_state().register_count(), 2);

        let frame = context.swap_method_state(None);
        assert_eq!(frame.map(|state| state.register_count()), Some(2));
        assert!(!context.has_method_state());
    }

    #[test]
    fn test_child_sees_parent_state() {
        let mut parent = context_with(StubVm::new());
        parent.set_method_state(MethodState::new(1));
        parent.statically_initialize_class_if_necessary(CLASS);
        parent.class_state_mut(CLASS).poke_field("x", Value::Int(1));
        parent.set_call_depth(3);

        let mut child = parent.child();
        assert!(child.is_class_initialized(CLASS));
        assert_eq!(child.call_depth(), 3);
        assert_eq!(
            child.get_class_state(CLASS).peek_field("x"),
            Some(&Value::Int(1))
        );
        assert_eq!(
            child.peek_class_side_effect(CLASS),
            Some(SideEffectLevel::None)
        );
    }

    #[test]
    fn test_child_isolation() {
        let mut parent = context_with(StubVm::new());
        parent.set_method_state(MethodState::new(1));
        parent.statically_initialize_class_if_necessary(CLASS);

        let mut child = parent.child();
        child.class_state_mut(CLASS).poke_field("x", Value::Int(9));
        child
            .method_state_mut()
            .assign_register(0, Value::Int(7))
            .unwrap();
        child.heap_mut().alloc_local_instance(CLASS);

        assert_eq!(parent.get_class_state(CLASS).peek_field("x"), None);
        assert!(!parent.method_state().read_register(0).unwrap().is_known());
        assert!(parent.heap().is_empty());
    }

    #[test]
    fn test_parent_mutation_after_child_is_private() {
        let mut parent = context_with(StubVm::new());
        parent.set_method_state(MethodState::new(1));
        parent.statically_initialize_class_if_necessary(CLASS);

        let mut child = parent.child();
        parent.class_state_mut(CLASS).poke_field("x", Value::Int(5));

        assert_eq!(child.get_class_state(CLASS).peek_field("x"), None);
    }

    #[test]
    #[should_panic(expected = "child derivation requires a method frame")]
    fn test_child_requires_frame() {
        let context = context_with(StubVm::new());
        let _ = context.child();
    }

    #[test]
    fn test_fork_isolation() {
        let mut original = context_with(StubVm::new());
        original.statically_initialize_class_if_necessary(CLASS);

        let mut fork = original.fork();
        fork.class_state_mut(CLASS).poke_field("x", Value::Int(2));
        fork.statically_initialize_class_if_necessary(CLASS);

        assert!(fork.is_class_initialized(CLASS));
        assert_eq!(original.get_class_state(CLASS).peek_field("x"), None);
    }

    #[test]
    fn test_clone_is_fork() {
        let mut original = context_with(StubVm::new());
        original.statically_initialize_class_if_necessary(CLASS);

        let mut copy = original.clone();
        copy.class_state_mut(CLASS).poke_field("x", Value::Null);

        assert_eq!(original.get_class_state(CLASS).peek_field("x"), None);
    }

    #[test]
    fn test_debug_is_summary() {
        let context = context_with(StubVm::new());
        let rendered = format!("{context:?}");
        assert!(rendered.contains("ExecutionContext"));
        assert!(rendered.contains("call_depth"));
    }
}
