//! Path isolation and allocation asymmetry integration tests.
//!
//! Forked and derived contexts must never observe each other's mutations,
//! heap references must stay stable across derivation, and array allocation
//! must not trigger class initialization the way instance allocation does.

use std::sync::Arc;

use dexscope::prelude::*;

const MAIN: &str = "Lcom/example/Main;";

/// Registry with one class whose initializer stores a constant, plus a
/// method for each allocation shape.
fn build_registry() -> ClassRegistry {
    let registry = ClassRegistry::new();
    registry.register(
        ClassDefinition::builder(MAIN)
            .static_field("flag", "I", None)
            .method(MethodDefinition::new(
                &format!("{MAIN}-><clinit>()V"),
                AccessFlags::STATIC | AccessFlags::CONSTRUCTOR,
                1,
                vec![
                    Op::new(0, 2, OpKind::Const { dest: 0, literal: 1 }),
                    Op::new(
                        2,
                        4,
                        OpKind::StaticPut {
                            source: 0,
                            field: FieldRef::new(MAIN, "flag", "I"),
                        },
                    ),
                    Op::new(4, 5, OpKind::ReturnVoid),
                ],
            ))
            .method(MethodDefinition::new(
                &format!("{MAIN}->make()V"),
                AccessFlags::PUBLIC,
                1,
                vec![
                    Op::new(
                        0,
                        2,
                        OpKind::NewInstance {
                            dest: 0,
                            class_name: MAIN.into(),
                        },
                    ),
                    Op::new(2, 3, OpKind::ReturnVoid),
                ],
            ))
            .method(MethodDefinition::new(
                &format!("{MAIN}->makeArray()V"),
                AccessFlags::PUBLIC,
                2,
                vec![
                    Op::new(0, 2, OpKind::Const { dest: 1, literal: 3 }),
                    Op::new(
                        2,
                        4,
                        OpKind::NewArray {
                            dest: 0,
                            length_register: 1,
                            array_type: format!("[{MAIN}").into(),
                        },
                    ),
                    Op::new(4, 5, OpKind::ReturnVoid),
                ],
            ))
            .build(),
    );
    registry
}

fn build_vm() -> Arc<DexVm> {
    Arc::new(DexVm::new(build_registry(), ExecutionLimits::minimal()))
}

#[test]
fn test_instance_allocation_initializes_but_array_allocation_does_not() {
    let vm = build_vm();

    let mut via_instance = DexVm::spawn_root_context(&vm, 1);
    vm.execute(&format!("{MAIN}->make()V"), &mut via_instance)
        .expect("make executes");
    assert!(via_instance.is_class_initialized(MAIN));

    let mut via_array = DexVm::spawn_root_context(&vm, 2);
    let graph = vm
        .execute(&format!("{MAIN}->makeArray()V"), &mut via_array)
        .expect("makeArray executes");
    assert!(!via_array.is_class_initialized(MAIN));
    assert_eq!(via_array.peek_class_side_effect(MAIN), None);
    assert_eq!(graph.strongest_side_effect(), SideEffectLevel::None);
}

#[test]
fn test_array_contents_default_per_component_type() {
    let vm = build_vm();
    let mut context = DexVm::spawn_root_context(&vm, 2);
    vm.execute(&format!("{MAIN}->makeArray()V"), &mut context)
        .expect("makeArray executes");

    assert_eq!(context.heap().len(), 1);
    let (_, object) = context.heap().iter().next().expect("one allocation");
    match object {
        HeapObject::Array {
            element_type,
            elements,
        } => {
            assert_eq!(element_type.as_ref(), MAIN);
            // Reference components default to null.
            assert_eq!(elements.as_slice(), &[Value::Null, Value::Null, Value::Null]);
        }
        other => panic!("expected an array, got {other}"),
    }
}

#[test]
fn test_fork_isolates_heap_and_keeps_references_stable() {
    let vm = build_vm();
    let mut original = DexVm::spawn_root_context(&vm, 1);
    vm.execute(&format!("{MAIN}->make()V"), &mut original)
        .expect("make executes");

    let shared = original
        .heap()
        .iter()
        .next()
        .map(|(reference, _)| reference)
        .expect("one allocation");

    let mut fork = original.fork();
    // The pre-fork reference resolves on both sides.
    assert!(fork.heap().contains(shared));
    assert!(original.heap().contains(shared));

    // Post-fork allocations are private to their side.
    fork.heap_mut().alloc_local_instance(MAIN);
    assert_eq!(fork.heap().len(), 2);
    assert_eq!(original.heap().len(), 1);
}

#[test]
fn test_fork_isolates_class_state() {
    let vm = build_vm();
    let mut original = DexVm::spawn_root_context(&vm, 1);
    vm.execute(&format!("{MAIN}->make()V"), &mut original)
        .expect("make executes");
    assert_eq!(
        original.get_class_state(MAIN).peek_field("flag"),
        Some(&Value::Int(1))
    );

    let mut fork = original.fork();
    fork.class_state_mut(MAIN).poke_field("flag", Value::Int(99));

    assert_eq!(
        original.get_class_state(MAIN).peek_field("flag"),
        Some(&Value::Int(1))
    );
    assert_eq!(
        fork.get_class_state(MAIN).peek_field("flag"),
        Some(&Value::Int(99))
    );
}

#[test]
fn test_child_continues_with_parent_view_but_isolated() {
    let vm = build_vm();
    let mut parent = DexVm::spawn_root_context(&vm, 2);
    vm.execute(&format!("{MAIN}->make()V"), &mut parent)
        .expect("make executes");
    parent
        .method_state_mut()
        .assign_register(0, Value::Int(5))
        .unwrap();

    let mut child = parent.child();
    assert!(child.is_class_initialized(MAIN));
    assert_eq!(
        child.method_state().read_register(0).unwrap(),
        &Value::Int(5)
    );

    child
        .method_state_mut()
        .assign_register(0, Value::Int(6))
        .unwrap();
    child.class_state_mut(MAIN).poke_field("flag", Value::Null);

    assert_eq!(
        parent.method_state().read_register(0).unwrap(),
        &Value::Int(5)
    );
    assert_eq!(
        parent.get_class_state(MAIN).peek_field("flag"),
        Some(&Value::Int(1))
    );
}

#[test]
fn test_run_all_gives_each_method_an_isolated_path() {
    let vm = build_vm();
    let make = format!("{MAIN}->make()V");
    let make_array = format!("{MAIN}->makeArray()V");
    let descriptors = [
        make.as_str(),
        make.as_str(),
        make_array.as_str(),
        make.as_str(),
    ];

    let results = DexVm::run_all(&vm, &descriptors);
    assert_eq!(results.len(), descriptors.len());

    // Every make() runs against a fresh context, so each one re-initializes
    // the class and reports the same weak classification; no path sees
    // another's initialization.
    for (descriptor, graph) in &results[..2] {
        assert_eq!(descriptor, &make);
        assert_eq!(
            graph.as_ref().map(ExecutionGraph::strongest_side_effect),
            Some(SideEffectLevel::Weak)
        );
    }
    assert_eq!(
        results[2].1.as_ref().map(ExecutionGraph::strongest_side_effect),
        Some(SideEffectLevel::None)
    );
    assert_eq!(
        results[3].1.as_ref().map(ExecutionGraph::strongest_side_effect),
        Some(SideEffectLevel::Weak)
    );
}
