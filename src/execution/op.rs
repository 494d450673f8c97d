//! Dalvik op catalog and execution.
//!
//! Each op is an [`Op`]: a code address, the address of the following op,
//! and an [`OpKind`] carrying the operands. Execution happens in
//! [`Op::execute`], a single exhaustive dispatch over the kind; adding an
//! op means adding a variant and an arm, and the compiler points at every
//! site that needs updating.
//!
//! Executing an op returns an [`OpOutcome`]: the addresses execution can
//! flow to next and the side effect this particular execution had. Side
//! effects are computed per execution, never cached on the op, because the
//! same op can classify differently on different paths (an allocation's
//! effect depends on what the class's initializer did on *this* path).
//!
//! # Side-Effect Rules
//!
//! - `const`, `return-void`: never an effect.
//! - `new-instance`: initializes a local class and adopts its recorded
//!   level; allow-listed external classes are
//!   [`None`](SideEffectLevel::None); all other external classes are
//!   [`Strong`](SideEffectLevel::Strong).
//! - `new-array`: never an effect, and crucially never initializes the
//!   component class. Dalvik only initializes on instance creation or
//!   static member access, not on array allocation.
//! - `sget`: initializes the owning class and adopts its recorded level.
//! - `sput`: at least [`Weak`](SideEffectLevel::Weak), raised to the owning
//!   class's recorded level when initialization carried a stronger one.

use std::{fmt, sync::Arc};

use crate::{
    execution::{
        allowlist::is_safe_allocation, ExecutionContext, HeapObject, SideEffectLevel, Value,
    },
    types::names,
    Result,
};

/// Reference to a static field: owning class, field name, type descriptor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldRef {
    /// Owning class, internal format.
    pub class_name: Arc<str>,
    /// Field name.
    pub name: Arc<str>,
    /// Field type descriptor, internal format.
    pub descriptor: Arc<str>,
}

impl FieldRef {
    /// Creates a field reference.
    #[must_use]
    pub fn new(class_name: &str, name: &str, descriptor: &str) -> Self {
        FieldRef {
            class_name: Arc::from(class_name),
            name: Arc::from(name),
            descriptor: Arc::from(descriptor),
        }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}:{}", self.class_name, self.name, self.descriptor)
    }
}

/// What one execution of an op did: where control can go and what effect
/// the op had.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpOutcome {
    /// Addresses execution can continue at; empty for method exits.
    pub successors: Vec<u32>,
    /// Side effect of this particular execution.
    pub side_effect: SideEffectLevel,
}

/// Operands for each supported op.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OpKind {
    /// Loads a literal into a register.
    Const {
        /// Destination register.
        dest: u16,
        /// Literal value.
        literal: i32,
    },
    /// Allocates an instance of a class, initializing it if local.
    NewInstance {
        /// Destination register for the reference.
        dest: u16,
        /// Class to instantiate, internal format.
        class_name: Arc<str>,
    },
    /// Allocates an array with a length taken from a register.
    NewArray {
        /// Destination register for the reference.
        dest: u16,
        /// Register holding the element count.
        length_register: u16,
        /// Array type descriptor, internal format (e.g. `[I`).
        array_type: Arc<str>,
    },
    /// Reads a static field into a register.
    StaticGet {
        /// Destination register.
        dest: u16,
        /// Field to read.
        field: FieldRef,
    },
    /// Writes a register into a static field.
    StaticPut {
        /// Register holding the value to store.
        source: u16,
        /// Field to write.
        field: FieldRef,
    },
    /// Returns from a `void` method.
    ReturnVoid,
}

/// One op in a method body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Op {
    address: u32,
    next_address: u32,
    kind: OpKind,
}

impl Op {
    /// Creates an op at `address` whose fall-through successor is
    /// `next_address`.
    #[must_use]
    pub fn new(address: u32, next_address: u32, kind: OpKind) -> Self {
        Op {
            address,
            next_address,
            kind,
        }
    }

    /// Returns the op's code address.
    #[must_use]
    pub fn address(&self) -> u32 {
        self.address
    }

    /// Returns the address of the op that follows in code order.
    #[must_use]
    pub fn next_address(&self) -> u32 {
        self.next_address
    }

    /// Returns the op's operands.
    #[must_use]
    pub fn kind(&self) -> &OpKind {
        &self.kind
    }

    /// Returns the smali mnemonic for this op.
    #[must_use]
    pub fn mnemonic(&self) -> &'static str {
        match &self.kind {
            OpKind::Const { .. } => "const",
            OpKind::NewInstance { .. } => "new-instance",
            OpKind::NewArray { .. } => "new-array",
            OpKind::StaticGet { .. } => "sget",
            OpKind::StaticPut { .. } => "sput",
            OpKind::ReturnVoid => "return-void",
        }
    }

    /// Executes this op against a context.
    ///
    /// # Errors
    ///
    /// Returns an error when an operand register is out of bounds for the
    /// current frame.
    ///
    /// # Panics
    ///
    /// Panics when the context has no method frame; engines assign one
    /// before executing ops.
    pub fn execute(&self, context: &mut ExecutionContext) -> Result<OpOutcome> {
        match &self.kind {
            OpKind::Const { dest, literal } => {
                context
                    .method_state_mut()
                    .assign_register(*dest, Value::Int(*literal))?;
                Ok(self.flow_to_next(SideEffectLevel::None))
            }

            OpKind::NewInstance { dest, class_name } => {
                let (level, object) = if context.vm().is_local_class(class_name) {
                    context.statically_initialize_class_if_necessary(class_name);
                    // Unrecorded here means the class is mid-initialization,
                    // as in a singleton's initializer allocating its own
                    // class; those ops classify through their own record.
                    let level = context
                        .peek_class_side_effect(class_name)
                        .unwrap_or(SideEffectLevel::None);
                    (level, HeapObject::local_instance(class_name))
                } else if is_safe_allocation(class_name) {
                    (
                        SideEffectLevel::None,
                        HeapObject::opaque_instance(class_name),
                    )
                } else {
                    (
                        SideEffectLevel::Strong,
                        HeapObject::uninitialized_instance(class_name),
                    )
                };

                let reference = context.heap_mut().alloc(object);
                context
                    .method_state_mut()
                    .assign_register(*dest, Value::Object(reference))?;
                Ok(self.flow_to_next(level))
            }

            OpKind::NewArray {
                dest,
                length_register,
                array_type,
            } => {
                // No initialization trigger here, even for local component
                // classes.
                let length = context
                    .method_state()
                    .read_register(*length_register)?
                    .clone();
                let value = match length {
                    Value::Int(count) if count >= 0 => {
                        let element_type = names::component_type(array_type);
                        let elements =
                            vec![Value::default_for(element_type); count.unsigned_abs() as usize];
                        let reference = context.heap_mut().alloc_array(element_type, elements);
                        Value::Object(reference)
                    }
                    _ => Value::unknown(array_type),
                };
                context.method_state_mut().assign_register(*dest, value)?;
                Ok(self.flow_to_next(SideEffectLevel::None))
            }

            OpKind::StaticGet { dest, field } => {
                let (level, value) = if context.vm().is_local_class(&field.class_name) {
                    // Touching the statics initializes the class first.
                    let value = context
                        .get_class_state(&field.class_name)
                        .peek_field(&field.name)
                        .cloned()
                        .unwrap_or_else(|| Value::default_for(&field.descriptor));
                    let level = context
                        .peek_class_side_effect(&field.class_name)
                        .unwrap_or(SideEffectLevel::None);
                    (level, value)
                } else {
                    (SideEffectLevel::None, Value::unknown(&field.descriptor))
                };
                context.method_state_mut().assign_register(*dest, value)?;
                Ok(self.flow_to_next(level))
            }

            OpKind::StaticPut { source, field } => {
                let value = context.method_state().read_register(*source)?.clone();
                let level = if context.vm().is_local_class(&field.class_name) {
                    context
                        .class_state_mut(&field.class_name)
                        .poke_field(&field.name, value);
                    context
                        .peek_class_side_effect(&field.class_name)
                        .unwrap_or(SideEffectLevel::None)
                        .strongest(SideEffectLevel::Weak)
                } else {
                    // The write happens somewhere the analysis cannot see.
                    SideEffectLevel::Weak
                };
                Ok(self.flow_to_next(level))
            }

            OpKind::ReturnVoid => Ok(OpOutcome {
                successors: Vec::new(),
                side_effect: SideEffectLevel::None,
            }),
        }
    }

    fn flow_to_next(&self, side_effect: SideEffectLevel) -> OpOutcome {
        OpOutcome {
            successors: vec![self.next_address],
            side_effect,
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            OpKind::Const { dest, literal } => {
                write!(f, "const v{dest}, {literal:#x}")
            }
            OpKind::NewInstance { dest, class_name } => {
                write!(f, "new-instance v{dest}, {class_name}")
            }
            OpKind::NewArray {
                dest,
                length_register,
                array_type,
            } => write!(f, "new-array v{dest}, v{length_register}, {array_type}"),
            OpKind::StaticGet { dest, field } => write!(f, "sget v{dest}, {field}"),
            OpKind::StaticPut { source, field } => write!(f, "sput v{source}, {field}"),
            OpKind::ReturnVoid => write!(f, "return-void"),
        }
    }
}
