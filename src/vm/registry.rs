//! Class and method definitions and their lookup registry.
//!
//! The registry is the engine's picture of the analyzed input: every class
//! it knows, each class's static fields (with declared initial values, when
//! the source carried one), and each method's body as a list of ops.
//! Definitions are built programmatically through
//! [`ClassDefinitionBuilder`] and shared as `Arc`s, so lookups are cheap
//! and concurrent analyses can hold the same definitions.

use std::{collections::HashMap, sync::Arc};

use bitflags::bitflags;
use dashmap::DashMap;

use crate::execution::{Op, Value};

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    /// Dalvik access flags for classes, fields, and methods.
    pub struct AccessFlags: u32 {
        /// Visible everywhere
        const PUBLIC = 0x0001;
        /// Visible only to the declaring class
        const PRIVATE = 0x0002;
        /// Visible to the package and subclasses
        const PROTECTED = 0x0004;
        /// Belongs to the class, not instances
        const STATIC = 0x0008;
        /// Not overridable or reassignable
        const FINAL = 0x0010;
        /// Method acquires a monitor around its body
        const SYNCHRONIZED = 0x0020;
        /// Field reads and writes are not cached (bridge on methods)
        const VOLATILE = 0x0040;
        /// Field is skipped by default serialization (varargs on methods)
        const TRANSIENT = 0x0080;
        /// Method is implemented outside the bytecode
        const NATIVE = 0x0100;
        /// Type is an interface
        const INTERFACE = 0x0200;
        /// Type or method has no implementation
        const ABSTRACT = 0x0400;
        /// Strict IEEE 754 floating point
        const STRICT = 0x0800;
        /// Emitted by the compiler, absent from source
        const SYNTHETIC = 0x1000;
        /// Type is an annotation
        const ANNOTATION = 0x2000;
        /// Type or field is an enum member
        const ENUM = 0x4000;
        /// Method is a constructor or static initializer
        const CONSTRUCTOR = 0x1_0000;
        /// `synchronized` declared in source, emitted unsynchronized
        const DECLARED_SYNCHRONIZED = 0x2_0000;
    }
}

/// Static field declared by a class.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldDefinition {
    /// Field name.
    pub name: Arc<str>,
    /// Type descriptor, internal format.
    pub descriptor: Arc<str>,
    /// Access flags.
    pub access: AccessFlags,
    /// Declared initial value, when the source carried one.
    pub initial_value: Option<Value>,
}

/// Method defined with a body in the analyzed input.
#[derive(Clone, Debug, PartialEq)]
pub struct MethodDefinition {
    descriptor: Arc<str>,
    access: AccessFlags,
    register_count: u16,
    ops: Vec<Op>,
}

impl MethodDefinition {
    /// Creates a method from its full descriptor
    /// (`Lcom/example/Main;->run()V`), flags, frame size, and body.
    #[must_use]
    pub fn new(descriptor: &str, access: AccessFlags, register_count: u16, ops: Vec<Op>) -> Self {
        MethodDefinition {
            descriptor: Arc::from(descriptor),
            access,
            register_count,
            ops,
        }
    }

    /// Returns the full method descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    /// Returns the method's access flags.
    #[must_use]
    pub fn access(&self) -> AccessFlags {
        self.access
    }

    /// Returns the number of registers the method's frame declares.
    #[must_use]
    pub fn register_count(&self) -> u16 {
        self.register_count
    }

    /// Returns the method body in code order.
    #[must_use]
    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    /// Returns the op at a code address, if the body has one there.
    #[must_use]
    pub fn op_at(&self, address: u32) -> Option<&Op> {
        self.ops.iter().find(|op| op.address() == address)
    }

    /// Returns the address execution starts at, `None` for an empty body.
    #[must_use]
    pub fn entry_address(&self) -> Option<u32> {
        self.ops.first().map(Op::address)
    }

    /// Returns true for `static` methods, `<clinit>` included.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.access.contains(AccessFlags::STATIC)
    }
}

/// Class defined in the analyzed input.
#[derive(Clone, Debug)]
pub struct ClassDefinition {
    name: Arc<str>,
    access: AccessFlags,
    static_fields: Vec<FieldDefinition>,
    methods: HashMap<String, Arc<MethodDefinition>>,
}

impl ClassDefinition {
    /// Starts building a class with the given name, internal format.
    #[must_use]
    pub fn builder(name: &str) -> ClassDefinitionBuilder {
        ClassDefinitionBuilder::new(name)
    }

    /// Returns the class name, internal format.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the class's access flags.
    #[must_use]
    pub fn access(&self) -> AccessFlags {
        self.access
    }

    /// Returns the class's static fields.
    #[must_use]
    pub fn static_fields(&self) -> &[FieldDefinition] {
        &self.static_fields
    }

    /// Returns a method by full descriptor.
    #[must_use]
    pub fn method(&self, descriptor: &str) -> Option<&Arc<MethodDefinition>> {
        self.methods.get(descriptor)
    }

    /// Iterates over the class's methods in no particular order.
    pub fn methods(&self) -> impl Iterator<Item = &Arc<MethodDefinition>> + '_ {
        self.methods.values()
    }
}

/// Fluent builder for [`ClassDefinition`].
///
/// # Example
///
/// ```rust
/// use dexscope::vm::{AccessFlags, ClassDefinition, MethodDefinition};
///
/// let class = ClassDefinition::builder("Lcom/example/Main;")
///     .access(AccessFlags::PUBLIC)
///     .static_field("count", "I", None)
///     .method(MethodDefinition::new(
///         "Lcom/example/Main;->run()V",
///         AccessFlags::PUBLIC,
///         1,
///         Vec::new(),
///     ))
///     .build();
///
/// assert_eq!(class.name(), "Lcom/example/Main;");
/// assert_eq!(class.static_fields().len(), 1);
/// ```
#[derive(Debug)]
pub struct ClassDefinitionBuilder {
    name: Arc<str>,
    access: AccessFlags,
    static_fields: Vec<FieldDefinition>,
    methods: HashMap<String, Arc<MethodDefinition>>,
}

impl ClassDefinitionBuilder {
    /// Starts a builder for the given class name, internal format.
    #[must_use]
    pub fn new(name: &str) -> Self {
        ClassDefinitionBuilder {
            name: Arc::from(name),
            access: AccessFlags::PUBLIC,
            static_fields: Vec::new(),
            methods: HashMap::new(),
        }
    }

    /// Sets the class's access flags. Defaults to `PUBLIC`.
    #[must_use]
    pub fn access(mut self, access: AccessFlags) -> Self {
        self.access = access;
        self
    }

    /// Declares a static field, optionally with its initial value.
    #[must_use]
    pub fn static_field(mut self, name: &str, descriptor: &str, initial_value: Option<Value>) -> Self {
        self.static_fields.push(FieldDefinition {
            name: Arc::from(name),
            descriptor: Arc::from(descriptor),
            access: AccessFlags::PUBLIC | AccessFlags::STATIC,
            initial_value,
        });
        self
    }

    /// Adds a method, keyed by its full descriptor.
    #[must_use]
    pub fn method(mut self, method: MethodDefinition) -> Self {
        self.methods
            .insert(method.descriptor().to_string(), Arc::new(method));
        self
    }

    /// Finishes the class.
    #[must_use]
    pub fn build(self) -> ClassDefinition {
        ClassDefinition {
            name: self.name,
            access: self.access,
            static_fields: self.static_fields,
            methods: self.methods,
        }
    }
}

/// Concurrent lookup table of every class in the analyzed input.
///
/// Lookups clone `Arc`s out, so holding a definition never blocks other
/// readers and definitions outlive registry mutation.
#[derive(Debug, Default)]
pub struct ClassRegistry {
    classes: DashMap<String, Arc<ClassDefinition>>,
}

impl ClassRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        ClassRegistry {
            classes: DashMap::new(),
        }
    }

    /// Registers a class, returning the previous definition under that name
    /// if one existed.
    pub fn register(&self, class: ClassDefinition) -> Option<Arc<ClassDefinition>> {
        self.classes
            .insert(class.name().to_string(), Arc::new(class))
    }

    /// Returns a class by name, internal format.
    #[must_use]
    pub fn class(&self, class_name: &str) -> Option<Arc<ClassDefinition>> {
        self.classes
            .get(class_name)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Returns true when the class is registered.
    #[must_use]
    pub fn contains_class(&self, class_name: &str) -> bool {
        self.classes.contains_key(class_name)
    }

    /// Returns a method by full descriptor.
    #[must_use]
    pub fn method(&self, method_descriptor: &str) -> Option<Arc<MethodDefinition>> {
        let (class_name, _) = method_descriptor.split_once("->")?;
        let class = self.class(class_name)?;
        class.method(method_descriptor).cloned()
    }

    /// Returns true when the method is registered with a body.
    #[must_use]
    pub fn contains_method(&self, method_descriptor: &str) -> bool {
        self.method(method_descriptor).is_some()
    }

    /// Returns the names of all registered classes, in no particular order.
    #[must_use]
    pub fn class_names(&self) -> Vec<String> {
        self.classes.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Returns the number of registered classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Returns true when no classes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::OpKind;

    fn sample_class() -> ClassDefinition {
        ClassDefinition::builder("Lcom/example/Main;")
            .access(AccessFlags::PUBLIC | AccessFlags::FINAL)
            .static_field("count", "I", Some(Value::Int(10)))
            .method(MethodDefinition::new(
                "Lcom/example/Main;->run()V",
                AccessFlags::PUBLIC,
                2,
                vec![Op::new(0, 1, OpKind::ReturnVoid)],
            ))
            .build()
    }

    #[test]
    fn test_builder() {
        let class = sample_class();
        assert_eq!(class.name(), "Lcom/example/Main;");
        assert!(class.access().contains(AccessFlags::FINAL));
        assert_eq!(class.static_fields().len(), 1);
        assert_eq!(
            class.static_fields()[0].initial_value,
            Some(Value::Int(10))
        );
        assert!(class.method("Lcom/example/Main;->run()V").is_some());
        assert!(class.method("Lcom/example/Main;->stop()V").is_none());
    }

    #[test]
    fn test_method_definition() {
        let method = MethodDefinition::new(
            "Lcom/example/Main;-><clinit>()V",
            AccessFlags::STATIC | AccessFlags::CONSTRUCTOR,
            1,
            vec![
                Op::new(0, 2, OpKind::Const { dest: 0, literal: 1 }),
                Op::new(2, 3, OpKind::ReturnVoid),
            ],
        );

        assert!(method.is_static());
        assert_eq!(method.entry_address(), Some(0));
        assert_eq!(method.op_at(2).map(Op::mnemonic), Some("return-void"));
        assert!(method.op_at(1).is_none());
        assert_eq!(method.ops().len(), 2);
    }

    #[test]
    fn test_empty_method_has_no_entry() {
        let method = MethodDefinition::new(
            "Lcom/example/Main;->gone()V",
            AccessFlags::ABSTRACT,
            0,
            Vec::new(),
        );
        assert_eq!(method.entry_address(), None);
    }

    #[test]
    fn test_registry_lookup() {
        let registry = ClassRegistry::new();
        assert!(registry.is_empty());

        registry.register(sample_class());
        assert_eq!(registry.len(), 1);
        assert!(registry.contains_class("Lcom/example/Main;"));
        assert!(!registry.contains_class("Lcom/example/Other;"));

        let class = registry.class("Lcom/example/Main;").unwrap();
        assert_eq!(class.name(), "Lcom/example/Main;");
    }

    #[test]
    fn test_registry_method_lookup() {
        let registry = ClassRegistry::new();
        registry.register(sample_class());

        let method = registry.method("Lcom/example/Main;->run()V").unwrap();
        assert_eq!(method.register_count(), 2);

        assert!(registry.contains_method("Lcom/example/Main;->run()V"));
        assert!(!registry.contains_method("Lcom/example/Main;->stop()V"));
        assert!(!registry.contains_method("Lcom/example/Other;->run()V"));
        // Not a method descriptor at all.
        assert!(!registry.contains_method("Lcom/example/Main;"));
    }

    #[test]
    fn test_register_replaces() {
        let registry = ClassRegistry::new();
        assert!(registry.register(sample_class()).is_none());
        let previous = registry.register(
            ClassDefinition::builder("Lcom/example/Main;").build(),
        );
        assert!(previous.is_some());
        assert_eq!(registry.len(), 1);
        // The replacement has no methods.
        assert!(!registry.contains_method("Lcom/example/Main;->run()V"));
    }

    #[test]
    fn test_class_names() {
        let registry = ClassRegistry::new();
        registry.register(sample_class());
        registry.register(ClassDefinition::builder("Lcom/example/Other;").build());

        let mut names = registry.class_names();
        names.sort_unstable();
        assert_eq!(names, ["Lcom/example/Main;", "Lcom/example/Other;"]);
    }
}
