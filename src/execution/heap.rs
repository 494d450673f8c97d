//! Abstract heap for one execution path.
//!
//! This module provides [`Heap`], the object store shared by all state along
//! a single analyzed path. It supports allocation of:
//!
//! - **Local instances** - objects of analyzable classes, with tracked fields
//! - **Opaque instances** - objects of allow-listed external classes, usable
//!   but not field-tracked
//! - **Uninitialized instances** - storage allocated before any constructor
//!   has run
//! - **Arrays** - element storage with a tracked component type
//!
//! # Identity and Forking
//!
//! Objects are referenced via [`HeapRef`], an opaque handle whose id is
//! stable across [`Heap::fork`]. Forking is the unit of path isolation: the
//! fork and the original resolve the same ids to independent objects, and
//! mutations on either side are invisible to the other.
//!
//! # Copy-on-Write Semantics
//!
//! The store is an `imbl::HashMap`, so `fork()` is O(1) via structural
//! sharing and only entries mutated after the fork are actually copied.
//! Because every path owns its heap exclusively, no locking is involved;
//! isolation is structural.

use std::{fmt, sync::Arc};

use imbl::HashMap as ImHashMap;

use crate::{
    execution::{ExecutionError, HeapRef, Value},
    Result,
};

/// Object stored on the abstract heap.
///
/// The three instance variants encode how much the analysis knows about an
/// object: locally-defined classes get tracked fields, allow-listed external
/// classes get an opaque placeholder, and storage allocated before
/// construction is kept distinct so later analysis can see that no
/// constructor has run.
#[derive(Clone, Debug, PartialEq)]
pub enum HeapObject {
    /// Instance of an analyzable class with tracked instance fields.
    LocalInstance {
        /// Class of the instance, internal format.
        class_name: Arc<str>,
        /// Field name to value, populated as writes are observed.
        fields: ImHashMap<Arc<str>, Value>,
    },
    /// Instance of an allow-listed external class; usable as an operand but
    /// its internals are not modeled.
    OpaqueInstance {
        /// Class of the instance, internal format.
        class_name: Arc<str>,
    },
    /// Storage allocated by `new-instance` before any constructor ran.
    UninitializedInstance {
        /// Class of the instance, internal format.
        class_name: Arc<str>,
    },
    /// Array storage with a tracked component type.
    Array {
        /// Component descriptor, internal format (e.g. `I` for an `int[]`).
        element_type: Arc<str>,
        /// Element values, index for index.
        elements: Vec<Value>,
    },
}

impl HeapObject {
    /// Creates a local instance with no fields observed yet.
    #[must_use]
    pub fn local_instance(class_name: &str) -> Self {
        HeapObject::LocalInstance {
            class_name: Arc::from(class_name),
            fields: ImHashMap::new(),
        }
    }

    /// Creates an opaque instance of an external class.
    #[must_use]
    pub fn opaque_instance(class_name: &str) -> Self {
        HeapObject::OpaqueInstance {
            class_name: Arc::from(class_name),
        }
    }

    /// Creates an allocated-but-unconstructed instance.
    #[must_use]
    pub fn uninitialized_instance(class_name: &str) -> Self {
        HeapObject::UninitializedInstance {
            class_name: Arc::from(class_name),
        }
    }

    /// Creates an array with the given component descriptor and elements.
    #[must_use]
    pub fn array(element_type: &str, elements: Vec<Value>) -> Self {
        HeapObject::Array {
            element_type: Arc::from(element_type),
            elements,
        }
    }

    /// Returns a static label describing the object kind, used in
    /// diagnostics and type-mismatch errors.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            HeapObject::LocalInstance { .. } => "LocalInstance",
            HeapObject::OpaqueInstance { .. } => "OpaqueInstance",
            HeapObject::UninitializedInstance { .. } => "UninitializedInstance",
            HeapObject::Array { .. } => "Array",
        }
    }

    /// Returns the class of an instance, or `None` for arrays.
    #[must_use]
    pub fn class_name(&self) -> Option<&str> {
        match self {
            HeapObject::LocalInstance { class_name, .. }
            | HeapObject::OpaqueInstance { class_name }
            | HeapObject::UninitializedInstance { class_name } => Some(class_name),
            HeapObject::Array { .. } => None,
        }
    }
}

impl fmt::Display for HeapObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeapObject::LocalInstance { class_name, .. } => {
                write!(f, "LocalInstance({class_name})")
            }
            HeapObject::OpaqueInstance { class_name } => {
                write!(f, "OpaqueInstance({class_name})")
            }
            HeapObject::UninitializedInstance { class_name } => {
                write!(f, "UninitializedInstance({class_name})")
            }
            HeapObject::Array {
                element_type,
                elements,
            } => write!(f, "Array({element_type}, len={})", elements.len()),
        }
    }
}

/// Object store for one execution path.
///
/// Created once per root context and forked alongside the context for every
/// derived frame or speculative branch. See the module documentation for the
/// identity and isolation rules.
///
/// # Example
///
/// ```rust
/// use dexscope::execution::{Heap, HeapObject, Value};
///
/// let mut heap = Heap::new();
/// let reference = heap.alloc(HeapObject::local_instance("Lcom/example/Foo;"));
///
/// let mut fork = heap.fork();
/// fork.set_instance_field(reference, "count", Value::Int(5)).unwrap();
///
/// // The original never sees the fork's write.
/// assert_eq!(heap.instance_field(reference, "count").unwrap(), None);
/// ```
#[derive(Debug, PartialEq)]
pub struct Heap {
    objects: ImHashMap<u64, HeapObject>,
    next_id: u64,
}

impl Heap {
    /// Creates an empty heap.
    #[must_use]
    pub fn new() -> Self {
        Heap {
            objects: ImHashMap::new(),
            next_id: 0,
        }
    }

    /// Allocates an object and returns its reference.
    ///
    /// Ids are handed out monotonically and never reused within a lineage.
    pub fn alloc(&mut self, object: HeapObject) -> HeapRef {
        let reference = HeapRef::new(self.next_id);
        self.next_id += 1;
        self.objects.insert(reference.id(), object);
        reference
    }

    /// Allocates a [`HeapObject::LocalInstance`] of the given class.
    pub fn alloc_local_instance(&mut self, class_name: &str) -> HeapRef {
        self.alloc(HeapObject::local_instance(class_name))
    }

    /// Allocates a [`HeapObject::OpaqueInstance`] of the given class.
    pub fn alloc_opaque_instance(&mut self, class_name: &str) -> HeapRef {
        self.alloc(HeapObject::opaque_instance(class_name))
    }

    /// Allocates a [`HeapObject::UninitializedInstance`] of the given class.
    pub fn alloc_uninitialized_instance(&mut self, class_name: &str) -> HeapRef {
        self.alloc(HeapObject::uninitialized_instance(class_name))
    }

    /// Allocates a [`HeapObject::Array`] with the given component descriptor
    /// and elements.
    pub fn alloc_array(&mut self, element_type: &str, elements: Vec<Value>) -> HeapRef {
        self.alloc(HeapObject::array(element_type, elements))
    }

    /// Resolves a reference to the stored object.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::InvalidHeapReference`] when the reference
    /// does not identify a live object in this heap.
    pub fn get(&self, reference: HeapRef) -> Result<&HeapObject> {
        self.objects
            .get(&reference.id())
            .ok_or_else(|| ExecutionError::InvalidHeapReference { reference }.into())
    }

    /// Resolves a reference to the stored object for mutation.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::InvalidHeapReference`] when the reference
    /// does not identify a live object in this heap.
    pub fn get_mut(&mut self, reference: HeapRef) -> Result<&mut HeapObject> {
        self.objects
            .get_mut(&reference.id())
            .ok_or_else(|| ExecutionError::InvalidHeapReference { reference }.into())
    }

    /// Reads a tracked field of a [`HeapObject::LocalInstance`].
    ///
    /// Returns `None` when the instance has not had that field written.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::InvalidHeapReference`] for dangling
    /// references and [`ExecutionError::HeapTypeMismatch`] when the object is
    /// not a local instance.
    pub fn instance_field(&self, reference: HeapRef, field_name: &str) -> Result<Option<&Value>> {
        match self.get(reference)? {
            HeapObject::LocalInstance { fields, .. } => Ok(fields.get(field_name)),
            other => Err(ExecutionError::HeapTypeMismatch {
                expected: "LocalInstance",
                found: other.kind(),
            }
            .into()),
        }
    }

    /// Writes a tracked field of a [`HeapObject::LocalInstance`].
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::InvalidHeapReference`] for dangling
    /// references and [`ExecutionError::HeapTypeMismatch`] when the object is
    /// not a local instance.
    pub fn set_instance_field(
        &mut self,
        reference: HeapRef,
        field_name: &str,
        value: Value,
    ) -> Result<()> {
        match self.get_mut(reference)? {
            HeapObject::LocalInstance { fields, .. } => {
                fields.insert(Arc::from(field_name), value);
                Ok(())
            }
            other => Err(ExecutionError::HeapTypeMismatch {
                expected: "LocalInstance",
                found: other.kind(),
            }
            .into()),
        }
    }

    /// Returns true when the reference resolves in this heap.
    #[must_use]
    pub fn contains(&self, reference: HeapRef) -> bool {
        self.objects.contains_key(&reference.id())
    }

    /// Returns the number of live objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns true when no objects have been allocated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Iterates over all live objects in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (HeapRef, &HeapObject)> + '_ {
        self.objects
            .iter()
            .map(|(id, object)| (HeapRef::new(*id), object))
    }

    /// Forks this heap into an independent copy.
    ///
    /// This is an O(1) operation: both heaps share structure until one of
    /// them mutates an entry. Ids already handed out resolve identically on
    /// both sides; objects allocated after the fork are private to their
    /// side.
    #[must_use]
    pub fn fork(&self) -> Self {
        Heap {
            objects: self.objects.clone(),
            next_id: self.next_id,
        }
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Heap {
    fn clone(&self) -> Self {
        self.fork()
    }
}
