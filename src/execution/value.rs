//! Abstract register values.

use std::{fmt, sync::Arc};

/// Reference to an object stored in a [`Heap`](crate::execution::Heap).
///
/// `HeapRef` is an opaque handle with reference-equality semantics: two
/// `HeapRef` values are equal when they identify the same abstract object.
/// Identifiers are stable across [`Heap::fork`](crate::execution::Heap::fork),
/// so a reference captured before a fork resolves to the corresponding
/// (independent) object in both copies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HeapRef(pub(crate) u64);

impl HeapRef {
    /// Creates a heap reference with the given id.
    ///
    /// Normally called by [`Heap`](crate::execution::Heap) during allocation.
    #[must_use]
    pub fn new(id: u64) -> Self {
        HeapRef(id)
    }

    /// Returns the internal id of this reference.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for HeapRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "obj@{}", self.0)
    }
}

/// Abstract value held in a register or a field.
///
/// Dalvik registers are untyped 32-bit cells with register pairs for wide
/// values; this abstraction keeps one `Value` per logical quantity instead of
/// modeling the pair layout. Values that cannot be determined statically are
/// represented as [`Value::Unknown`] carrying the declared type descriptor,
/// so analyses degrade by approximation instead of failing.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// 32-bit integer family (`int`, `short`, `byte`, `char`, `boolean`).
    Int(i32),
    /// 64-bit integer (`long`), occupying a register pair in real Dalvik.
    Wide(i64),
    /// 32-bit IEEE float.
    Float(f32),
    /// 64-bit IEEE double, occupying a register pair in real Dalvik.
    Double(f64),
    /// Reference to a heap object.
    Object(HeapRef),
    /// The null reference.
    Null,
    /// A value that could not be determined, with its declared type
    /// descriptor (internal format).
    Unknown(Arc<str>),
}

impl Value {
    /// Creates a [`Value::Unknown`] carrying the declared type descriptor.
    #[must_use]
    pub fn unknown(type_descriptor: &str) -> Self {
        Value::Unknown(Arc::from(type_descriptor))
    }

    /// Returns the zero value for a field or array-element descriptor.
    ///
    /// Primitives map to their numeric zero, reference types to
    /// [`Value::Null`]. Descriptors that are not recognizable degrade to
    /// [`Value::Unknown`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dexscope::execution::Value;
    ///
    /// assert_eq!(Value::default_for("I"), Value::Int(0));
    /// assert_eq!(Value::default_for("J"), Value::Wide(0));
    /// assert_eq!(Value::default_for("Ljava/lang/String;"), Value::Null);
    /// ```
    #[must_use]
    pub fn default_for(descriptor: &str) -> Self {
        match descriptor {
            "I" | "S" | "B" | "C" | "Z" => Value::Int(0),
            "J" => Value::Wide(0),
            "F" => Value::Float(0.0),
            "D" => Value::Double(0.0),
            _ if descriptor.starts_with('L') || descriptor.starts_with('[') => Value::Null,
            _ => Value::unknown(descriptor),
        }
    }

    /// Returns true when the value is statically known (not
    /// [`Value::Unknown`]).
    #[must_use]
    pub fn is_known(&self) -> bool {
        !matches!(self, Value::Unknown(_))
    }

    /// Returns true for [`Value::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the heap reference when the value is an object reference.
    #[must_use]
    pub fn as_object(&self) -> Option<HeapRef> {
        match self {
            Value::Object(reference) => Some(*reference),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(value) => write!(f, "{value}"),
            Value::Wide(value) => write!(f, "{value}L"),
            Value::Float(value) => write!(f, "{value}f"),
            Value::Double(value) => write!(f, "{value}"),
            Value::Object(reference) => write!(f, "{reference}"),
            Value::Null => write!(f, "null"),
            Value::Unknown(descriptor) => write!(f, "unknown<{descriptor}>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heap_ref_identity() {
        let a = HeapRef::new(7);
        let b = HeapRef::new(7);
        let c = HeapRef::new(8);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.id(), 7);
        assert_eq!(a.to_string(), "obj@7");
    }

    #[test]
    fn test_default_for_primitives() {
        assert_eq!(Value::default_for("I"), Value::Int(0));
        assert_eq!(Value::default_for("Z"), Value::Int(0));
        assert_eq!(Value::default_for("J"), Value::Wide(0));
        assert_eq!(Value::default_for("F"), Value::Float(0.0));
        assert_eq!(Value::default_for("D"), Value::Double(0.0));
    }

    #[test]
    fn test_default_for_references() {
        assert_eq!(Value::default_for("Ljava/lang/String;"), Value::Null);
        assert_eq!(Value::default_for("[I"), Value::Null);
    }

    #[test]
    fn test_default_for_unrecognized() {
        let value = Value::default_for("Q");
        assert!(!value.is_known());
    }

    #[test]
    fn test_predicates() {
        assert!(Value::Int(1).is_known());
        assert!(!Value::unknown("I").is_known());
        assert!(Value::Null.is_null());
        assert!(!Value::Int(0).is_null());
        assert_eq!(Value::Object(HeapRef::new(3)).as_object(), Some(HeapRef::new(3)));
        assert_eq!(Value::Null.as_object(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Int(42).to_string(), "42");
        assert_eq!(Value::Wide(9).to_string(), "9L");
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::unknown("I").to_string(), "unknown<I>");
        assert_eq!(Value::Object(HeapRef::new(2)).to_string(), "obj@2");
    }
}
