//! Static field state for a single class.
//!
//! A [`ClassState`] records the values of one class's static fields as
//! observed along one execution path. Each [`ExecutionContext`] owns a
//! `ClassState` per class it has touched; derived contexts receive
//! independent children so that writes on one path never leak into another.
//!
//! Field values follow a peek/poke discipline: [`ClassState::peek_field`]
//! never mutates, [`ClassState::poke_field`] records an observed write.
//! A field that was never poked reads as `None`; callers decide whether
//! that means the declared default or an unknown.
//!
//! [`ExecutionContext`]: crate::execution::ExecutionContext

use std::sync::Arc;

use imbl::HashMap as ImHashMap;

use crate::execution::Value;

/// Values of one class's static fields along one execution path.
///
/// # Example
///
/// ```rust
/// use dexscope::execution::{ClassState, Value};
///
/// let mut state = ClassState::new("Lcom/example/Config;");
/// state.poke_field("DEBUG", Value::Int(1));
///
/// assert_eq!(state.peek_field("DEBUG"), Some(&Value::Int(1)));
/// assert_eq!(state.peek_field("VERSION"), None);
/// ```
#[derive(Debug, PartialEq)]
pub struct ClassState {
    class_name: Arc<str>,
    fields: ImHashMap<Arc<str>, Value>,
}

impl ClassState {
    /// Creates an empty state for the given class, internal format.
    #[must_use]
    pub fn new(class_name: &str) -> Self {
        ClassState {
            class_name: Arc::from(class_name),
            fields: ImHashMap::new(),
        }
    }

    /// Returns the class this state belongs to, internal format.
    #[must_use]
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Records a static field write.
    pub fn poke_field(&mut self, field_name: &str, value: Value) {
        self.fields.insert(Arc::from(field_name), value);
    }

    /// Reads a static field without mutating anything.
    ///
    /// Returns `None` when the field has never been poked on this path.
    #[must_use]
    pub fn peek_field(&self, field_name: &str) -> Option<&Value> {
        self.fields.get(field_name)
    }

    /// Returns true when the field has been poked on this path.
    #[must_use]
    pub fn has_field(&self, field_name: &str) -> bool {
        self.fields.contains_key(field_name)
    }

    /// Iterates over the names of all poked fields, in no particular order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields.keys().map(Arc::as_ref)
    }

    /// Returns the number of poked fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true when no field has been poked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Derives an independent state for a child path.
    ///
    /// The child starts with the same field values; pokes on either side are
    /// invisible to the other. O(1) via structural sharing.
    #[must_use]
    pub fn child(&self) -> Self {
        ClassState {
            class_name: Arc::clone(&self.class_name),
            fields: self.fields.clone(),
        }
    }
}

impl Clone for ClassState {
    fn clone(&self) -> Self {
        self.child()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peek_poke() {
        let mut state = ClassState::new("Lcom/example/Main;");
        assert_eq!(state.class_name(), "Lcom/example/Main;");
        assert!(state.is_empty());
        assert!(!state.has_field("total"));

        state.poke_field("total", Value::Int(42));
        assert_eq!(state.peek_field("total"), Some(&Value::Int(42)));
        assert!(state.has_field("total"));
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_poke_overwrites() {
        let mut state = ClassState::new("Lcom/example/Main;");
        state.poke_field("total", Value::Int(1));
        state.poke_field("total", Value::Int(2));
        assert_eq!(state.peek_field("total"), Some(&Value::Int(2)));
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_child_sees_parent_values() {
        let mut parent = ClassState::new("Lcom/example/Main;");
        parent.poke_field("total", Value::Int(7));

        let child = parent.child();
        assert_eq!(child.class_name(), "Lcom/example/Main;");
        assert_eq!(child.peek_field("total"), Some(&Value::Int(7)));
    }

    #[test]
    fn test_child_isolation() {
        let mut parent = ClassState::new("Lcom/example/Main;");
        parent.poke_field("total", Value::Int(7));

        let mut child = parent.child();
        child.poke_field("total", Value::Int(8));
        parent.poke_field("extra", Value::Null);

        assert_eq!(parent.peek_field("total"), Some(&Value::Int(7)));
        assert_eq!(child.peek_field("total"), Some(&Value::Int(8)));
        assert!(!child.has_field("extra"));
    }

    #[test]
    fn test_field_names() {
        let mut state = ClassState::new("Lcom/example/Main;");
        state.poke_field("a", Value::Int(0));
        state.poke_field("b", Value::Null);

        let mut names: Vec<&str> = state.field_names().collect();
        names.sort_unstable();
        assert_eq!(names, ["a", "b"]);
    }
}
