//! Side-effect-free allocation allow-list.
//!
//! External classes cannot be analyzed, so allocating one is normally
//! assumed to have arbitrary side effects. The classes here are the
//! exception: value-like platform types whose constructors and static
//! initializers are known to touch nothing observable. Allocating one
//! classifies as [`SideEffectLevel::None`](crate::execution::SideEffectLevel::None).
//!
//! Membership is deliberately small. A type belongs here only when every
//! path through its initialization is effect-free; when in doubt, leave it
//! out and let the conservative default stand.

use crate::types::names;

/// Platform classes with effect-free construction, internal format, sorted.
static SAFE_CLASSES: &[&str] = &[
    "Ljava/lang/Boolean;",
    "Ljava/lang/Byte;",
    "Ljava/lang/Character;",
    "Ljava/lang/Double;",
    "Ljava/lang/Float;",
    "Ljava/lang/Integer;",
    "Ljava/lang/Long;",
    "Ljava/lang/Object;",
    "Ljava/lang/Short;",
    "Ljava/lang/String;",
    "Ljava/lang/StringBuffer;",
    "Ljava/lang/StringBuilder;",
    "Ljava/util/ArrayList;",
    "Ljava/util/HashMap;",
    "Ljava/util/HashSet;",
    "Ljava/util/LinkedHashMap;",
    "Ljava/util/LinkedHashSet;",
    "Ljava/util/LinkedList;",
];

/// Returns true when allocating the class is known to be effect-free.
///
/// Covers the fixed class list above plus primitive types and their
/// wrappers.
///
/// # Example
///
/// ```rust
/// use dexscope::execution::is_safe_allocation;
///
/// assert!(is_safe_allocation("Ljava/lang/StringBuilder;"));
/// assert!(is_safe_allocation("Ljava/lang/Integer;"));
/// assert!(!is_safe_allocation("Ljava/io/File;"));
/// ```
#[must_use]
pub fn is_safe_allocation(class_name: &str) -> bool {
    SAFE_CLASSES.binary_search(&class_name).is_ok() || names::is_primitive_or_wrapper(class_name)
}
