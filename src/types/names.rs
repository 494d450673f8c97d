//! Type-name format handling for Dalvik and Java class names.
//!
//! Class names travel in three textual formats, and different layers of an
//! analysis pipeline prefer different ones:
//!
//! | Format   | Scalar example        | Array example           |
//! |----------|-----------------------|-------------------------|
//! | Internal | `Ljava/lang/Object;`  | `[Ljava/lang/Object;`   |
//! | Binary   | `java.lang.Object`    | `[Ljava.lang.Object;`   |
//! | Source   | `java.lang.Object`    | `java.lang.Object[]`    |
//!
//! Primitives are single letters in the internal format (`I`, `J`, `Z`, ...)
//! and keyword names in the binary and source formats (`int`, `long`,
//! `boolean`, ...). `V` (void) is carried in the primitive tables even though
//! it is not a value type, because method descriptors use it.
//!
//! All functions here are pure string transformations. Malformed names are
//! passed through with separators normalized rather than rejected; callers
//! that need validation should do it before conversion.

use std::fmt;

/// The textual format of a class name.
///
/// See the module documentation for examples of each format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeFormat {
    /// Smali / descriptor format: `Ljava/lang/Object;`, `I`, `[Z`.
    Internal,
    /// JVM binary format: `java.lang.Object`, `int`, `[Ljava.lang.Object;`.
    Binary,
    /// Source / human-readable format: `java.lang.Object`, `int`, `boolean[]`.
    Source,
}

impl fmt::Display for TypeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeFormat::Internal => write!(f, "internal"),
            TypeFormat::Binary => write!(f, "binary"),
            TypeFormat::Source => write!(f, "source"),
        }
    }
}

/// Maps an internal primitive descriptor to its binary keyword name.
fn primitive_to_binary(internal: &str) -> Option<&'static str> {
    match internal {
        "I" => Some("int"),
        "S" => Some("short"),
        "J" => Some("long"),
        "B" => Some("byte"),
        "D" => Some("double"),
        "F" => Some("float"),
        "Z" => Some("boolean"),
        "C" => Some("char"),
        "V" => Some("void"),
        _ => None,
    }
}

/// Maps a binary primitive keyword to its internal descriptor.
fn binary_to_primitive(binary: &str) -> Option<&'static str> {
    match binary {
        "int" => Some("I"),
        "short" => Some("S"),
        "long" => Some("J"),
        "byte" => Some("B"),
        "double" => Some("D"),
        "float" => Some("F"),
        "boolean" => Some("Z"),
        "char" => Some("C"),
        "void" => Some("V"),
        _ => None,
    }
}

/// Maps an internal primitive descriptor to its wrapper class (internal format).
fn primitive_to_wrapper(internal: &str) -> Option<&'static str> {
    match internal {
        "I" => Some("Ljava/lang/Integer;"),
        "S" => Some("Ljava/lang/Short;"),
        "J" => Some("Ljava/lang/Long;"),
        "B" => Some("Ljava/lang/Byte;"),
        "D" => Some("Ljava/lang/Double;"),
        "F" => Some("Ljava/lang/Float;"),
        "Z" => Some("Ljava/lang/Boolean;"),
        "C" => Some("Ljava/lang/Character;"),
        "V" => Some("Ljava/lang/Void;"),
        _ => None,
    }
}

/// Maps a wrapper class (internal format) to its primitive descriptor.
fn wrapper_to_primitive(wrapper: &str) -> Option<&'static str> {
    match wrapper {
        "Ljava/lang/Integer;" => Some("I"),
        "Ljava/lang/Short;" => Some("S"),
        "Ljava/lang/Long;" => Some("J"),
        "Ljava/lang/Byte;" => Some("B"),
        "Ljava/lang/Double;" => Some("D"),
        "Ljava/lang/Float;" => Some("F"),
        "Ljava/lang/Boolean;" => Some("Z"),
        "Ljava/lang/Character;" => Some("C"),
        "Ljava/lang/Void;" => Some("V"),
        _ => None,
    }
}

/// Strips every array dimension from a class name.
///
/// Works with internal and binary formats.
///
/// # Examples
///
/// ```rust
/// use dexscope::types::names::component_base;
///
/// assert_eq!(component_base("[[B"), "B");
/// assert_eq!(component_base("[Ljava/lang/Object;"), "Ljava/lang/Object;");
/// assert_eq!(component_base("I"), "I");
/// ```
#[must_use]
pub fn component_base(class_name: &str) -> &str {
    class_name.trim_start_matches('[')
}

/// Strips a single array dimension from a class name.
///
/// Mirrors `Array.getComponentType`: `[[I` becomes `[I`. Non-array names are
/// returned unchanged.
#[must_use]
pub fn component_type(class_name: &str) -> &str {
    class_name.strip_prefix('[').unwrap_or(class_name)
}

/// Returns the number of array dimensions of a class name.
///
/// # Examples
///
/// ```rust
/// use dexscope::types::names::dimension_count;
///
/// assert_eq!(dimension_count("[[J"), 2);
/// assert_eq!(dimension_count("Ljava/lang/Object;"), 0);
/// ```
#[must_use]
pub fn dimension_count(class_name: &str) -> usize {
    class_name.bytes().take_while(|&b| b == b'[').count()
}

/// Returns true when the class name denotes an array of any dimension.
#[must_use]
pub fn is_array(class_name: &str) -> bool {
    class_name.starts_with('[')
}

/// Converts a binary-format class name into the internal format.
///
/// # Examples
///
/// ```rust
/// use dexscope::types::names::binary_to_internal;
///
/// assert_eq!(binary_to_internal("java.lang.Object"), "Ljava/lang/Object;");
/// assert_eq!(binary_to_internal("[Ljava.lang.Object;"), "[Ljava/lang/Object;");
/// assert_eq!(binary_to_internal("int"), "I");
/// assert_eq!(binary_to_internal("[Z"), "[Z");
/// ```
#[must_use]
pub fn binary_to_internal(binary_name: &str) -> String {
    let base = component_base(binary_name);
    let dimensions = dimension_count(binary_name);
    let mut internal = String::with_capacity(binary_name.len() + 2);
    for _ in 0..dimensions {
        internal.push('[');
    }

    if let Some(primitive) = binary_to_primitive(base) {
        internal.push_str(primitive);
        return internal;
    }

    // Array-of-primitive spelled with the internal letter, e.g. "[Z".
    if dimensions > 0 && primitive_to_binary(base).is_some() {
        internal.push_str(base);
        return internal;
    }

    if base.ends_with(';') {
        internal.push_str(&base.replace('.', "/"));
    } else {
        internal.push('L');
        internal.push_str(&base.replace('.', "/"));
        internal.push(';');
    }

    internal
}

/// Converts an internal-format class name into the binary format.
///
/// # Examples
///
/// ```rust
/// use dexscope::types::names::internal_to_binary;
///
/// assert_eq!(internal_to_binary("Ljava/lang/Object;"), "java.lang.Object");
/// assert_eq!(internal_to_binary("[Ljava/lang/Object;"), "[Ljava.lang.Object;");
/// assert_eq!(internal_to_binary("J"), "long");
/// ```
#[must_use]
pub fn internal_to_binary(internal_name: &str) -> String {
    if let Some(primitive) = primitive_to_binary(internal_name) {
        return primitive.to_string();
    }

    if internal_name.starts_with('[') {
        internal_name.replace('/', ".")
    } else {
        let stripped = internal_name
            .strip_prefix('L')
            .and_then(|rest| rest.strip_suffix(';'))
            .unwrap_or(internal_name);
        stripped.replace('/', ".")
    }
}

/// Converts an internal-format class name into the source format.
///
/// # Examples
///
/// ```rust
/// use dexscope::types::names::internal_to_source;
///
/// assert_eq!(internal_to_source("[Ljava/lang/Object;"), "java.lang.Object[]");
/// assert_eq!(internal_to_source("[[I"), "int[][]");
/// ```
#[must_use]
pub fn internal_to_source(internal_name: &str) -> String {
    let base = component_base(internal_name);
    let mut source = String::with_capacity(internal_name.len() + 2);
    match primitive_to_binary(base) {
        Some(primitive) => source.push_str(primitive),
        None => {
            let stripped = base
                .strip_prefix('L')
                .and_then(|rest| rest.strip_suffix(';'))
                .unwrap_or(base);
            source.push_str(&stripped.replace('/', "."));
        }
    }

    for _ in 0..dimension_count(internal_name) {
        source.push_str("[]");
    }

    source
}

/// Converts a source-format class name into the internal format.
///
/// # Examples
///
/// ```rust
/// use dexscope::types::names::source_to_internal;
///
/// assert_eq!(source_to_internal("int[][]"), "[[I");
/// assert_eq!(source_to_internal("com.foo.Bar[]"), "[Lcom/foo/Bar;");
/// assert_eq!(source_to_internal("boolean"), "Z");
/// ```
#[must_use]
pub fn source_to_internal(source_name: &str) -> String {
    let base = source_name.trim_end_matches("[]");
    let dimensions = (source_name.len() - base.len()) / 2;
    let mut internal = String::with_capacity(source_name.len() + 2);
    for _ in 0..dimensions {
        internal.push('[');
    }

    match binary_to_primitive(base) {
        Some(primitive) => internal.push_str(primitive),
        None => {
            internal.push('L');
            internal.push_str(&base.replace('.', "/"));
            internal.push(';');
        }
    }

    internal
}

/// Converts a source-format class name into the binary format.
///
/// Scalar names keep their keyword spelling (`int` stays `int`), while arrays
/// take the bracketed binary form (`int[]` becomes `[I`, `com.foo.Bar[]`
/// becomes `[Lcom.foo.Bar;`).
#[must_use]
pub fn source_to_binary(source_name: &str) -> String {
    let base = source_name.trim_end_matches("[]");
    let dimensions = (source_name.len() - base.len()) / 2;
    let mut binary = String::with_capacity(source_name.len() + 2);
    for _ in 0..dimensions {
        binary.push('[');
    }

    match binary_to_primitive(base) {
        Some(primitive) => {
            if dimensions > 0 {
                binary.push_str(primitive);
            } else {
                binary.push_str(base);
            }
        }
        None => {
            if dimensions > 0 {
                binary.push('L');
                binary.push_str(base);
                binary.push(';');
            } else {
                binary.push_str(base);
            }
        }
    }

    binary
}

/// Converts a class name of any format into the requested format.
///
/// The input format is detected from shape: slashes or a primitive descriptor
/// mean internal, a trailing `;` means binary, anything else is treated as
/// source.
///
/// # Examples
///
/// ```rust
/// use dexscope::types::names::{to_format, TypeFormat};
///
/// assert_eq!(to_format("java.lang.Object", TypeFormat::Internal), "Ljava/lang/Object;");
/// assert_eq!(to_format("[I", TypeFormat::Source), "int[]");
/// assert_eq!(to_format("Lcom/foo/Bar;", TypeFormat::Binary), "com.foo.Bar");
/// ```
#[must_use]
pub fn to_format(class_name: &str, format: TypeFormat) -> String {
    let base = component_base(class_name);
    if base.contains('/') || primitive_to_binary(base).is_some() {
        match format {
            TypeFormat::Internal => class_name.to_string(),
            TypeFormat::Binary => internal_to_binary(class_name),
            TypeFormat::Source => internal_to_source(class_name),
        }
    } else if class_name.ends_with(';') {
        match format {
            TypeFormat::Internal => binary_to_internal(class_name),
            TypeFormat::Binary => class_name.to_string(),
            TypeFormat::Source => internal_to_source(&binary_to_internal(class_name)),
        }
    } else {
        match format {
            TypeFormat::Internal => source_to_internal(class_name),
            TypeFormat::Binary => source_to_binary(class_name),
            TypeFormat::Source => class_name.to_string(),
        }
    }
}

/// Returns the package of a class in dotted form, or `""` for the default
/// package. Works with all formats.
///
/// # Examples
///
/// ```rust
/// use dexscope::types::names::package_name;
///
/// assert_eq!(package_name("Lorg/cf/Klazz;"), "org.cf");
/// assert_eq!(package_name("Klazz"), "");
/// ```
#[must_use]
pub fn package_name(class_name: &str) -> String {
    let source_name = to_format(class_name, TypeFormat::Source);
    match source_name.rsplit_once('.') {
        Some((package, _)) => package.to_string(),
        None => String::new(),
    }
}

/// Returns the wrapper class (internal format) for a primitive type, keeping
/// array dimensions: `I` gives `Ljava/lang/Integer;`, `[I` gives
/// `[Ljava/lang/Integer;`. Non-primitives give `None`. Works with all formats.
#[must_use]
pub fn wrapper_for(class_name: &str) -> Option<String> {
    let internal = to_format(class_name, TypeFormat::Internal);
    let wrapper = primitive_to_wrapper(component_base(&internal))?;
    let dimensions = dimension_count(&internal);
    if dimensions == 0 {
        return Some(wrapper.to_string());
    }

    let mut name = String::with_capacity(dimensions + wrapper.len());
    for _ in 0..dimensions {
        name.push('[');
    }
    name.push_str(wrapper);
    Some(name)
}

/// Returns the primitive descriptor for a wrapper class, keeping array
/// dimensions: `Ljava/lang/Integer;` gives `I`, `[Ljava/lang/Long;` gives
/// `[J`. Non-wrappers give `None`. Works with all formats.
#[must_use]
pub fn primitive_for(class_name: &str) -> Option<String> {
    let internal = to_format(class_name, TypeFormat::Internal);
    let primitive = wrapper_to_primitive(component_base(&internal))?;
    let dimensions = dimension_count(&internal);
    let mut name = String::with_capacity(dimensions + primitive.len());
    for _ in 0..dimensions {
        name.push('[');
    }
    name.push_str(primitive);
    Some(name)
}

/// Returns true when the class name denotes a primitive type (of any array
/// dimension). Works with all formats.
///
/// `V` (void) counts as primitive here because method descriptors carry it.
#[must_use]
pub fn is_primitive(class_name: &str) -> bool {
    let internal = to_format(class_name, TypeFormat::Internal);
    primitive_to_binary(component_base(&internal)).is_some()
}

/// Returns true when the class name denotes a primitive wrapper class.
/// Works with all formats.
#[must_use]
pub fn is_wrapper(class_name: &str) -> bool {
    primitive_for(class_name).is_some()
}

/// Returns true when the class name is a primitive or a primitive wrapper.
/// Works with all formats.
#[must_use]
pub fn is_primitive_or_wrapper(class_name: &str) -> bool {
    is_primitive(class_name) || is_wrapper(class_name)
}
