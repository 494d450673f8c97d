//! Type-name utilities shared across the crate.
//!
//! Dalvik code identifies classes by descriptor strings rather than resolved
//! handles, so every layer of the crate ends up passing class names around.
//! This module centralizes the format conversions and classification helpers
//! those layers need.
//!
//! # Key Components
//!
//! - [`names`] - conversions between internal, binary, and source formats,
//!   array dimension handling, and primitive/wrapper classification
//! - [`names::TypeFormat`] - the format selector used by [`names::to_format`]

pub mod names;

pub use names::TypeFormat;
