//! Side-effect classification lattice.

use std::fmt;

use strum::{EnumCount, EnumIter};

/// How far the effects of executing a piece of code can escape.
///
/// Levels form a totally ordered lattice and combine with [`strongest`]
/// (`SideEffectLevel::strongest`), which is the lattice maximum. The ordering
/// is part of the public contract: analyses rely on `None < Weak < Strong`
/// to decide whether emulated results can be trusted and whether code may be
/// removed or replaced.
///
/// - [`None`](SideEffectLevel::None) - no observable effect outside the
///   current frame; safe to replay, cache, or elide.
/// - [`Weak`](SideEffectLevel::Weak) - mutates emulated state visible beyond
///   the current frame (static fields, shared objects) but stays inside the
///   modeled world.
/// - [`Strong`](SideEffectLevel::Strong) - may escape the modeled world (I/O,
///   unmodeled calls) or could not be proven weaker; the conservative default.
///
/// # Examples
///
/// ```rust
/// use dexscope::execution::SideEffectLevel;
///
/// assert!(SideEffectLevel::None < SideEffectLevel::Weak);
/// assert!(SideEffectLevel::Weak < SideEffectLevel::Strong);
///
/// let combined = SideEffectLevel::Weak.strongest(SideEffectLevel::None);
/// assert_eq!(combined, SideEffectLevel::Weak);
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, EnumCount, EnumIter,
)]
pub enum SideEffectLevel {
    /// No effect observable outside the executing frame.
    #[default]
    None,
    /// Mutates emulated state visible beyond the frame, but nothing escapes
    /// the modeled world.
    Weak,
    /// May escape the modeled world, or could not be proven weaker.
    Strong,
}

impl SideEffectLevel {
    /// Combines two levels, keeping the stronger one.
    ///
    /// This is the lattice join: commutative, associative, idempotent, and
    /// monotone in both arguments.
    #[must_use]
    pub fn strongest(self, other: Self) -> Self {
        self.max(other)
    }

    /// Folds an iterator of levels down to the strongest one.
    ///
    /// An empty iterator yields [`SideEffectLevel::None`].
    #[must_use]
    pub fn strongest_of<I>(levels: I) -> Self
    where
        I: IntoIterator<Item = SideEffectLevel>,
    {
        levels
            .into_iter()
            .fold(SideEffectLevel::None, SideEffectLevel::strongest)
    }
}

impl fmt::Display for SideEffectLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SideEffectLevel::None => write!(f, "none"),
            SideEffectLevel::Weak => write!(f, "weak"),
            SideEffectLevel::Strong => write!(f, "strong"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_total_order() {
        assert!(SideEffectLevel::None < SideEffectLevel::Weak);
        assert!(SideEffectLevel::Weak < SideEffectLevel::Strong);
        assert!(SideEffectLevel::None < SideEffectLevel::Strong);
        assert_eq!(SideEffectLevel::COUNT, 3);
    }

    #[test]
    fn test_strongest_is_max() {
        for a in SideEffectLevel::iter() {
            for b in SideEffectLevel::iter() {
                let joined = a.strongest(b);
                assert!(joined >= a);
                assert!(joined >= b);
                assert!(joined == a || joined == b);
            }
        }
    }

    #[test]
    fn test_lattice_laws() {
        for a in SideEffectLevel::iter() {
            assert_eq!(a.strongest(a), a);
            for b in SideEffectLevel::iter() {
                assert_eq!(a.strongest(b), b.strongest(a));
                for c in SideEffectLevel::iter() {
                    assert_eq!(a.strongest(b).strongest(c), a.strongest(b.strongest(c)));
                }
            }
        }
    }

    #[test]
    fn test_strongest_of_fold() {
        assert_eq!(
            SideEffectLevel::strongest_of([SideEffectLevel::None, SideEffectLevel::Weak]),
            SideEffectLevel::Weak
        );
        assert_eq!(
            SideEffectLevel::strongest_of([
                SideEffectLevel::Weak,
                SideEffectLevel::Strong,
                SideEffectLevel::None
            ]),
            SideEffectLevel::Strong
        );
        assert_eq!(SideEffectLevel::strongest_of([]), SideEffectLevel::None);
    }

    #[test]
    fn test_display() {
        assert_eq!(SideEffectLevel::None.to_string(), "none");
        assert_eq!(SideEffectLevel::Weak.to_string(), "weak");
        assert_eq!(SideEffectLevel::Strong.to_string(), "strong");
    }

    #[test]
    fn test_default_is_none() {
        assert_eq!(SideEffectLevel::default(), SideEffectLevel::None);
    }
}
