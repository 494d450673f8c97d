//! Resource limits for method execution.

/// Bounds on how much work one method execution may do.
///
/// Obfuscated input is adversarial: initializer chains can recurse and
/// decrypted-at-runtime loops can spin forever. Limits turn both into
/// ordinary execution failures, which callers already treat conservatively.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExecutionLimits {
    /// Maximum nesting of method executions, initializers included.
    pub max_call_depth: u32,
    /// Maximum ops executed within a single method body.
    pub max_ops_per_method: usize,
}

impl ExecutionLimits {
    /// Creates limits from explicit bounds.
    #[must_use]
    pub fn new(max_call_depth: u32, max_ops_per_method: usize) -> Self {
        ExecutionLimits {
            max_call_depth,
            max_ops_per_method,
        }
    }

    /// Generous limits for ordinary analysis runs.
    #[must_use]
    pub fn for_analysis() -> Self {
        ExecutionLimits::new(64, 10_000)
    }

    /// Tight limits for smoke tests and untrusted probing.
    #[must_use]
    pub fn minimal() -> Self {
        ExecutionLimits::new(4, 256)
    }
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self::for_analysis()
    }
}
