//! Error types for the evictkit library.
//!
//! Cache operations themselves never fail: a miss is `None`, and a cache
//! built with capacity 0 silently drops writes. Errors only surface in two
//! places:
//!
//! - [`ConfigError`]: returned by the fallible `try_*` constructors and
//!   [`CacheBuilder::try_build`](crate::builder::CacheBuilder::try_build)
//!   when a tuning parameter is out of range.
//! - [`InvariantError`]: returned by `check_invariants` on every engine and
//!   data structure when internal bookkeeping disagrees with itself.
//!
//! ```
//! use evictkit::error::ConfigError;
//! use evictkit::policy::lfu::LfuCache;
//!
//! let err = LfuCache::<u64, u64>::try_with_max_average(16, 0).unwrap_err();
//! assert_eq!(err.field(), "max_average_frequency");
//! ```

use std::fmt;

// ---------------------------------------------------------------------------
// InvariantError
// ---------------------------------------------------------------------------

/// Internal bookkeeping violated one of its own invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantError(String);

impl InvariantError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for InvariantError {}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// A construction parameter failed validation.
///
/// Carries the parameter name so callers that assemble configuration from
/// user input can point at the offending field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    field: &'static str,
    reason: String,
}

impl ConfigError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }

    /// Shorthand for parameters that must be at least 1.
    pub(crate) fn zero(field: &'static str) -> Self {
        Self::new(field, "must be at least 1")
    }

    /// Name of the rejected parameter.
    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: {}", self.field, self.reason)
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invariant_display_is_message() {
        let err = InvariantError::new("ghost list over capacity");
        assert_eq!(err.to_string(), "ghost list over capacity");
        assert_eq!(err.message(), "ghost list over capacity");
    }

    #[test]
    fn config_display_names_field() {
        let err = ConfigError::zero("k");
        assert_eq!(err.to_string(), "invalid k: must be at least 1");
        assert_eq!(err.field(), "k");
        assert_eq!(err.reason(), "must be at least 1");
    }

    #[test]
    fn both_are_std_errors() {
        fn assert_error<T: std::error::Error + Send + Sync + 'static>() {}
        assert_error::<InvariantError>();
        assert_error::<ConfigError>();
    }
}
