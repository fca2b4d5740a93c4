//! Error type for the SAMP value model.

use std::fmt;

/// Result type alias for value-model operations.
pub type SampResult<T> = std::result::Result<T, ValueError>;

/// Errors raised while validating or decoding a SAMP value.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ValueError {
    /// A value failed validation: not a string/list/mapping leaf, a
    /// non-string mapping key, an out-of-range character, or a `null`.
    #[error("malformed SAMP value at {path}: {reason}")]
    MalformedValue {
        /// Human-readable reason for the failure.
        reason: String,
        /// Dotted/bracketed path to the offending node, e.g. `root.params[2]`.
        path: String,
    },
    /// The JSON text could not be parsed at all.
    #[error("invalid JSON: {0}")]
    InvalidJson(String),
}

impl ValueError {
    pub(crate) fn malformed(reason: impl Into<String>, path: impl Into<String>) -> Self {
        Self::MalformedValue {
            reason: reason.into(),
            path: path.into(),
        }
    }
}

/// A path segment accumulator used while walking a value tree for validation.
#[derive(Debug, Clone, Default)]
pub(crate) struct Path(String);

impl Path {
    pub(crate) fn root() -> Self {
        Self("root".to_string())
    }

    pub(crate) fn index(&self, i: usize) -> Self {
        Self(format!("{}[{}]", self.0, i))
    }

    pub(crate) fn key(&self, k: &str) -> Self {
        Self(format!("{}.{}", self.0, k))
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
