//! Interpolation error types.

use thiserror::Error;
use tide_core::ErrorKind;

/// Result type alias for interpolation.
pub type InterpolationResult<T> = Result<T, InterpolationError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterpolationError {
    /// Raised by the `?` and `:?` operators.
    #[error("required variable '{name}' is missing: {message}")]
    Required { name: String, message: String },

    /// Raised in strict mode when a reference resolves to nothing.
    #[error("variable '{name}' is not defined")]
    Undefined { name: String },

    /// Text or a substituted value carries the character reserved for `$$`.
    #[error("text contains the reserved character U+FDD0")]
    ReservedCharacter,

    #[error("interpolation exceeded {limit} substitutions; a variable probably references itself")]
    RecursionLimit { limit: usize },
}

impl InterpolationError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Resolution
    }
}
