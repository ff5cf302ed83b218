//! Arena-specific error types.

use std::error::Error;
use std::fmt;

use relax_core::FieldError;

/// Errors that can occur while building or driving a [`FieldPair`](crate::FieldPair).
#[derive(Clone, Debug, PartialEq)]
pub enum ArenaError {
    /// Configuration rejected at construction.
    InvalidConfig {
        /// Description of the problem.
        reason: String,
    },
    /// Two fields of different lengths were paired.
    LengthMismatch {
        /// Length of field A.
        a: usize,
        /// Length of field B.
        b: usize,
    },
    /// `publish()` called without a preceding `begin_swap()`.
    NoSwapInProgress,
    /// A field-model value was rejected.
    Field(FieldError),
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig { reason } => write!(f, "invalid arena config: {reason}"),
            Self::LengthMismatch { a, b } => {
                write!(f, "paired fields differ in length: A has {a}, B has {b}")
            }
            Self::NoSwapInProgress => write!(f, "publish() called without begin_swap()"),
            Self::Field(e) => write!(f, "field: {e}"),
        }
    }
}

impl Error for ArenaError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Field(e) => Some(e),
            _ => None,
        }
    }
}

impl From<FieldError> for ArenaError {
    fn from(e: FieldError) -> Self {
        Self::Field(e)
    }
}
