//! Error types for type decoding and schema parsing.

use thiserror::Error;

use crate::types::BasicType;

/// Errors from checked primitive decoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypeError {
    /// The byte span is shorter than the type's fixed width.
    #[error("buffer too short to decode {ty}: need {needed} bytes, got {available}")]
    BufferTooShort {
        ty: BasicType,
        needed: usize,
        available: usize,
    },
}

/// Errors from parsing a schema text dump.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// A line of the dump could not be parsed.
    #[error("schema parse error at line {line}: {reason}")]
    Parse { line: usize, reason: String },
}

impl SchemaError {
    pub(crate) fn parse(line: usize, reason: impl Into<String>) -> Self {
        SchemaError::Parse {
            line,
            reason: reason.into(),
        }
    }
}

/// Result type alias for schema operations.
pub type Result<T> = std::result::Result<T, SchemaError>;
