//! Wire error types.

use thiserror::Error;

/// Result type for codec operations.
pub type WireResult<T> = Result<T, WireError>;

/// Errors that can occur while encoding or decoding a frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    /// A read ran past the end of the frame (truncated or malformed input).
    #[error("buffer exhausted: needed {needed} bytes, {remaining} remaining")]
    BufferExhausted { needed: usize, remaining: usize },

    /// The trailing parity tag does not match the frame contents.
    #[error("integrity check failed: computed tag {expected}, frame carries {found}")]
    IntegrityViolation { expected: u8, found: u8 },

    /// No factory is registered for this type name.
    #[error("unknown type: {0}")]
    UnknownType(String),

    /// Field metadata disagrees with the type's declared schema.
    #[error("schema mismatch for {type_name}: {reason}")]
    SchemaMismatch { type_name: String, reason: String },

    /// A back-reference points at an ordinal not seen yet in this frame.
    #[error("invalid back-reference to ordinal {0}")]
    InvalidReference(i32),

    /// An object handle does not belong to the graph being encoded.
    #[error("object handle {0} is not part of this graph")]
    UnknownHandle(usize),

    /// Zero-length input.
    #[error("empty input")]
    EmptyInput,

    /// A string on the wire is not valid UTF-8.
    #[error("string is not valid UTF-8")]
    InvalidUtf8,

    /// A string is too long for its 4-byte length prefix.
    #[error("string of {0} bytes does not fit a 32-bit length prefix")]
    StringTooLong(usize),

    /// The object graph nests deeper than the codec allows.
    #[error("object graph nested deeper than {0} levels")]
    DepthLimitExceeded(usize),

    /// A typed decode found a root of a different type.
    #[error("expected root of type {expected}, found {found}")]
    UnexpectedType { expected: String, found: String },

    /// A typed decode found a null root.
    #[error("root object is null")]
    NullRoot,
}

impl WireError {
    /// Creates a schema mismatch error.
    pub fn schema_mismatch(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }
}
