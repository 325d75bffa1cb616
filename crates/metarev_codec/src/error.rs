//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while encoding or decoding metadata values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The CBOR writer rejected the value.
    #[error("encoding failed: {message}")]
    EncodingFailed {
        /// Description of the encoding error.
        message: String,
    },

    /// The input bytes are not a well-formed CBOR item.
    #[error("decoding failed: {message}")]
    DecodingFailed {
        /// Description of the decoding error.
        message: String,
    },

    /// Float values cannot be stored as metadata.
    #[error("float values are not supported in metadata")]
    FloatForbidden,

    /// The item is valid CBOR but has no metadata equivalent (tags, etc).
    #[error("unsupported CBOR item: {type_name}")]
    UnsupportedType {
        /// Name of the unsupported item.
        type_name: String,
    },

    /// Integer does not fit in an `i64`.
    #[error("integer overflow")]
    IntegerOverflow,

    /// A decoded value did not have the expected shape.
    #[error("unexpected shape: expected {expected}")]
    UnexpectedShape {
        /// What the caller expected to find.
        expected: String,
    },
}

impl CodecError {
    /// Create an encoding failed error.
    pub fn encoding_failed(message: impl Into<String>) -> Self {
        Self::EncodingFailed {
            message: message.into(),
        }
    }

    /// Create a decoding failed error.
    pub fn decoding_failed(message: impl Into<String>) -> Self {
        Self::DecodingFailed {
            message: message.into(),
        }
    }

    /// Create an unsupported type error.
    pub fn unsupported_type(type_name: impl Into<String>) -> Self {
        Self::UnsupportedType {
            type_name: type_name.into(),
        }
    }

    /// Create an unexpected shape error.
    pub fn unexpected_shape(expected: impl Into<String>) -> Self {
        Self::UnexpectedShape {
            expected: expected.into(),
        }
    }
}
