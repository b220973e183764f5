//! Error types and handling for the codec registry
//!
//! This module defines every error surfaced by type resolution, encoding,
//! decoding and composite field access. None of them are retried internally.

use thiserror::Error;

/// Main result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the codec registry
#[derive(Error, Debug)]
pub enum Error {
    /// A type code or descriptor the codec set cannot handle
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    /// A registered codec does not fit the descriptor it was registered for
    #[error("Ambiguous type: {0}")]
    AmbiguousType(String),

    /// Composite value accessed with an unknown field name or index
    #[error("No such field: {0}")]
    NoSuchField(String),

    /// Raw bytes do not match the layout the codec expects
    #[error("Malformed value: {0}")]
    MalformedValue(String),

    /// Type metadata bytes could not be parsed into a descriptor
    #[error("Malformed type metadata: {0}")]
    MalformedMetadata(String),

    /// Value kind does not match the codec or accessor
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Expected type name
        expected: String,
        /// Actual type name received
        actual: String
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Prometheus metrics errors
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl Error {
    /// Create an unsupported type error
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedType(msg.into())
    }

    /// Create an ambiguous type error
    pub fn ambiguous(msg: impl Into<String>) -> Self {
        Self::AmbiguousType(msg.into())
    }

    /// Create a no such field error
    pub fn no_such_field(field: impl Into<String>) -> Self {
        Self::NoSuchField(field.into())
    }

    /// Create a malformed value error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedValue(msg.into())
    }

    /// Create a malformed metadata error
    pub fn malformed_metadata(msg: impl Into<String>) -> Self {
        Self::MalformedMetadata(msg.into())
    }

    /// Create a type mismatch error
    pub fn mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Check if this error was raised while decoding or encoding bytes
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            Error::MalformedValue(_) | Error::TypeMismatch { .. }
        )
    }

    /// Check if this error was raised while resolving a type
    pub fn is_schema_error(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedType(_)
                | Error::AmbiguousType(_)
                | Error::MalformedMetadata(_)
        )
    }
}
