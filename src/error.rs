//! Error types for JSON:API encoding and decoding.

use std::path::PathBuf;
use thiserror::Error;

/// Faults raised while building, rendering or parsing a JSON:API document.
///
/// Every variant is fatal to the current call. Links dropped by the compliance
/// policy are reported separately (see [`crate::NonCompliantLink`]) and never
/// surface here.
#[derive(Debug, Error)]
pub enum CodecError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid JSON:API document: {message}")]
    InvalidDocument { message: String },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    // Codec errors (exit code 2)
    #[error("cannot compute JSON:API resource id for {class}")]
    MissingIdentifier { class: String },

    #[error("cannot write id value \"{value}\" into field '{field}': expected {expected}")]
    InvalidIdentifier {
        field: String,
        value: String,
        expected: &'static str,
    },

    #[error("JSON:API relationship validation error for '{name}': {reason}")]
    InvalidRelationship { name: String, reason: String },

    #[error("JSON:API type '{actual}' is not assignable to {expected}")]
    TypeMismatch { expected: String, actual: String },

    #[error("cannot deserialize relationship '{name}': {message}")]
    MalformedRelationship { name: String, message: String },

    #[error("model object must be a paged collection with page metadata")]
    NotPaged,

    #[error("invalid link base '{base}': {source}")]
    InvalidLinkBase {
        base: String,
        #[source]
        source: url::ParseError,
    },
}

impl CodecError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            CodecError::FileNotFound { .. } | CodecError::ReadError { .. } => 3,
            _ => 2,
        }
    }

    pub(crate) fn invalid_document(message: impl Into<String>) -> Self {
        CodecError::InvalidDocument {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for CodecError {
    fn from(source: serde_json::Error) -> Self {
        CodecError::InvalidJson { source }
    }
}
