use std::path::PathBuf;
use std::time::Duration;

use crate::config::IdentifierKind;

/// Errors that can occur when driving ExifTool.
///
/// Errors are organized by category:
/// - Validation errors: detected before any process interaction
/// - Configuration errors: detected at `build()` time or when persisting
///   the generated config
/// - Spawn errors: failed to start the ExifTool process
/// - Per-file errors: recorded in that file's [`FileMetadata`](crate::FileMetadata)
/// - Protocol errors: desynchronized or malformed process output
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    // -------------------------------------------------------------------------
    // Validation errors (no process contact)
    // -------------------------------------------------------------------------
    /// A namespace or field name does not match its identifier pattern.
    #[error("invalid {kind} {value:?}: must match pattern {}", .kind.pattern())]
    InvalidIdentifier { kind: IdentifierKind, value: String },

    /// The field is not part of the session's configured field set.
    #[error("field {field:?} is not configured for this session")]
    FieldNotConfigured { field: String },

    /// The value cannot be sent over the line protocol.
    #[error("invalid value: {0}")]
    InvalidValue(String),

    // -------------------------------------------------------------------------
    // Configuration errors
    // -------------------------------------------------------------------------
    /// Invalid configuration provided to builder.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The generated ExifTool config could not be persisted.
    #[error("failed to write generated config: {0}")]
    ConfigWrite(#[source] std::io::Error),

    // -------------------------------------------------------------------------
    // Spawn errors
    // -------------------------------------------------------------------------
    /// ExifTool binary not found.
    #[error("exiftool not found (searched: {searched})")]
    BinaryNotFound { searched: String },

    /// Failed to spawn the exiftool subprocess.
    #[error("failed to spawn exiftool process: {0}")]
    ProcessSpawn(#[source] std::io::Error),

    // -------------------------------------------------------------------------
    // Per-file errors
    // -------------------------------------------------------------------------
    /// The input file does not exist.
    #[error("file not found: {}", .path.display())]
    FileNotFound { path: PathBuf },

    /// The input file exists but could not be inspected.
    #[error("cannot access {}: {source}", .path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file path cannot be sent over the line protocol.
    #[error("path cannot be sent to exiftool: {}", .path.display())]
    InvalidPath { path: PathBuf },

    // -------------------------------------------------------------------------
    // Protocol errors
    // -------------------------------------------------------------------------
    /// The output stream ended before a response frame was produced.
    #[error("no response from exiftool (output stream closed)")]
    EmptyResponse,

    /// Reading the merged output stream failed.
    #[error("error while reading exiftool output: {0}")]
    Scan(#[source] std::io::Error),

    /// A response frame exceeded the configured buffer size.
    #[error("response frame exceeds buffer size of {limit} bytes")]
    FrameTooLarge { limit: usize },

    /// The response payload is not the expected JSON array of objects.
    #[error("malformed response payload ({raw:?}): {source}")]
    Decode {
        raw: String,
        #[source]
        source: serde_json::Error,
    },

    /// A previous failure left the process dead or desynchronized.
    #[error("exiftool process terminated")]
    ProcessTerminated,

    /// The session was already closed.
    #[error("session is closed")]
    SessionClosed,

    /// IO error writing to the exiftool subprocess.
    #[error("IO error: {0}")]
    Io(#[source] std::io::Error),

    /// Waiting for a response frame exceeded the configured timeout.
    #[error("response timed out after {0:?}")]
    Timeout(Duration),

    // -------------------------------------------------------------------------
    // Field access errors
    // -------------------------------------------------------------------------
    /// The requested key is absent from the decoded fields.
    #[error("key not found: {key}")]
    KeyNotFound { key: String },

    /// The value stored under the key has an unexpected type.
    #[error("field {key} cannot be read as {expected}")]
    TypeMismatch { key: String, expected: &'static str },
}

/// A specialized Result type for libexiftool operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a decode error carrying the raw payload.
    pub fn decode(source: serde_json::Error, raw: &[u8]) -> Self {
        Self::Decode {
            raw: String::from_utf8_lossy(raw).into_owned(),
            source,
        }
    }

    /// Create an IO error.
    pub fn io(source: std::io::Error) -> Self {
        Self::Io(source)
    }

    /// Check if this error was raised before any process interaction.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidIdentifier { .. }
                | Error::FieldNotConfigured { .. }
                | Error::InvalidValue(_)
                | Error::InvalidConfig(_)
        )
    }

    /// Check if this error leaves the session unusable.
    ///
    /// The session should be closed and a new one started.
    pub fn is_session_fatal(&self) -> bool {
        matches!(
            self,
            Error::EmptyResponse
                | Error::Scan(_)
                | Error::FrameTooLarge { .. }
                | Error::ProcessTerminated
                | Error::SessionClosed
                | Error::Timeout(_)
        )
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Decode {
            raw: String::new(),
            source: err,
        }
    }
}
