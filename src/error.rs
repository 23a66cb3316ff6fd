//! Centralized error types for mboxthread.

use std::path::PathBuf;
use std::string::FromUtf8Error;
use thiserror::Error;

/// All errors produced by the mboxthread library.
#[derive(Error, Debug)]
pub enum MboxError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The specified archive does not exist.
    #[error("MBOX file not found: {0}")]
    FileNotFound(PathBuf),

    /// A raw segment could not be turned into a message.
    #[error("Malformed message in segment {segment}: {source}")]
    MalformedMessage {
        segment: usize,
        #[source]
        source: MalformedMessageError,
    },

    /// An encoded-word inside a segment could not be decoded.
    #[error("Decoding error in segment {segment}: {source}")]
    Codec {
        segment: usize,
        #[source]
        source: CodecError,
    },

    /// The configuration file is present but unusable.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Errors from the `=?utf-8?b?...?=` decoder.
#[derive(Error, Debug)]
pub enum CodecError {
    /// The payload is not valid standard base64.
    #[error("invalid base64 payload '{payload}': {source}")]
    InvalidBase64 {
        payload: String,
        source: base64::DecodeError,
    },

    /// The payload decodes to bytes that are not UTF-8.
    #[error("payload '{payload}' is not valid UTF-8: {source}")]
    InvalidUtf8 {
        payload: String,
        source: FromUtf8Error,
    },
}

/// A message whose identity could not be extracted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct MalformedMessageError {
    pub reason: String,
}

impl MalformedMessageError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Convenience alias for `Result<T, MboxError>`.
pub type Result<T> = std::result::Result<T, MboxError>;

impl MboxError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Index of the archive segment that failed, if the error is tied to one.
    pub fn segment(&self) -> Option<usize> {
        match self {
            Self::MalformedMessage { segment, .. } | Self::Codec { segment, .. } => Some(*segment),
            _ => None,
        }
    }
}
