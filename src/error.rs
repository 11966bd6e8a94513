use std::error::Error as StdError;
use std::path::PathBuf;

use thiserror::Error;

/// Scrivener's crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Scrivener's crate-wide error type.
///
/// Each variant corresponds to one stage of the per-item pipeline, so callers can tell a
/// rejected input apart from a backend or disk failure without string matching.
///
/// This is intentionally decoupled from `anyhow` so downstream libraries aren't forced to
/// adopt `anyhow` in their own public APIs.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid image '{}': {issue}", path.display())]
    Validation {
        path: PathBuf,
        issue: ValidationIssue,
    },

    #[error("classification failed: {0}")]
    Classification(String),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("failed to persist transcription to '{}': {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to load prompt from '{}': {reason}", path.display())]
    Prompt { path: PathBuf, reason: String },

    #[error("{0}")]
    Message(String),

    #[error(transparent)]
    Other(#[from] Box<dyn StdError + Send + Sync>),
}

/// Why an input path was rejected before any processing happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationIssue {
    NotFound,
    NotAFile,
    UnsupportedExtension,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            ValidationIssue::NotFound => "file not found",
            ValidationIssue::NotAFile => "path is not a file",
            ValidationIssue::UnsupportedExtension => "unsupported file extension",
        };
        f.write_str(text)
    }
}

/// Failures raised by a transcription backend.
///
/// Backend errors always fail the item; nothing in the pipeline retries them.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("local recognition failed: {0}")]
    LocalRecognition(String),

    #[error("cloud transcriber is not configured (no API key found)")]
    NotConfigured,

    #[error("cloud API rejected the credentials: {0}")]
    Authentication(String),

    #[error("cloud API rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("cloud API resource not found (check the model name and endpoint): {0}")]
    NotFound(String),

    #[error("cloud API rejected the request: {0}")]
    BadRequest(String),

    #[error("cloud API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("malformed response from cloud API: {0}")]
    MalformedResponse(String),

    #[error("cloud transcription failed: {0}")]
    CloudTranscription(String),
}

impl Error {
    pub(crate) fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Message(format!("{err:#}"))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Other(Box::new(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Other(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_names_path_and_issue() {
        let err = Error::Validation {
            path: PathBuf::from("scans/notes.png"),
            issue: ValidationIssue::UnsupportedExtension,
        };
        assert_eq!(
            err.to_string(),
            "invalid image 'scans/notes.png': unsupported file extension"
        );
    }

    #[test]
    fn backend_errors_convert_transparently() {
        let err: Error = BackendError::NotConfigured.into();
        assert!(matches!(err, Error::Backend(BackendError::NotConfigured)));
        assert!(err.to_string().contains("not configured"));
    }

    #[test]
    fn anyhow_errors_keep_their_context_chain() {
        let err = anyhow::anyhow!("inner").context("outer");
        let err: Error = err.into();
        assert_eq!(err.to_string(), "outer: inner");
    }
}
