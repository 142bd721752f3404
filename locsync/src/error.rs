//! All error types for the locsync crate.
//!
//! Structural problems inside a single file (a key that is a string on one
//! side and an object on the other) are not errors in this sense: they are
//! collected by the [`ChangeRecorder`](crate::recorder::ChangeRecorder) and
//! only fail the run once every file has been processed. Everything here is
//! returned from fallible operations and aborts the current run.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Why a `--check` run failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckFailure {
    /// Keys would be added or removed.
    OutOfSync,
    /// Only key order or whitespace would change.
    Formatting,
}

impl fmt::Display for CheckFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckFailure::OutOfSync => write!(
                f,
                "keys are out of sync. Run again without check mode to synchronize files"
            ),
            CheckFailure::Formatting => write!(
                f,
                "files have unordered keys or unexpected whitespace. Run again without check mode to correct files"
            ),
        }
    }
}

/// Stable, machine-readable error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Io,
    Parse,
    InvalidResource,
    Http,
    TranslationResponse,
    UnexpectedTranslationKey,
    TranslationExhausted,
    UnsafeKeys,
    CheckFailed,
    Config,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid resource: {0}")]
    InvalidResource(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A translation reply that could not be used. Retried by the batcher.
    #[error("unusable translation response: {0}")]
    TranslationResponse(String),

    #[error("translation response references key `{key}` which was not requested")]
    UnexpectedTranslationKey { key: String },

    #[error("translation error -- unable to continue translation after {attempts} attempts: {last}")]
    TranslationExhausted { attempts: usize, last: String },

    #[error("found keys unsafe to synchronize ({count} type mismatches)")]
    UnsafeKeys { count: usize },

    #[error("check failed -- {0}")]
    CheckFailed(CheckFailure),

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Creates a new invalid-resource error.
    pub fn invalid_resource(message: impl Into<String>) -> Self {
        Error::InvalidResource(message.into())
    }

    /// Creates a new retryable translation-response error.
    pub fn translation_response(message: impl Into<String>) -> Self {
        Error::TranslationResponse(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }

    pub fn error_code(&self) -> ErrorCode {
        match self {
            Error::Io(_) => ErrorCode::Io,
            Error::Parse(_) => ErrorCode::Parse,
            Error::InvalidResource(_) => ErrorCode::InvalidResource,
            Error::Http(_) => ErrorCode::Http,
            Error::TranslationResponse(_) => ErrorCode::TranslationResponse,
            Error::UnexpectedTranslationKey { .. } => ErrorCode::UnexpectedTranslationKey,
            Error::TranslationExhausted { .. } => ErrorCode::TranslationExhausted,
            Error::UnsafeKeys { .. } => ErrorCode::UnsafeKeys,
            Error::CheckFailed(_) => ErrorCode::CheckFailed,
            Error::Config(_) => ErrorCode::Config,
        }
    }

    /// Whether the translation batcher may try the same batch again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::TranslationResponse(_) | Error::Http(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_parse_error() {
        let json_error = serde_json::from_str::<serde_json::Value>("{ invalid json }").unwrap_err();
        let error = Error::Parse(json_error);
        assert!(error.to_string().contains("parse error"));
        assert_eq!(error.error_code(), ErrorCode::Parse);
    }

    #[test]
    fn test_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let error = Error::Io(io_error);
        assert!(error.to_string().contains("I/O error"));
    }

    #[test]
    fn test_invalid_resource_error() {
        let error = Error::invalid_resource("value at `a::b` is a number");
        assert_eq!(
            error.to_string(),
            "invalid resource: value at `a::b` is a number"
        );
    }

    #[test]
    fn test_check_failed_messages() {
        let error = Error::CheckFailed(CheckFailure::OutOfSync);
        assert!(error.to_string().contains("keys are out of sync"));

        let error = Error::CheckFailed(CheckFailure::Formatting);
        assert!(error.to_string().contains("unordered keys"));
        assert_eq!(error.error_code(), ErrorCode::CheckFailed);
    }

    #[test]
    fn test_retryable_classification() {
        assert!(Error::translation_response("missing key").is_retryable());
        assert!(
            !Error::UnexpectedTranslationKey {
                key: "x".to_string()
            }
            .is_retryable()
        );
        assert!(
            !Error::TranslationExhausted {
                attempts: 5,
                last: "boom".to_string()
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_error_code_serialization() {
        let encoded = serde_json::to_string(&ErrorCode::UnsafeKeys).unwrap();
        assert_eq!(encoded, "\"unsafe_keys\"");
    }
}
