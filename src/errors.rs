/*!
 * Error types for the docxlate application.
 *
 * This module contains custom error types for the different stages of the
 * translation pipeline, using the thiserror crate for ergonomic error definitions.
 *
 * Only `DocumentError` and `AppError` ever reach the caller of the pipeline.
 * `TranslationError` is recovered inside the batch translator and is only
 * reported through the log.
 */

use std::path::PathBuf;
use thiserror::Error;

use crate::document::Locator;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The API answered but carried no usable text
    #[error("API returned an empty response")]
    EmptyResponse,
}

/// Anomalies of a single batch translation call
#[derive(Error, Debug)]
pub enum TranslationError {
    /// The external call errored or returned unusable content
    #[error("Translation call failed: {0}")]
    CallFailed(#[from] ProviderError),

    /// The response split into a different number of segments than were sent
    #[error("Number of translated segments ({received}) doesn't match number of original texts ({expected})")]
    SegmentCountMismatch {
        /// Segments sent
        expected: usize,
        /// Segments received
        received: usize,
    },
}

/// Errors raised while reading or writing a document
#[derive(Error, Debug)]
pub enum DocumentError {
    /// The file extension is not one of the supported formats
    #[error("Unsupported file type: {extension}")]
    UnsupportedFormat {
        /// Extension as found on the input path (may be empty)
        extension: String,
    },

    /// The document could not be opened or parsed
    #[error("Cannot read {path}: {reason}")]
    SourceUnreadable {
        /// Offending document
        path: PathBuf,
        /// Underlying cause
        reason: String,
    },

    /// Duplicating, writing, saving or re-attaching images failed
    #[error("Cannot write {path}: {reason}")]
    WriteFailure {
        /// Output document
        path: PathBuf,
        /// Underlying cause
        reason: String,
    },

    /// A translated locator was not found in the duplicated document
    #[error("No text unit at {locator} in the output document")]
    UnresolvedLocator {
        /// The locator that could not be written back
        locator: Locator,
    },
}

impl DocumentError {
    pub(crate) fn unreadable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::SourceUnreadable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn write_failure(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::WriteFailure {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Reading the duplicate during write-back counts as a write failure
    pub(crate) fn into_write_failure(self) -> Self {
        match self {
            Self::SourceUnreadable { path, reason } => Self::WriteFailure { path, reason },
            other => other,
        }
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a document adapter
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Invalid or incomplete configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
