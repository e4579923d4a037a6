//! Unified error handling for the autoposter crate
//!
//! This module provides a unified error type that consolidates the
//! domain-specific errors of the content pipeline and the platform clients
//! into a single `Error` enum.
//!
//! # Architecture
//!
//! - [`PosterErrorTrait`] - Common interface implemented by all error types
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors
//!
//! # Handling strategy
//!
//! | Category | Where it surfaces | Outcome |
//! |----------|-------------------|---------|
//! | `Config` | startup | process aborts before the loop |
//! | `Generation` | one slot | logged, slot skipped |
//! | `Publish` | one service | retried by the governor, then recorded |
//! | everything else | loop body | logged, loop pauses and resumes |

use std::io;
use thiserror::Error;

pub use crate::content::GenerationError;
pub use crate::platforms::PublishError;

/// Common trait for all autoposter error types
pub trait PosterErrorTrait: std::error::Error {
    /// Check if this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Configuration and startup errors
    Config,
    /// History store errors
    Storage,
    /// Topic selection and article generation errors
    Generation,
    /// Platform publish errors
    Publish,
    /// Control protocol errors (marker files, liveness artifact)
    Control,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Short label used in log fields
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Storage => "storage",
            Self::Generation => "generation",
            Self::Publish => "publish",
            Self::Control => "control",
            Self::Other => "other",
        }
    }
}

/// Unified error type for the autoposter crate
#[derive(Error, Debug)]
pub enum Error {
    /// Article generation errors
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    /// Platform publish errors
    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),

    /// Database errors
    #[error("Database error: {0}")]
    Database(#[source] rusqlite::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// Control protocol errors
    #[error("Control error: {0}")]
    Control(String),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl PosterErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Generation(e) => e.is_recoverable(),
            Self::Publish(e) => e.is_recoverable(),
            Self::Database(_) => true, // store is reopened per operation
            Self::Io(_) => true,
            Self::Json(_) => false,
            Self::Config(_) => false,
            Self::Control(_) => true,
            Self::Other { .. } => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Generation(_) => ErrorCategory::Generation,
            Self::Publish(_) => ErrorCategory::Publish,
            Self::Database(_) => ErrorCategory::Storage,
            Self::Io(_) | Self::Control(_) => ErrorCategory::Control,
            Self::Json(_) => ErrorCategory::Other,
            Self::Config(_) => ErrorCategory::Config,
            Self::Other { .. } => ErrorCategory::Other,
        }
    }
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a control protocol error
    pub fn control(msg: impl Into<String>) -> Self {
        Self::Control(msg.into())
    }

    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other {
            context: context.into(),
            source: None,
        }
    }

    /// Create a generic error with context and source
    pub fn with_source(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Other {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Whether this error must abort the process instead of the current iteration
    pub fn is_fatal(&self) -> bool {
        self.category() == ErrorCategory::Config
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other {
            context: format!("{err:#}"),
            source: None,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
