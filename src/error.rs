//! Unified error handling for the crosspost crate
//!
//! This module provides a unified error type that consolidates all domain-specific
//! errors into a single `Error` enum, while maintaining the ability to use
//! domain-specific errors when needed.
//!
//! # Architecture
//!
//! - [`CrosspostErrorTrait`] - Common interface implemented by all error types
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors
//!
//! # Recovery policy
//!
//! | Failure              | Recovery                                        |
//! |----------------------|-------------------------------------------------|
//! | element not found    | fallback locator or fallback action             |
//! | media not found      | fatal to that item only                         |
//! | navigation error     | abandon the account, try the next one           |
//! | credentials missing  | fatal to the run, loop never starts             |
//! | ledger corrupt       | treat the ledger as empty                       |

use std::io;
use thiserror::Error;

// Re-export domain-specific errors for convenience
pub use crate::utils::error::{DriverError, HarvestError, LedgerError, TransferError};

/// Common trait for all crosspost error types
pub trait CrosspostErrorTrait: std::error::Error {
    /// Check if this error is recoverable without ending the run
    fn is_recoverable(&self) -> bool;

    /// Short description for status messages
    fn user_message(&self) -> String;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Browser automation errors (launch, navigation, elements)
    Browser,
    /// Source timeline harvesting errors
    Harvest,
    /// Transfer pipeline errors
    Transfer,
    /// Ledger and file errors
    Storage,
    /// Configuration and credential errors
    Config,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Human-readable category name
    pub fn label(&self) -> &'static str {
        match self {
            Self::Browser => "browser error",
            Self::Harvest => "harvest error",
            Self::Transfer => "transfer error",
            Self::Storage => "storage error",
            Self::Config => "configuration error",
            Self::Other => "other error",
        }
    }
}

/// Unified error type for the crosspost crate
#[derive(Error, Debug)]
pub enum Error {
    /// Browser driver errors
    #[error("Browser error: {0}")]
    Driver(#[from] DriverError),

    /// Timeline harvesting errors
    #[error("Harvest error: {0}")]
    Harvest(#[from] HarvestError),

    /// Transfer pipeline errors
    #[error("Transfer error: {0}")]
    Transfer(#[from] TransferError),

    /// Ledger errors
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Required credentials are missing
    #[error("Credentials missing: {0}")]
    CredentialsMissing(String),

    /// No browser session could be acquired
    #[error("Browser session unavailable: {0}")]
    SessionUnavailable(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl CrosspostErrorTrait for DriverError {
    fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Launch(_))
    }

    fn user_message(&self) -> String {
        match self {
            Self::ElementNotFound { .. } => "A page control could not be found".to_string(),
            Self::SurfaceClosed => "The browser tab was closed".to_string(),
            other => other.to_string(),
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Browser
    }
}

impl CrosspostErrorTrait for HarvestError {
    fn is_recoverable(&self) -> bool {
        true
    }

    fn user_message(&self) -> String {
        self.to_string()
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Harvest
    }
}

impl CrosspostErrorTrait for TransferError {
    fn is_recoverable(&self) -> bool {
        true
    }

    fn user_message(&self) -> String {
        self.to_string()
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Driver(_) => ErrorCategory::Browser,
            _ => ErrorCategory::Transfer,
        }
    }
}

impl CrosspostErrorTrait for LedgerError {
    fn is_recoverable(&self) -> bool {
        true
    }

    fn user_message(&self) -> String {
        self.to_string()
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Storage
    }
}

impl CrosspostErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Driver(e) => e.is_recoverable(),
            Self::Harvest(e) => e.is_recoverable(),
            Self::Transfer(e) => e.is_recoverable(),
            Self::Ledger(e) => e.is_recoverable(),
            Self::CredentialsMissing(_) | Self::SessionUnavailable(_) => false,
            Self::Io(_) => true,
            Self::Json(_) => false,
            Self::Http(_) => true,
            Self::Config(_) => false,
            Self::Other { .. } => false,
        }
    }

    fn user_message(&self) -> String {
        match self {
            Self::Driver(e) => e.user_message(),
            Self::Harvest(e) => e.user_message(),
            Self::Transfer(e) => e.user_message(),
            Self::Ledger(e) => e.user_message(),
            Self::Other { context, .. } => context.clone(),
            other => format!("{}: {other}", other.category().label()),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Driver(_) | Self::SessionUnavailable(_) => ErrorCategory::Browser,
            Self::Harvest(_) => ErrorCategory::Harvest,
            Self::Transfer(e) => e.category(),
            Self::Ledger(_) | Self::Io(_) | Self::Json(_) => ErrorCategory::Storage,
            Self::Http(_) => ErrorCategory::Transfer,
            Self::CredentialsMissing(_) | Self::Config(_) => ErrorCategory::Config,
            Self::Other { .. } => ErrorCategory::Other,
        }
    }
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

// Conversion from anyhow::Error
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other {
            context: err.to_string(),
            source: None,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
