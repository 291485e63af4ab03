//! Error types for the crosspost automation core
//!
//! This module defines the domain error types used by the browser layer,
//! the harvester, the transfer pipeline and the ledger.

use thiserror::Error;

/// Errors raised by a page driver while talking to the browser
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// Browser process could not be started or connected to
    #[error("Browser launch failed: {0}")]
    Launch(String),

    /// Navigation did not complete
    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    /// A bounded wait ran out
    #[error("Timed out after {ms} ms waiting for {what}")]
    Timeout { what: String, ms: u64 },

    /// None of the locator candidates resolved in time
    #[error("Element not found: {locator}")]
    ElementNotFound { locator: String },

    /// The interactive surface (tab) was closed underneath us
    #[error("Page surface is closed")]
    SurfaceClosed,

    /// Protocol-level failure reported by the browser
    #[error("Browser protocol error: {0}")]
    Protocol(String),

    /// Script evaluation returned something unexpected
    #[error("Script evaluation failed: {0}")]
    Script(String),
}

impl DriverError {
    /// Create a navigation error
    pub fn navigation(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Navigation {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create an element-not-found error
    pub fn element_not_found(locator: impl Into<String>) -> Self {
        Self::ElementNotFound {
            locator: locator.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(what: impl Into<String>, ms: u64) -> Self {
        Self::Timeout {
            what: what.into(),
            ms,
        }
    }
}

/// Errors raised while harvesting a source account timeline
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HarvestError {
    /// Account URL was empty after normalization
    #[error("Account URL is empty")]
    EmptyAccount,

    /// Timeline page could not be loaded
    #[error("Failed to load timeline {account}: {source}")]
    Navigation {
        account: String,
        #[source]
        source: DriverError,
    },

    /// No item node rendered within the element timeout
    #[error("No items found on timeline {account}")]
    NotFound { account: String },

    /// Any other driver failure while reading the timeline
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),
}

/// Reasons a single transfer fails
///
/// These are carried inside a `TransferResult` rather than raised past the
/// pipeline boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    /// Item page could not be opened
    #[error("Could not open item page: {0}")]
    ItemUnavailable(String),

    /// Neither an image nor a video was found on the item
    #[error("No image or video found on item")]
    MediaNotFound,

    /// Media was found but could not be downloaded
    #[error("Media download failed: {0}")]
    MediaDownload(String),

    /// Destination login did not complete
    #[error("Destination login failed: {0}")]
    LoginFailed(String),

    /// Composer could not be opened by any means
    #[error("Composer could not be opened")]
    ComposerUnavailable,

    /// No input surface accepted the text
    #[error("Composer rejected the text input")]
    TextNotAccepted,

    /// Upload control was missing or rejected the file
    #[error("Media could not be attached: {0}")]
    AttachFailed(String),

    /// Every finalization tier was unavailable
    #[error("No publish, queue or draft control was available")]
    FinalizeUnavailable,

    /// Underlying driver failure in a step without a more specific reason
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),
}

impl TransferError {
    /// Whether retrying the same item can plausibly succeed
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::MediaNotFound)
    }
}

/// Errors raised by the seen-item ledger
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Ledger file could not be read or written
    #[error("Ledger I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Ledger file is not a valid account -> ids document
    #[error("Ledger file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}
