//! Core data structures shared across the automation core

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::error::TransferError;

// ============================================================================
// Candidate Item
// ============================================================================

/// One piece of source content eligible for transfer
///
/// Created transiently per harvest; only its `id` outlives the cycle, and only
/// as ledger membership after a successful transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateItem {
    /// Item identifier extracted from the canonical URL
    pub id: String,

    /// Canonical item URL
    pub url: String,

    /// Publication time when the timeline exposed one
    pub published_at: Option<DateTime<Utc>>,

    /// Whether the item is pinned to the top of the timeline
    pub is_pinned: bool,

    /// Normalized timeline URL of the account the item came from
    pub source_account: String,

    /// Position of the item node in document order
    pub position: usize,
}

impl CandidateItem {
    /// Short human-readable label for status messages
    pub fn label(&self) -> String {
        if self.is_pinned {
            format!("{} (pinned)", self.url)
        } else {
            self.url.clone()
        }
    }
}

// ============================================================================
// Credentials
// ============================================================================

/// A login pair for one platform
///
/// `Debug` never prints the secret.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
    /// Login name or e-mail address
    pub username: String,

    /// Password
    pub password: String,
}

impl CredentialPair {
    /// Create a new credential pair
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Both halves present after trimming
    pub fn is_complete(&self) -> bool {
        !self.username.trim().is_empty() && !self.password.trim().is_empty()
    }

    /// Username with everything but the first character masked
    pub fn masked_username(&self) -> String {
        let mut chars = self.username.chars();
        match chars.next() {
            Some(first) => format!("{first}{}", "*".repeat(chars.count())),
            None => String::new(),
        }
    }
}

impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("username", &self.masked_username())
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Source and destination platform logins
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Source platform login; timelines are read without logging in
    #[serde(default)]
    pub source: Option<CredentialPair>,

    /// Destination platform login
    #[serde(default)]
    pub destination: CredentialPair,
}

// ============================================================================
// Transfer Outcome
// ============================================================================

/// How a composer session was finalized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Finalization {
    /// Posted immediately
    Published,
    /// Added to the posting queue
    Enqueued,
    /// Saved as a draft
    Drafted,
}

impl fmt::Display for Finalization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Published => "published",
            Self::Enqueued => "enqueued",
            Self::Drafted => "drafted",
        };
        f.write_str(label)
    }
}

/// Result of one transfer attempt, consumed by the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferResult {
    /// Whether the item reached a finalized state
    pub success: bool,

    /// Identifier of the transferred item
    pub item_id: String,

    /// Why the transfer failed, if it did
    pub failure_reason: Option<TransferError>,

    /// Which tier finalized the post, if it succeeded
    pub finalization: Option<Finalization>,
}

impl TransferResult {
    /// Successful transfer
    pub fn succeeded(item_id: impl Into<String>, finalization: Finalization) -> Self {
        Self {
            success: true,
            item_id: item_id.into(),
            failure_reason: None,
            finalization: Some(finalization),
        }
    }

    /// Failed transfer
    pub fn failed(item_id: impl Into<String>, reason: TransferError) -> Self {
        Self {
            success: false,
            item_id: item_id.into(),
            failure_reason: Some(reason),
            finalization: None,
        }
    }
}

// ============================================================================
// Item Lifecycle
// ============================================================================

/// Lifecycle of one item within a cycle
///
/// `Failed` is terminal for the cycle; the item stays eligible later because
/// it never reaches the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemState {
    Harvested,
    TextExtracted,
    MediaAcquired,
    LoggedIn,
    ComposerOpen,
    TextEntered,
    MediaAttached,
    Finalized(Finalization),
    LedgerRecorded,
    Failed,
}

impl ItemState {
    /// Whether no further transitions happen in this cycle
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::LedgerRecorded | Self::Failed)
    }
}
