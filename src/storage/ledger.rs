//! Seen-item ledger
//!
//! The ledger is the only durable state of the automation core: a JSON
//! document mapping each source account to the ids already transferred from
//! it. It is read fully at startup and rewritten fully after every record.
//!
//! Loading is fail-open. A missing or corrupt document yields an empty ledger,
//! trading a possible re-transfer for never refusing to start.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::utils::error::LedgerError;

/// On-disk shape: account -> ids
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
struct LedgerDocument(BTreeMap<String, BTreeSet<String>>);

/// Durable set of transferred item ids per source account
#[derive(Debug, Clone)]
pub struct SeenLedger {
    path: PathBuf,
    entries: BTreeMap<String, BTreeSet<String>>,
}

impl SeenLedger {
    /// Load the ledger, starting empty when the file is missing or corrupt
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(ledger) => ledger,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ledger unreadable, starting empty");
                Self::empty(path)
            }
        }
    }

    /// Load the ledger, reporting unreadable or corrupt documents
    pub fn try_load(path: &Path) -> Result<Self, LedgerError> {
        if !path.exists() {
            debug!(path = %path.display(), "No ledger yet, starting empty");
            return Ok(Self::empty(path));
        }

        let file = File::open(path)?;
        let document: LedgerDocument = serde_json::from_reader(BufReader::new(file))?;

        debug!(path = %path.display(), accounts = document.0.len(), "Ledger loaded");
        Ok(Self {
            path: path.to_path_buf(),
            entries: document.0,
        })
    }

    /// Empty ledger that will be written to `path`
    pub fn empty(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            entries: BTreeMap::new(),
        }
    }

    /// Backing document location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether `id` was already transferred from `account`
    pub fn contains(&self, account: &str, id: &str) -> bool {
        self.entries
            .get(account)
            .is_some_and(|ids| ids.contains(id))
    }

    /// Add `id` in memory; `false` when it was already present
    pub fn record(&mut self, account: &str, id: &str) -> bool {
        self.entries
            .entry(account.to_string())
            .or_default()
            .insert(id.to_string())
    }

    /// Rewrite the backing document (temp file + rename)
    pub fn flush(&self) -> Result<(), LedgerError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        let mut writer = BufWriter::new(File::create(&temp_path)?);
        serde_json::to_writer_pretty(&mut writer, &self.entries)?;
        writer.flush()?;
        fs::rename(&temp_path, &self.path)?;

        debug!(path = %self.path.display(), "Ledger flushed");
        Ok(())
    }

    /// Record `id` and flush immediately
    pub fn record_and_flush(&mut self, account: &str, id: &str) -> Result<(), LedgerError> {
        self.record(account, id);
        self.flush()
    }

    /// Accounts with at least one recorded id
    pub fn accounts(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Recorded ids of one account, sorted
    pub fn ids(&self, account: &str) -> Vec<&str> {
        self.entries
            .get(account)
            .map(|ids| ids.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Total number of recorded ids
    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeSet::len).sum()
    }

    /// Whether nothing is recorded
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget one account; `true` when it had entries
    pub fn clear_account(&mut self, account: &str) -> bool {
        self.entries.remove(account).is_some()
    }

    /// Forget everything
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
