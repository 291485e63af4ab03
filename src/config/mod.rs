//! Configuration management for crosspost
//!
//! This module handles loading and validating configuration from environment
//! variables, TOML files and the external key-value settings store.

pub mod store;

pub use store::{EncryptedFileStore, KeyValueStore, StoreKey};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::{CredentialPair, Credentials};
use crate::utils::format_account_url;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Per-run settings
    pub settings: Settings,

    /// Source accounts in priority order
    pub accounts: AccountsConfig,

    /// Platform logins
    pub credentials: Credentials,

    /// Cycle planning
    pub schedule: ScheduleConfig,

    /// Timeline harvesting
    pub harvest: HarvestConfig,

    /// Transfer pipeline tuning
    pub transfer: TransferConfig,

    /// Ledger and media locations
    pub storage: StorageConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Settings supplied per run; immutable once the controller starts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Navigation timeout in milliseconds
    pub page_timeout_ms: u64,

    /// Element wait timeout in milliseconds
    pub element_timeout_ms: u64,

    /// Run the browser without a window
    pub headless: bool,

    /// Publish immediately instead of enqueueing
    pub auto_publish: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            page_timeout_ms: 30_000,
            element_timeout_ms: 10_000,
            headless: false,
            auto_publish: false,
        }
    }
}

impl Settings {
    /// Navigation timeout as Duration
    #[must_use]
    pub fn page_timeout(&self) -> Duration {
        Duration::from_millis(self.page_timeout_ms)
    }

    /// Element wait timeout as Duration
    #[must_use]
    pub fn element_timeout(&self) -> Duration {
        Duration::from_millis(self.element_timeout_ms)
    }
}

/// Source accounts, tried in this order within a slot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountsConfig {
    /// Primary account (handle or URL)
    pub primary: String,

    /// Fallback account
    pub secondary: Option<String>,

    /// Second fallback account
    pub tertiary: Option<String>,
}

impl AccountsConfig {
    /// Normalized, non-empty account URLs in priority order
    pub fn urls(&self) -> Vec<String> {
        std::iter::once(Some(self.primary.as_str()))
            .chain([self.secondary.as_deref(), self.tertiary.as_deref()])
            .flatten()
            .map(format_account_url)
            .filter(|url| !url.is_empty())
            .collect()
    }
}

/// Cycle planning configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Number of transfer slots per window
    pub items_per_window: u32,

    /// Window length in minutes
    pub window_minutes: u32,

    /// Fixed RNG seed for reproducible plans
    pub seed: Option<u64>,

    /// Stop after this many full plans; runs until stopped when absent
    pub max_cycles: Option<u32>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            items_per_window: 1,
            window_minutes: 60,
            seed: None,
            max_cycles: None,
        }
    }
}

/// Timeline harvesting configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// How many newest items to parse per account
    pub count: usize,

    /// Lower bound of the pause between candidate checks
    pub candidate_delay_min_ms: u64,

    /// Upper bound of the pause between candidate checks
    pub candidate_delay_max_ms: u64,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            count: 5,
            candidate_delay_min_ms: 1_000,
            candidate_delay_max_ms: 3_000,
        }
    }
}

/// Transfer pipeline configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Attempts per item before the slot moves on
    pub max_attempts: u32,

    /// Delay before the second attempt
    pub retry_delay_ms: u64,

    /// Pause after opening the composer so its editor can mount
    pub composer_settle_ms: u64,

    /// Pause between typing and reading the input surface back
    pub verify_settle_ms: u64,

    /// Pause after attaching media so the upload can finish
    pub upload_settle_ms: u64,

    /// Interval between locator polls during an element wait
    pub poll_interval_ms: u64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            retry_delay_ms: 2_000,
            composer_settle_ms: 8_000,
            verify_settle_ms: 2_000,
            upload_settle_ms: 5_000,
            poll_interval_ms: 250,
        }
    }
}

/// Persistent locations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Seen-item ledger document
    pub ledger_path: PathBuf,

    /// Encrypted key-value settings store document
    pub store_path: PathBuf,

    /// Directory for downloaded media; system temp dir when absent
    pub media_dir: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            ledger_path: PathBuf::from("data/seen.json"),
            store_path: PathBuf::from("data/store.json"),
            media_dir: None,
        }
    }
}

impl StorageConfig {
    /// Directory downloaded media is written to
    pub fn media_dir(&self) -> PathBuf {
        self.media_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Key file sealing the settings store, next to the store itself
    pub fn store_key_path(&self) -> PathBuf {
        self.store_path.with_extension("key")
    }

    /// Open the settings store with its resolved key
    pub fn open_store(&self) -> Result<EncryptedFileStore> {
        let key = StoreKey::resolve(&self.store_key_path())?;
        EncryptedFileStore::open(&self.store_path, key)
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Recursively replace `base` entries with those present in `overlay`
fn merge_toml(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_toml(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env();
        Ok(config)
    }

    /// Overlay `CROSSPOST_*` environment variables onto this configuration
    pub fn apply_env(&mut self) {
        if let Some(v) = env_parse("CROSSPOST_PAGE_TIMEOUT_MS") {
            self.settings.page_timeout_ms = v;
        }
        if let Some(v) = env_parse("CROSSPOST_ELEMENT_TIMEOUT_MS") {
            self.settings.element_timeout_ms = v;
        }
        if let Some(v) = env_parse("CROSSPOST_HEADLESS") {
            self.settings.headless = v;
        }
        if let Some(v) = env_parse("CROSSPOST_AUTO_PUBLISH") {
            self.settings.auto_publish = v;
        }

        if let Some(v) = env_string("CROSSPOST_ACCOUNT") {
            self.accounts.primary = v;
        }
        if let Some(v) = env_string("CROSSPOST_SECONDARY_ACCOUNT") {
            self.accounts.secondary = Some(v);
        }
        if let Some(v) = env_string("CROSSPOST_TERTIARY_ACCOUNT") {
            self.accounts.tertiary = Some(v);
        }

        if let (Some(user), Some(pass)) = (
            env_string("CROSSPOST_SOURCE_USER"),
            env_string("CROSSPOST_SOURCE_PASSWORD"),
        ) {
            self.credentials.source = Some(CredentialPair::new(user, pass));
        }
        if let Some(v) = env_string("CROSSPOST_DEST_EMAIL") {
            self.credentials.destination.username = v;
        }
        if let Some(v) = env_string("CROSSPOST_DEST_PASSWORD") {
            self.credentials.destination.password = v;
        }

        if let Some(v) = env_parse("CROSSPOST_ITEMS_PER_WINDOW") {
            self.schedule.items_per_window = v;
        }
        if let Some(v) = env_parse("CROSSPOST_SEED") {
            self.schedule.seed = Some(v);
        }
        if let Some(v) = env_string("CROSSPOST_LEDGER_PATH") {
            self.storage.ledger_path = PathBuf::from(v);
        }
        if let Some(v) = env_string("CROSSPOST_STORE_PATH") {
            self.storage.store_path = PathBuf::from(v);
        }
        if let Some(v) = env_string("CROSSPOST_MEDIA_DIR") {
            self.storage.media_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = env_string("CROSSPOST_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = env_string("CROSSPOST_LOG_FORMAT") {
            self.logging.format = v;
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        Self::default().merge_file(path)
    }

    /// Run configuration built in layers
    ///
    /// Stored settings come first, keys present in the TOML file replace
    /// them, then `CROSSPOST_*` environment variables apply on top.
    /// Command-line flags are applied by the caller afterwards.
    pub fn layered(file: Option<&Path>, stored: &Settings) -> Result<Self> {
        let base = Self {
            settings: stored.clone(),
            ..Self::default()
        };
        let mut config = match file {
            Some(path) => base.merge_file(path)?,
            None => base,
        };
        config.apply_env();
        Ok(config)
    }

    /// Overlay the keys present in a TOML file onto this configuration
    fn merge_file(self, path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let overlay: toml::Table = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        let mut merged = toml::Value::try_from(&self).context("Failed to encode configuration")?;
        merge_toml(&mut merged, toml::Value::Table(overlay));
        merged
            .try_into()
            .with_context(|| format!("Invalid configuration in {}", path.display()))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.settings.page_timeout_ms == 0 || self.settings.element_timeout_ms == 0 {
            anyhow::bail!("page and element timeouts must be greater than 0");
        }

        if self.schedule.window_minutes == 0 {
            anyhow::bail!("window_minutes must be greater than 0");
        }

        if self.schedule.items_per_window > self.schedule.window_minutes {
            anyhow::bail!(
                "items_per_window ({}) cannot exceed window_minutes ({}): every slot needs at least one minute",
                self.schedule.items_per_window,
                self.schedule.window_minutes
            );
        }

        if self.harvest.count == 0 {
            anyhow::bail!("harvest count must be greater than 0");
        }

        if self.harvest.candidate_delay_min_ms > self.harvest.candidate_delay_max_ms {
            anyhow::bail!("candidate_delay_min_ms must not exceed candidate_delay_max_ms");
        }

        if self.transfer.max_attempts == 0 {
            anyhow::bail!("max_attempts must be at least 1");
        }

        if self.transfer.poll_interval_ms == 0 {
            anyhow::bail!("poll_interval_ms must be greater than 0");
        }

        Ok(())
    }
}
