//! Key-value store contract for persisted settings and credentials
//!
//! The automation core only consumes settings and credentials through
//! [`KeyValueStore`]; where and how they are kept belongs to the caller.
//! [`EncryptedFileStore`] is the implementation used by the CLI: one JSON
//! document sealed with ChaCha20-Poly1305, readable only by its owner.

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chacha20poly1305::aead::{Aead, AeadCore, KeyInit, OsRng};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};
use rand::RngCore;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

use super::Settings;
use crate::models::CredentialPair;

/// Key holding run settings
pub const SETTINGS_KEY: &str = "settings";

/// Key holding saved logins and the last account
pub const CREDENTIALS_KEY: &str = "credentials";

/// Passphrase variable that replaces the generated key file
pub const STORE_KEY_ENV: &str = "CROSSPOST_STORE_KEY";

const STORE_FORMAT_VERSION: u32 = 1;
const PASSPHRASE_CONTEXT: &[u8] = b"crosspost-store-key-v1";
const NONCE_BYTES: usize = 12;

/// Generic get/set contract of the settings store
pub trait KeyValueStore: Send {
    /// Read a value
    fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Write a value
    fn set(&mut self, key: &str, value: Value) -> Result<()>;

    /// Remove a value
    fn delete(&mut self, key: &str) -> Result<()>;

    /// Remove every value
    fn clear(&mut self) -> Result<()>;
}

/// Logins remembered between runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SavedCredentials {
    /// Last primary account entered
    pub account: String,

    /// Destination platform login
    pub destination: CredentialPair,
}

fn get_typed<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>> {
    match store.get(key)? {
        Some(value) => {
            let typed = serde_json::from_value(value)
                .with_context(|| format!("Stored value for '{key}' has an unexpected shape"))?;
            Ok(Some(typed))
        }
        None => Ok(None),
    }
}

/// Stored settings, falling back to defaults when none were saved
pub fn load_settings(store: &dyn KeyValueStore) -> Result<Settings> {
    Ok(get_typed(store, SETTINGS_KEY)?.unwrap_or_default())
}

/// Persist settings
pub fn save_settings(store: &mut dyn KeyValueStore, settings: &Settings) -> Result<()> {
    store.set(SETTINGS_KEY, serde_json::to_value(settings)?)
}

/// Stored credentials, if any were saved
pub fn load_credentials(store: &dyn KeyValueStore) -> Result<Option<SavedCredentials>> {
    get_typed(store, CREDENTIALS_KEY)
}

/// Persist credentials
pub fn save_credentials(store: &mut dyn KeyValueStore, saved: &SavedCredentials) -> Result<()> {
    store.set(CREDENTIALS_KEY, serde_json::to_value(saved)?)
}

/// Forget saved credentials
pub fn clear_credentials(store: &mut dyn KeyValueStore) -> Result<()> {
    store.delete(CREDENTIALS_KEY)
}

// ============================================================================
// Store key
// ============================================================================

/// 256-bit key sealing the store at rest
#[derive(Clone)]
pub struct StoreKey(Zeroizing<[u8; 32]>);

impl StoreKey {
    /// Fresh random key
    pub fn generate() -> Self {
        let mut key = Zeroizing::new([0u8; 32]);
        OsRng.fill_bytes(&mut key[..]);
        Self(key)
    }

    /// Key derived from a passphrase
    pub fn from_passphrase(passphrase: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(PASSPHRASE_CONTEXT);
        hasher.update(passphrase.as_bytes());
        let mut key = Zeroizing::new([0u8; 32]);
        key.copy_from_slice(&hasher.finalize());
        Self(key)
    }

    /// Key kept in `path`, generated and written (owner-only) on first use
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let encoded = Zeroizing::new(
                fs::read_to_string(path)
                    .with_context(|| format!("Failed to read store key: {}", path.display()))?,
            );
            let bytes = Zeroizing::new(
                BASE64
                    .decode(encoded.trim())
                    .with_context(|| format!("Store key is not valid base64: {}", path.display()))?,
            );
            if bytes.len() != 32 {
                anyhow::bail!("Store key must be 32 bytes: {}", path.display());
            }
            let mut key = Zeroizing::new([0u8; 32]);
            key.copy_from_slice(&bytes);
            return Ok(Self(key));
        }

        let key = Self::generate();
        ensure_parent(path)?;
        let encoded = Zeroizing::new(BASE64.encode(&key.0[..]));
        write_private(path, encoded.as_bytes())
            .with_context(|| format!("Failed to write store key: {}", path.display()))?;
        tracing::info!(path = %path.display(), "Generated store key");
        Ok(key)
    }

    /// `CROSSPOST_STORE_KEY` when set, otherwise the key file at `key_path`
    pub fn resolve(key_path: &Path) -> Result<Self> {
        match std::env::var(STORE_KEY_ENV) {
            Ok(passphrase) if !passphrase.is_empty() => Ok(Self::from_passphrase(&passphrase)),
            _ => Self::load_or_create(key_path),
        }
    }

    fn cipher(&self) -> ChaCha20Poly1305 {
        let key: &[u8; 32] = &self.0;
        ChaCha20Poly1305::new(key.into())
    }
}

impl fmt::Debug for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StoreKey([REDACTED])")
    }
}

// ============================================================================
// Encrypted file store
// ============================================================================

/// On-disk layout of a sealed store
#[derive(Serialize, Deserialize)]
struct SealedDocument {
    version: u32,
    nonce: String,
    ciphertext: String,
}

/// Key-value store sealed into a single file on disk
pub struct EncryptedFileStore {
    path: PathBuf,
    key: StoreKey,
    entries: Map<String, Value>,
}

impl fmt::Debug for EncryptedFileStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptedFileStore")
            .field("path", &self.path)
            .field("keys", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl EncryptedFileStore {
    /// Open a store, starting empty when the file is missing
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read, is not a sealed store, or was
    /// sealed with a different key.
    pub fn open(path: &Path, key: StoreKey) -> Result<Self> {
        let entries = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read store: {}", path.display()))?;
            if content.trim().is_empty() {
                Map::new()
            } else {
                unseal(&key, &content)
                    .with_context(|| format!("Failed to open store: {}", path.display()))?
            }
        } else {
            Map::new()
        };

        Ok(Self {
            path: path.to_path_buf(),
            key,
            entries,
        })
    }

    fn persist(&self) -> Result<()> {
        ensure_parent(&self.path)?;
        let sealed = seal(&self.key, &self.entries)?;
        let temp_path = self.path.with_extension("json.tmp");
        write_private(&temp_path, sealed.as_bytes())
            .with_context(|| format!("Failed to write store: {}", temp_path.display()))?;
        fs::rename(&temp_path, &self.path)
            .with_context(|| format!("Failed to replace store: {}", self.path.display()))?;
        Ok(())
    }
}

impl KeyValueStore for EncryptedFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        self.persist()
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        if self.entries.remove(key).is_some() {
            self.persist()?;
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        self.persist()
    }
}

fn seal(key: &StoreKey, entries: &Map<String, Value>) -> Result<String> {
    let plaintext = Zeroizing::new(serde_json::to_vec(entries)?);
    let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
    let ciphertext = key
        .cipher()
        .encrypt(&nonce, plaintext.as_slice())
        .map_err(|_| anyhow::anyhow!("Failed to encrypt store"))?;

    let document = SealedDocument {
        version: STORE_FORMAT_VERSION,
        nonce: BASE64.encode(nonce),
        ciphertext: BASE64.encode(ciphertext),
    };
    Ok(serde_json::to_string_pretty(&document)?)
}

fn unseal(key: &StoreKey, content: &str) -> Result<Map<String, Value>> {
    let document: SealedDocument =
        serde_json::from_str(content).context("Not a sealed crosspost store")?;
    if document.version != STORE_FORMAT_VERSION {
        anyhow::bail!("Unsupported store version {}", document.version);
    }

    let nonce = BASE64.decode(&document.nonce).context("Invalid store nonce")?;
    if nonce.len() != NONCE_BYTES {
        anyhow::bail!("Invalid store nonce length {}", nonce.len());
    }
    let ciphertext = BASE64
        .decode(&document.ciphertext)
        .context("Invalid store ciphertext")?;

    let plaintext = Zeroizing::new(
        key.cipher()
            .decrypt(Nonce::from_slice(&nonce), ciphertext.as_slice())
            .map_err(|_| anyhow::anyhow!("Failed to decrypt store, wrong key?"))?,
    );
    serde_json::from_slice(&plaintext).context("Decrypted store is not a JSON object")
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    Ok(())
}

/// Write `contents` to `path`, readable and writable by the owner only
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(contents)?;
    file.sync_all()
}
