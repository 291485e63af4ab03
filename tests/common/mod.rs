//! Common test utilities
//!
//! In-memory stand-ins for the browser and the media downloader. Every fake
//! shares one [`FakeWorld`] so a test can script pages up front and inspect
//! clicks, typed text and logins afterwards.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crosspost::browser::{BrowserLauncher, BrowserSession, Locator, PageDriver};
use crosspost::config::{Config, Settings};
use crosspost::models::CredentialPair;
use crosspost::parser::selectors::TIMELINE_ITEM_CSS;
use crosspost::parser::MediaSource;
use crosspost::transfer::{DestinationLocators, MediaFetcher, MediaFile, MediaKind};
use crosspost::utils::error::{DriverError, TransferError};

// ============================================================================
// Scripted pages
// ============================================================================

/// Timeline article linking to `/<handle>/status/<id>`
pub fn timeline_article(handle: &str, id: u64, datetime: &str, pinned: bool) -> String {
    let context = if pinned {
        r#"<div data-testid="socialContext"><span>Pinned</span></div>"#
    } else {
        ""
    };
    format!(
        r#"<article data-testid="tweet">{context}
            <a href="/{handle}/status/{id}"><time datetime="{datetime}">1h</time></a>
            <div data-testid="tweetText"><span>post {id}</span></div>
        </article>"#
    )
}

/// Timeline page wrapping `articles`
pub fn timeline_page(articles: &[String]) -> String {
    format!("<html><body>{}</body></html>", articles.concat())
}

/// Item page with text and, optionally, a photo
pub fn item_page(handle: &str, id: u64, text: &str, with_photo: bool) -> String {
    let photo = if with_photo {
        format!(r#"<div data-testid="tweetPhoto"><img src="https://pbs.twimg.com/media/{id}.jpg"></div>"#)
    } else {
        String::new()
    };
    format!(
        r#"<html><body><article data-testid="tweet">
            <a href="/{handle}/status/{id}"><time datetime="2024-05-01T10:00:00Z"></time></a>
            <div data-testid="tweetText"><span>{text}</span></div>
            {photo}
        </article></body></html>"#
    )
}

pub fn item_url(handle: &str, id: u64) -> String {
    format!("https://x.com/{handle}/status/{id}")
}

pub fn account_url(handle: &str) -> String {
    format!("https://x.com/{handle}")
}

// ============================================================================
// Fake browser
// ============================================================================

/// Shared, scriptable browser state
#[derive(Debug, Default)]
pub struct FakeWorld {
    /// Markup served per URL
    pub pages: HashMap<String, String>,
    /// URLs whose navigation fails
    pub unreachable: HashSet<String>,
    /// Destination controls currently on screen
    pub controls: HashSet<Locator>,
    /// Inputs that silently drop keyboard input
    pub reject_typing: HashSet<Locator>,
    /// Login page URL and its fields
    pub login_url: String,
    pub login_fields: Vec<Locator>,
    /// Submitted logins are refused
    pub reject_login: bool,
    /// Launches fail
    pub fail_launch: bool,

    pub current_url: String,
    pub logged_in: bool,
    pub closed: bool,

    pub visited: Vec<String>,
    pub clicks: Vec<Locator>,
    pub typed: HashMap<Locator, String>,
    pub uploads: Vec<PathBuf>,
    pub login_submits: usize,
    pub launches: usize,
    pub surfaces: usize,
}

#[derive(Debug, Clone, Default)]
pub struct SharedWorld(Arc<Mutex<FakeWorld>>);

impl SharedWorld {
    /// World wired to the default destination login form
    pub fn new() -> Self {
        let locators = DestinationLocators::default();
        let world = Self::default();
        {
            let mut w = world.lock();
            w.login_url = locators.login.url.clone();
            w.login_fields = locators
                .login
                .username_fields
                .iter()
                .chain(&locators.login.password_fields)
                .cloned()
                .collect();
        }
        world
    }

    pub fn lock(&self) -> MutexGuard<'_, FakeWorld> {
        self.0.lock().expect("fake world poisoned")
    }

    /// Serve `html` at `url`
    pub fn page(&self, url: impl Into<String>, html: impl Into<String>) -> &Self {
        self.lock().pages.insert(url.into(), html.into());
        self
    }

    /// Put destination controls on screen
    pub fn controls(&self, locators: impl IntoIterator<Item = Locator>) -> &Self {
        self.lock().controls.extend(locators);
        self
    }

    /// A composer with a text box, a file input and the queue button
    pub fn buffer_composer(&self) -> &Self {
        self.controls([
            Locator::text("button", "Create a post"),
            Locator::css(r#"div[role="textbox"]"#),
            Locator::css(r#"input[type="file"]"#),
            Locator::css(r#"button[data-testid="queue-button"]"#),
        ])
    }

    pub fn clicked(&self, locator: &Locator) -> bool {
        self.lock().clicks.contains(locator)
    }

    pub fn visits_to(&self, url: &str) -> usize {
        self.lock().visited.iter().filter(|v| *v == url).count()
    }
}

/// One fake tab
pub struct FakeDriver {
    world: SharedWorld,
}

impl FakeDriver {
    pub fn new(world: SharedWorld) -> Self {
        Self { world }
    }
}

fn is_login_field(world: &FakeWorld, locator: &Locator) -> bool {
    world.login_fields.contains(locator)
}

fn visible(world: &FakeWorld, locator: &Locator) -> bool {
    if *locator == Locator::css(TIMELINE_ITEM_CSS) {
        return world
            .pages
            .get(&world.current_url)
            .is_some_and(|html| html.contains(r#"data-testid="tweet""#));
    }
    if is_login_field(world, locator) {
        return world.current_url == world.login_url && !world.logged_in;
    }
    world.controls.contains(locator)
}

#[async_trait]
impl PageDriver for FakeDriver {
    async fn goto(&mut self, url: &str, _timeout: Duration) -> Result<(), DriverError> {
        let mut w = self.world.lock();
        if w.closed {
            return Err(DriverError::SurfaceClosed);
        }
        w.visited.push(url.to_string());
        if w.unreachable.contains(url) {
            return Err(DriverError::navigation(url, "unreachable"));
        }
        w.current_url = url.to_string();
        Ok(())
    }

    async fn wait_for_navigation(&mut self, _timeout: Duration) -> Result<(), DriverError> {
        Ok(())
    }

    async fn content(&mut self) -> Result<String, DriverError> {
        let w = self.world.lock();
        Ok(w.pages
            .get(&w.current_url)
            .cloned()
            .unwrap_or_else(|| "<html><body></body></html>".to_string()))
    }

    async fn exists(&mut self, locator: &Locator) -> Result<bool, DriverError> {
        let w = self.world.lock();
        if w.closed {
            return Err(DriverError::SurfaceClosed);
        }
        Ok(visible(&w, locator))
    }

    async fn click(&mut self, locator: &Locator) -> Result<(), DriverError> {
        let mut w = self.world.lock();
        if !visible(&w, locator) {
            return Err(DriverError::element_not_found(locator.to_string()));
        }
        w.clicks.push(locator.clone());
        Ok(())
    }

    async fn clear_and_type(&mut self, locator: &Locator, text: &str) -> Result<(), DriverError> {
        let mut w = self.world.lock();
        if !w.reject_typing.contains(locator) {
            w.typed.insert(locator.clone(), text.to_string());
        }
        Ok(())
    }

    async fn inject_text(&mut self, locator: &Locator, text: &str) -> Result<(), DriverError> {
        self.world
            .lock()
            .typed
            .insert(locator.clone(), text.to_string());
        Ok(())
    }

    async fn read_text(&mut self, locator: &Locator) -> Result<Option<String>, DriverError> {
        Ok(self.world.lock().typed.get(locator).cloned())
    }

    async fn press_key(&mut self, locator: &Locator, key: &str) -> Result<(), DriverError> {
        let mut w = self.world.lock();
        if key == "Enter" && is_login_field(&w, locator) {
            w.login_submits += 1;
            if !w.reject_login {
                w.logged_in = true;
            }
        }
        Ok(())
    }

    async fn upload_file(&mut self, _locator: &Locator, path: &Path) -> Result<(), DriverError> {
        self.world.lock().uploads.push(path.to_path_buf());
        Ok(())
    }

    async fn is_open(&mut self) -> bool {
        !self.world.lock().closed
    }
}

pub struct FakeSession {
    world: SharedWorld,
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn open_surface(&mut self) -> Result<Box<dyn PageDriver>, DriverError> {
        {
            let mut w = self.world.lock();
            w.surfaces += 1;
            w.closed = false;
        }
        Ok(Box::new(FakeDriver::new(self.world.clone())))
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        self.world.lock().closed = true;
        Ok(())
    }
}

#[derive(Clone)]
pub struct FakeLauncher {
    pub world: SharedWorld,
}

impl FakeLauncher {
    pub fn new(world: SharedWorld) -> Self {
        Self { world }
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self, _settings: &Settings) -> Result<Box<dyn BrowserSession>, DriverError> {
        let mut w = self.world.lock();
        if w.fail_launch {
            return Err(DriverError::Launch("no browser binary".to_string()));
        }
        w.launches += 1;
        Ok(Box::new(FakeSession {
            world: self.world.clone(),
        }))
    }
}

// ============================================================================
// Fake media downloads
// ============================================================================

/// Writes a placeholder file per item and counts calls
pub struct FakeMediaFetcher {
    dir: tempfile::TempDir,
    calls: AtomicUsize,
}

impl FakeMediaFetcher {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("temp dir"),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }
}

#[async_trait]
impl MediaFetcher for FakeMediaFetcher {
    async fn fetch(&self, source: &MediaSource, item_id: &str) -> Result<MediaFile, TransferError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let kind = match source {
            MediaSource::Image(_) => MediaKind::Image,
            MediaSource::Video(_) => MediaKind::Video,
        };
        let path = self.dir.path().join(format!("{item_id}.media"));
        std::fs::write(&path, b"media").map_err(|e| TransferError::MediaDownload(e.to_string()))?;
        Ok(MediaFile::new(path, kind))
    }
}

// ============================================================================
// Configuration
// ============================================================================

pub fn destination_login() -> CredentialPair {
    CredentialPair::new("relay@example.com", "hunter2")
}

/// Config writing its ledger under `dir`, with fast retries
pub fn test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.credentials.destination = destination_login();
    config.storage.ledger_path = dir.join("ledger.json");
    config.storage.store_path = dir.join("store.json");
    config.transfer.max_attempts = 2;
    config.transfer.retry_delay_ms = 100;
    config
}
