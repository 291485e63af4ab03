//! Browser automation layer
//!
//! The automation core never talks to a browser directly. It goes through
//! three small traits:
//!
//! - [`BrowserLauncher`] creates a [`BrowserSession`] (one per process)
//! - [`BrowserSession`] opens interactive surfaces (tabs)
//! - [`PageDriver`] performs navigation, queries and input on one surface
//!
//! [`chrome`] implements them on top of the Chrome DevTools Protocol; tests
//! implement them with in-memory fakes.
//!
//! On top of the traits sit the [`ResilientExecutor`], which resolves ordered
//! locator lists within a bounded wait, and the [`SessionManager`], which owns
//! the long-lived session and the destination login state.

pub mod chrome;
pub mod executor;
pub mod locator;
pub mod session;

pub use chrome::ChromeLauncher;
pub use executor::ResilientExecutor;
pub use locator::{ClickPath, Locator};
pub use session::{LoginForm, LoginOutcome, SessionManager};

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

use crate::config::Settings;
use crate::utils::error::DriverError;

/// Operations on one interactive surface (page/tab)
///
/// Query methods never wait: bounded waiting is the executor's job. Methods
/// taking a locator act on the first element it matches.
#[async_trait]
pub trait PageDriver: Send {
    /// Navigate to `url` and wait for the load to finish
    async fn goto(&mut self, url: &str, timeout: Duration) -> Result<(), DriverError>;

    /// Wait for a navigation triggered by a previous action
    async fn wait_for_navigation(&mut self, timeout: Duration) -> Result<(), DriverError>;

    /// Current document markup
    async fn content(&mut self) -> Result<String, DriverError>;

    /// Whether `locator` matches an element right now
    async fn exists(&mut self, locator: &Locator) -> Result<bool, DriverError>;

    /// Click the element
    async fn click(&mut self, locator: &Locator) -> Result<(), DriverError>;

    /// Focus the element, clear it and type `text` as keyboard input
    async fn clear_and_type(&mut self, locator: &Locator, text: &str) -> Result<(), DriverError>;

    /// Assign `text` through script and fire input events
    async fn inject_text(&mut self, locator: &Locator, text: &str) -> Result<(), DriverError>;

    /// Read the element's visible text or value back
    async fn read_text(&mut self, locator: &Locator) -> Result<Option<String>, DriverError>;

    /// Press a named key (e.g. "Enter") on the element
    async fn press_key(&mut self, locator: &Locator, key: &str) -> Result<(), DriverError>;

    /// Set a local file on a file input element
    async fn upload_file(&mut self, locator: &Locator, path: &Path) -> Result<(), DriverError>;

    /// Whether the surface can still be driven
    async fn is_open(&mut self) -> bool;
}

/// A running automation session that can open surfaces
#[async_trait]
pub trait BrowserSession: Send {
    /// Open a new interactive surface
    async fn open_surface(&mut self) -> Result<Box<dyn PageDriver>, DriverError>;

    /// Shut the session down
    async fn close(&mut self) -> Result<(), DriverError>;
}

/// Factory for browser sessions
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    /// Start a session honoring `settings` (headless mode, timeouts)
    async fn launch(&self, settings: &Settings) -> Result<Box<dyn BrowserSession>, DriverError>;
}
