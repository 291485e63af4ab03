//! Chrome DevTools Protocol driver built on chromiumoxide

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::locator::Locator;
use super::{BrowserLauncher, BrowserSession, PageDriver};
use crate::config::Settings;
use crate::utils::error::DriverError;

/// Window size used for every launched browser
const WINDOW_SIZE: (u32, u32) = (1366, 768);

fn protocol(err: CdpError) -> DriverError {
    match err {
        CdpError::Timeout => DriverError::timeout("browser response", 0),
        other => DriverError::Protocol(other.to_string()),
    }
}

/// A failed lookup on a tab that no longer answers means the tab is gone
fn lookup_error(locator: &Locator, surface_open: bool) -> DriverError {
    if surface_open {
        DriverError::element_not_found(locator.to_string())
    } else {
        DriverError::SurfaceClosed
    }
}

fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

// ============================================================================
// Launcher
// ============================================================================

/// Launches a local Chrome/Chromium
#[derive(Debug, Clone, Default)]
pub struct ChromeLauncher {
    executable: Option<PathBuf>,
}

impl ChromeLauncher {
    /// Launcher using the browser found on the system
    pub fn new() -> Self {
        Self::default()
    }

    /// Launcher using an explicit browser binary
    pub fn with_executable(path: impl Into<PathBuf>) -> Self {
        Self {
            executable: Some(path.into()),
        }
    }
}

#[async_trait]
impl BrowserLauncher for ChromeLauncher {
    async fn launch(&self, settings: &Settings) -> Result<Box<dyn BrowserSession>, DriverError> {
        let mut builder = BrowserConfig::builder()
            .window_size(WINDOW_SIZE.0, WINDOW_SIZE.1)
            .request_timeout(settings.page_timeout())
            .arg("--start-maximized");
        if !settings.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &self.executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(DriverError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| DriverError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "Browser handler event error");
                }
            }
        });

        Ok(Box::new(ChromeSession { browser, handler }))
    }
}

// ============================================================================
// Session
// ============================================================================

struct ChromeSession {
    browser: Browser,
    handler: JoinHandle<()>,
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn open_surface(&mut self) -> Result<Box<dyn PageDriver>, DriverError> {
        let page = self.browser.new_page("about:blank").await.map_err(protocol)?;
        Ok(Box::new(ChromePage { page }))
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        let result = self.browser.close().await.map(|_| ()).map_err(protocol);
        if let Err(e) = self.browser.wait().await {
            warn!(error = %e, "Browser process did not exit cleanly");
        }
        self.handler.abort();
        result
    }
}

// ============================================================================
// Page
// ============================================================================

struct ChromePage {
    page: Page,
}

impl ChromePage {
    async fn find(&self, locator: &Locator) -> Result<Element, DriverError> {
        let found = match locator {
            Locator::Css(selector) => self.page.find_element(selector.as_str()).await,
            other => {
                let expr = other.to_xpath().unwrap_or_default();
                self.page.find_xpath(expr).await
            }
        };
        match found {
            Ok(element) => Ok(element),
            Err(e) => {
                debug!(locator = %locator, error = %e, "Element lookup failed");
                Err(lookup_error(locator, self.page.url().await.is_ok()))
            }
        }
    }

    async fn call(&self, locator: &Locator, function: String) -> Result<Option<serde_json::Value>, DriverError> {
        let element = self.find(locator).await?;
        let returns = element
            .call_js_fn(function, false)
            .await
            .map_err(|e| DriverError::Script(e.to_string()))?;
        Ok(returns.result.value)
    }
}

#[async_trait]
impl PageDriver for ChromePage {
    async fn goto(&mut self, url: &str, timeout: Duration) -> Result<(), DriverError> {
        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(DriverError::navigation(url, e.to_string())),
            Err(_) => Err(DriverError::timeout(format!("navigation to {url}"), timeout.as_millis() as u64)),
        }
    }

    async fn wait_for_navigation(&mut self, timeout: Duration) -> Result<(), DriverError> {
        match tokio::time::timeout(timeout, self.page.wait_for_navigation()).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(protocol(e)),
            Err(_) => Err(DriverError::timeout("navigation", timeout.as_millis() as u64)),
        }
    }

    async fn content(&mut self) -> Result<String, DriverError> {
        self.page.content().await.map_err(protocol)
    }

    async fn exists(&mut self, locator: &Locator) -> Result<bool, DriverError> {
        match self.find(locator).await {
            Ok(_) => Ok(true),
            Err(DriverError::ElementNotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn click(&mut self, locator: &Locator) -> Result<(), DriverError> {
        let element = self.find(locator).await?;
        element.click().await.map_err(protocol)?;
        Ok(())
    }

    async fn clear_and_type(&mut self, locator: &Locator, text: &str) -> Result<(), DriverError> {
        let element = self.find(locator).await?;
        element.click().await.map_err(protocol)?;
        element
            .call_js_fn(
                "function() { if ('value' in this) { this.value = ''; } else { this.innerText = ''; } }",
                false,
            )
            .await
            .map_err(|e| DriverError::Script(e.to_string()))?;
        element.type_str(text).await.map_err(protocol)?;
        Ok(())
    }

    async fn inject_text(&mut self, locator: &Locator, text: &str) -> Result<(), DriverError> {
        let function = format!(
            "function() {{
                const text = {};
                this.focus();
                if ('value' in this) {{ this.value = text; }} else {{ this.innerText = text; }}
                for (const name of ['input', 'change', 'keydown', 'keypress', 'keyup']) {{
                    this.dispatchEvent(new Event(name, {{ bubbles: true }}));
                }}
                this.dispatchEvent(new Event('blur'));
                this.dispatchEvent(new Event('focus'));
            }}",
            js_string(text)
        );
        self.call(locator, function).await.map(|_| ())
    }

    async fn read_text(&mut self, locator: &Locator) -> Result<Option<String>, DriverError> {
        let value = self
            .call(
                locator,
                "function() { return ('value' in this && this.value) ? this.value : (this.innerText || this.textContent || ''); }"
                    .to_string(),
            )
            .await?;
        Ok(value
            .and_then(|v| v.as_str().map(str::to_string))
            .filter(|s| !s.trim().is_empty()))
    }

    async fn press_key(&mut self, locator: &Locator, key: &str) -> Result<(), DriverError> {
        let element = self.find(locator).await?;
        element.press_key(key).await.map_err(protocol)?;
        Ok(())
    }

    async fn upload_file(&mut self, locator: &Locator, path: &Path) -> Result<(), DriverError> {
        let element = self.find(locator).await?;
        let mut params = SetFileInputFilesParams::new(vec![path.display().to_string()]);
        params.backend_node_id = Some(element.backend_node_id);
        self.page.execute(params).await.map_err(protocol)?;
        Ok(())
    }

    async fn is_open(&mut self) -> bool {
        self.page.url().await.is_ok()
    }
}
