//! Browser session ownership and destination login state
//!
//! One [`SessionManager`] exists per run. It launches the browser lazily,
//! keeps exactly one interactive surface, reopens that surface when it gets
//! closed, and remembers whether the destination login already happened.
//!
//! The login flag is never re-validated: once set it stays set until the
//! manager is dropped.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::executor::ResilientExecutor;
use super::locator::Locator;
use super::{BrowserLauncher, BrowserSession, PageDriver};
use crate::config::Settings;
use crate::controller::events::StatusSink;
use crate::models::CredentialPair;
use crate::utils::error::{DriverError, TransferError};

/// Upper bound on the wait for a first-run dialog after login
const DISMISS_TIMEOUT: Duration = Duration::from_secs(3);

/// Where and how the destination login form is filled in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginForm {
    /// Login page URL
    pub url: String,

    /// Candidates for the username / e-mail input
    pub username_fields: Vec<Locator>,

    /// Candidates for the password input
    pub password_fields: Vec<Locator>,

    /// Candidates for closing a first-run dialog shown after login
    pub dismiss_controls: Vec<Locator>,
}

/// What `ensure_logged_in` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Credentials were submitted and accepted
    LoggedIn,
    /// Already authenticated; nothing was submitted
    Skipped,
}

/// Owner of the single browser session and its interactive surface
pub struct SessionManager {
    launcher: Arc<dyn BrowserLauncher>,
    settings: Settings,
    login_form: LoginForm,
    session: Option<Box<dyn BrowserSession>>,
    surface: Option<Box<dyn PageDriver>>,
    logged_in: bool,
}

impl SessionManager {
    /// Create a manager; nothing is launched until first use
    pub fn new(launcher: Arc<dyn BrowserLauncher>, settings: Settings, login_form: LoginForm) -> Self {
        Self {
            launcher,
            settings,
            login_form,
            session: None,
            surface: None,
            logged_in: false,
        }
    }

    /// Run settings the session was created with
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Whether the destination login already succeeded
    pub fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    /// Launch the browser session if it is not running yet
    pub async fn ensure_session(&mut self) -> Result<(), DriverError> {
        self.session_mut().await.map(|_| ())
    }

    async fn session_mut(&mut self) -> Result<&mut Box<dyn BrowserSession>, DriverError> {
        if self.session.is_none() {
            info!(headless = self.settings.headless, "Launching browser session");
            let session = self.launcher.launch(&self.settings).await?;
            self.session = Some(session);
        }
        self.session
            .as_mut()
            .ok_or_else(|| DriverError::Launch("session unavailable after launch".to_string()))
    }

    /// The interactive surface, reopened if it was closed
    pub async fn surface(&mut self) -> Result<&mut dyn PageDriver, DriverError> {
        let usable = match self.surface.as_mut() {
            Some(surface) => surface.is_open().await,
            None => false,
        };

        if !usable {
            if self.surface.take().is_some() {
                warn!("Interactive surface was closed, opening a new one");
            }
            let surface = self.session_mut().await?.open_surface().await?;
            debug!("Opened interactive surface");
            self.surface = Some(surface);
        }

        match self.surface.as_deref_mut() {
            Some(surface) => Ok(surface),
            None => Err(DriverError::SurfaceClosed),
        }
    }

    /// Log in to the destination platform unless already logged in
    ///
    /// A second call after a successful login submits nothing and reports
    /// "skipped" to `status`.
    #[instrument(skip_all, fields(user = %credentials.masked_username()))]
    pub async fn ensure_logged_in(
        &mut self,
        credentials: &CredentialPair,
        executor: &ResilientExecutor,
        status: &StatusSink,
    ) -> Result<LoginOutcome, TransferError> {
        if self.logged_in {
            status.status("Destination login skipped, already logged in");
            return Ok(LoginOutcome::Skipped);
        }
        if !credentials.is_complete() {
            return Err(TransferError::LoginFailed(
                "destination credentials are incomplete".to_string(),
            ));
        }

        status.status(format!(
            "Logging in to destination as {}",
            credentials.masked_username()
        ));

        let form = self.login_form.clone();
        let page_timeout = self.settings.page_timeout();
        let page = self.surface().await?;

        page.goto(&form.url, page_timeout)
            .await
            .map_err(|e| TransferError::LoginFailed(e.to_string()))?;

        let username_field = executor
            .resolve(page, &form.username_fields)
            .await?
            .ok_or_else(|| TransferError::LoginFailed("username field not found".to_string()))?;
        page.clear_and_type(&username_field, &credentials.username).await?;

        let password_field = executor
            .resolve(page, &form.password_fields)
            .await?
            .ok_or_else(|| TransferError::LoginFailed("password field not found".to_string()))?;
        page.clear_and_type(&password_field, &credentials.password).await?;
        page.press_key(&password_field, "Enter").await?;

        page.wait_for_navigation(page_timeout)
            .await
            .map_err(|e| TransferError::LoginFailed(e.to_string()))?;

        if page.exists(&password_field).await? {
            return Err(TransferError::LoginFailed(
                "login form still shown after submit".to_string(),
            ));
        }

        self.logged_in = true;
        info!("Destination login succeeded");
        status.status("Logged in to destination");

        self.dismiss_interstitial(executor).await?;
        Ok(LoginOutcome::LoggedIn)
    }

    /// Close a first-run dialog if one is shown; silent when none is
    async fn dismiss_interstitial(&mut self, executor: &ResilientExecutor) -> Result<(), DriverError> {
        let controls = self.login_form.dismiss_controls.clone();
        if controls.is_empty() {
            return Ok(());
        }

        let short = executor.with_timeout(DISMISS_TIMEOUT.min(executor.element_timeout()));
        let page = self.surface().await?;
        match short.click_first(page, &controls).await? {
            Some(locator) => debug!(locator = %locator, "Dismissed first-run dialog"),
            None => debug!("No first-run dialog to dismiss"),
        }
        Ok(())
    }

    /// Shut the browser down
    pub async fn close(&mut self) {
        self.surface = None;
        if let Some(mut session) = self.session.take() {
            if let Err(e) = session.close().await {
                warn!(error = %e, "Browser did not close cleanly");
            }
        }
    }
}
