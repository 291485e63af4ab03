//! Destination composer steps
//!
//! Opening the composer, entering and verifying text, attaching media and the
//! finalization ladder. Every step resolves controls through the
//! [`ResilientExecutor`]; a missing control becomes a [`TransferError`] only
//! when no fallback is left.

use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::locators::DestinationLocators;
use crate::browser::{ClickPath, Locator, PageDriver, ResilientExecutor};
use crate::config::TransferConfig;
use crate::controller::events::StatusSink;
use crate::models::Finalization;
use crate::utils::error::{DriverError, TransferError};

// ============================================================================
// Finalization Ladder
// ============================================================================

/// One tier of the finalization ladder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeTier {
    Publish,
    Enqueue,
    Draft,
}

impl FinalizeTier {
    /// Tier the ladder starts at
    pub fn initial(auto_publish: bool) -> Self {
        if auto_publish {
            Self::Publish
        } else {
            Self::Enqueue
        }
    }

    /// Tier tried when this tier's control is unavailable
    pub fn fallback(self) -> Option<Self> {
        match self {
            Self::Publish => Some(Self::Enqueue),
            Self::Enqueue => Some(Self::Draft),
            Self::Draft => None,
        }
    }

    /// Outcome reported when this tier's control was clicked
    pub fn outcome(self) -> Finalization {
        match self {
            Self::Publish => Finalization::Published,
            Self::Enqueue => Finalization::Enqueued,
            Self::Draft => Finalization::Drafted,
        }
    }

    /// Click paths implementing this tier
    pub fn paths(self, locators: &DestinationLocators) -> &[ClickPath] {
        match self {
            Self::Publish => &locators.publish,
            Self::Enqueue => &locators.enqueue,
            Self::Draft => &locators.draft,
        }
    }

    /// Every tier in the order they are attempted
    pub fn ladder(auto_publish: bool) -> Vec<Self> {
        std::iter::successors(Some(Self::initial(auto_publish)), |tier| tier.fallback()).collect()
    }
}

// ============================================================================
// Composer
// ============================================================================

/// Pauses between composer steps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComposerTiming {
    /// After opening, so the editor can mount
    pub settle: Duration,
    /// Between entering text and reading it back
    pub verify: Duration,
    /// After attaching media, so the upload can finish
    pub upload: Duration,
}

impl From<&TransferConfig> for ComposerTiming {
    fn from(config: &TransferConfig) -> Self {
        Self {
            settle: Duration::from_millis(config.composer_settle_ms),
            verify: Duration::from_millis(config.verify_settle_ms),
            upload: Duration::from_millis(config.upload_settle_ms),
        }
    }
}

/// Drives the destination composer on one surface
pub struct Composer<'a> {
    locators: &'a DestinationLocators,
    executor: &'a ResilientExecutor,
    timing: ComposerTiming,
    page_timeout: Duration,
}

impl<'a> Composer<'a> {
    pub fn new(
        locators: &'a DestinationLocators,
        executor: &'a ResilientExecutor,
        timing: ComposerTiming,
        page_timeout: Duration,
    ) -> Self {
        Self {
            locators,
            executor,
            timing,
            page_timeout,
        }
    }

    /// Open the composer by button, else by URL; fails when no input surface shows
    pub async fn open(&self, page: &mut dyn PageDriver) -> Result<(), TransferError> {
        match self.executor.click_first(page, &self.locators.open_composer).await? {
            Some(locator) => debug!(locator = %locator, "Opened composer by button"),
            None => {
                debug!(url = %self.locators.compose_url, "Composer button unavailable, navigating");
                page.goto(&self.locators.compose_url, self.page_timeout)
                    .await
                    .map_err(|e| {
                        warn!(error = %e, "Composer URL did not load");
                        TransferError::ComposerUnavailable
                    })?;
            }
        }

        if self
            .executor
            .resolve(page, &self.locators.text_inputs)
            .await?
            .is_none()
        {
            return Err(TransferError::ComposerUnavailable);
        }

        tokio::time::sleep(self.timing.settle).await;
        Ok(())
    }

    /// Enter `text` and verify it by reading the surface back
    ///
    /// Each resolved input surface is tried with keyboard typing first, then
    /// with script injection. Only a non-empty read-back counts. Empty `text`
    /// skips the step.
    pub async fn enter_text(
        &self,
        page: &mut dyn PageDriver,
        text: &str,
        status: &StatusSink,
    ) -> Result<(), TransferError> {
        if text.trim().is_empty() {
            status.status("Item has no text, skipping text entry");
            return Ok(());
        }

        let surfaces = self
            .executor
            .resolve_all(page, &self.locators.text_inputs)
            .await?;

        for surface in &surfaces {
            if self.type_and_verify(page, surface, text).await? {
                info!(locator = %surface, "Text entered");
                return Ok(());
            }
            if self.inject_and_verify(page, surface, text).await? {
                info!(locator = %surface, "Text injected");
                return Ok(());
            }
            debug!(locator = %surface, "Input surface rejected text");
        }

        Err(TransferError::TextNotAccepted)
    }

    async fn type_and_verify(
        &self,
        page: &mut dyn PageDriver,
        surface: &Locator,
        text: &str,
    ) -> Result<bool, TransferError> {
        if let Err(e) = page.click(surface).await {
            return tolerate(e, surface);
        }
        if let Err(e) = page.clear_and_type(surface, text).await {
            return tolerate(e, surface);
        }
        self.verify(page, surface).await
    }

    async fn inject_and_verify(
        &self,
        page: &mut dyn PageDriver,
        surface: &Locator,
        text: &str,
    ) -> Result<bool, TransferError> {
        if let Err(e) = page.inject_text(surface, text).await {
            return tolerate(e, surface);
        }
        self.verify(page, surface).await
    }

    async fn verify(&self, page: &mut dyn PageDriver, surface: &Locator) -> Result<bool, TransferError> {
        tokio::time::sleep(self.timing.verify).await;
        match page.read_text(surface).await {
            Ok(read_back) => Ok(read_back.is_some_and(|t| !t.trim().is_empty())),
            Err(e) => tolerate(e, surface),
        }
    }

    /// Attach a local media file
    pub async fn attach(&self, page: &mut dyn PageDriver, path: &Path) -> Result<(), TransferError> {
        let input = self
            .executor
            .resolve(page, &self.locators.file_inputs)
            .await?
            .ok_or_else(|| TransferError::AttachFailed("file input not found".to_string()))?;

        page.upload_file(&input, path).await.map_err(|e| match e {
            DriverError::SurfaceClosed => TransferError::Driver(e),
            other => TransferError::AttachFailed(other.to_string()),
        })?;

        tokio::time::sleep(self.timing.upload).await;
        Ok(())
    }

    /// Walk the finalization ladder from the tier chosen by `auto_publish`
    pub async fn finalize(
        &self,
        page: &mut dyn PageDriver,
        auto_publish: bool,
        status: &StatusSink,
    ) -> Result<Finalization, TransferError> {
        let mut tier = FinalizeTier::initial(auto_publish);
        loop {
            if let Some(path) = self.executor.first_path(page, tier.paths(self.locators)).await? {
                info!(tier = ?tier, path, "Post finalized");
                return Ok(tier.outcome());
            }

            match tier.fallback() {
                Some(next) => {
                    status.status(format!("{tier:?} control unavailable, trying {next:?}"));
                    tier = next;
                }
                None => return Err(TransferError::FinalizeUnavailable),
            }
        }
    }
}

/// A failed interaction on one surface moves on to the next one, unless the page is gone
fn tolerate(error: DriverError, surface: &Locator) -> Result<bool, TransferError> {
    match error {
        DriverError::SurfaceClosed => Err(TransferError::Driver(error)),
        other => {
            debug!(locator = %surface, error = %other, "Input attempt failed");
            Ok(false)
        }
    }
}
