//! Resilient action execution
//!
//! Every UI interaction resolves an ordered list of locator candidates within
//! one bounded wait. The first candidate that matches is acted upon; when none
//! match before the element timeout, the action is reported as unavailable
//! (`Ok(None)` / `false`) so the caller can pick a fallback action.
//!
//! Only [`DriverError::SurfaceClosed`] escapes as an error: a closed tab makes
//! every further fallback pointless.

use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::locator::{ClickPath, Locator};
use super::PageDriver;
use crate::utils::error::DriverError;

/// Bounded-wait locator resolution and fallback actions
#[derive(Debug, Clone)]
pub struct ResilientExecutor {
    element_timeout: Duration,
    poll_interval: Duration,
}

impl ResilientExecutor {
    /// Create an executor with the given element timeout and poll interval
    pub fn new(element_timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            element_timeout,
            poll_interval: poll_interval.max(Duration::from_millis(1)),
        }
    }

    /// Element timeout applied to every resolution
    pub fn element_timeout(&self) -> Duration {
        self.element_timeout
    }

    /// Copy of this executor with a different element timeout
    pub fn with_timeout(&self, element_timeout: Duration) -> Self {
        Self {
            element_timeout,
            poll_interval: self.poll_interval,
        }
    }

    /// Check every candidate once, in priority order
    async fn present_candidates(
        &self,
        page: &mut dyn PageDriver,
        candidates: &[Locator],
    ) -> Result<Vec<Locator>, DriverError> {
        let mut matched = Vec::new();
        for candidate in candidates {
            match page.exists(candidate).await {
                Ok(true) => matched.push(candidate.clone()),
                Ok(false) => {}
                Err(DriverError::SurfaceClosed) => return Err(DriverError::SurfaceClosed),
                Err(e) => debug!(locator = %candidate, error = %e, "Locator check failed"),
            }
        }
        Ok(matched)
    }

    /// Wait until at least one candidate matches; return every match at that moment
    ///
    /// The list keeps candidate priority order. An empty list means nothing
    /// resolved within the element timeout.
    pub async fn resolve_all(
        &self,
        page: &mut dyn PageDriver,
        candidates: &[Locator],
    ) -> Result<Vec<Locator>, DriverError> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let deadline = Instant::now() + self.element_timeout;
        loop {
            let matched = self.present_candidates(page, candidates).await?;
            if !matched.is_empty() {
                return Ok(matched);
            }
            let now = Instant::now();
            if now >= deadline {
                debug!(
                    candidates = candidates.len(),
                    timeout_ms = self.element_timeout.as_millis() as u64,
                    "No locator candidate resolved"
                );
                return Ok(Vec::new());
            }
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }
    }

    /// First candidate that resolves within the element timeout
    pub async fn resolve(
        &self,
        page: &mut dyn PageDriver,
        candidates: &[Locator],
    ) -> Result<Option<Locator>, DriverError> {
        Ok(self.resolve_all(page, candidates).await?.into_iter().next())
    }

    /// Resolve and click; `None` when the control is unavailable
    pub async fn click_first(
        &self,
        page: &mut dyn PageDriver,
        candidates: &[Locator],
    ) -> Result<Option<Locator>, DriverError> {
        for locator in self.resolve_all(page, candidates).await? {
            match page.click(&locator).await {
                Ok(()) => {
                    debug!(locator = %locator, "Clicked control");
                    return Ok(Some(locator));
                }
                Err(DriverError::SurfaceClosed) => return Err(DriverError::SurfaceClosed),
                Err(e) => warn!(locator = %locator, error = %e, "Click on resolved control failed"),
            }
        }
        Ok(None)
    }

    /// Perform every step of `path`; `false` as soon as a step is unavailable
    pub async fn run_path(
        &self,
        page: &mut dyn PageDriver,
        path: &ClickPath,
    ) -> Result<bool, DriverError> {
        for (index, step) in path.steps.iter().enumerate() {
            if self.click_first(page, step).await?.is_none() {
                debug!(path = path.name, step = index, "Click path step unavailable");
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Try alternative click paths in order; the name of the one that completed
    pub async fn first_path(
        &self,
        page: &mut dyn PageDriver,
        paths: &[ClickPath],
    ) -> Result<Option<&'static str>, DriverError> {
        for path in paths {
            if self.run_path(page, path).await? {
                return Ok(Some(path.name));
            }
        }
        Ok(None)
    }
}
