//! Transfer pipeline: one candidate item into the destination composer
//!
//! Steps, in order:
//!
//! 1. Open the item page, read its text and locate an image or video
//! 2. Download the media (an item without media fails with `MediaNotFound`)
//! 3. Ensure the destination login
//! 4. Open the composer, enter and verify the text, attach the media
//! 5. Finalize through the publish → enqueue → draft ladder
//!
//! Any step failure ends the attempt with a failed [`TransferResult`]; nothing
//! is raised past [`TransferPipeline::transfer`]. The downloaded file is
//! removed on every exit path.

pub mod composer;
pub mod locators;
pub mod media;

pub use composer::{Composer, ComposerTiming, FinalizeTier};
pub use locators::DestinationLocators;
pub use media::{HttpMediaFetcher, MediaFetcher, MediaFile, MediaKind};

use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::browser::{Locator, ResilientExecutor, SessionManager};
use crate::controller::events::StatusSink;
use crate::models::{CandidateItem, CredentialPair, Finalization, ItemState, TransferResult};
use crate::parser::selectors::TIMELINE_ITEM_CSS;
use crate::parser::ItemPageParser;
use crate::utils::error::TransferError;
use crate::utils::truncate_text;

/// Moves items from the source platform to the destination composer
pub struct TransferPipeline {
    locators: DestinationLocators,
    fetcher: Arc<dyn MediaFetcher>,
    parser: ItemPageParser,
    timing: ComposerTiming,
}

impl TransferPipeline {
    pub fn new(locators: DestinationLocators, fetcher: Arc<dyn MediaFetcher>, timing: ComposerTiming) -> Self {
        Self {
            locators,
            fetcher,
            parser: ItemPageParser::new(),
            timing,
        }
    }

    /// Transfer one item; failures come back inside the result
    #[instrument(skip_all, fields(item = %item.id))]
    pub async fn transfer(
        &self,
        session: &mut SessionManager,
        executor: &ResilientExecutor,
        item: &CandidateItem,
        credentials: &CredentialPair,
        auto_publish: bool,
        status: &StatusSink,
    ) -> TransferResult {
        let mut state = ItemState::Harvested;
        match self
            .run(session, executor, item, credentials, auto_publish, status, &mut state)
            .await
        {
            Ok(finalization) => {
                status.status(format!("Item {} {finalization}", item.id));
                TransferResult::succeeded(&item.id, finalization)
            }
            Err(reason) => {
                warn!(state = ?state, reason = %reason, "Transfer failed");
                advance(&mut state, ItemState::Failed);
                status.status(format!("Transfer of {} failed: {reason}", item.id));
                TransferResult::failed(&item.id, reason)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn run(
        &self,
        session: &mut SessionManager,
        executor: &ResilientExecutor,
        item: &CandidateItem,
        credentials: &CredentialPair,
        auto_publish: bool,
        status: &StatusSink,
        state: &mut ItemState,
    ) -> Result<Finalization, TransferError> {
        let page_timeout = session.settings().page_timeout();

        status.status(format!("Reading {}", item.label()));
        let content = {
            let page = session.surface().await?;
            page.goto(&item.url, page_timeout)
                .await
                .map_err(|e| TransferError::ItemUnavailable(e.to_string()))?;
            if executor
                .resolve(page, &[Locator::css(TIMELINE_ITEM_CSS)])
                .await?
                .is_none()
            {
                debug!("Item node did not render, parsing whatever loaded");
            }
            let html = page.content().await?;
            self.parser.parse(&html, &item.id)
        };
        advance(state, ItemState::TextExtracted);
        if !content.text.is_empty() {
            debug!(text = %truncate_text(&content.text, 80), "Item text extracted");
        }

        let source = content.media(&item.url).ok_or(TransferError::MediaNotFound)?;
        let media = self.fetcher.fetch(&source, &item.id).await?;
        advance(state, ItemState::MediaAcquired);

        session.ensure_logged_in(credentials, executor, status).await?;
        advance(state, ItemState::LoggedIn);

        let page = session.surface().await?;
        let composer = Composer::new(&self.locators, executor, self.timing, page_timeout);

        composer.open(page).await?;
        advance(state, ItemState::ComposerOpen);

        composer.enter_text(page, &content.text, status).await?;
        advance(state, ItemState::TextEntered);

        composer.attach(page, media.path()).await?;
        advance(state, ItemState::MediaAttached);

        let finalization = composer.finalize(page, auto_publish, status).await?;
        advance(state, ItemState::Finalized(finalization));

        Ok(finalization)
    }
}

fn advance(state: &mut ItemState, next: ItemState) {
    debug!(from = ?*state, to = ?next, "Item state");
    *state = next;
}
