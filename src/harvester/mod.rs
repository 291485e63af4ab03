//! Content harvesting from source account timelines
//!
//! [`ContentHarvester::harvest`] loads one timeline and returns its newest
//! items, normal items first and pinned items as backfill. [`select_fresh`]
//! then drops everything the ledger already knows.

use std::time::Duration;
use tracing::{debug, info, instrument};

use crate::browser::{Locator, PageDriver, ResilientExecutor};
use crate::models::CandidateItem;
use crate::parser::selectors::TIMELINE_ITEM_CSS;
use crate::parser::TimelineParser;
use crate::storage::SeenLedger;
use crate::utils::error::HarvestError;

/// Reads candidate items from account timelines
pub struct ContentHarvester {
    parser: TimelineParser,
}

impl ContentHarvester {
    #[must_use]
    pub fn new() -> Self {
        Self {
            parser: TimelineParser::new(),
        }
    }

    /// Newest `count` items of `account_url`, newest first
    ///
    /// # Errors
    ///
    /// - `HarvestError::Navigation` when the timeline cannot be loaded
    /// - `HarvestError::NotFound` when no item renders within the executor's
    ///   element timeout
    #[instrument(skip(self, page, executor), fields(account = %account_url))]
    pub async fn harvest(
        &self,
        page: &mut dyn PageDriver,
        executor: &ResilientExecutor,
        account_url: &str,
        count: usize,
        page_timeout: Duration,
    ) -> Result<Vec<CandidateItem>, HarvestError> {
        if account_url.trim().is_empty() {
            return Err(HarvestError::EmptyAccount);
        }

        page.goto(account_url, page_timeout)
            .await
            .map_err(|source| HarvestError::Navigation {
                account: account_url.to_string(),
                source,
            })?;

        let item_node = [Locator::css(TIMELINE_ITEM_CSS)];
        if executor.resolve(page, &item_node).await?.is_none() {
            return Err(HarvestError::NotFound {
                account: account_url.to_string(),
            });
        }

        let html = page.content().await?;
        let parsed = self.parser.parse(&html, account_url);
        if parsed.is_empty() {
            return Err(HarvestError::NotFound {
                account: account_url.to_string(),
            });
        }

        let total = parsed.len();
        let items = select_items(parsed, count);
        info!(
            parsed = total,
            selected = items.len(),
            pinned = items.iter().filter(|i| i.is_pinned).count(),
            "Timeline harvested"
        );
        Ok(items)
    }
}

impl Default for ContentHarvester {
    fn default() -> Self {
        Self::new()
    }
}

/// Pick up to `count` items: normal ones first, pinned ones as backfill
///
/// Each group is ordered newest first when any selected item carries a
/// timestamp, otherwise document order is kept.
pub fn select_items(items: Vec<CandidateItem>, count: usize) -> Vec<CandidateItem> {
    let (pinned, normal): (Vec<_>, Vec<_>) = items.into_iter().partition(|i| i.is_pinned);

    let mut normal: Vec<CandidateItem> = normal.into_iter().take(count).collect();
    let backfill = count.saturating_sub(normal.len());
    let mut pinned: Vec<CandidateItem> = pinned.into_iter().take(backfill).collect();

    let any_timestamp = normal
        .iter()
        .chain(pinned.iter())
        .any(|i| i.published_at.is_some());

    if any_timestamp {
        order_newest_first(&mut normal);
        order_newest_first(&mut pinned);
    }

    normal.extend(pinned);
    normal
}

/// Newest first; items without a timestamp go last in document order
fn order_newest_first(items: &mut [CandidateItem]) {
    items.sort_by(|a, b| match (a.published_at, b.published_at) {
        (Some(x), Some(y)) => y.cmp(&x).then(a.position.cmp(&b.position)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.position.cmp(&b.position),
    });
}

/// Items not yet recorded in the ledger, order preserved
pub fn select_fresh(items: Vec<CandidateItem>, ledger: &SeenLedger) -> Vec<CandidateItem> {
    let total = items.len();
    let fresh: Vec<CandidateItem> = items
        .into_iter()
        .filter(|item| !ledger.contains(&item.source_account, &item.id))
        .collect();
    debug!(total, fresh = fresh.len(), "Filtered seen items");
    fresh
}
