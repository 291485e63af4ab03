//! Timeline page parser
//!
//! Turns rendered timeline markup into [`CandidateItem`]s in document order.
//! Selection (count limit, pinned backfill, freshness ordering) belongs to the
//! harvester; this module only reads what the page shows.

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;

use crate::models::CandidateItem;
use crate::parser::selectors::{TimelineSelectors, PIN_KEYWORDS};
use crate::utils::SOURCE_BASE_URL;

lazy_static! {
    static ref CANONICAL_PATH: Regex =
        Regex::new(r"^(?:https?://[^/]+)?(/[^/?#]+/status/(\d+))").expect("Invalid regex pattern");
}

/// First element under `root` matched by any selector, in selector order
pub(crate) fn select_first<'a>(root: ElementRef<'a>, selectors: &[Selector]) -> Option<ElementRef<'a>> {
    selectors.iter().find_map(|sel| root.select(sel).next())
}

/// Canonical item URL and id for a status link
///
/// Strips trailing segments such as `/photo/1` or `/analytics`.
pub fn canonical_item_url(href: &str) -> Option<(String, String)> {
    let caps = CANONICAL_PATH.captures(href.trim())?;
    let path = caps.get(1)?.as_str();
    let id = caps.get(2)?.as_str().to_string();
    Some((id, format!("{SOURCE_BASE_URL}{path}")))
}

/// Timeline markup parser
pub struct TimelineParser {
    selectors: TimelineSelectors,
}

impl TimelineParser {
    #[must_use]
    pub fn new() -> Self {
        Self {
            selectors: TimelineSelectors::new(),
        }
    }

    /// Parse every item node in document order
    ///
    /// Nodes without a recognizable status link are skipped; repeated ids keep
    /// their first occurrence. `position` counts kept items from zero.
    pub fn parse(&self, html: &str, account_url: &str) -> Vec<CandidateItem> {
        let document = Html::parse_document(html);
        let mut seen = HashSet::new();
        let mut items = Vec::new();

        let nodes = self
            .selectors
            .item
            .iter()
            .map(|sel| document.select(sel).collect::<Vec<_>>())
            .find(|nodes| !nodes.is_empty())
            .unwrap_or_default();

        for node in nodes {
            let Some((id, url)) = self.item_link(node) else {
                continue;
            };
            if !seen.insert(id.clone()) {
                continue;
            }

            items.push(CandidateItem {
                id,
                url,
                published_at: self.timestamp(node),
                is_pinned: self.is_pinned(node),
                source_account: account_url.to_string(),
                position: items.len(),
            });
        }

        items
    }

    /// Status link of the item itself, preferring the one wrapping its timestamp
    fn item_link(&self, node: ElementRef<'_>) -> Option<(String, String)> {
        let links: Vec<ElementRef<'_>> = self
            .selectors
            .status_link
            .iter()
            .flat_map(|sel| node.select(sel))
            .collect();

        let with_time = links
            .iter()
            .find(|link| select_first(**link, self.selectors.time).is_some());

        with_time
            .into_iter()
            .chain(links.iter())
            .filter_map(|link| link.value().attr("href"))
            .find_map(canonical_item_url)
    }

    fn timestamp(&self, node: ElementRef<'_>) -> Option<DateTime<Utc>> {
        let time = select_first(node, self.selectors.time)?;
        let raw = time.value().attr("datetime")?;
        DateTime::parse_from_rfc3339(raw.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Pinned when a context marker mentions a pin keyword or a pin icon is shown
    fn is_pinned(&self, node: ElementRef<'_>) -> bool {
        let marker = self
            .selectors
            .social_context
            .iter()
            .flat_map(|sel| node.select(sel))
            .any(|el| contains_pin_keyword(&el.text().collect::<String>()));
        if marker {
            return true;
        }

        self.selectors
            .pin_icon
            .iter()
            .flat_map(|sel| node.select(sel))
            .any(|icon| match icon.value().attr("aria-label") {
                Some(label) => label.to_lowercase().contains("pin"),
                None => icon.value().attr("data-testid") == Some("icon-pin"),
            })
    }
}

impl Default for TimelineParser {
    fn default() -> Self {
        Self::new()
    }
}

fn contains_pin_keyword(text: &str) -> bool {
    let lower = text.to_lowercase();
    PIN_KEYWORDS.iter().any(|kw| lower.contains(kw))
}
