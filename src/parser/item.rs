//! Item page parser: text and media of a single item

use scraper::{ElementRef, Html};
use url::Url;

use crate::parser::selectors::{ItemSelectors, TimelineSelectors};
use crate::parser::timeline::{canonical_item_url, select_first};
use crate::utils::normalize_whitespace;

/// Where the media of an item can be fetched from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    /// Direct image URL
    Image(String),
    /// Item page hosting a video; resolved by an external extractor
    Video(String),
}

/// Content read from an item page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemContent {
    /// Item text; empty when the item has none
    pub text: String,

    /// First attached image
    pub image_url: Option<String>,

    /// Whether a video player is attached
    pub has_video: bool,
}

impl ItemContent {
    /// Preferred media: the image, else the video hosted at `item_url`
    pub fn media(&self, item_url: &str) -> Option<MediaSource> {
        match (&self.image_url, self.has_video) {
            (Some(url), _) => Some(MediaSource::Image(url.clone())),
            (None, true) => Some(MediaSource::Video(item_url.to_string())),
            (None, false) => None,
        }
    }
}

/// Item page markup parser
pub struct ItemPageParser {
    item: ItemSelectors,
    timeline: TimelineSelectors,
}

impl ItemPageParser {
    #[must_use]
    pub fn new() -> Self {
        Self {
            item: ItemSelectors::new(),
            timeline: TimelineSelectors::new(),
        }
    }

    /// Parse the focal item of an item page
    ///
    /// Item pages also render parents and replies; the focal node is the first
    /// item node linking to `item_id`, else the first item node, else the
    /// whole document.
    pub fn parse(&self, html: &str, item_id: &str) -> ItemContent {
        let document = Html::parse_document(html);
        let root = self.focal_node(&document, item_id).unwrap_or_else(|| document.root_element());

        let text = select_first(root, self.item.text)
            .map(|el| normalize_whitespace(&el.text().collect::<String>()))
            .unwrap_or_default();

        let image_url = self
            .item
            .photo
            .iter()
            .flat_map(|sel| root.select(sel))
            .filter_map(|img| img.value().attr("src"))
            .map(str::trim)
            .find(|src| !src.is_empty())
            .map(full_size_image);

        let has_video = select_first(root, self.item.video).is_some();

        ItemContent {
            text,
            image_url,
            has_video,
        }
    }

    fn focal_node<'a>(&self, document: &'a Html, item_id: &str) -> Option<ElementRef<'a>> {
        let nodes: Vec<ElementRef<'a>> = self
            .timeline
            .item
            .iter()
            .flat_map(|sel| document.select(sel))
            .collect();

        let links_to_item = |node: &ElementRef<'a>| {
            self.timeline
                .status_link
                .iter()
                .flat_map(|sel| node.select(sel))
                .filter_map(|a| a.value().attr("href"))
                .filter_map(canonical_item_url)
                .any(|(id, _)| id == item_id)
        };

        nodes
            .iter()
            .find(|node| links_to_item(*node))
            .or_else(|| nodes.first())
            .copied()
    }
}

/// Ask the image CDN for the large rendition instead of the thumbnail
///
/// Only URLs that already carry a `name` size parameter are rewritten.
pub fn full_size_image(src: &str) -> String {
    let Ok(mut url) = Url::parse(src) else {
        return src.to_string();
    };
    if !url.query_pairs().any(|(key, _)| key == "name") {
        return src.to_string();
    }

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(key, value)| {
            let value = if key == "name" { "large".into() } else { value };
            (key.into_owned(), value.into_owned())
        })
        .collect();
    url.query_pairs_mut().clear().extend_pairs(pairs);
    url.to_string()
}

impl Default for ItemPageParser {
    fn default() -> Self {
        Self::new()
    }
}
