//! HTML parsing and data extraction
//!
//! This module parses rendered source platform pages: account timelines into
//! candidate items, and item pages into text plus media references.

pub mod item;
pub mod selectors;
pub mod timeline;

pub use item::{ItemContent, ItemPageParser, MediaSource};
pub use timeline::{canonical_item_url, TimelineParser};
