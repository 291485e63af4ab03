//! Common utilities and helper functions
//!
//! This module provides shared utilities used across the application.

pub mod error;
pub mod retry;

use rand::Rng;
use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;

/// Base URL of the source platform
pub const SOURCE_BASE_URL: &str = "https://x.com";

/// Normalize a raw account reference into a timeline URL
///
/// Accepts `@handle`, `handle`, or a full `https://` URL. Empty input stays
/// empty so callers can treat it as "no account configured".
pub fn format_account_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let handle = trimmed.strip_prefix('@').unwrap_or(trimmed);
    if handle.starts_with("https://") {
        return handle.to_string();
    }

    let handle = handle
        .trim_start_matches("x.com/")
        .trim_start_matches("www.x.com/");
    format!("{SOURCE_BASE_URL}/{handle}")
}

/// Normalize whitespace in text
pub fn normalize_whitespace(text: &str) -> String {
    static WHITESPACE_RE: OnceLock<Regex> = OnceLock::new();

    let re = WHITESPACE_RE.get_or_init(|| Regex::new(r"\s+").expect("Invalid regex pattern"));

    re.replace_all(text.trim(), " ").to_string()
}

/// Truncate text to a maximum number of characters for status messages
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{kept}...")
}

/// Pick a uniformly random delay in `[min_ms, max_ms]`
pub fn jitter(min_ms: u64, max_ms: u64) -> Duration {
    if max_ms <= min_ms {
        return Duration::from_millis(min_ms);
    }
    Duration::from_millis(rand::thread_rng().gen_range(min_ms..=max_ms))
}
