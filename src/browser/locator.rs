//! Locator strategies for interactive controls
//!
//! A control the automation wants to touch ("the publish button") is described
//! by an ordered list of [`Locator`]s rather than a single selector. Lists are
//! plain data, so fallback ladders can be unit-tested without a browser.

use std::fmt;

/// One way of finding a control on a page
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    /// CSS selector
    Css(String),

    /// XPath expression
    XPath(String),

    /// Element of `tag` whose text contains `text`
    Text { tag: String, text: String },
}

impl Locator {
    /// CSS selector locator
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// XPath locator
    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::XPath(expr.into())
    }

    /// Text-content locator
    pub fn text(tag: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Text {
            tag: tag.into(),
            text: text.into(),
        }
    }

    /// XPath equivalent for non-CSS strategies
    ///
    /// Returns `None` for CSS locators, which drivers query directly.
    pub fn to_xpath(&self) -> Option<String> {
        match self {
            Self::Css(_) => None,
            Self::XPath(expr) => Some(expr.clone()),
            Self::Text { tag, text } => Some(format!(
                "//{tag}[contains(., {})]",
                xpath_literal(text)
            )),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(sel) => write!(f, "css:{sel}"),
            Self::XPath(expr) => write!(f, "xpath:{expr}"),
            Self::Text { tag, text } => write!(f, "text:{tag}~\"{text}\""),
        }
    }
}

/// Quote a string as an XPath 1.0 literal
fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        return format!("'{value}'");
    }
    if !value.contains('"') {
        return format!("\"{value}\"");
    }
    let parts: Vec<String> = value.split('\'').map(|p| format!("'{p}'")).collect();
    format!("concat({})", parts.join(", \"'\", "))
}

/// Sequence of clicks that together perform one action
///
/// Each step is itself a candidate list. A path is available only if every
/// step resolves, e.g. "open the schedule dropdown, then pick Add to Queue".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickPath {
    /// Short name used in status messages and logs
    pub name: &'static str,

    /// Ordered steps, each a list of alternative locators
    pub steps: Vec<Vec<Locator>>,
}

impl ClickPath {
    /// Path made of a single step
    pub fn single(name: &'static str, candidates: Vec<Locator>) -> Self {
        Self {
            name,
            steps: vec![candidates],
        }
    }

    /// Path made of several consecutive steps
    pub fn chain(name: &'static str, steps: Vec<Vec<Locator>>) -> Self {
        Self { name, steps }
    }
}
