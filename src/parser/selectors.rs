//! CSS selectors for source platform timeline and item pages
//!
//! Each element kind has an ordered fallback list. The first list entry is
//! also exported as a raw string so the browser layer can wait for the same
//! element the parser later reads.

use lazy_static::lazy_static;
use scraper::Selector;

// Helper macro to parse selectors safely at compile time
macro_rules! parse_selector {
    ($s:expr) => {
        Selector::parse($s).expect(concat!("Invalid CSS selector: ", $s))
    };
}

/// Item node on a timeline
pub const TIMELINE_ITEM_CSS: &str = r#"article[data-testid="tweet"]"#;

/// Keywords of the contextual marker shown above pinned items
pub const PIN_KEYWORDS: &[&str] = &["pin", "sabit", "fix"];

lazy_static! {
    // Timeline selectors
    static ref TIMELINE_ITEM: Vec<Selector> = vec![
        parse_selector!(r#"article[data-testid="tweet"]"#),
        parse_selector!(r#"div[data-testid="cellInnerDiv"] article"#),
    ];

    static ref SOCIAL_CONTEXT: Vec<Selector> = vec![
        parse_selector!(r#"div[data-testid="socialContext"]"#),
        parse_selector!(r#"span[data-testid="socialContext"]"#),
    ];

    static ref PIN_ICON: Vec<Selector> = vec![
        parse_selector!(r#"svg[data-testid="icon-pin"]"#),
        parse_selector!("svg[aria-label]"),
    ];

    static ref STATUS_LINK: Vec<Selector> = vec![
        parse_selector!(r#"a[href*="/status/"]"#),
    ];

    static ref ITEM_TIME: Vec<Selector> = vec![
        parse_selector!("time[datetime]"),
    ];

    // Item page selectors
    static ref ITEM_TEXT: Vec<Selector> = vec![
        parse_selector!(r#"div[data-testid="tweetText"]"#),
        parse_selector!(r#"div[lang][dir="auto"]"#),
    ];

    static ref ITEM_PHOTO: Vec<Selector> = vec![
        parse_selector!(r#"div[data-testid="tweetPhoto"] img"#),
        parse_selector!(r#"a[href*="/photo/"] img"#),
    ];

    static ref ITEM_VIDEO: Vec<Selector> = vec![
        parse_selector!(r#"div[data-testid="videoPlayer"]"#),
        parse_selector!(r#"div[data-testid="videoComponent"]"#),
        parse_selector!("video"),
    ];
}

/// Selectors for timeline pages
pub struct TimelineSelectors {
    pub item: &'static [Selector],
    pub social_context: &'static [Selector],
    pub pin_icon: &'static [Selector],
    pub status_link: &'static [Selector],
    pub time: &'static [Selector],
}

impl TimelineSelectors {
    pub fn new() -> Self {
        Self {
            item: &TIMELINE_ITEM,
            social_context: &SOCIAL_CONTEXT,
            pin_icon: &PIN_ICON,
            status_link: &STATUS_LINK,
            time: &ITEM_TIME,
        }
    }
}

impl Default for TimelineSelectors {
    fn default() -> Self {
        Self::new()
    }
}

/// Selectors for a single item page
pub struct ItemSelectors {
    pub text: &'static [Selector],
    pub photo: &'static [Selector],
    pub video: &'static [Selector],
}

impl ItemSelectors {
    pub fn new() -> Self {
        Self {
            text: &ITEM_TEXT,
            photo: &ITEM_PHOTO,
            video: &ITEM_VIDEO,
        }
    }
}

impl Default for ItemSelectors {
    fn default() -> Self {
        Self::new()
    }
}
