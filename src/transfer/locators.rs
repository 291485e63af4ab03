//! Locator ladders for the destination platform
//!
//! Every control is an ordered candidate list; multi-click actions are
//! [`ClickPath`]s. The defaults target the Buffer publishing UI.

use crate::browser::{ClickPath, Locator, LoginForm};

/// Destination login page
pub const LOGIN_URL: &str =
    "https://login.buffer.com/login?plan=free&cycle=year&cta=bufferSite-globalNav-login-1";

/// Direct composer URL, used when no composer button is found
pub const COMPOSE_URL: &str = "https://publish.buffer.com/compose";

/// Every locator the transfer pipeline uses on the destination platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationLocators {
    /// Login form and first-run dialog controls
    pub login: LoginForm,

    /// URL opened when no composer button resolves
    pub compose_url: String,

    /// Buttons that open the composer
    pub open_composer: Vec<Locator>,

    /// Composer text input surfaces
    pub text_inputs: Vec<Locator>,

    /// Media file inputs
    pub file_inputs: Vec<Locator>,

    /// Ways to publish immediately
    pub publish: Vec<ClickPath>,

    /// Ways to add the post to the queue
    pub enqueue: Vec<ClickPath>,

    /// Ways to save the post as a draft
    pub draft: Vec<ClickPath>,
}

impl Default for DestinationLocators {
    fn default() -> Self {
        Self {
            login: LoginForm {
                url: LOGIN_URL.to_string(),
                username_fields: vec![
                    Locator::css(r#"input[name="email"]"#),
                    Locator::css(r#"input[type="email"]"#),
                ],
                password_fields: vec![
                    Locator::css(r#"input[name="password"]"#),
                    Locator::css(r#"input[type="password"]"#),
                ],
                dismiss_controls: vec![
                    Locator::css(r#"button[aria-label="Close"]"#),
                    Locator::css(r#"[data-testid="modal-close"]"#),
                    Locator::text("button", "Skip"),
                    Locator::text("button", "Got it"),
                ],
            },
            compose_url: COMPOSE_URL.to_string(),
            open_composer: vec![
                Locator::xpath("//button[contains(text(),'Create your next post')]"),
                Locator::text("button", "Create a post"),
                Locator::text("button", "New Post"),
            ],
            text_inputs: vec![
                Locator::css(r#"div[role="textbox"]"#),
                Locator::css(r#"div[data-testid="composer-textarea"]"#),
                Locator::css(r#"div[contenteditable="true"]"#),
                Locator::css(".composer-editor"),
                Locator::css(".text-area"),
                Locator::css(".textarea"),
                Locator::css(r#"div[class*="composer"]"#),
                Locator::css(r#"div[class*="textarea"]"#),
                Locator::css(r#"div[contentEditable="true"]"#),
            ],
            file_inputs: vec![
                Locator::css(r#"input[type="file"]"#),
                Locator::css(r#"input[accept*="image"]"#),
            ],
            publish: vec![
                ClickPath::single(
                    "publish button",
                    vec![Locator::css(r#"button[data-testid="publish-button"]"#)],
                ),
                ClickPath::single("share now", vec![Locator::text("button", "Share Now")]),
            ],
            enqueue: vec![
                ClickPath::chain(
                    "schedule dropdown",
                    vec![
                        vec![Locator::css(
                            r#"button[data-testid="post-composer-schedule-dropdown"]"#,
                        )],
                        vec![Locator::css(r#"div[data-testid="add-to-queue-option"]"#)],
                    ],
                ),
                ClickPath::single(
                    "queue button",
                    vec![Locator::css(r#"button[data-testid="queue-button"]"#)],
                ),
                ClickPath::single(
                    "add to queue",
                    vec![Locator::xpath(r#"//button[contains(., "Add to Queue")]"#)],
                ),
            ],
            draft: vec![
                ClickPath::single(
                    "draft button",
                    vec![Locator::css(r#"button[data-testid="draft-save-buttons"]"#)],
                ),
                ClickPath::single("save draft", vec![Locator::text("button", "Save as Draft")]),
            ],
        }
    }
}
