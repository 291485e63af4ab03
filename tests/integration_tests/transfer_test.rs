//! Transfer pipeline tests against the fake browser

use std::sync::Arc;
use std::time::Duration;

use crosspost::browser::{Locator, ResilientExecutor, SessionManager};
use crosspost::config::{Settings, TransferConfig};
use crosspost::controller::{StatusEvent, StatusSink};
use crosspost::models::{CandidateItem, Finalization};
use crosspost::transfer::locators::COMPOSE_URL;
use crosspost::transfer::{ComposerTiming, DestinationLocators, TransferPipeline};
use crosspost::utils::error::TransferError;

use crate::common::{
    account_url, destination_login, item_page, item_url, FakeLauncher, FakeMediaFetcher,
    SharedWorld,
};

const HANDLE: &str = "rustlang";

fn candidate(id: u64) -> CandidateItem {
    CandidateItem {
        id: id.to_string(),
        url: item_url(HANDLE, id),
        published_at: None,
        is_pinned: false,
        source_account: account_url(HANDLE),
        position: 0,
    }
}

fn executor() -> ResilientExecutor {
    ResilientExecutor::new(Duration::from_secs(10), Duration::from_millis(250))
}

fn session(world: &SharedWorld) -> SessionManager {
    SessionManager::new(
        Arc::new(FakeLauncher::new(world.clone())),
        Settings::default(),
        DestinationLocators::default().login,
    )
}

fn pipeline(fetcher: Arc<FakeMediaFetcher>) -> TransferPipeline {
    TransferPipeline::new(
        DestinationLocators::default(),
        fetcher,
        ComposerTiming::from(&TransferConfig::default()),
    )
}

fn drain(rx: &mut tokio::sync::mpsc::UnboundedReceiver<StatusEvent>) -> Vec<String> {
    let mut messages = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let StatusEvent::Status(message) = event {
            messages.push(message);
        }
    }
    messages
}

#[tokio::test(start_paused = true)]
async fn test_item_enqueued_with_text_and_media() {
    let world = SharedWorld::new();
    world
        .page(item_url(HANDLE, 7), item_page(HANDLE, 7, "Rust 1.80 is out", true))
        .buffer_composer();
    let fetcher = Arc::new(FakeMediaFetcher::new());
    let mut session = session(&world);

    let result = pipeline(Arc::clone(&fetcher))
        .transfer(
            &mut session,
            &executor(),
            &candidate(7),
            &destination_login(),
            false,
            &StatusSink::disabled(),
        )
        .await;

    assert!(result.success, "transfer failed: {:?}", result.failure_reason);
    assert_eq!(result.item_id, "7");
    assert_eq!(result.finalization, Some(Finalization::Enqueued));
    assert!(session.is_logged_in());
    assert_eq!(fetcher.calls(), 1);

    let w = world.lock();
    assert_eq!(
        w.typed.get(&Locator::css(r#"div[role="textbox"]"#)).map(String::as_str),
        Some("Rust 1.80 is out")
    );
    assert_eq!(w.uploads.len(), 1);
    assert!(w
        .clicks
        .contains(&Locator::css(r#"button[data-testid="queue-button"]"#)));
}

#[tokio::test(start_paused = true)]
async fn test_publish_unavailable_falls_back_to_enqueue() {
    let world = SharedWorld::new();
    world
        .page(item_url(HANDLE, 8), item_page(HANDLE, 8, "new release", true))
        .buffer_composer();
    let (status, mut rx) = StatusSink::channel();
    let mut session = session(&world);

    let result = pipeline(Arc::new(FakeMediaFetcher::new()))
        .transfer(
            &mut session,
            &executor(),
            &candidate(8),
            &destination_login(),
            true,
            &status,
        )
        .await;

    assert!(result.success);
    assert_eq!(result.finalization, Some(Finalization::Enqueued));
    let messages = drain(&mut rx);
    assert!(
        messages.iter().any(|m| m.contains("Publish control unavailable")),
        "no fallback status in {messages:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn test_item_without_media_fails_before_login() {
    let world = SharedWorld::new();
    world
        .page(item_url(HANDLE, 9), item_page(HANDLE, 9, "text only", false))
        .buffer_composer();
    let fetcher = Arc::new(FakeMediaFetcher::new());
    let mut session = session(&world);

    let result = pipeline(Arc::clone(&fetcher))
        .transfer(
            &mut session,
            &executor(),
            &candidate(9),
            &destination_login(),
            false,
            &StatusSink::disabled(),
        )
        .await;

    assert!(!result.success);
    assert_eq!(result.failure_reason, Some(TransferError::MediaNotFound));
    assert_eq!(result.finalization, None);
    assert!(!session.is_logged_in());
    assert_eq!(world.lock().login_submits, 0);
    assert_eq!(fetcher.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_text_injected_when_typing_is_dropped() {
    let world = SharedWorld::new();
    world
        .page(item_url(HANDLE, 10), item_page(HANDLE, 10, "injected text", true))
        .buffer_composer();
    world
        .lock()
        .reject_typing
        .insert(Locator::css(r#"div[role="textbox"]"#));
    let mut session = session(&world);

    let result = pipeline(Arc::new(FakeMediaFetcher::new()))
        .transfer(
            &mut session,
            &executor(),
            &candidate(10),
            &destination_login(),
            false,
            &StatusSink::disabled(),
        )
        .await;

    assert!(result.success);
    assert_eq!(
        world
            .lock()
            .typed
            .get(&Locator::css(r#"div[role="textbox"]"#))
            .map(String::as_str),
        Some("injected text")
    );
}

#[tokio::test(start_paused = true)]
async fn test_composer_url_used_without_button() {
    let world = SharedWorld::new();
    world
        .page(item_url(HANDLE, 11), item_page(HANDLE, 11, "no button", true))
        .controls([
            Locator::css(r#"div[role="textbox"]"#),
            Locator::css(r#"input[type="file"]"#),
            Locator::text("button", "Save as Draft"),
        ]);
    let mut session = session(&world);

    let result = pipeline(Arc::new(FakeMediaFetcher::new()))
        .transfer(
            &mut session,
            &executor(),
            &candidate(11),
            &destination_login(),
            false,
            &StatusSink::disabled(),
        )
        .await;

    assert!(result.success);
    assert_eq!(result.finalization, Some(Finalization::Drafted));
    assert_eq!(world.visits_to(COMPOSE_URL), 1);
}

#[tokio::test(start_paused = true)]
async fn test_no_finalize_control_fails() {
    let world = SharedWorld::new();
    world
        .page(item_url(HANDLE, 12), item_page(HANDLE, 12, "stuck", true))
        .controls([
            Locator::text("button", "Create a post"),
            Locator::css(r#"div[role="textbox"]"#),
            Locator::css(r#"input[type="file"]"#),
        ]);
    let mut session = session(&world);

    let result = pipeline(Arc::new(FakeMediaFetcher::new()))
        .transfer(
            &mut session,
            &executor(),
            &candidate(12),
            &destination_login(),
            true,
            &StatusSink::disabled(),
        )
        .await;

    assert!(!result.success);
    assert_eq!(result.failure_reason, Some(TransferError::FinalizeUnavailable));
}

#[tokio::test(start_paused = true)]
async fn test_downloaded_media_removed_after_transfer() {
    let world = SharedWorld::new();
    world
        .page(item_url(HANDLE, 13), item_page(HANDLE, 13, "cleanup", true))
        .buffer_composer();
    let mut session = session(&world);

    let result = pipeline(Arc::new(FakeMediaFetcher::new()))
        .transfer(
            &mut session,
            &executor(),
            &candidate(13),
            &destination_login(),
            false,
            &StatusSink::disabled(),
        )
        .await;

    assert!(result.success);
    let uploaded = world.lock().uploads[0].clone();
    assert!(!uploaded.exists());
}

#[tokio::test(start_paused = true)]
async fn test_rejected_login_fails_transfer() {
    let world = SharedWorld::new();
    world
        .page(item_url(HANDLE, 14), item_page(HANDLE, 14, "locked out", true))
        .buffer_composer();
    world.lock().reject_login = true;
    let mut session = session(&world);

    let result = pipeline(Arc::new(FakeMediaFetcher::new()))
        .transfer(
            &mut session,
            &executor(),
            &candidate(14),
            &destination_login(),
            false,
            &StatusSink::disabled(),
        )
        .await;

    assert!(!result.success);
    assert!(matches!(
        result.failure_reason,
        Some(TransferError::LoginFailed(_))
    ));
    assert!(!session.is_logged_in());
}
