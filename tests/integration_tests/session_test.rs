//! Session manager tests: lazy launch, surface reuse, login idempotence and
//! first-run dialog handling

use std::sync::Arc;
use std::time::Duration;

use crosspost::browser::{LoginOutcome, Locator, ResilientExecutor, SessionManager};
use crosspost::config::Settings;
use crosspost::controller::{StatusEvent, StatusSink};
use crosspost::models::CredentialPair;
use crosspost::transfer::DestinationLocators;
use crosspost::utils::error::{DriverError, TransferError};

use crate::common::{destination_login, FakeLauncher, SharedWorld};

fn executor() -> ResilientExecutor {
    ResilientExecutor::new(Duration::from_secs(5), Duration::from_millis(250))
}

fn manager(world: &SharedWorld) -> SessionManager {
    SessionManager::new(
        Arc::new(FakeLauncher::new(world.clone())),
        Settings::default(),
        DestinationLocators::default().login,
    )
}

#[tokio::test(start_paused = true)]
async fn test_second_login_is_skipped() {
    let world = SharedWorld::new();
    let mut session = manager(&world);
    let (status, mut rx) = StatusSink::channel();

    let first = session
        .ensure_logged_in(&destination_login(), &executor(), &status)
        .await
        .unwrap();
    let second = session
        .ensure_logged_in(&destination_login(), &executor(), &status)
        .await
        .unwrap();

    assert_eq!(first, LoginOutcome::LoggedIn);
    assert_eq!(second, LoginOutcome::Skipped);
    assert_eq!(world.lock().login_submits, 1);
    assert_eq!(world.visits_to(&DestinationLocators::default().login.url), 1);

    let mut skipped = false;
    while let Ok(event) = rx.try_recv() {
        if let StatusEvent::Status(message) = event {
            skipped |= message.contains("already logged in");
        }
    }
    assert!(skipped);
}

#[tokio::test(start_paused = true)]
async fn test_incomplete_credentials_submit_nothing() {
    let world = SharedWorld::new();
    let mut session = manager(&world);

    let result = session
        .ensure_logged_in(
            &CredentialPair::new("relay@example.com", " "),
            &executor(),
            &StatusSink::disabled(),
        )
        .await;

    assert!(matches!(result, Err(TransferError::LoginFailed(_))));
    assert_eq!(world.lock().launches, 0);
}

#[tokio::test(start_paused = true)]
async fn test_login_form_still_shown_is_a_login_failure() {
    let world = SharedWorld::new();
    world.lock().reject_login = true;
    let mut session = manager(&world);

    let result = session
        .ensure_logged_in(&destination_login(), &executor(), &StatusSink::disabled())
        .await;

    match result {
        Err(TransferError::LoginFailed(reason)) => assert!(reason.contains("still shown")),
        other => panic!("expected a login failure, got {other:?}"),
    }
    assert!(!session.is_logged_in());
    assert_eq!(world.lock().login_submits, 1);
}

#[tokio::test]
async fn test_browser_launched_once_and_surface_reused() {
    let world = SharedWorld::new();
    let mut session = manager(&world);

    session.ensure_session().await.unwrap();
    session.surface().await.unwrap();
    session.surface().await.unwrap();

    let w = world.lock();
    assert_eq!(w.launches, 1);
    assert_eq!(w.surfaces, 1);
}

#[tokio::test]
async fn test_closed_surface_is_reopened() {
    let world = SharedWorld::new();
    let mut session = manager(&world);

    session.surface().await.unwrap();
    world.lock().closed = true;
    let page = session.surface().await.unwrap();
    assert!(page.is_open().await);

    let w = world.lock();
    assert_eq!(w.launches, 1);
    assert_eq!(w.surfaces, 2);
}

#[tokio::test]
async fn test_launch_failure_is_reported() {
    let world = SharedWorld::new();
    world.lock().fail_launch = true;
    let mut session = manager(&world);

    let result = session.ensure_session().await;
    assert!(matches!(result, Err(DriverError::Launch(_))));
}

#[tokio::test(start_paused = true)]
async fn test_first_run_dialog_closed_by_first_matching_control() {
    let world = SharedWorld::new();
    let close = Locator::css(r#"button[aria-label="Close"]"#);
    let skip = Locator::text("button", "Skip");
    world.controls([skip.clone(), close.clone()]);
    let mut session = manager(&world);

    let outcome = session
        .ensure_logged_in(&destination_login(), &executor(), &StatusSink::disabled())
        .await
        .unwrap();

    assert_eq!(outcome, LoginOutcome::LoggedIn);
    assert_eq!(world.lock().clicks, vec![close]);
    assert!(!world.clicked(&skip));
}

#[tokio::test(start_paused = true)]
async fn test_login_without_dialog_clicks_nothing() {
    let world = SharedWorld::new();
    let mut session = manager(&world);

    let outcome = session
        .ensure_logged_in(&destination_login(), &executor(), &StatusSink::disabled())
        .await
        .unwrap();

    assert_eq!(outcome, LoginOutcome::LoggedIn);
    assert!(world.lock().clicks.is_empty());
    assert!(session.is_logged_in());
}
