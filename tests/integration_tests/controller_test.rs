//! Process controller tests: full cycles, account fallback and cancellation

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::Instant;

use crosspost::config::Config;
use crosspost::controller::{ProcessController, RunOutcome, StartRequest, StatusEvent, StatusSink};
use crosspost::storage::SeenLedger;

use crate::common::{
    account_url, item_page, item_url, test_config, timeline_article, timeline_page, FakeLauncher,
    FakeMediaFetcher, SharedWorld,
};

/// Serve a timeline for `handle` plus one item page per `(id, with_photo)`
fn script_account(world: &SharedWorld, handle: &str, items: &[(u64, bool)]) {
    let articles: Vec<String> = items
        .iter()
        .map(|(id, _)| {
            // Higher ids are newer
            let datetime = format!("2024-05-01T{:02}:00:00Z", id % 24);
            timeline_article(handle, *id, &datetime, false)
        })
        .collect();
    world.page(account_url(handle), timeline_page(&articles));
    for (id, with_photo) in items {
        world.page(
            item_url(handle, *id),
            item_page(handle, *id, &format!("post {id}"), *with_photo),
        );
    }
}

fn controller(
    config: &Config,
    world: &SharedWorld,
    fetcher: &Arc<FakeMediaFetcher>,
) -> (ProcessController, UnboundedReceiver<StatusEvent>) {
    let (status, rx) = StatusSink::channel();
    let controller = ProcessController::new(
        config.clone(),
        Arc::new(FakeLauncher::new(world.clone())),
        fetcher.clone(),
        status,
    );
    (controller, rx)
}

fn collect(rx: &mut UnboundedReceiver<StatusEvent>) -> Vec<StatusEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn terminal_events(events: &[StatusEvent]) -> usize {
    events.iter().filter(|e| e.is_terminal()).count()
}

#[tokio::test(start_paused = true)]
async fn test_one_item_per_slot_recorded_in_ledger() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.accounts.primary = "acc1".into();
    config.schedule.items_per_window = 2;
    config.schedule.max_cycles = Some(1);
    config.schedule.seed = Some(7);

    let world = SharedWorld::new();
    script_account(&world, "acc1", &[(3, true), (2, true), (1, true)]);
    world.buffer_composer();
    let fetcher = Arc::new(FakeMediaFetcher::new());
    let (controller, mut rx) = controller(&config, &world, &fetcher);

    let outcome = controller.start(StartRequest::from_config(&config)).await;

    assert_eq!(outcome, RunOutcome::Finished);
    assert_eq!(fetcher.calls(), 2);
    assert_eq!(world.lock().login_submits, 1);
    assert_eq!(world.lock().launches, 1);

    let ledger = SeenLedger::load(&config.storage.ledger_path);
    assert_eq!(ledger.ids(&account_url("acc1")), vec!["2", "3"]);

    let events = collect(&mut rx);
    assert!(matches!(
        events.iter().find(|e| matches!(e, StatusEvent::NewPlan { .. })),
        Some(StatusEvent::NewPlan { item_count: 2, intervals }) if intervals.iter().sum::<u32>() == 60
    ));
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, StatusEvent::StartCountdown { .. }))
            .count(),
        2
    );
    assert_eq!(events.last(), Some(&StatusEvent::Finished));
    assert_eq!(terminal_events(&events), 1);
}

#[tokio::test(start_paused = true)]
async fn test_secondary_account_used_when_primary_is_exhausted() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.accounts.primary = "acc1".into();
    config.accounts.secondary = Some("acc2".into());
    config.schedule.max_cycles = Some(1);

    let mut ledger = SeenLedger::empty(&config.storage.ledger_path);
    ledger.record(&account_url("acc1"), "5");
    ledger.record(&account_url("acc1"), "4");
    ledger.flush().unwrap();

    let world = SharedWorld::new();
    script_account(&world, "acc1", &[(5, true), (4, true)]);
    script_account(&world, "acc2", &[(20, true)]);
    world.buffer_composer();
    let fetcher = Arc::new(FakeMediaFetcher::new());
    let (controller, _rx) = controller(&config, &world, &fetcher);

    let outcome = controller.start(StartRequest::from_config(&config)).await;

    assert_eq!(outcome, RunOutcome::Finished);
    assert_eq!(world.visits_to(&account_url("acc1")), 1);
    assert_eq!(world.visits_to(&item_url("acc1", 5)), 0);

    let ledger = SeenLedger::load(&config.storage.ledger_path);
    assert_eq!(ledger.ids(&account_url("acc2")), vec!["20"]);
    assert_eq!(ledger.ids(&account_url("acc1")).len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_primary_falls_back() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.accounts.primary = "acc1".into();
    config.accounts.secondary = Some("acc2".into());
    config.schedule.max_cycles = Some(1);

    let world = SharedWorld::new();
    world.lock().unreachable.insert(account_url("acc1"));
    script_account(&world, "acc2", &[(30, true)]);
    world.buffer_composer();
    let fetcher = Arc::new(FakeMediaFetcher::new());
    let (controller, mut rx) = controller(&config, &world, &fetcher);

    let outcome = controller.start(StartRequest::from_config(&config)).await;

    assert_eq!(outcome, RunOutcome::Finished);
    let ledger = SeenLedger::load(&config.storage.ledger_path);
    assert_eq!(ledger.ids(&account_url("acc2")), vec!["30"]);

    let events = collect(&mut rx);
    assert!(events.iter().any(|e| matches!(
        e,
        StatusEvent::Status(message) if message.starts_with("Could not read https://x.com/acc1")
    )));
}

#[tokio::test(start_paused = true)]
async fn test_item_without_media_skipped_for_next_candidate() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.accounts.primary = "acc1".into();
    config.schedule.max_cycles = Some(1);

    let world = SharedWorld::new();
    script_account(&world, "acc1", &[(2, false), (1, true)]);
    world.buffer_composer();
    let fetcher = Arc::new(FakeMediaFetcher::new());
    let (controller, _rx) = controller(&config, &world, &fetcher);

    let outcome = controller.start(StartRequest::from_config(&config)).await;

    assert_eq!(outcome, RunOutcome::Finished);
    // No retry for an item without media
    assert_eq!(world.visits_to(&item_url("acc1", 2)), 1);
    assert_eq!(fetcher.calls(), 1);

    let ledger = SeenLedger::load(&config.storage.ledger_path);
    assert_eq!(ledger.ids(&account_url("acc1")), vec!["1"]);
}

#[tokio::test(start_paused = true)]
async fn test_failed_transfer_is_retried() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.accounts.primary = "acc1".into();
    config.schedule.max_cycles = Some(1);

    let world = SharedWorld::new();
    script_account(&world, "acc1", &[(1, true)]);
    world.lock().reject_login = true;
    world.buffer_composer();
    let fetcher = Arc::new(FakeMediaFetcher::new());
    let (controller, mut rx) = controller(&config, &world, &fetcher);

    let outcome = controller.start(StartRequest::from_config(&config)).await;

    assert_eq!(outcome, RunOutcome::Finished);
    assert_eq!(world.lock().login_submits, 2);
    assert!(SeenLedger::load(&config.storage.ledger_path).is_empty());

    let events = collect(&mut rx);
    assert!(events.iter().any(|e| matches!(
        e,
        StatusEvent::Status(message) if message.contains("slot skipped")
    )));
}

#[tokio::test(start_paused = true)]
async fn test_missing_destination_login_fails_before_launch() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.accounts.primary = "acc1".into();
    config.credentials.destination.password.clear();

    let world = SharedWorld::new();
    let fetcher = Arc::new(FakeMediaFetcher::new());
    let (controller, mut rx) = controller(&config, &world, &fetcher);

    let outcome = controller.start(StartRequest::from_config(&config)).await;

    assert!(matches!(outcome, RunOutcome::Failed(ref reason) if reason.contains("Credentials missing")));
    assert_eq!(world.lock().launches, 0);

    let events = collect(&mut rx);
    assert_eq!(terminal_events(&events), 1);
    assert!(matches!(events.last(), Some(StatusEvent::Failed(_))));
}

#[tokio::test(start_paused = true)]
async fn test_no_account_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    let world = SharedWorld::new();
    let fetcher = Arc::new(FakeMediaFetcher::new());
    let (controller, _rx) = controller(&config, &world, &fetcher);

    let outcome = controller.start(StartRequest::from_config(&config)).await;
    assert!(matches!(outcome, RunOutcome::Failed(_)));
}

#[tokio::test(start_paused = true)]
async fn test_browser_launch_failure_fails_run() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.accounts.primary = "acc1".into();

    let world = SharedWorld::new();
    world.lock().fail_launch = true;
    let fetcher = Arc::new(FakeMediaFetcher::new());
    let (controller, _rx) = controller(&config, &world, &fetcher);

    let outcome = controller.start(StartRequest::from_config(&config)).await;
    assert!(
        matches!(outcome, RunOutcome::Failed(ref reason) if reason.contains("session unavailable"))
    );
}

#[tokio::test(start_paused = true)]
async fn test_stop_during_countdown_cancels_promptly() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.accounts.primary = "acc1".into();
    config.schedule.items_per_window = 1;

    let world = SharedWorld::new();
    script_account(&world, "acc1", &[(2, true), (1, true)]);
    world.buffer_composer();
    let fetcher = Arc::new(FakeMediaFetcher::new());
    let (controller, mut rx) = controller(&config, &world, &fetcher);

    let stop = controller.stop_handle();
    let watcher = tokio::spawn(async move {
        let mut stopped_at = None;
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            if stopped_at.is_none() && matches!(event, StatusEvent::StartCountdown { .. }) {
                tokio::time::sleep(Duration::from_secs(3)).await;
                stop.stop();
                stopped_at = Some(Instant::now());
            }
            let terminal = event.is_terminal();
            events.push(event);
            if terminal {
                break;
            }
        }
        (stopped_at, events)
    });

    let outcome = controller.start(StartRequest::from_config(&config)).await;
    let finished_at = Instant::now();
    let (stopped_at, events) = watcher.await.unwrap();

    assert_eq!(outcome, RunOutcome::Cancelled);
    let stopped_at = stopped_at.expect("stop was never requested");
    assert!(finished_at.duration_since(stopped_at) <= Duration::from_secs(1));

    assert_eq!(fetcher.calls(), 1);
    let ledger = SeenLedger::load(&config.storage.ledger_path);
    assert_eq!(ledger.ids(&account_url("acc1")), vec!["2"]);
    assert_eq!(events.last(), Some(&StatusEvent::Cancelled));
    assert_eq!(terminal_events(&events), 1);
}
