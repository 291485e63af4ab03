//! Harvester tests against a scripted timeline

use std::time::Duration;
use tokio::time::Instant;

use crosspost::browser::ResilientExecutor;
use crosspost::harvester::ContentHarvester;
use crosspost::utils::error::HarvestError;

use crate::common::{account_url, timeline_article, timeline_page, FakeDriver, SharedWorld};

const PAGE_TIMEOUT: Duration = Duration::from_secs(30);
const ELEMENT_TIMEOUT: Duration = Duration::from_secs(2);

fn executor() -> ResilientExecutor {
    ResilientExecutor::new(ELEMENT_TIMEOUT, Duration::from_millis(250))
}

#[tokio::test(start_paused = true)]
async fn test_timeline_items_newest_first() {
    let world = SharedWorld::new();
    world.page(
        account_url("acc1"),
        timeline_page(&[
            timeline_article("acc1", 1, "2024-05-01T08:00:00Z", false),
            timeline_article("acc1", 3, "2024-05-01T10:00:00Z", false),
            timeline_article("acc1", 9, "2024-05-01T23:00:00Z", true),
        ]),
    );
    let mut page = FakeDriver::new(world.clone());

    let items = ContentHarvester::new()
        .harvest(&mut page, &executor(), &account_url("acc1"), 5, PAGE_TIMEOUT)
        .await
        .unwrap();

    let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["3", "1", "9"]);
}

#[tokio::test(start_paused = true)]
async fn test_empty_timeline_gives_up_after_element_timeout() {
    let world = SharedWorld::new();
    world.page(account_url("quiet"), timeline_page(&[]));
    let mut page = FakeDriver::new(world.clone());

    let started = Instant::now();
    let result = ContentHarvester::new()
        .harvest(&mut page, &executor(), &account_url("quiet"), 5, PAGE_TIMEOUT)
        .await;
    let waited = started.elapsed();

    assert!(matches!(result, Err(HarvestError::NotFound { .. })));
    assert!(waited >= ELEMENT_TIMEOUT);
    assert!(waited < PAGE_TIMEOUT, "waited {waited:?} for the first item");
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_timeline_is_a_navigation_error() {
    let world = SharedWorld::new();
    world.lock().unreachable.insert(account_url("gone"));
    let mut page = FakeDriver::new(world.clone());

    let result = ContentHarvester::new()
        .harvest(&mut page, &executor(), &account_url("gone"), 5, PAGE_TIMEOUT)
        .await;

    assert!(matches!(result, Err(HarvestError::Navigation { .. })));
}
