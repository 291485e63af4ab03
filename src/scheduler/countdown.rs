//! Cancellable wait between slots
//!
//! The wait is a loop of one-second ticks rather than one long sleep, so a
//! stop request is observed within a second.

use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::trace;

use crate::controller::events::{StatusEvent, StatusSink, StopHandle};

const TICK: Duration = Duration::from_secs(1);

/// How a countdown ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownOutcome {
    /// The full wait elapsed
    Elapsed,
    /// A stop was requested during the wait
    Stopped,
}

/// Wait `seconds`, checking `stop` once per second
///
/// Emits `StartCountdown` before the first tick.
pub async fn countdown(seconds: u64, stop: &StopHandle, status: &StatusSink) -> CountdownOutcome {
    status.send(StatusEvent::StartCountdown { seconds });

    let mut ticks = interval_at(Instant::now() + TICK, TICK);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    for remaining in (0..seconds).rev() {
        if stop.is_stopped() {
            return CountdownOutcome::Stopped;
        }
        ticks.tick().await;
        trace!(remaining, "Countdown tick");
    }

    if stop.is_stopped() {
        CountdownOutcome::Stopped
    } else {
        CountdownOutcome::Elapsed
    }
}
