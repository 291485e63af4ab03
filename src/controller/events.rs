//! Status notifications and the stop flag
//!
//! The controller talks to its consumer (CLI, UI shell) through a
//! fire-and-forget channel of [`StatusEvent`]s. A dropped receiver never
//! blocks or fails the automation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Notification emitted by the automation core
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    /// Human-readable progress message
    Status(String),

    /// A fresh cycle plan was generated
    NewPlan {
        /// Number of slots in the plan
        item_count: usize,
        /// Planned waits in minutes
        intervals: Vec<u32>,
    },

    /// A countdown to the next slot started
    StartCountdown {
        /// Length of the wait in seconds
        seconds: u64,
    },

    /// The run ended normally
    Finished,

    /// The run ended because of a setup failure
    Failed(String),

    /// The run ended on a stop request
    Cancelled,
}

impl StatusEvent {
    /// Whether this event ends the run
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Failed(_) | Self::Cancelled)
    }
}

/// Sending half of the status channel
#[derive(Debug, Clone, Default)]
pub struct StatusSink {
    tx: Option<mpsc::UnboundedSender<StatusEvent>>,
}

impl StatusSink {
    /// Create a sink and the receiver its events arrive on
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<StatusEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// Sink that only logs
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Emit an event
    pub fn send(&self, event: StatusEvent) {
        match &event {
            StatusEvent::Status(message) => info!(status = %message),
            StatusEvent::NewPlan {
                item_count,
                intervals,
            } => info!(item_count, ?intervals, "New cycle plan"),
            StatusEvent::StartCountdown { seconds } => info!(seconds, "Countdown started"),
            StatusEvent::Finished => info!("Process finished"),
            StatusEvent::Failed(reason) => warn!(reason = %reason, "Process failed"),
            StatusEvent::Cancelled => info!("Process cancelled"),
        }

        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }

    /// Emit a human-readable status message
    pub fn status(&self, message: impl Into<String>) {
        self.send(StatusEvent::Status(message.into()));
    }
}

/// Process-wide cooperative stop flag
///
/// Set only by an explicit stop command; checked by the controller at every
/// slot and every countdown tick.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    /// New, unset flag
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop
    pub fn stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether a stop was requested
    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
