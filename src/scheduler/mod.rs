//! Slot scheduling
//!
//! - [`plan`] - randomized cycle plans that spread slots across a window
//! - [`countdown`] - the cancellable per-second wait between slots

pub mod countdown;
pub mod plan;

pub use countdown::{countdown, CountdownOutcome};
pub use plan::{plan, CyclePlan, CyclePlanner};
