//! crosspost - scheduled content relay from X timelines to a Buffer queue
//!
//! The crate periodically harvests the newest items of one or more source
//! accounts, skips items already relayed, and drives the destination composer
//! to publish, enqueue or draft each new item.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and the settings store contract
//! - [`browser`] - Driver traits, locator strategies, resilient execution, session ownership
//! - [`parser`] - HTML parsing of timeline and item pages
//! - [`harvester`] - Timeline harvesting and fresh-candidate selection
//! - [`transfer`] - The transfer pipeline, composer steps and media acquisition
//! - [`scheduler`] - Randomized cycle plans and the cancellable countdown
//! - [`storage`] - The seen-item ledger
//! - [`controller`] - The top-level loop and its status/stop channels
//! - [`models`] - Core data structures and types
//! - [`utils`] - Common utilities, domain errors and retry helpers
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use crosspost::browser::ChromeLauncher;
//! use crosspost::config::Config;
//! use crosspost::controller::{ProcessController, StartRequest, StatusSink};
//! use crosspost::transfer::HttpMediaFetcher;
//! use crosspost::utils::retry::RetryConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let fetcher = HttpMediaFetcher::new(
//!         config.storage.media_dir(),
//!         config.settings.page_timeout(),
//!         RetryConfig::default(),
//!     )?;
//!     let (status, _events) = StatusSink::channel();
//!     let controller = ProcessController::new(
//!         config.clone(),
//!         Arc::new(ChromeLauncher::new()),
//!         Arc::new(fetcher),
//!         status,
//!     );
//!     controller.start(StartRequest::from_config(&config)).await;
//!     Ok(())
//! }
//! ```

pub mod browser;
pub mod config;
pub mod controller;
pub mod error;
pub mod harvester;
pub mod models;
pub mod parser;
pub mod scheduler;
pub mod storage;
pub mod transfer;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::controller::{ProcessController, StartRequest, StatusEvent, StatusSink, StopHandle};
    pub use crate::error::{CrosspostErrorTrait, Error, ErrorCategory, Result};
    pub use crate::models::{CandidateItem, CredentialPair, Credentials, Finalization, TransferResult};
    pub use crate::storage::SeenLedger;
}

// Direct re-exports for convenience
pub use models::{CandidateItem, Finalization, TransferResult};
