pub mod ledger;
pub mod plan;
pub mod run;
pub mod store;

// Re-export command functions for convenience
pub use ledger::{ledger, LedgerAction};
pub use plan::plan;
pub use run::{run, RunParams};
pub use store::{store, StoreAction};

use anyhow::Result;
use std::path::Path;

use crosspost::config::Config;

/// Configuration from `path` (or defaults) with environment overrides applied
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = match path {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    config.apply_env();
    Ok(config)
}
