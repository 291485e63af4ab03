//! Durable state of the automation core
//!
//! Only the seen-item ledger lives here; settings and credentials go through
//! the key-value store in [`crate::config::store`].

pub mod ledger;

pub use ledger::SeenLedger;
