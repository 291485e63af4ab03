//! End-to-end tests of the automation core
//!
//! - Harvest → transfer → ledger through the process controller
//! - Timeline waits and ordering in the harvester
//! - Composer and finalization fallbacks in the transfer pipeline
//! - Login idempotence and surface reuse in the session manager

pub mod controller_test;
pub mod harvester_test;
pub mod session_test;
pub mod transfer_test;
