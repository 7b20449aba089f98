//! Release run orchestration.
//!
//! This module provides:
//! - The stage ledger enforcing the release-before-index gate
//! - The pipeline that drives one run per push event

mod ledger;
mod orchestrator;

pub use ledger::StageLedger;
pub use orchestrator::ReleasePipeline;
