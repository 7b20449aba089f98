//! Event sinks for run observability.
//!
//! The orchestrator reports every run and stage transition to an
//! [`EventSink`]. Payloads never contain credentials.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

/// A run began evaluating an event.
pub const RUN_STARTED: &str = "run.started";
/// The event did not match the trigger rule.
pub const RUN_SKIPPED: &str = "run.skipped";
/// A run reached its final status.
pub const RUN_COMPLETED: &str = "run.completed";
/// A stage moved to `running`.
pub const STAGE_STARTED: &str = "stage.started";
/// A stage moved to `succeeded`.
pub const STAGE_SUCCEEDED: &str = "stage.succeeded";
/// A stage moved to `failed`.
pub const STAGE_FAILED: &str = "stage.failed";
