//! Core domain model types for releaseflow.
//!
//! This module contains the fundamental types used throughout the pipeline:
//! - Stage identity and status enums
//! - The triggering push event
//! - Build artifacts, stage records and run results

mod artifact;
mod event;
mod result;
mod status;

pub use artifact::{ArtifactKind, BuildArtifactSet, DistributionName};
pub use event::ReleaseEvent;
pub use result::{ReleaseHandle, RunResult, StageRecord};
pub use status::{RunStatus, StageId, StageStatus};
