//! Test doubles and assertions for release pipelines.
//!
//! The recording doubles share a [`CallLog`] so tests can assert the order
//! of external calls across the release host, the builder and the index.

mod assertions;
mod mocks;

pub use assertions::{
    assert_event_order, assert_run_failed_at, assert_run_skipped, assert_run_succeeded,
    assert_stage_status,
};
pub use mocks::{
    CallLog, FailureFactory, RecordingPackageIndex, RecordingReleaseHost, ReleaseCall,
    StubArtifactBuilder,
};
