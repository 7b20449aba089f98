//! # Releaseflow
//!
//! A tag-triggered release pipeline for Python packages.
//!
//! A push whose reference matches the trigger rule (by default
//! `refs/tags/v*`) runs two stages in strict order:
//!
//! - **release**: create the hosted release for the tag, titled by the
//!   reference, with the first commit message as the body
//! - **pypi**: build the sdist and wheel, then upload both to the index
//!
//! The index stage never starts unless the release stage succeeded.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use releaseflow::prelude::*;
//!
//! let config = PipelineConfig::new("owner/repo");
//! let pipeline = config.build_pipeline(ReleaseCredentials::new(gh_token, pypi_token))?;
//!
//! let event = ReleaseEvent::new("refs/tags/v2.0.0", "Release 2.0.0");
//! let result = pipeline.run(&event, &config.trigger_rule()?).await;
//! std::process::exit(result.exit_code());
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod build;
pub mod config;
pub mod core;
pub mod credentials;
pub mod errors;
pub mod events;
pub mod pipeline;
pub mod publish;
pub mod testing;
pub mod trigger;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::build::{ArtifactBuilder, ToolchainBuilder};
    pub use crate::config::PipelineConfig;
    pub use crate::core::{
        ArtifactKind, BuildArtifactSet, ReleaseEvent, ReleaseHandle, RunResult, RunStatus,
        StageId, StageRecord, StageStatus,
    };
    pub use crate::credentials::{Credential, CredentialScope, ReleaseCredentials};
    pub use crate::errors::{
        BuildError, ConfigError, PublishError, ReleaseflowError, StageTransitionError,
        TriggerRuleError,
    };
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::pipeline::{ReleasePipeline, StageLedger};
    pub use crate::publish::{
        GithubReleaseClient, HostedReleaseStage, IndexPublishStage, NotesPolicy, PackageIndex,
        PypiUploadClient, ReleaseHost,
    };
    pub use crate::trigger::{matches, TriggerRule};
}
