//! Artifact building.
//!
//! The index stage turns a checked-out source tree into a source
//! distribution and a wheel through an [`ArtifactBuilder`].

mod toolchain;

pub use toolchain::{clear_stale_artifacts, discover_artifacts, ToolchainBuilder};

use crate::core::BuildArtifactSet;
use crate::errors::BuildError;
use async_trait::async_trait;
use std::path::Path;

/// Produces the distributions for a source tree.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ArtifactBuilder: Send + Sync {
    /// Builds the source distribution and wheel.
    ///
    /// Implementations must only return `Ok` for a set that passes
    /// [`BuildArtifactSet::verify`].
    async fn build(&self, source_tree: &Path) -> Result<BuildArtifactSet, BuildError>;
}
