//! The two publish stages and the remote targets they talk to.
//!
//! This module provides:
//! - [`ReleaseHost`] / [`PackageIndex`] ports
//! - [`HostedReleaseStage`] and [`IndexPublishStage`]
//! - HTTP clients for GitHub Releases and the PyPI legacy upload API

mod github;
#[cfg(test)]
mod http_stub;
mod notes;
mod ports;
mod pypi;
mod stages;

pub use github::GithubReleaseClient;
pub use notes::{render_title, NotesPolicy, DEFAULT_TITLE_TEMPLATE};
pub use ports::{PackageIndex, ReleaseHost};
pub use pypi::{DistributionFile, PypiUploadClient, UploadDigests, DEFAULT_UPLOAD_URL};
pub use stages::{HostedReleaseStage, IndexPublishStage};
