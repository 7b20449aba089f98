//! Narrow interfaces to the two remote release targets.

use crate::core::ReleaseHandle;
use crate::credentials::Credential;
use crate::errors::PublishError;
use async_trait::async_trait;
use std::path::Path;

/// The source-hosting platform's release API.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReleaseHost: Send + Sync {
    /// Creates a release attached to `tag_name`.
    ///
    /// Must fail with [`PublishError::DuplicateRelease`] when a release for
    /// the tag already exists.
    async fn create_release(
        &self,
        tag_name: &str,
        title: &str,
        body: &str,
        token: &Credential,
    ) -> Result<ReleaseHandle, PublishError>;
}

/// The package index upload API.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PackageIndex: Send + Sync {
    /// Uploads a single distribution file.
    ///
    /// Must fail with [`PublishError::DuplicateVersion`] when the index
    /// already holds the file.
    async fn upload_package(&self, artifact: &Path, token: &Credential)
        -> Result<(), PublishError>;
}
