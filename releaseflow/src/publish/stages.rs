//! The two publish stages.

use super::notes::{render_title, NotesPolicy, DEFAULT_TITLE_TEMPLATE};
use super::ports::{PackageIndex, ReleaseHost};
use crate::build::ArtifactBuilder;
use crate::core::{BuildArtifactSet, ReleaseHandle};
use crate::credentials::Credential;
use crate::errors::PublishError;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Creates the human-facing release on the source-hosting platform.
#[derive(Clone)]
pub struct HostedReleaseStage {
    host: Arc<dyn ReleaseHost>,
    notes_policy: NotesPolicy,
    title_template: String,
}

impl HostedReleaseStage {
    /// Creates the stage with verbatim notes and the ref as title.
    #[must_use]
    pub fn new(host: Arc<dyn ReleaseHost>) -> Self {
        Self {
            host,
            notes_policy: NotesPolicy::default(),
            title_template: DEFAULT_TITLE_TEMPLATE.to_string(),
        }
    }

    /// Sets how the commit message becomes the release body.
    #[must_use]
    pub fn with_notes_policy(mut self, policy: NotesPolicy) -> Self {
        self.notes_policy = policy;
        self
    }

    /// Sets the title template (`{ref}` and `{tag}` are expanded).
    #[must_use]
    pub fn with_title_template(mut self, template: impl Into<String>) -> Self {
        self.title_template = template.into();
        self
    }

    /// Publishes the release for `tag_name`.
    ///
    /// The title is rendered from the reference and the body is the commit
    /// message after the notes policy.
    ///
    /// # Errors
    ///
    /// Returns the host's error unchanged; none are retried.
    pub async fn publish(
        &self,
        git_ref: &str,
        tag_name: &str,
        commit_message: &str,
        token: &Credential,
    ) -> Result<ReleaseHandle, PublishError> {
        let title = render_title(&self.title_template, git_ref, tag_name);
        let body = self.notes_policy.apply(commit_message);

        info!(tag = %tag_name, title = %title, "Creating hosted release");
        let handle = self
            .host
            .create_release(tag_name, &title, &body, token)
            .await?;
        info!(tag = %tag_name, release_id = %handle.id, "Hosted release created");
        Ok(handle)
    }
}

impl fmt::Debug for HostedReleaseStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostedReleaseStage")
            .field("notes_policy", &self.notes_policy)
            .field("title_template", &self.title_template)
            .finish_non_exhaustive()
    }
}

/// Builds the distributions and uploads them to the package index.
#[derive(Clone)]
pub struct IndexPublishStage {
    builder: Arc<dyn ArtifactBuilder>,
    index: Arc<dyn PackageIndex>,
}

impl IndexPublishStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(builder: Arc<dyn ArtifactBuilder>, index: Arc<dyn PackageIndex>) -> Self {
        Self { builder, index }
    }

    /// Builds from `source_tree`, checks the output, then uploads both
    /// artifacts.
    ///
    /// Returns the uploaded paths in upload order.
    ///
    /// # Errors
    ///
    /// Build failures, and artifact sets that fail
    /// [`BuildArtifactSet::verify`], are wrapped in
    /// [`PublishError::BuildStepFailed`] and no upload is attempted.
    pub async fn publish(
        &self,
        source_tree: &Path,
        token: &Credential,
    ) -> Result<Vec<PathBuf>, PublishError> {
        let artifacts = self.builder.build(source_tree).await?;
        if let Err(e) = artifacts.verify() {
            warn!(error = %e, "Builder returned unusable artifacts");
            return Err(e.into());
        }
        self.upload_artifacts(&artifacts, token).await
    }

    /// Uploads the sdist, then the wheel.
    ///
    /// A failure after the sdist went up leaves it on the index.
    ///
    /// # Errors
    ///
    /// Returns the first upload error.
    pub async fn upload_artifacts(
        &self,
        artifacts: &BuildArtifactSet,
        token: &Credential,
    ) -> Result<Vec<PathBuf>, PublishError> {
        let mut uploaded = Vec::with_capacity(2);

        for path in artifacts.paths() {
            info!(artifact = %path.display(), "Uploading to package index");
            if let Err(e) = self.index.upload_package(path, token).await {
                if !uploaded.is_empty() {
                    warn!(
                        uploaded = ?uploaded,
                        failed = %path.display(),
                        "Index upload failed after a partial upload"
                    );
                }
                return Err(e);
            }
            uploaded.push(path.to_path_buf());
        }

        Ok(uploaded)
    }
}

impl fmt::Debug for IndexPublishStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexPublishStage").finish_non_exhaustive()
    }
}
