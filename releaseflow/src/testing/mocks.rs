//! Recording doubles for the release host, the builder and the index.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::build::ArtifactBuilder;
use crate::core::{ArtifactKind, BuildArtifactSet, ReleaseHandle};
use crate::credentials::{Credential, CredentialScope};
use crate::errors::{BuildError, PublishError};
use crate::publish::{PackageIndex, ReleaseHost};

/// Produces a fresh error for every failing call.
pub type FailureFactory<E> = Arc<dyn Fn() -> E + Send + Sync>;

/// Ordered record of external calls, shared between doubles.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    pub fn record(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    /// Returns all entries in call order.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    /// Number of entries starting with `prefix`.
    #[must_use]
    pub fn count(&self, prefix: &str) -> usize {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .count()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

/// One recorded `create_release` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseCall {
    /// Tag the release was created for.
    pub tag_name: String,
    /// Release title.
    pub title: String,
    /// Release body.
    pub body: String,
    /// Scope of the token that was presented.
    pub scope: CredentialScope,
}

/// A release host that records calls and returns a configured outcome.
pub struct RecordingReleaseHost {
    log: CallLog,
    release_id: String,
    failure: Option<FailureFactory<PublishError>>,
    calls: Mutex<Vec<ReleaseCall>>,
}

impl RecordingReleaseHost {
    /// Creates a host that succeeds with release id `rel_1`.
    #[must_use]
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            release_id: "rel_1".to_string(),
            failure: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Sets the id of created releases.
    #[must_use]
    pub fn with_release_id(mut self, id: impl Into<String>) -> Self {
        self.release_id = id.into();
        self
    }

    /// Makes every call fail with the factory's error.
    #[must_use]
    pub fn failing(mut self, failure: impl Fn() -> PublishError + Send + Sync + 'static) -> Self {
        self.failure = Some(Arc::new(failure));
        self
    }

    /// Returns the recorded calls.
    #[must_use]
    pub fn calls(&self) -> Vec<ReleaseCall> {
        self.calls.lock().clone()
    }

    /// Returns the number of calls.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl ReleaseHost for RecordingReleaseHost {
    async fn create_release(
        &self,
        tag_name: &str,
        title: &str,
        body: &str,
        token: &Credential,
    ) -> Result<ReleaseHandle, PublishError> {
        self.log.record(format!("create_release:{tag_name}"));
        self.calls.lock().push(ReleaseCall {
            tag_name: tag_name.to_string(),
            title: title.to_string(),
            body: body.to_string(),
            scope: token.scope(),
        });

        match &self.failure {
            Some(failure) => Err(failure()),
            None => Ok(ReleaseHandle::new(self.release_id.clone(), tag_name)),
        }
    }
}

impl fmt::Debug for RecordingReleaseHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingReleaseHost")
            .field("release_id", &self.release_id)
            .field("failing", &self.failure.is_some())
            .field("calls", &self.call_count())
            .finish()
    }
}

/// A builder that writes small placeholder distributions instead of running
/// a toolchain.
///
/// Relative artifact paths are resolved against the source tree it is asked
/// to build, and the files are created there.
pub struct StubArtifactBuilder {
    log: CallLog,
    artifacts: BuildArtifactSet,
    omitted: Option<ArtifactKind>,
    failure: Option<FailureFactory<BuildError>>,
    trees: Mutex<Vec<PathBuf>>,
}

impl StubArtifactBuilder {
    /// Creates a builder that succeeds with `artifacts`.
    #[must_use]
    pub fn new(log: CallLog, artifacts: BuildArtifactSet) -> Self {
        Self {
            log,
            artifacts,
            omitted: None,
            failure: None,
            trees: Mutex::new(Vec::new()),
        }
    }

    /// Reports success but never writes the artifact of `kind`.
    #[must_use]
    pub fn omitting(mut self, kind: ArtifactKind) -> Self {
        self.omitted = Some(kind);
        self
    }

    /// Makes every build fail with the factory's error.
    #[must_use]
    pub fn failing(mut self, failure: impl Fn() -> BuildError + Send + Sync + 'static) -> Self {
        self.failure = Some(Arc::new(failure));
        self
    }

    /// Source trees the builder was asked to build.
    #[must_use]
    pub fn trees(&self) -> Vec<PathBuf> {
        self.trees.lock().clone()
    }

    /// Returns the number of builds.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.trees.lock().len()
    }
}

#[async_trait]
impl ArtifactBuilder for StubArtifactBuilder {
    async fn build(&self, source_tree: &Path) -> Result<BuildArtifactSet, BuildError> {
        self.log.record(format!("build:{}", source_tree.display()));
        self.trees.lock().push(source_tree.to_path_buf());

        if let Some(failure) = &self.failure {
            return Err(failure());
        }

        let artifacts = BuildArtifactSet::new(
            source_tree.join(&self.artifacts.sdist),
            source_tree.join(&self.artifacts.wheel),
        );
        for (kind, path) in [
            (ArtifactKind::Sdist, &artifacts.sdist),
            (ArtifactKind::Wheel, &artifacts.wheel),
        ] {
            if self.omitted == Some(kind) {
                continue;
            }
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(path, format!("{kind} written by StubArtifactBuilder")).await?;
        }
        Ok(artifacts)
    }
}

impl fmt::Debug for StubArtifactBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StubArtifactBuilder")
            .field("artifacts", &self.artifacts)
            .field("omitted", &self.omitted)
            .field("failing", &self.failure.is_some())
            .finish_non_exhaustive()
    }
}

/// A package index that records uploads and can refuse some of them.
pub struct RecordingPackageIndex {
    log: CallLog,
    fail_suffix: Option<String>,
    failure: Option<FailureFactory<PublishError>>,
    uploads: Mutex<Vec<(PathBuf, CredentialScope)>>,
}

impl RecordingPackageIndex {
    /// Creates an index that accepts every upload.
    #[must_use]
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            fail_suffix: None,
            failure: None,
            uploads: Mutex::new(Vec::new()),
        }
    }

    /// Refuses uploads whose path ends with `suffix`.
    #[must_use]
    pub fn failing_on(
        mut self,
        suffix: impl Into<String>,
        failure: impl Fn() -> PublishError + Send + Sync + 'static,
    ) -> Self {
        self.fail_suffix = Some(suffix.into());
        self.failure = Some(Arc::new(failure));
        self
    }

    /// Paths of every attempted upload, in order.
    #[must_use]
    pub fn attempted(&self) -> Vec<PathBuf> {
        self.uploads.lock().iter().map(|(p, _)| p.clone()).collect()
    }

    /// Token scopes presented with each upload.
    #[must_use]
    pub fn scopes(&self) -> Vec<CredentialScope> {
        self.uploads.lock().iter().map(|(_, s)| *s).collect()
    }

    /// Returns the number of upload attempts.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.uploads.lock().len()
    }
}

#[async_trait]
impl PackageIndex for RecordingPackageIndex {
    async fn upload_package(
        &self,
        artifact: &Path,
        token: &Credential,
    ) -> Result<(), PublishError> {
        self.log.record(format!("upload:{}", artifact.display()));
        self.uploads
            .lock()
            .push((artifact.to_path_buf(), token.scope()));

        let refused = self
            .fail_suffix
            .as_deref()
            .is_some_and(|suffix| artifact.to_string_lossy().ends_with(suffix));
        match (&self.failure, refused) {
            (Some(failure), true) => Err(failure()),
            _ => Ok(()),
        }
    }
}

impl fmt::Debug for RecordingPackageIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingPackageIndex")
            .field("fail_suffix", &self.fail_suffix)
            .field("calls", &self.call_count())
            .finish_non_exhaustive()
    }
}
