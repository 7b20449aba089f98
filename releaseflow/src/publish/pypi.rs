//! Package index client for the PyPI legacy upload API.

use super::ports::PackageIndex;
use crate::core::{ArtifactKind, DistributionName};
use crate::credentials::Credential;
use crate::errors::PublishError;
use async_trait::async_trait;
use md5::{Digest, Md5};
use reqwest::multipart::{Form, Part};
use sha2::Sha256;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

const TARGET: &str = "package index";
const TOKEN_USERNAME: &str = "__token__";
const METADATA_VERSION: &str = "2.1";

/// Default legacy upload endpoint.
pub const DEFAULT_UPLOAD_URL: &str = "https://upload.pypi.org/legacy/";

/// Name, version and type of a distribution file, read from its file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionFile {
    /// Path on disk.
    pub path: PathBuf,
    /// sdist or wheel.
    pub kind: ArtifactKind,
    /// Distribution name as it appears in the file name.
    pub name: String,
    /// Version string.
    pub version: String,
    /// `source` for sdists, the python tag (e.g. `py3`) for wheels.
    pub pyversion: String,
}

impl DistributionFile {
    /// Reads name, version and python tag from the file name.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::InvalidArtifact`] for a file name that is not
    /// an sdist or wheel name.
    pub fn parse(path: &Path) -> Result<Self, PublishError> {
        let DistributionName {
            kind,
            name,
            version,
            pyversion,
        } = DistributionName::parse(path)
            .map_err(|reason| PublishError::invalid_artifact(path, reason))?;

        Ok(Self {
            path: path.to_path_buf(),
            kind,
            name,
            version,
            pyversion,
        })
    }

    /// The `filetype` form value expected by the index.
    #[must_use]
    pub fn filetype(&self) -> &'static str {
        match self.kind {
            ArtifactKind::Sdist => "sdist",
            ArtifactKind::Wheel => "bdist_wheel",
        }
    }

    fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Hex digests sent alongside an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadDigests {
    /// MD5 hex digest.
    pub md5: String,
    /// SHA-256 hex digest.
    pub sha256: String,
}

impl UploadDigests {
    /// Computes both digests of `content`.
    #[must_use]
    pub fn of(content: &[u8]) -> Self {
        Self {
            md5: hex::encode(Md5::digest(content)),
            sha256: hex::encode(Sha256::digest(content)),
        }
    }
}

/// Uploads distributions with the legacy multipart API.
#[derive(Debug, Clone)]
pub struct PypiUploadClient {
    client: reqwest::Client,
    upload_url: String,
}

impl PypiUploadClient {
    /// Creates a client for the given upload endpoint.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the HTTP client cannot be built.
    pub fn new(
        upload_url: impl Into<String>,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, PublishError> {
        Self::from_builder(reqwest::Client::builder(), upload_url, timeout, user_agent)
    }

    fn from_builder(
        builder: reqwest::ClientBuilder,
        upload_url: impl Into<String>,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, PublishError> {
        let client = builder
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            upload_url: upload_url.into(),
        })
    }

    /// The configured upload endpoint.
    #[must_use]
    pub fn upload_url(&self) -> &str {
        &self.upload_url
    }
}

#[async_trait]
impl PackageIndex for PypiUploadClient {
    async fn upload_package(
        &self,
        artifact: &Path,
        token: &Credential,
    ) -> Result<(), PublishError> {
        let dist = DistributionFile::parse(artifact)?;
        let content = tokio::fs::read(artifact)
            .await
            .map_err(|e| PublishError::invalid_artifact(artifact, e.to_string()))?;
        let digests = UploadDigests::of(&content);
        let size = content.len();

        let content_part = Part::bytes(content)
            .file_name(dist.file_name())
            .mime_str("application/octet-stream")?;

        let form = Form::new()
            .text(":action", "file_upload")
            .text("protocol_version", "1")
            .text("metadata_version", METADATA_VERSION)
            .text("name", dist.name.clone())
            .text("version", dist.version.clone())
            .text("filetype", dist.filetype())
            .text("pyversion", dist.pyversion.clone())
            .text("md5_digest", digests.md5)
            .text("sha256_digest", digests.sha256)
            .part("content", content_part);

        debug!(
            name = %dist.name,
            version = %dist.version,
            filetype = dist.filetype(),
            bytes = size,
            "Sending upload"
        );

        let response = self
            .client
            .post(&self.upload_url)
            .basic_auth(TOKEN_USERNAME, Some(token.expose()))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            info!(artifact = %artifact.display(), "Upload accepted");
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        Err(classify_failure(status.as_u16(), artifact, &text))
    }
}

/// Maps a non-2xx upload response to an error kind.
fn classify_failure(status: u16, artifact: &Path, body: &str) -> PublishError {
    let duplicate = status == 409
        || (status == 400 && body.to_ascii_lowercase().contains("already exists"));

    match status {
        401 | 403 => PublishError::auth(TARGET),
        _ if duplicate => PublishError::DuplicateVersion {
            path: artifact.to_path_buf(),
        },
        _ => PublishError::Rejected {
            status,
            message: body.chars().take(512).collect(),
        },
    }
}
