//! GitHub Releases client.

use super::ports::ReleaseHost;
use crate::core::ReleaseHandle;
use crate::credentials::Credential;
use crate::errors::PublishError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const TARGET: &str = "GitHub Releases";
const API_VERSION: &str = "2022-11-28";

#[derive(Debug, Serialize)]
struct CreateReleaseRequest<'a> {
    tag_name: &'a str,
    name: &'a str,
    body: &'a str,
    draft: bool,
    prerelease: bool,
}

#[derive(Debug, Deserialize)]
struct CreateReleaseResponse {
    id: u64,
    #[serde(default)]
    html_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ValidationFailure {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ValidationDetail>,
}

#[derive(Debug, Deserialize)]
struct ValidationDetail {
    #[serde(default)]
    code: String,
}

/// Creates releases through the GitHub REST API.
#[derive(Debug, Clone)]
pub struct GithubReleaseClient {
    client: reqwest::Client,
    api_base: String,
    repository: String,
}

impl GithubReleaseClient {
    /// Creates a client for `owner/repo`.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the HTTP client cannot be built.
    pub fn new(
        repository: impl Into<String>,
        api_base: impl Into<String>,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, PublishError> {
        Self::from_builder(
            reqwest::Client::builder(),
            repository,
            api_base,
            timeout,
            user_agent,
        )
    }

    fn from_builder(
        builder: reqwest::ClientBuilder,
        repository: impl Into<String>,
        api_base: impl Into<String>,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, PublishError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));

        let client = builder
            .timeout(timeout)
            .user_agent(user_agent)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            repository: repository.into(),
        })
    }

    /// The release-creation endpoint.
    #[must_use]
    pub fn releases_url(&self) -> String {
        format!("{}/repos/{}/releases", self.api_base, self.repository)
    }
}

#[async_trait]
impl ReleaseHost for GithubReleaseClient {
    async fn create_release(
        &self,
        tag_name: &str,
        title: &str,
        body: &str,
        token: &Credential,
    ) -> Result<ReleaseHandle, PublishError> {
        let request = CreateReleaseRequest {
            tag_name,
            name: title,
            body,
            draft: false,
            prerelease: false,
        };

        let response = self
            .client
            .post(self.releases_url())
            .bearer_auth(token.expose())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        debug!(status = status.as_u16(), tag = %tag_name, "Release API responded");

        if !status.is_success() {
            return Err(classify_failure(status.as_u16(), tag_name, &text));
        }

        let created: CreateReleaseResponse = serde_json::from_str(&text)
            .map_err(|e| PublishError::transport(format!("unreadable release response: {e}")))?;

        let handle = ReleaseHandle::new(created.id.to_string(), tag_name);
        Ok(match created.html_url {
            Some(url) => handle.with_url(url),
            None => handle,
        })
    }
}

/// Maps a non-2xx release API response to an error kind.
fn classify_failure(status: u16, tag_name: &str, body: &str) -> PublishError {
    match status {
        401 | 403 => PublishError::auth(TARGET),
        422 => {
            let failure: ValidationFailure = serde_json::from_str(body).unwrap_or_default();
            if failure.errors.iter().any(|e| e.code == "already_exists") {
                PublishError::DuplicateRelease {
                    tag: tag_name.to_string(),
                }
            } else {
                PublishError::Rejected {
                    status,
                    message: failure.message,
                }
            }
        }
        _ => PublishError::Rejected {
            status,
            message: body.chars().take(512).collect(),
        },
    }
}
