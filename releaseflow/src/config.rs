//! Pipeline configuration.
//!
//! Values come from serde (any format the caller deserializes) or from an
//! environment map, where `RELEASEFLOW_*` variables override the defaults.

use crate::build::ToolchainBuilder;
use crate::credentials::ReleaseCredentials;
use crate::errors::{ConfigError, ReleaseflowError};
use crate::pipeline::ReleasePipeline;
use crate::publish::{
    GithubReleaseClient, HostedReleaseStage, IndexPublishStage, NotesPolicy, PypiUploadClient,
    DEFAULT_TITLE_TEMPLATE, DEFAULT_UPLOAD_URL,
};
use crate::trigger::{TriggerRule, DEFAULT_NAMESPACE, DEFAULT_PATTERN};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const ENV_PREFIX: &str = "RELEASEFLOW_";

/// Settings for one release pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// `owner/repo` on the hosting platform.
    pub repository: String,
    /// REST API root of the hosting platform.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Package index upload endpoint.
    #[serde(default = "default_upload_url")]
    pub upload_url: String,
    /// Reference namespace that carries tags.
    #[serde(default = "default_tag_namespace")]
    pub tag_namespace: String,
    /// Glob the tag name must match.
    #[serde(default = "default_tag_pattern")]
    pub tag_pattern: String,
    /// Checked-out source tree to build.
    #[serde(default = "default_source_tree")]
    pub source_tree: PathBuf,
    /// Where the toolchain writes distributions.
    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,
    /// Packaging program; the default toolchain when unset.
    #[serde(default)]
    pub build_program: Option<String>,
    /// Arguments for `build_program`.
    #[serde(default)]
    pub build_args: Vec<String>,
    /// How the commit message becomes the release body.
    #[serde(default)]
    pub notes_policy: NotesPolicy,
    /// Release title template.
    #[serde(default = "default_title_template")]
    pub title_template: String,
    /// HTTP timeout for both remote targets.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// User agent sent to both remote targets.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_api_base_url() -> String {
    "https://api.github.com".to_string()
}

fn default_upload_url() -> String {
    DEFAULT_UPLOAD_URL.to_string()
}

fn default_tag_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn default_tag_pattern() -> String {
    DEFAULT_PATTERN.to_string()
}

fn default_source_tree() -> PathBuf {
    PathBuf::from(".")
}

fn default_out_dir() -> PathBuf {
    PathBuf::from("dist")
}

fn default_title_template() -> String {
    DEFAULT_TITLE_TEMPLATE.to_string()
}

fn default_timeout_seconds() -> u64 {
    60
}

fn default_user_agent() -> String {
    format!("releaseflow/{}", env!("CARGO_PKG_VERSION"))
}

impl PipelineConfig {
    /// Creates a configuration with defaults for `owner/repo`.
    #[must_use]
    pub fn new(repository: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            api_base_url: default_api_base_url(),
            upload_url: default_upload_url(),
            tag_namespace: default_tag_namespace(),
            tag_pattern: default_tag_pattern(),
            source_tree: default_source_tree(),
            out_dir: default_out_dir(),
            build_program: None,
            build_args: Vec::new(),
            notes_policy: NotesPolicy::default(),
            title_template: default_title_template(),
            timeout_seconds: default_timeout_seconds(),
            user_agent: default_user_agent(),
        }
    }

    /// Reads configuration from environment-style variables.
    ///
    /// The repository comes from `RELEASEFLOW_REPOSITORY`, falling back to
    /// `GITHUB_REPOSITORY`; the API root falls back to `GITHUB_API_URL`.
    /// `RELEASEFLOW_BUILD_ARGS` is split on whitespace.
    ///
    /// # Errors
    ///
    /// `Missing` without a repository, `Invalid` for unparsable values.
    pub fn from_env_map(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            vars.get(&format!("{ENV_PREFIX}{key}"))
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
        };

        let repository = get("REPOSITORY")
            .or_else(|| vars.get("GITHUB_REPOSITORY").map(String::as_str))
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ConfigError::Missing("GITHUB_REPOSITORY".to_string()))?;

        let mut config = Self::new(repository);

        if let Some(url) =
            get("API_BASE_URL").or_else(|| vars.get("GITHUB_API_URL").map(String::as_str))
        {
            config.api_base_url = url.to_string();
        }
        if let Some(url) = get("UPLOAD_URL") {
            config.upload_url = url.to_string();
        }
        if let Some(ns) = get("TAG_NAMESPACE") {
            config.tag_namespace = ns.to_string();
        }
        if let Some(pattern) = get("TAG_PATTERN") {
            config.tag_pattern = pattern.to_string();
        }
        if let Some(tree) = get("SOURCE_TREE") {
            config.source_tree = PathBuf::from(tree);
        }
        if let Some(dir) = get("OUT_DIR") {
            config.out_dir = PathBuf::from(dir);
        }
        if let Some(program) = get("BUILD_PROGRAM") {
            config.build_program = Some(program.to_string());
        }
        if let Some(args) = get("BUILD_ARGS") {
            config.build_args = args.split_whitespace().map(str::to_string).collect();
        }
        if let Some(policy) = get("NOTES_POLICY") {
            config.notes_policy = parse_notes_policy(policy)?;
        }
        if let Some(template) = get("TITLE_TEMPLATE") {
            config.title_template = template.to_string();
        }
        if let Some(raw) = get("TIMEOUT_SECONDS") {
            config.timeout_seconds = raw.parse().map_err(|e| {
                ConfigError::invalid(format!("{ENV_PREFIX}TIMEOUT_SECONDS"), format!("{e}"))
            })?;
        }
        if let Some(agent) = get("USER_AGENT") {
            config.user_agent = agent.to_string();
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks values that serde cannot.
    ///
    /// # Errors
    ///
    /// Returns the first unusable setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.repository.contains('/') {
            return Err(ConfigError::invalid("repository", "expected owner/repo"));
        }
        if self.timeout_seconds == 0 {
            return Err(ConfigError::invalid("timeout_seconds", "must be positive"));
        }
        if self.build_program.is_none() && !self.build_args.is_empty() {
            return Err(ConfigError::invalid(
                "build_args",
                "set only together with build_program",
            ));
        }
        Ok(())
    }

    /// Sets the tag pattern.
    #[must_use]
    pub fn with_tag_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.tag_pattern = pattern.into();
        self
    }

    /// Sets the source tree.
    #[must_use]
    pub fn with_source_tree(mut self, tree: impl Into<PathBuf>) -> Self {
        self.source_tree = tree.into();
        self
    }

    /// Sets the notes policy.
    #[must_use]
    pub fn with_notes_policy(mut self, policy: NotesPolicy) -> Self {
        self.notes_policy = policy;
        self
    }

    /// HTTP timeout as a `Duration`.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Compiles the trigger rule.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty or malformed pattern.
    pub fn trigger_rule(&self) -> Result<TriggerRule, ReleaseflowError> {
        Ok(TriggerRule::new(
            self.tag_namespace.clone(),
            self.tag_pattern.clone(),
        )?)
    }

    /// The artifact builder these settings describe.
    #[must_use]
    pub fn toolchain(&self) -> ToolchainBuilder {
        let builder = ToolchainBuilder::new(self.out_dir.clone());
        match &self.build_program {
            Some(program) => builder.with_command(program.clone(), self.build_args.clone()),
            None => builder,
        }
    }

    /// Wires the remote clients, the toolchain and the credentials into a
    /// pipeline.
    ///
    /// # Errors
    ///
    /// Fails on invalid settings or if an HTTP client cannot be built.
    pub fn build_pipeline(
        &self,
        credentials: ReleaseCredentials,
    ) -> Result<ReleasePipeline, ReleaseflowError> {
        self.validate()?;

        let host = GithubReleaseClient::new(
            self.repository.clone(),
            self.api_base_url.clone(),
            self.timeout(),
            &self.user_agent,
        )?;
        let index =
            PypiUploadClient::new(self.upload_url.clone(), self.timeout(), &self.user_agent)?;

        let release = HostedReleaseStage::new(Arc::new(host))
            .with_notes_policy(self.notes_policy)
            .with_title_template(self.title_template.clone());
        let publish = IndexPublishStage::new(Arc::new(self.toolchain()), Arc::new(index));

        Ok(ReleasePipeline::new(release, publish, credentials)
            .with_source_tree(self.source_tree.clone()))
    }
}

fn parse_notes_policy(raw: &str) -> Result<NotesPolicy, ConfigError> {
    match raw.to_ascii_lowercase().replace('-', "_").as_str() {
        "verbatim" => Ok(NotesPolicy::Verbatim),
        "escape_markdown" => Ok(NotesPolicy::EscapeMarkdown),
        other => Err(ConfigError::invalid(
            format!("{ENV_PREFIX}NOTES_POLICY"),
            format!("unknown policy '{other}'"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use crate::errors::TriggerRuleError;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::new("beartype/beartype");
        assert_eq!(config.api_base_url, "https://api.github.com");
        assert_eq!(config.upload_url, "https://upload.pypi.org/legacy/");
        assert_eq!(config.tag_namespace, "refs/tags");
        assert_eq!(config.tag_pattern, "v*");
        assert_eq!(config.out_dir, PathBuf::from("dist"));
        assert_eq!(config.title_template, "{ref}");
        assert_eq!(config.timeout(), Duration::from_secs(60));
        assert_eq!(config.notes_policy, NotesPolicy::Verbatim);
        assert!(config.user_agent.starts_with("releaseflow/"));
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let raw = r#"{
            "repository": "o/r",
            "tag_pattern": "release-*",
            "notes_policy": "escape_markdown"
        }"#;
        let config: PipelineConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.tag_pattern, "release-*");
        assert_eq!(config.notes_policy, NotesPolicy::EscapeMarkdown);
        assert_eq!(config.timeout_seconds, 60);
        assert_eq!(config.source_tree, PathBuf::from("."));
    }

    #[test]
    fn test_from_env_requires_repository() {
        let err = PipelineConfig::from_env_map(&HashMap::new()).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(ref name) if name == "GITHUB_REPOSITORY"));
    }

    #[test]
    fn test_from_env_uses_github_variables() {
        let config = PipelineConfig::from_env_map(&env(&[
            ("GITHUB_REPOSITORY", "beartype/beartype"),
            ("GITHUB_API_URL", "https://ghe.example.com/api/v3"),
        ]))
        .unwrap();
        assert_eq!(config.repository, "beartype/beartype");
        assert_eq!(config.api_base_url, "https://ghe.example.com/api/v3");
    }

    #[test]
    fn test_from_env_overrides() {
        let config = PipelineConfig::from_env_map(&env(&[
            ("GITHUB_REPOSITORY", "a/b"),
            ("RELEASEFLOW_REPOSITORY", "c/d"),
            ("RELEASEFLOW_TAG_PATTERN", "v[0-9]*"),
            ("RELEASEFLOW_BUILD_PROGRAM", "uv"),
            ("RELEASEFLOW_BUILD_ARGS", "build  --out-dir dist"),
            ("RELEASEFLOW_NOTES_POLICY", "escape-markdown"),
            ("RELEASEFLOW_TIMEOUT_SECONDS", "15"),
        ]))
        .unwrap();

        assert_eq!(config.repository, "c/d");
        assert_eq!(config.tag_pattern, "v[0-9]*");
        assert_eq!(config.build_program.as_deref(), Some("uv"));
        assert_eq!(config.build_args, vec!["build", "--out-dir", "dist"]);
        assert_eq!(config.notes_policy, NotesPolicy::EscapeMarkdown);
        assert_eq!(config.timeout_seconds, 15);

        let toolchain = config.toolchain();
        assert_eq!(toolchain.program(), "uv");
    }

    #[test]
    fn test_blank_override_is_ignored() {
        let config = PipelineConfig::from_env_map(&env(&[
            ("GITHUB_REPOSITORY", "a/b"),
            ("RELEASEFLOW_TAG_PATTERN", "  "),
        ]))
        .unwrap();
        assert_eq!(config.tag_pattern, "v*");
    }

    #[test]
    fn test_invalid_values() {
        let bad_timeout = PipelineConfig::from_env_map(&env(&[
            ("GITHUB_REPOSITORY", "a/b"),
            ("RELEASEFLOW_TIMEOUT_SECONDS", "soon"),
        ]));
        assert!(matches!(bad_timeout, Err(ConfigError::Invalid { .. })));

        let bad_policy = PipelineConfig::from_env_map(&env(&[
            ("GITHUB_REPOSITORY", "a/b"),
            ("RELEASEFLOW_NOTES_POLICY", "html"),
        ]));
        assert!(matches!(bad_policy, Err(ConfigError::Invalid { .. })));

        let bad_repo = PipelineConfig::from_env_map(&env(&[("GITHUB_REPOSITORY", "nope")]));
        assert!(matches!(bad_repo, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_args_without_program_rejected() {
        let mut config = PipelineConfig::new("a/b");
        config.build_args = vec!["x".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_trigger_rule() {
        let rule = PipelineConfig::new("a/b").trigger_rule().unwrap();
        assert!(rule.matches("refs/tags/v1.0.0"));
        assert!(!rule.matches("refs/heads/v1.0.0"));

        let empty = PipelineConfig::new("a/b").with_tag_pattern("").trigger_rule();
        assert!(matches!(
            empty,
            Err(ReleaseflowError::Trigger(TriggerRuleError::EmptyPattern))
        ));
    }

    #[test]
    fn test_build_pipeline() {
        let pipeline = PipelineConfig::new("a/b")
            .with_source_tree("/work/src")
            .build_pipeline(ReleaseCredentials::new("ghp_secret", "pypi-secret"))
            .unwrap();
        let debug = format!("{pipeline:?}");
        assert!(debug.contains("/work/src"));
        assert!(!debug.contains("ghp_secret"));
        assert!(!debug.contains("pypi-secret"));
    }
}
