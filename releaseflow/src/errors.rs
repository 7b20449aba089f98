//! Error types for the release pipeline.
//!
//! Stage-level failures are split into [`PublishError`] (remote targets) and
//! [`BuildError`] (packaging toolchain). None of them are retried within a
//! run; the orchestrator reports them together with the failing stage.

use crate::core::{StageId, StageStatus};
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for releaseflow operations outside a stage.
#[derive(Debug, Error)]
pub enum ReleaseflowError {
    /// Invalid or missing configuration.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// A trigger rule could not be constructed.
    #[error("{0}")]
    Trigger(#[from] TriggerRuleError),

    /// A publish stage failed.
    #[error("{0}")]
    Publish(#[from] PublishError),
}

/// Errors surfaced by the two publish stages.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The remote service rejected the credential.
    #[error("Authentication rejected by {target}")]
    AuthFailure {
        /// Human-readable name of the remote target.
        target: String,
    },

    /// A hosted release for this tag already exists.
    #[error("Release for tag '{tag}' already exists")]
    DuplicateRelease {
        /// The tag name.
        tag: String,
    },

    /// The index already holds this file/version.
    #[error("Package index rejected duplicate upload of {}", .path.display())]
    DuplicateVersion {
        /// The artifact that was rejected.
        path: PathBuf,
    },

    /// Network-level failure talking to the remote service.
    #[error("Transport error: {0}")]
    TransportError(String),

    /// The remote refused the request for a reason we do not classify.
    #[error("Remote rejected request with status {status}: {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body or summary.
        message: String,
    },

    /// An artifact could not be read or its file name is not a distribution.
    #[error("Invalid artifact {}: {reason}", .path.display())]
    InvalidArtifact {
        /// The artifact path.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },

    /// Building the artifacts failed before anything was uploaded.
    #[error("Build step failed: {0}")]
    BuildStepFailed(#[from] BuildError),
}

impl PublishError {
    /// Creates an auth failure for the given target.
    #[must_use]
    pub fn auth(target: impl Into<String>) -> Self {
        Self::AuthFailure {
            target: target.into(),
        }
    }

    /// Creates an invalid artifact error.
    #[must_use]
    pub fn invalid_artifact(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidArtifact {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a transport error.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::TransportError(message.into())
    }

    /// Stable snake_case name of the error kind, used in events and reports.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AuthFailure { .. } => "auth_failure",
            Self::DuplicateRelease { .. } => "duplicate_release",
            Self::DuplicateVersion { .. } => "duplicate_version",
            Self::TransportError(_) => "transport_error",
            Self::Rejected { .. } => "rejected",
            Self::InvalidArtifact { .. } => "invalid_artifact",
            Self::BuildStepFailed(_) => "build_step_failed",
        }
    }
}

impl From<reqwest::Error> for PublishError {
    fn from(err: reqwest::Error) -> Self {
        Self::TransportError(err.to_string())
    }
}

/// Errors raised by the artifact builder.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The packaging toolchain (or one of its modules) is not installed.
    #[error("Packaging toolchain missing: {tool}")]
    ToolchainMissing {
        /// The missing program or module.
        tool: String,
    },

    /// The toolchain exited with a non-zero status.
    #[error(
        "Build failed (exit code {}): {diagnostics}",
        .code.map_or_else(|| "signal".to_string(), |c| c.to_string())
    )]
    BuildFailure {
        /// Exit code, `None` when killed by a signal.
        code: Option<i32>,
        /// Captured diagnostic output.
        diagnostics: String,
    },

    /// The build reported success but an artifact is absent or empty.
    #[error("Missing {kind} artifact: {reason}")]
    MissingArtifact {
        /// "sdist" or "wheel".
        kind: &'static str,
        /// What exactly was wrong.
        reason: String,
    },

    /// The sdist and wheel do not describe the same release.
    #[error("Inconsistent artifacts: {reason}")]
    InconsistentArtifacts {
        /// Which fields disagree.
        reason: String,
    },

    /// IO error while running the toolchain or inspecting the output.
    #[error("IO error during build: {0}")]
    Io(#[from] std::io::Error),
}

impl BuildError {
    /// Creates a missing artifact error.
    #[must_use]
    pub fn missing(kind: &'static str, reason: impl Into<String>) -> Self {
        Self::MissingArtifact {
            kind,
            reason: reason.into(),
        }
    }
}

/// Error raised when a trigger rule is malformed.
#[derive(Debug, Clone, Error)]
pub enum TriggerRuleError {
    /// The glob pattern is empty.
    #[error("Trigger pattern cannot be empty")]
    EmptyPattern,

    /// The glob pattern could not be compiled.
    #[error("Invalid trigger pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// Compilation failure.
        reason: String,
    },
}

/// Error raised when a stage is moved through an illegal state change.
#[derive(Debug, Clone, Error)]
#[error("Stage '{stage}' cannot move from {from} to {to}: {reason}")]
pub struct StageTransitionError {
    /// The stage being moved.
    pub stage: StageId,
    /// Its current status.
    pub from: StageStatus,
    /// The requested status.
    pub to: StageStatus,
    /// Why the transition was refused.
    pub reason: String,
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required setting is not present.
    #[error("Missing required setting: {0}")]
    Missing(String),

    /// A setting has an unusable value.
    #[error("Invalid value for {name}: {reason}")]
    Invalid {
        /// The setting name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl ConfigError {
    /// Creates an invalid-value error.
    #[must_use]
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
