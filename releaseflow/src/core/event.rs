//! The push event that triggers a release run.

use serde::{Deserialize, Serialize};

/// An incoming push, as seen by the pipeline.
///
/// Created by the triggering system and read-only for the whole run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseEvent {
    /// Fully-qualified reference, e.g. `refs/tags/v6.9.6`.
    #[serde(rename = "ref")]
    pub git_ref: String,

    /// Message of the first commit in the push; used as the release body.
    #[serde(default)]
    pub head_commit_message: String,
}

impl ReleaseEvent {
    /// Creates a new release event.
    #[must_use]
    pub fn new(git_ref: impl Into<String>, head_commit_message: impl Into<String>) -> Self {
        Self {
            git_ref: git_ref.into(),
            head_commit_message: head_commit_message.into(),
        }
    }

    /// Builds an event from a push webhook payload.
    ///
    /// The body comes from `commits[0].message`, then `head_commit.message`.
    /// A push without commits yields an empty body.
    #[must_use]
    pub fn from_push_payload(git_ref: impl Into<String>, payload: &serde_json::Value) -> Self {
        let message = payload
            .get("commits")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .or_else(|| payload.get("head_commit").and_then(|c| c.get("message")))
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default();

        Self::new(git_ref, message)
    }
}
