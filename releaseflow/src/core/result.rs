//! Per-stage records and the overall run result.

use super::{RunStatus, StageId, StageStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Identifies a hosted release created by the release stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseHandle {
    /// Remote identifier of the release.
    pub id: String,
    /// The tag the release is attached to.
    pub tag_name: String,
    /// Browser URL, when the remote returns one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ReleaseHandle {
    /// Creates a new release handle.
    #[must_use]
    pub fn new(id: impl Into<String>, tag_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tag_name: tag_name.into(),
            url: None,
        }
    }

    /// Sets the browser URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// State of one stage within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRecord {
    /// Stage identity.
    pub id: StageId,
    /// Current status.
    pub status: StageStatus,
    /// Stage that must succeed first.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<StageId>,
    /// When the stage started running.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// When the stage reached a terminal status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Error message if failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Error kind if failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
}

impl StageRecord {
    /// Creates a pending record for the stage.
    #[must_use]
    pub fn pending(id: StageId) -> Self {
        Self {
            id,
            status: StageStatus::Pending,
            depends_on: id.dependency(),
            started_at: None,
            finished_at: None,
            error: None,
            error_kind: None,
        }
    }

    /// Returns the duration in milliseconds once the stage has finished.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn duration_ms(&self) -> Option<f64> {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds() as f64),
            _ => None,
        }
    }
}

/// Outcome of a single pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Unique ID of the run.
    pub run_id: Uuid,
    /// Overall status.
    pub status: RunStatus,
    /// The stage that failed, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<StageId>,
    /// Message of the error that failed the run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Final stage records, in execution order.
    #[serde(default)]
    pub stages: Vec<StageRecord>,
    /// Hosted release created by this run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release: Option<ReleaseHandle>,
    /// Artifacts uploaded to the index, in upload order.
    #[serde(default)]
    pub uploaded: Vec<PathBuf>,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
}

impl RunResult {
    /// Creates a skipped result.
    #[must_use]
    pub fn skipped(run_id: Uuid, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id,
            status: RunStatus::Skipped,
            failed_stage: None,
            error: None,
            stages: StageId::ALL.into_iter().map(StageRecord::pending).collect(),
            release: None,
            uploaded: Vec::new(),
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// Returns the record for a stage.
    #[must_use]
    pub fn stage(&self, id: StageId) -> Option<&StageRecord> {
        self.stages.iter().find(|s| s.id == id)
    }

    /// Process exit code for the run.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        self.status.exit_code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_pending_record_carries_dependency() {
        let record = StageRecord::pending(StageId::Pypi);
        assert_eq!(record.status, StageStatus::Pending);
        assert_eq!(record.depends_on, Some(StageId::Release));
        assert!(record.duration_ms().is_none());
    }

    #[test]
    fn test_record_duration() {
        let start = Utc::now();
        let mut record = StageRecord::pending(StageId::Release);
        record.started_at = Some(start);
        record.finished_at = Some(start + Duration::milliseconds(250));
        assert_eq!(record.duration_ms(), Some(250.0));
    }

    #[test]
    fn test_skipped_result_serialization() {
        let result = RunResult::skipped(Uuid::new_v4(), Utc::now());
        assert_eq!(result.exit_code(), 0);

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["status"], "skipped");
        assert!(value.get("failed_stage").is_none());
        assert!(value.get("release").is_none());
    }

    #[test]
    fn test_release_handle_url() {
        let handle = ReleaseHandle::new("rel_123", "v2.0.0").with_url("https://example.invalid/r");
        assert_eq!(handle.url.as_deref(), Some("https://example.invalid/r"));
    }
}
