//! Stage identity and status enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The two stages of a release run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    /// Create the hosted release on the source-hosting platform.
    Release,
    /// Build the distributions and upload them to the package index.
    Pypi,
}

impl StageId {
    /// Stages in execution order.
    pub const ALL: [Self; 2] = [Self::Release, Self::Pypi];

    /// The stage that must have succeeded before this one may start.
    #[must_use]
    pub fn dependency(self) -> Option<Self> {
        match self {
            Self::Release => None,
            Self::Pypi => Some(Self::Release),
        }
    }

    /// Returns the stage name as used in results and events.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Release => "release",
            Self::Pypi => "pypi",
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The execution status of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// Stage has not started.
    #[default]
    Pending,
    /// Stage is currently running.
    Running,
    /// Stage completed successfully.
    Succeeded,
    /// Stage failed.
    Failed,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl StageStatus {
    /// Returns true if the status can no longer change within the run.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// Overall outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// The event did not match the trigger rule; nothing ran.
    Skipped,
    /// Both stages succeeded.
    Succeeded,
    /// A stage failed.
    Failed,
}

impl RunStatus {
    /// Process exit code for automation wrappers.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Skipped | Self::Succeeded => 0,
            Self::Failed => 1,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skipped => write!(f, "skipped"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_id_display() {
        assert_eq!(StageId::Release.to_string(), "release");
        assert_eq!(StageId::Pypi.to_string(), "pypi");
    }

    #[test]
    fn test_stage_dependencies() {
        assert_eq!(StageId::Release.dependency(), None);
        assert_eq!(StageId::Pypi.dependency(), Some(StageId::Release));
    }

    #[test]
    fn test_stage_status_is_terminal() {
        assert!(StageStatus::Succeeded.is_terminal());
        assert!(StageStatus::Failed.is_terminal());
        assert!(!StageStatus::Pending.is_terminal());
        assert!(!StageStatus::Running.is_terminal());
    }

    #[test]
    fn test_run_status_exit_code() {
        assert_eq!(RunStatus::Skipped.exit_code(), 0);
        assert_eq!(RunStatus::Succeeded.exit_code(), 0);
        assert_eq!(RunStatus::Failed.exit_code(), 1);
    }

    #[test]
    fn test_status_serialize() {
        let json = serde_json::to_string(&StageStatus::Succeeded).unwrap();
        assert_eq!(json, r#""succeeded""#);

        let status: RunStatus = serde_json::from_str(r#""skipped""#).unwrap();
        assert_eq!(status, RunStatus::Skipped);

        assert_eq!(serde_json::to_string(&StageId::Pypi).unwrap(), r#""pypi""#);
    }
}
