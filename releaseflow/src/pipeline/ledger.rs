//! Per-run stage state with enforced transitions.

use crate::core::{StageId, StageRecord, StageStatus};
use crate::errors::StageTransitionError;
use chrono::Utc;

/// Tracks the status of every stage in one run.
///
/// Allowed moves are `pending -> running` (only when the dependency has
/// succeeded), `running -> succeeded` and `running -> failed`.
#[derive(Debug, Clone)]
pub struct StageLedger {
    records: Vec<StageRecord>,
}

impl Default for StageLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl StageLedger {
    /// Creates a ledger with every stage pending.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: StageId::ALL.into_iter().map(StageRecord::pending).collect(),
        }
    }

    fn position(id: StageId) -> usize {
        match id {
            StageId::Release => 0,
            StageId::Pypi => 1,
        }
    }

    /// Returns the record for a stage.
    #[must_use]
    pub fn get(&self, id: StageId) -> &StageRecord {
        &self.records[Self::position(id)]
    }

    /// Returns the status of a stage.
    #[must_use]
    pub fn status(&self, id: StageId) -> StageStatus {
        self.get(id).status
    }

    /// Moves a stage to `running`.
    ///
    /// # Errors
    ///
    /// Refused unless the stage is pending and its dependency succeeded.
    pub fn begin(&mut self, id: StageId) -> Result<(), StageTransitionError> {
        let current = self.status(id);
        if current != StageStatus::Pending {
            return Err(refuse(id, current, StageStatus::Running, "stage already started"));
        }

        if let Some(dep) = id.dependency() {
            let dep_status = self.status(dep);
            if dep_status != StageStatus::Succeeded {
                return Err(refuse(
                    id,
                    current,
                    StageStatus::Running,
                    format!("dependency '{dep}' is {dep_status}"),
                ));
            }
        }

        let record = &mut self.records[Self::position(id)];
        record.status = StageStatus::Running;
        record.started_at = Some(Utc::now());
        Ok(())
    }

    /// Moves a running stage to `succeeded`.
    ///
    /// # Errors
    ///
    /// Refused unless the stage is running.
    pub fn succeed(&mut self, id: StageId) -> Result<(), StageTransitionError> {
        self.finish(id, StageStatus::Succeeded, None)
    }

    /// Moves a running stage to `failed`, recording the error.
    ///
    /// # Errors
    ///
    /// Refused unless the stage is running.
    pub fn fail(
        &mut self,
        id: StageId,
        kind: &str,
        message: impl Into<String>,
    ) -> Result<(), StageTransitionError> {
        self.finish(id, StageStatus::Failed, Some((kind.to_string(), message.into())))
    }

    fn finish(
        &mut self,
        id: StageId,
        to: StageStatus,
        error: Option<(String, String)>,
    ) -> Result<(), StageTransitionError> {
        let current = self.status(id);
        if current != StageStatus::Running {
            let reason = if current.is_terminal() {
                "status is terminal"
            } else {
                "stage is not running"
            };
            return Err(refuse(id, current, to, reason));
        }

        let record = &mut self.records[Self::position(id)];
        record.status = to;
        record.finished_at = Some(Utc::now());
        if let Some((kind, message)) = error {
            record.error_kind = Some(kind);
            record.error = Some(message);
        }
        Ok(())
    }

    /// Consumes the ledger, returning records in execution order.
    #[must_use]
    pub fn into_records(self) -> Vec<StageRecord> {
        self.records
    }
}

fn refuse(
    stage: StageId,
    from: StageStatus,
    to: StageStatus,
    reason: impl Into<String>,
) -> StageTransitionError {
    StageTransitionError {
        stage,
        from,
        to,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_ledger_is_pending() {
        let ledger = StageLedger::new();
        assert_eq!(ledger.status(StageId::Release), StageStatus::Pending);
        assert_eq!(ledger.status(StageId::Pypi), StageStatus::Pending);
    }

    #[test]
    fn test_pypi_cannot_start_before_release() {
        let mut ledger = StageLedger::new();
        let err = ledger.begin(StageId::Pypi).unwrap_err();
        assert!(err.reason.contains("release"));
        assert_eq!(ledger.status(StageId::Pypi), StageStatus::Pending);
    }

    #[test]
    fn test_pypi_cannot_start_while_release_running() {
        let mut ledger = StageLedger::new();
        ledger.begin(StageId::Release).unwrap();
        assert!(ledger.begin(StageId::Pypi).is_err());
    }

    #[test]
    fn test_pypi_cannot_start_after_release_failed() {
        let mut ledger = StageLedger::new();
        ledger.begin(StageId::Release).unwrap();
        ledger.fail(StageId::Release, "auth_failure", "bad token").unwrap();

        assert!(ledger.begin(StageId::Pypi).is_err());
        let record = ledger.get(StageId::Release);
        assert_eq!(record.error_kind.as_deref(), Some("auth_failure"));
        assert!(record.finished_at.is_some());
    }

    #[test]
    fn test_full_sequence() {
        let mut ledger = StageLedger::new();
        ledger.begin(StageId::Release).unwrap();
        ledger.succeed(StageId::Release).unwrap();
        ledger.begin(StageId::Pypi).unwrap();
        ledger.succeed(StageId::Pypi).unwrap();

        let records = ledger.into_records();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.status == StageStatus::Succeeded));
        assert_eq!(records[0].id, StageId::Release);
    }

    #[test]
    fn test_terminal_status_cannot_change() {
        let mut ledger = StageLedger::new();
        ledger.begin(StageId::Release).unwrap();
        ledger.succeed(StageId::Release).unwrap();

        assert!(ledger.fail(StageId::Release, "x", "late").is_err());
        assert!(ledger.begin(StageId::Release).is_err());
        assert_eq!(ledger.status(StageId::Release), StageStatus::Succeeded);
    }

    #[test]
    fn test_cannot_finish_pending_stage() {
        let mut ledger = StageLedger::new();
        let err = ledger.succeed(StageId::Release).unwrap_err();
        assert_eq!(err.from, StageStatus::Pending);
        assert_eq!(err.to, StageStatus::Succeeded);
    }
}
