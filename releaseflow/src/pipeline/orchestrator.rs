//! The release run driver.

use super::ledger::StageLedger;
use crate::core::{ReleaseEvent, ReleaseHandle, RunResult, RunStatus, StageId};
use crate::credentials::ReleaseCredentials;
use crate::errors::PublishError;
use crate::events::{self, EventSink, NoOpEventSink};
use crate::publish::{HostedReleaseStage, IndexPublishStage};
use crate::trigger::TriggerRule;
use chrono::{DateTime, Utc};
use serde_json::json;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

/// Why a stage did not succeed.
#[derive(Debug)]
struct StageFailure {
    kind: String,
    message: String,
}

impl From<PublishError> for StageFailure {
    fn from(err: PublishError) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

/// Runs the release stages for one push event.
///
/// The hosted release is created first; the package index stage runs only
/// after it has succeeded. Credentials are bound here, once, and handed to
/// the stage that needs them.
pub struct ReleasePipeline {
    release: HostedReleaseStage,
    index: IndexPublishStage,
    credentials: ReleaseCredentials,
    source_tree: PathBuf,
    sink: Arc<dyn EventSink>,
}

impl ReleasePipeline {
    /// Creates a pipeline building from the current directory.
    #[must_use]
    pub fn new(
        release: HostedReleaseStage,
        index: IndexPublishStage,
        credentials: ReleaseCredentials,
    ) -> Self {
        Self {
            release,
            index,
            credentials,
            source_tree: PathBuf::from("."),
            sink: Arc::new(NoOpEventSink),
        }
    }

    /// Sets the checked-out source tree handed to the builder.
    #[must_use]
    pub fn with_source_tree(mut self, source_tree: impl Into<PathBuf>) -> Self {
        self.source_tree = source_tree.into();
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Evaluates the trigger and, on a match, runs both stages in order.
    ///
    /// A non-matching event returns [`RunStatus::Skipped`] without touching
    /// either remote target.
    pub async fn run(&self, event: &ReleaseEvent, rule: &TriggerRule) -> RunResult {
        let run_id = Uuid::new_v4();
        let span = info_span!("release_run", %run_id, git_ref = %event.git_ref);
        self.run_inner(run_id, event, rule).instrument(span).await
    }

    async fn run_inner(
        &self,
        run_id: Uuid,
        event: &ReleaseEvent,
        rule: &TriggerRule,
    ) -> RunResult {
        let started_at = Utc::now();
        self.sink
            .emit(
                events::RUN_STARTED,
                Some(json!({"run_id": run_id, "ref": event.git_ref})),
            )
            .await;

        let tag_name = match rule.tag_name(&event.git_ref) {
            Some(tag) if rule.matches(&event.git_ref) => tag,
            _ => {
                info!(pattern = rule.pattern(), "Reference does not match trigger; skipping");
                self.sink
                    .emit(
                        events::RUN_SKIPPED,
                        Some(json!({
                            "run_id": run_id,
                            "ref": event.git_ref,
                            "pattern": rule.pattern(),
                        })),
                    )
                    .await;
                return RunResult::skipped(run_id, started_at);
            }
        };

        let mut ledger = StageLedger::new();

        let release = self.release.publish(
            &event.git_ref,
            tag_name,
            &event.head_commit_message,
            &self.credentials.hosted_release,
        );
        let handle = match self.run_stage(&mut ledger, run_id, StageId::Release, release).await {
            Ok(handle) => handle,
            Err(failure) => {
                let failure = Some((StageId::Release, failure));
                return self
                    .finish(run_id, started_at, ledger, failure, None, Vec::new())
                    .await;
            }
        };

        let upload = self
            .index
            .publish(&self.source_tree, &self.credentials.package_index);
        match self.run_stage(&mut ledger, run_id, StageId::Pypi, upload).await {
            Ok(uploaded) => {
                self.finish(run_id, started_at, ledger, None, Some(handle), uploaded)
                    .await
            }
            Err(failure) => {
                self.finish(
                    run_id,
                    started_at,
                    ledger,
                    Some((StageId::Pypi, failure)),
                    Some(handle),
                    Vec::new(),
                )
                .await
            }
        }
    }

    /// Runs one stage through the ledger. `work` is not polled unless the
    /// ledger lets the stage start.
    async fn run_stage<T, Fut>(
        &self,
        ledger: &mut StageLedger,
        run_id: Uuid,
        id: StageId,
        work: Fut,
    ) -> Result<T, StageFailure>
    where
        Fut: Future<Output = Result<T, PublishError>>,
    {
        if let Err(e) = ledger.begin(id) {
            error!(stage = %id, error = %e, "Stage refused to start");
            return Err(StageFailure {
                kind: "gate".to_string(),
                message: e.to_string(),
            });
        }

        info!(stage = %id, "Stage started");
        self.sink
            .emit(events::STAGE_STARTED, Some(json!({"run_id": run_id, "stage": id})))
            .await;

        match work.await {
            Ok(value) => {
                ledger.succeed(id).map_err(|e| StageFailure {
                    kind: "gate".to_string(),
                    message: e.to_string(),
                })?;
                let duration_ms = ledger.get(id).duration_ms();
                info!(stage = %id, duration_ms, "Stage succeeded");
                self.sink
                    .emit(
                        events::STAGE_SUCCEEDED,
                        Some(json!({"run_id": run_id, "stage": id, "duration_ms": duration_ms})),
                    )
                    .await;
                Ok(value)
            }
            Err(err) => {
                let failure = StageFailure::from(err);
                ledger
                    .fail(id, &failure.kind, failure.message.clone())
                    .map_err(|e| StageFailure {
                        kind: "gate".to_string(),
                        message: e.to_string(),
                    })?;
                let duration_ms = ledger.get(id).duration_ms();
                error!(
                    stage = %id,
                    kind = %failure.kind,
                    error = %failure.message,
                    duration_ms,
                    "Stage failed"
                );
                self.sink
                    .emit(
                        events::STAGE_FAILED,
                        Some(json!({
                            "run_id": run_id,
                            "stage": id,
                            "kind": failure.kind,
                            "error": failure.message,
                            "duration_ms": duration_ms,
                        })),
                    )
                    .await;
                Err(failure)
            }
        }
    }

    async fn finish(
        &self,
        run_id: Uuid,
        started_at: DateTime<Utc>,
        ledger: StageLedger,
        failure: Option<(StageId, StageFailure)>,
        release: Option<ReleaseHandle>,
        uploaded: Vec<PathBuf>,
    ) -> RunResult {
        let (status, failed_stage, error) = match failure {
            None => (RunStatus::Succeeded, None, None),
            Some((stage, f)) => (RunStatus::Failed, Some(stage), Some(f.message)),
        };

        let result = RunResult {
            run_id,
            status,
            failed_stage,
            error,
            stages: ledger.into_records(),
            release,
            uploaded,
            started_at,
            finished_at: Utc::now(),
        };

        info!(
            status = %result.status,
            failed_stage = ?result.failed_stage,
            "Release run finished"
        );
        self.sink
            .emit(
                events::RUN_COMPLETED,
                Some(json!({
                    "run_id": run_id,
                    "status": result.status,
                    "failed_stage": result.failed_stage,
                })),
            )
            .await;
        result
    }
}

impl std::fmt::Debug for ReleasePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleasePipeline")
            .field("release", &self.release)
            .field("index", &self.index)
            .field("credentials", &self.credentials)
            .field("source_tree", &self.source_tree)
            .finish_non_exhaustive()
    }
}
