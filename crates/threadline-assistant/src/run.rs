use crate::api::{AssistantApi, RunStatus};
use crate::config::PollPolicy;
use std::sync::Arc;
use threadline_core::{DiagnosticLog, ThreadlineError, ThreadlineResult};
use tracing::{debug, info, warn};

/// Lifecycle of a run while it is being driven by [`RunOrchestrator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    /// No run has been started yet.
    NotStarted,
    /// Run started; `attempt` status queries have returned a non-terminal status.
    Polling {
        /// Status queries performed so far.
        attempt: u32,
    },
    /// The remote reported `completed`.
    Completed,
    /// The remote reported `failed`.
    Failed,
    /// The polling budget ran out before a terminal status.
    TimedOut,
}

impl RunPhase {
    /// Terminal phases end the polling loop.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunPhase::Completed | RunPhase::Failed | RunPhase::TimedOut)
    }

    /// Status queries performed to reach this phase, when still polling.
    pub fn attempts(&self) -> u32 {
        match self {
            RunPhase::Polling { attempt } => *attempt,
            _ => 0,
        }
    }

    /// Transition once the remote has accepted the run.
    pub fn started(self) -> RunPhase {
        match self {
            RunPhase::NotStarted => RunPhase::Polling { attempt: 0 },
            other => other,
        }
    }

    /// Transition after one more status query returned `status`.
    ///
    /// Terminal phases absorb every further observation.
    pub fn observe(self, status: &RunStatus, max_attempts: u32) -> RunPhase {
        if self.is_terminal() {
            return self;
        }
        let attempt = self.attempts() + 1;
        match status {
            RunStatus::Completed => RunPhase::Completed,
            RunStatus::Failed => RunPhase::Failed,
            _ if attempt >= max_attempts => RunPhase::TimedOut,
            _ => RunPhase::Polling { attempt },
        }
    }
}

/// Outcome of a run that reached `completed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Remote run id.
    pub run_id: String,
    /// Status queries it took, including the one that saw `completed`.
    pub attempts: u32,
}

/// Drives one run through bounded, fixed-interval polling.
///
/// Status checks are strictly sequential. A `failed` status or any remote
/// error ends the loop at once; nothing is retried.
pub struct RunOrchestrator {
    api: Arc<dyn AssistantApi>,
    assistant_id: String,
    policy: PollPolicy,
    diagnostics: Arc<DiagnosticLog>,
}

impl RunOrchestrator {
    /// Orchestrator for runs of `assistant_id`.
    pub fn new(
        api: Arc<dyn AssistantApi>,
        assistant_id: impl Into<String>,
        policy: PollPolicy,
        diagnostics: Arc<DiagnosticLog>,
    ) -> Self {
        Self {
            api,
            assistant_id: assistant_id.into(),
            policy,
            diagnostics,
        }
    }

    /// Starts a run on `thread_id` and waits for it to finish.
    ///
    /// Returns `RunFailed` with the remote payload, `RunTimedOut` after
    /// `max_attempts` non-terminal snapshots, or the remote error that aborted
    /// the loop.
    pub async fn execute_run(&self, thread_id: &str) -> ThreadlineResult<RunReport> {
        let mut phase = RunPhase::NotStarted;
        let run_id = self.api.start_run(thread_id, &self.assistant_id).await?;
        phase = phase.started();
        info!(thread_id, run_id = %run_id, "Run started");

        let max_attempts = self.policy.max_attempts;
        let mut attempts = 0;

        while !phase.is_terminal() {
            tokio::time::sleep(self.policy.interval()).await;

            let snapshot = self.api.get_run_status(thread_id, &run_id).await?;
            attempts += 1;
            self.diagnostics
                .record(format!("Run status: {}", snapshot.raw))
                .await;

            phase = phase.observe(&snapshot.status, max_attempts);
            debug!(
                thread_id,
                run_id = %run_id,
                attempt = attempts,
                status = snapshot.status.as_str(),
                "Run status"
            );

            if phase == RunPhase::Failed {
                warn!(thread_id, run_id = %run_id, attempt = attempts, "Run failed");
                self.diagnostics
                    .record(format!("Run failed: {}", snapshot.raw))
                    .await;
                return Err(ThreadlineError::RunFailed(snapshot.raw.to_string()));
            }
        }

        if phase == RunPhase::TimedOut {
            warn!(thread_id, run_id = %run_id, attempts, "Run did not complete in time");
            self.diagnostics
                .record(format!("Run did not complete after {attempts} attempts"))
                .await;
            return Err(ThreadlineError::RunTimedOut { attempts });
        }

        info!(thread_id, run_id = %run_id, attempts, "Run completed");
        Ok(RunReport { run_id, attempts })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::api::{MessageReceipt, RunSnapshot};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use threadline_core::{Message, Role};

    /// Replays a fixed sequence of status results and counts queries.
    struct ScriptedApi {
        script: Mutex<VecDeque<ThreadlineResult<&'static str>>>,
        status_calls: Mutex<u32>,
    }

    impl ScriptedApi {
        fn new(script: Vec<ThreadlineResult<&'static str>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                status_calls: Mutex::new(0),
            })
        }

        fn statuses(statuses: &[&'static str]) -> Arc<Self> {
            Self::new(statuses.iter().map(|s| Ok(*s)).collect())
        }

        fn status_calls(&self) -> u32 {
            *self.status_calls.lock()
        }
    }

    #[async_trait]
    impl AssistantApi for ScriptedApi {
        async fn create_conversation(&self, _initial_message: &str) -> ThreadlineResult<String> {
            Ok("thread_1".into())
        }

        async fn append_message(
            &self,
            _thread_id: &str,
            _role: Role,
            _content: &str,
        ) -> ThreadlineResult<MessageReceipt> {
            Ok(MessageReceipt {
                id: "msg_1".into(),
                raw: serde_json::json!({"id": "msg_1"}),
            })
        }

        async fn start_run(&self, _thread_id: &str, assistant_id: &str) -> ThreadlineResult<String> {
            assert_eq!(assistant_id, "asst_test");
            Ok("run_1".into())
        }

        async fn get_run_status(&self, _thread_id: &str, run_id: &str) -> ThreadlineResult<RunSnapshot> {
            *self.status_calls.lock() += 1;
            let next = self
                .script
                .lock()
                .pop_front()
                .unwrap_or(Ok("in_progress"))?;
            Ok(RunSnapshot {
                status: RunStatus::from_wire(next),
                raw: serde_json::json!({"id": run_id, "status": next}),
            })
        }

        async fn list_messages(&self, _thread_id: &str) -> ThreadlineResult<Vec<Message>> {
            Ok(vec![])
        }
    }

    fn orchestrator(api: Arc<ScriptedApi>, max_attempts: u32) -> RunOrchestrator {
        RunOrchestrator::new(
            api,
            "asst_test",
            PollPolicy {
                interval_ms: 0,
                max_attempts,
            },
            Arc::new(DiagnosticLog::disabled()),
        )
    }

    #[test]
    fn phase_transitions() {
        let phase = RunPhase::NotStarted.observe(&RunStatus::Queued, 3);
        assert_eq!(phase, RunPhase::Polling { attempt: 1 });
        let phase = phase.observe(&RunStatus::InProgress, 3);
        assert_eq!(phase, RunPhase::Polling { attempt: 2 });
        assert_eq!(phase.observe(&RunStatus::InProgress, 3), RunPhase::TimedOut);
        assert_eq!(phase.observe(&RunStatus::Completed, 3), RunPhase::Completed);
        assert_eq!(phase.observe(&RunStatus::Failed, 3), RunPhase::Failed);
    }

    #[test]
    fn started_moves_to_polling() {
        assert_eq!(RunPhase::NotStarted.started(), RunPhase::Polling { attempt: 0 });
        assert_eq!(RunPhase::Completed.started(), RunPhase::Completed);
        assert_eq!(
            RunPhase::Polling { attempt: 3 }.started(),
            RunPhase::Polling { attempt: 3 }
        );
    }

    #[test]
    fn terminal_phases_absorb() {
        for phase in [RunPhase::Completed, RunPhase::Failed, RunPhase::TimedOut] {
            assert!(phase.is_terminal());
            assert_eq!(phase.observe(&RunStatus::Completed, 10), phase);
        }
        assert!(!RunPhase::NotStarted.is_terminal());
    }

    #[test]
    fn completed_on_last_attempt_wins_over_timeout() {
        let phase = RunPhase::Polling { attempt: 9 };
        assert_eq!(phase.observe(&RunStatus::Completed, 10), RunPhase::Completed);
    }

    #[tokio::test]
    async fn completes_after_exactly_k_queries() {
        let api = ScriptedApi::statuses(&["queued", "in_progress", "in_progress", "completed"]);
        let report = orchestrator(api.clone(), 10)
            .execute_run("thread_1")
            .await
            .unwrap();

        assert_eq!(report.run_id, "run_1");
        assert_eq!(report.attempts, 4);
        assert_eq!(api.status_calls(), 4);
    }

    #[tokio::test]
    async fn completes_on_first_query() {
        let api = ScriptedApi::statuses(&["completed"]);
        let report = orchestrator(api.clone(), 10)
            .execute_run("thread_1")
            .await
            .unwrap();
        assert_eq!(report.attempts, 1);
        assert_eq!(api.status_calls(), 1);
    }

    #[tokio::test]
    async fn completes_on_last_allowed_query() {
        let mut statuses = vec!["in_progress"; 9];
        statuses.push("completed");
        let api = ScriptedApi::statuses(&statuses);
        let report = orchestrator(api.clone(), 10)
            .execute_run("thread_1")
            .await
            .unwrap();

        assert_eq!(report.attempts, 10);
        assert_eq!(api.status_calls(), 10);
    }

    #[tokio::test]
    async fn snapshot_error_aborts_on_first_query() {
        let api = ScriptedApi::new(vec![Err(ThreadlineError::RemoteProtocol(
            "get_run_status: response has no id: {}".into(),
        ))]);
        let err = orchestrator(api.clone(), 10)
            .execute_run("thread_1")
            .await
            .unwrap_err();

        assert!(matches!(err, ThreadlineError::RemoteProtocol(_)));
        assert_eq!(api.status_calls(), 1);
    }

    #[tokio::test]
    async fn times_out_after_max_queries() {
        let api = ScriptedApi::statuses(&[]);
        let err = orchestrator(api.clone(), 10)
            .execute_run("thread_1")
            .await
            .unwrap_err();

        assert!(matches!(err, ThreadlineError::RunTimedOut { attempts: 10 }));
        assert_eq!(api.status_calls(), 10);
    }

    #[tokio::test]
    async fn failed_short_circuits() {
        let api = ScriptedApi::statuses(&["queued", "failed", "completed"]);
        let err = orchestrator(api.clone(), 10)
            .execute_run("thread_1")
            .await
            .unwrap_err();

        match err {
            ThreadlineError::RunFailed(payload) => assert!(payload.contains("failed")),
            other => panic!("expected RunFailed, got {other:?}"),
        }
        assert_eq!(api.status_calls(), 2);
    }

    #[tokio::test]
    async fn transport_error_aborts_without_retry() {
        let api = ScriptedApi::new(vec![
            Ok("queued"),
            Err(ThreadlineError::RemoteUnavailable("connection reset".into())),
            Ok("completed"),
        ]);
        let err = orchestrator(api.clone(), 10)
            .execute_run("thread_1")
            .await
            .unwrap_err();

        assert!(matches!(err, ThreadlineError::RemoteUnavailable(_)));
        assert_eq!(api.status_calls(), 2);
    }

    #[tokio::test]
    async fn unknown_statuses_keep_polling() {
        let api = ScriptedApi::statuses(&["requires_action", "", "completed"]);
        let report = orchestrator(api.clone(), 5)
            .execute_run("thread_1")
            .await
            .unwrap();
        assert_eq!(report.attempts, 3);
    }

    #[tokio::test]
    async fn status_snapshots_go_to_diagnostic_log() {
        let tmp = tempfile::TempDir::new().unwrap();
        let log = Arc::new(DiagnosticLog::new(tmp.path().join("log.txt")));
        let api = ScriptedApi::statuses(&["in_progress", "completed"]);
        let orchestrator = RunOrchestrator::new(
            api,
            "asst_test",
            PollPolicy {
                interval_ms: 0,
                max_attempts: 10,
            },
            log.clone(),
        );

        orchestrator.execute_run("thread_1").await.unwrap();

        let data = std::fs::read_to_string(log.path().unwrap()).unwrap();
        assert_eq!(data.lines().filter(|l| l.contains("Run status:")).count(), 2);
    }
}
