use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::errors::WorkflowError;
use super::events::{Notification, NotificationKind};
use super::executor::PhaseExecutor;
use super::notifier::{DeliveryQueue, NotificationSink};
use super::plan::{StateKey, WorkflowPlan};
use super::state::{RunStatus, WorkflowRun};
use crate::agents::registry::AgentRegistry;
use crate::config::AppConfig;
use crate::llm::Generator;

/// Final result of a completed run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildOutcome {
    pub run_id: String,
    pub status: RunStatus,
    pub frontend_code: Value,
    pub content: Value,
    pub test_plan: Value,
    pub review_summary: Value,
    pub fixes: Value,
}

impl BuildOutcome {
    fn from_run(run: &WorkflowRun) -> Result<Self, WorkflowError> {
        let take = |key: StateKey| {
            run.state()
                .get(key)
                .filter(|value| !value.is_null())
                .cloned()
                .ok_or(WorkflowError::MissingOutput(key))
        };

        Ok(Self {
            run_id: run.run_id().to_string(),
            status: run.status(),
            frontend_code: take(StateKey::FrontendCode)?,
            content: take(StateKey::Content)?,
            test_plan: take(StateKey::Qa)?,
            review_summary: take(StateKey::Review)?,
            fixes: take(StateKey::Debug)?,
        })
    }
}

/// Entry point for running the build workflow
///
/// One orchestrator serves any number of runs; each `start` call gets its
/// own [`WorkflowRun`] and state.
pub struct Orchestrator {
    executor: PhaseExecutor,
}

impl Orchestrator {
    pub fn new(
        plan: WorkflowPlan,
        registry: AgentRegistry,
        notifier: Arc<dyn NotificationSink>,
    ) -> Result<Self, WorkflowError> {
        Ok(Self {
            executor: PhaseExecutor::new(plan, registry, notifier)?,
        })
    }

    /// Bound on how long the sink may take to accept one notification
    pub fn with_delivery_timeout(self, timeout: Duration) -> Self {
        Self {
            executor: self.executor.with_delivery_timeout(timeout),
        }
    }

    /// Orchestrator for the standard plan with generation-backed agents
    pub fn from_config(
        config: &AppConfig,
        generator: Arc<dyn Generator>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Result<Self, WorkflowError> {
        Self::new(
            WorkflowPlan::standard(config.integration_delay),
            AgentRegistry::from_config(config, generator),
            notifier,
        )
    }

    /// Run the whole workflow for `prompt`
    ///
    /// On failure the phase-failed notification has already been emitted when
    /// the error is returned.
    pub async fn start(&self, run_id: &str, prompt: &str) -> Result<BuildOutcome, WorkflowError> {
        info!(run_id = %run_id, prompt_chars = prompt.chars().count(), "Starting project");

        let queue = self.executor.open_queue();
        let result = self.drive(run_id, prompt, &queue).await;
        queue.close().await;
        result
    }

    async fn drive(
        &self,
        run_id: &str,
        prompt: &str,
        queue: &DeliveryQueue,
    ) -> Result<BuildOutcome, WorkflowError> {
        let mut run = WorkflowRun::new(run_id, prompt);
        self.executor.run_phases(&mut run, queue).await?;

        let outcome = BuildOutcome::from_run(&run)?;
        let data = serde_json::to_value(&outcome).unwrap_or(Value::Null);
        self.executor.emit(
            queue,
            Notification::new(
                run_id,
                self.executor.plan().last_phase(),
                NotificationKind::RunCompleted,
                "Project complete!",
            )
            .with_data(data),
        );

        Ok(outcome)
    }
}
