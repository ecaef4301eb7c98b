//! Phase executor.
//!
//! Runs a validated [`WorkflowPlan`] against one [`WorkflowRun`].
//! Notifications go onto a per-run [`DeliveryQueue`], so a slow or faulty
//! sink never holds up or aborts the run. For each phase:
//!
//! 1. emit "phase started"
//! 2. resolve each invocation's context from committed state
//! 3. launch the invocations: spawned together in parallel phases, one at a
//!    time in sequential phases
//! 4. join every launched invocation; siblings of a failed invocation are
//!    never cancelled
//! 5. emit one notification per invocation, in declaration order
//! 6. if all succeeded, commit the outputs and emit "phase completed";
//!    otherwise commit nothing, emit "phase failed" and abort the run
//!
//! Workflow state is only written here, between phases, so it needs no lock.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde_json::{Map, Value};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, warn};

use super::errors::WorkflowError;
use super::events::{Notification, NotificationKind};
use super::notifier::{DeliveryQueue, NotificationSink, DEFAULT_DELIVERY_TIMEOUT};
use super::plan::{Invocation, Phase, PhaseMode, WorkflowPlan};
use super::state::{WorkflowRun, WorkflowState};
use crate::agents::errors::AgentError;
use crate::agents::registry::AgentRegistry;
use crate::agents::types::{AgentResult, ExecutionContext};

pub struct PhaseExecutor {
    plan: WorkflowPlan,
    registry: AgentRegistry,
    notifier: Arc<dyn NotificationSink>,
    delivery_timeout: Duration,
}

impl PhaseExecutor {
    /// Create an executor, validating the plan against the registry
    pub fn new(
        plan: WorkflowPlan,
        registry: AgentRegistry,
        notifier: Arc<dyn NotificationSink>,
    ) -> Result<Self, WorkflowError> {
        plan.validate()?;
        if let Some(role) = plan.roles().into_iter().find(|role| !registry.contains(*role)) {
            return Err(WorkflowError::AgentNotFound(role));
        }

        Ok(Self {
            plan,
            registry,
            notifier,
            delivery_timeout: DEFAULT_DELIVERY_TIMEOUT,
        })
    }

    /// Bound on how long the sink may take to accept one notification
    pub fn with_delivery_timeout(mut self, timeout: Duration) -> Self {
        self.delivery_timeout = timeout;
        self
    }

    pub fn plan(&self) -> &WorkflowPlan {
        &self.plan
    }

    /// Queue feeding this executor's sink, for one run
    pub fn open_queue(&self) -> DeliveryQueue {
        DeliveryQueue::start(Arc::clone(&self.notifier), self.delivery_timeout)
    }

    /// Drive `run` through every phase of the plan
    ///
    /// Returns the first phase failure; no later phase is started after it.
    /// Queued notifications are flushed before this returns.
    pub async fn run(&self, run: &mut WorkflowRun) -> Result<(), WorkflowError> {
        let queue = self.open_queue();
        let result = self.run_phases(run, &queue).await;
        queue.close().await;
        result
    }

    pub(crate) async fn run_phases(
        &self,
        run: &mut WorkflowRun,
        queue: &DeliveryQueue,
    ) -> Result<(), WorkflowError> {
        for phase in self.plan.phases() {
            run.begin_phase(phase.number)?;
            self.emit(queue, Notification::phase_started(run.run_id(), phase.number, phase.name));

            let results = self.execute_phase(phase, run.state()).await?;

            for (invocation, result) in &results {
                self.emit(queue, agent_notification(run.run_id(), phase.number, invocation, result));
            }

            if let Some((invocation, result)) = results.iter().find(|(_, r)| !r.is_completed()) {
                let cause = result
                    .error
                    .clone()
                    .unwrap_or_else(|| "agent failed".to_string());
                run.fail()?;
                warn!(
                    run_id = %run.run_id(),
                    phase = phase.number,
                    role = %invocation.role,
                    cause = %cause,
                    "Phase failed, aborting run"
                );
                self.emit(
                    queue,
                    Notification::phase_failed(run.run_id(), phase.number, phase.name, &cause)
                        .with_role(invocation.role),
                );

                return Err(WorkflowError::PhaseFailed {
                    phase: phase.number,
                    role: invocation.role,
                    cause,
                });
            }

            let mut committed = Map::new();
            for (invocation, result) in results {
                committed.insert(invocation.output.to_string(), result.output.clone());
                run.commit(invocation.output, result.output)?;
            }

            let completed = Notification::phase_completed(run.run_id(), phase.number, phase.name);
            let completed = if committed.is_empty() {
                completed
            } else {
                completed.with_data(Value::Object(committed))
            };
            self.emit(queue, completed);
        }

        run.complete()
    }

    async fn execute_phase<'p>(
        &self,
        phase: &'p Phase,
        state: &WorkflowState,
    ) -> Result<Vec<(&'p Invocation, AgentResult)>, WorkflowError> {
        match phase.mode {
            PhaseMode::Barrier { delay } => {
                debug!(phase = phase.number, delay_ms = delay.as_millis() as u64, "Waiting at barrier");
                tokio::time::sleep(delay).await;
                Ok(Vec::new())
            }
            PhaseMode::Sequential => {
                let mut results = Vec::with_capacity(phase.invocations.len());
                for invocation in &phase.invocations {
                    let handle = self.spawn_invocation(invocation, state)?;
                    let result = finish(invocation, handle.await);
                    let failed = !result.is_completed();
                    results.push((invocation, result));
                    if failed {
                        break;
                    }
                }
                Ok(results)
            }
            PhaseMode::Parallel => {
                let handles = phase
                    .invocations
                    .iter()
                    .map(|invocation| self.spawn_invocation(invocation, state))
                    .collect::<Result<Vec<_>, _>>()?;

                let joined = join_all(handles).await;

                Ok(phase
                    .invocations
                    .iter()
                    .zip(joined)
                    .map(|(invocation, joined)| (invocation, finish(invocation, joined)))
                    .collect())
            }
        }
    }

    fn spawn_invocation(
        &self,
        invocation: &Invocation,
        state: &WorkflowState,
    ) -> Result<JoinHandle<AgentResult>, WorkflowError> {
        let agent = self
            .registry
            .get(invocation.role)
            .ok_or(WorkflowError::AgentNotFound(invocation.role))?;
        let context = resolve_context(invocation, state);

        Ok(tokio::spawn(async move { agent.execute(&context).await }))
    }

    /// Log a notification and queue it for the sink
    pub(crate) fn emit(&self, queue: &DeliveryQueue, notification: Notification) {
        info!(
            run_id = %notification.run_id,
            phase = notification.phase,
            kind = ?notification.kind,
            "{}",
            notification.message
        );
        queue.push(notification);
    }
}

/// Context for an invocation, read from committed state
fn resolve_context(invocation: &Invocation, state: &WorkflowState) -> ExecutionContext {
    ExecutionContext::new(
        invocation
            .inputs
            .iter()
            .filter_map(|key| state.get(*key).map(|value| (*key, value.clone())))
            .collect(),
    )
}

/// Turn a joined task into a result, treating panics and empty outputs as failures
fn finish(invocation: &Invocation, joined: Result<AgentResult, JoinError>) -> AgentResult {
    match joined {
        Ok(result) if result.is_completed() && result.output.is_null() => {
            AgentResult::failed(invocation.role, "agent completed without output")
        }
        Ok(result) => result,
        Err(e) => AgentResult::failed(invocation.role, AgentError::Join(e.to_string())),
    }
}

fn agent_notification(
    run_id: &str,
    phase: u8,
    invocation: &Invocation,
    result: &AgentResult,
) -> Notification {
    if result.is_completed() {
        Notification::new(
            run_id,
            phase,
            NotificationKind::AgentCompleted,
            format!("{} produced {}", result.agent_name, invocation.output),
        )
        .with_role(invocation.role)
    } else {
        Notification::new(
            run_id,
            phase,
            NotificationKind::AgentFailed,
            format!(
                "{} failed: {}",
                result.agent_name,
                result.error.as_deref().unwrap_or("unknown error")
            ),
        )
        .with_role(invocation.role)
    }
}
