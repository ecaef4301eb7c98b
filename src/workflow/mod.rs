// Workflow engine
//
// A fixed plan of phases runs the role agents, threads each phase's outputs
// into later phases through write-once workflow state, and reports progress
// through a notification sink.

pub mod errors;
pub mod events;
pub mod executor;
pub mod notifier;
pub mod orchestrator;
pub mod plan;
pub mod state;

pub use errors::WorkflowError;
pub use events::{Notification, NotificationKind};
pub use executor::PhaseExecutor;
pub use notifier::{BroadcastNotifier, NotificationSink, NotifyError};
pub use orchestrator::{BuildOutcome, Orchestrator};
pub use plan::{Invocation, Phase, PhaseMode, StateKey, WorkflowPlan};
pub use state::{RunStatus, WorkflowRun, WorkflowState};
