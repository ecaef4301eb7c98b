//! Declarative description of the build workflow.
//!
//! A [`WorkflowPlan`] is an ordered list of phases. Each phase names the agent
//! invocations it runs, which workflow state keys feed each invocation, and the
//! key each invocation's output is committed under. Plans are validated once,
//! before any phase executes.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::errors::WorkflowError;
use crate::agents::types::AgentRole;

/// Keys of the run-scoped workflow state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateKey {
    Prompt,
    ProjectBrief,
    DesignSpec,
    BackendDesign,
    FrontendCode,
    Content,
    Review,
    Qa,
    Debug,
}

impl StateKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateKey::Prompt => "prompt",
            StateKey::ProjectBrief => "project_brief",
            StateKey::DesignSpec => "design_spec",
            StateKey::BackendDesign => "backend_design",
            StateKey::FrontendCode => "frontend_code",
            StateKey::Content => "content",
            StateKey::Review => "review",
            StateKey::Qa => "qa",
            StateKey::Debug => "debug",
        }
    }
}

impl std::fmt::Display for StateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a phase runs its invocations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseMode {
    /// One invocation at a time, in declaration order
    Sequential,
    /// All invocations as concurrent tasks, joined before the phase ends
    Parallel,
    /// No invocations; waits for `delay` as an integration checkpoint
    Barrier { delay: Duration },
}

/// One agent invocation with its input bindings and output key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub role: AgentRole,
    pub inputs: Vec<StateKey>,
    pub output: StateKey,
}

impl Invocation {
    pub fn new(role: AgentRole, inputs: &[StateKey], output: StateKey) -> Self {
        Self {
            role,
            inputs: inputs.to_vec(),
            output,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phase {
    pub number: u8,
    pub name: &'static str,
    pub mode: PhaseMode,
    pub invocations: Vec<Invocation>,
}

impl Phase {
    pub fn sequential(number: u8, name: &'static str, invocations: Vec<Invocation>) -> Self {
        Self {
            number,
            name,
            mode: PhaseMode::Sequential,
            invocations,
        }
    }

    pub fn parallel(number: u8, name: &'static str, invocations: Vec<Invocation>) -> Self {
        Self {
            number,
            name,
            mode: PhaseMode::Parallel,
            invocations,
        }
    }

    pub fn barrier(number: u8, name: &'static str, delay: Duration) -> Self {
        Self {
            number,
            name,
            mode: PhaseMode::Barrier { delay },
            invocations: Vec::new(),
        }
    }

    /// Roles this phase invokes, in declaration order
    pub fn roles(&self) -> impl Iterator<Item = AgentRole> + '_ {
        self.invocations.iter().map(|invocation| invocation.role)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowPlan {
    phases: Vec<Phase>,
}

impl WorkflowPlan {
    pub fn new(phases: Vec<Phase>) -> Self {
        Self { phases }
    }

    /// The seven-phase website build
    pub fn standard(integration_delay: Duration) -> Self {
        use AgentRole::{Backend, Debugger, Frontend, Pm, Reviewer, Ui, Writer};
        use StateKey::{BackendDesign, Content, DesignSpec, FrontendCode, ProjectBrief, Prompt, Review};

        Self::new(vec![
            Phase::sequential(
                1,
                "Discovery & Planning",
                vec![Invocation::new(Pm, &[Prompt], ProjectBrief)],
            ),
            Phase::parallel(
                2,
                "Design & Architecture",
                vec![
                    Invocation::new(Ui, &[ProjectBrief], DesignSpec),
                    Invocation::new(Backend, &[ProjectBrief], BackendDesign),
                ],
            ),
            Phase::parallel(
                3,
                "Implementation",
                vec![
                    Invocation::new(Frontend, &[DesignSpec, ProjectBrief], FrontendCode),
                    Invocation::new(Writer, &[DesignSpec, ProjectBrief], Content),
                ],
            ),
            Phase::barrier(4, "Integration Standup", integration_delay),
            Phase::sequential(
                5,
                "Refinement & Polish",
                vec![Invocation::new(Reviewer, &[FrontendCode, BackendDesign], Review)],
            ),
            Phase::sequential(
                6,
                "Testing & Validation",
                vec![Invocation::new(AgentRole::Qa, &[ProjectBrief], StateKey::Qa)],
            ),
            Phase::sequential(
                7,
                "Delivery",
                vec![Invocation::new(Debugger, &[Review, FrontendCode], StateKey::Debug)],
            ),
        ])
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    pub fn phase(&self, number: u8) -> Option<&Phase> {
        self.phases.iter().find(|phase| phase.number == number)
    }

    pub fn last_phase(&self) -> u8 {
        self.phases.last().map(|phase| phase.number).unwrap_or(0)
    }

    /// Every role the plan invokes
    pub fn roles(&self) -> BTreeSet<AgentRole> {
        self.phases.iter().flat_map(|phase| phase.roles()).collect()
    }

    /// Check the plan before it runs
    ///
    /// Phases must be numbered from 1 without gaps, every input must be
    /// committed by an earlier phase (or be the seed prompt), and no key may be
    /// written twice.
    pub fn validate(&self) -> Result<(), WorkflowError> {
        if self.phases.is_empty() {
            return Err(WorkflowError::InvalidPlan("plan has no phases".to_string()));
        }

        let mut available = BTreeSet::from([StateKey::Prompt]);

        for (index, phase) in self.phases.iter().enumerate() {
            let expected = index + 1;
            if usize::from(phase.number) != expected {
                return Err(WorkflowError::InvalidPlan(format!(
                    "phase {} declared at position {expected}",
                    phase.number
                )));
            }

            match phase.mode {
                PhaseMode::Barrier { .. } if !phase.invocations.is_empty() => {
                    return Err(WorkflowError::InvalidPlan(format!(
                        "barrier phase {} declares invocations",
                        phase.number
                    )));
                }
                PhaseMode::Sequential | PhaseMode::Parallel if phase.invocations.is_empty() => {
                    return Err(WorkflowError::InvalidPlan(format!(
                        "phase {} declares no invocations",
                        phase.number
                    )));
                }
                _ => {}
            }

            for invocation in &phase.invocations {
                if let Some(missing) = invocation.inputs.iter().find(|key| !available.contains(*key)) {
                    return Err(WorkflowError::PlanValidity {
                        phase: phase.number,
                        key: *missing,
                    });
                }
            }

            // outputs join the available set only after the whole phase
            for invocation in &phase.invocations {
                if !available.insert(invocation.output) {
                    return Err(WorkflowError::DuplicateOutput {
                        phase: phase.number,
                        key: invocation.output,
                    });
                }
            }
        }

        Ok(())
    }
}
