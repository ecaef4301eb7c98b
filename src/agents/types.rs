use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::workflow::plan::StateKey;

/// The eight roles of the build team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    Pm,
    Ui,
    Frontend,
    Backend,
    Writer,
    Reviewer,
    Qa,
    Debugger,
}

impl AgentRole {
    pub const ALL: [AgentRole; 8] = [
        AgentRole::Pm,
        AgentRole::Ui,
        AgentRole::Frontend,
        AgentRole::Backend,
        AgentRole::Writer,
        AgentRole::Reviewer,
        AgentRole::Qa,
        AgentRole::Debugger,
    ];

    /// Short role key used in configuration and registry lookups
    pub fn key(&self) -> &'static str {
        match self {
            AgentRole::Pm => "pm",
            AgentRole::Ui => "ui",
            AgentRole::Frontend => "frontend",
            AgentRole::Backend => "backend",
            AgentRole::Writer => "writer",
            AgentRole::Reviewer => "reviewer",
            AgentRole::Qa => "qa",
            AgentRole::Debugger => "debugger",
        }
    }

    /// Human readable name shown in notifications
    pub fn display_name(&self) -> &'static str {
        match self {
            AgentRole::Pm => "Project Manager",
            AgentRole::Ui => "UI/UX Designer",
            AgentRole::Frontend => "Frontend Developer",
            AgentRole::Backend => "Backend Developer",
            AgentRole::Writer => "Content Writer",
            AgentRole::Reviewer => "Code Reviewer",
            AgentRole::Qa => "QA Tester",
            AgentRole::Debugger => "Debugger",
        }
    }

    /// Model used when configuration does not override it
    pub fn default_model(&self) -> &'static str {
        match self {
            AgentRole::Pm | AgentRole::Reviewer => "anthropic/claude-3.5-sonnet",
            AgentRole::Ui => "openai/gpt-4o",
            AgentRole::Frontend | AgentRole::Backend | AgentRole::Debugger => {
                "deepseek/deepseek-coder"
            }
            AgentRole::Writer => "google/gemini-2.0-flash-exp:free",
            AgentRole::Qa => "google/gemini-pro",
        }
    }

    /// Sampling temperature for this role's generation calls
    pub fn temperature(&self) -> f32 {
        match self {
            AgentRole::Ui => 0.8,
            AgentRole::Frontend | AgentRole::Writer => 0.7,
            AgentRole::Pm | AgentRole::Backend | AgentRole::Qa => 0.5,
            AgentRole::Reviewer | AgentRole::Debugger => 0.4,
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|role| role.key() == key)
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Terminal status of one agent invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Completed,
    Failed,
}

/// Result of a single agent invocation
///
/// `output` is `Value::Null` for failed invocations and `error` carries the cause.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResult {
    pub agent_name: String,
    pub role: AgentRole,
    pub output: Value,
    pub status: AgentStatus,
    pub error: Option<String>,
}

impl AgentResult {
    pub fn completed(role: AgentRole, output: Value) -> Self {
        Self {
            agent_name: role.display_name().to_string(),
            role,
            output,
            status: AgentStatus::Completed,
            error: None,
        }
    }

    pub fn failed(role: AgentRole, cause: impl std::fmt::Display) -> Self {
        Self {
            agent_name: role.display_name().to_string(),
            role,
            output: Value::Null,
            status: AgentStatus::Failed,
            error: Some(cause.to_string()),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == AgentStatus::Completed
    }
}

/// Immutable inputs of one invocation, resolved from workflow state when
/// the phase is entered
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecutionContext {
    inputs: BTreeMap<StateKey, Value>,
}

impl ExecutionContext {
    pub fn new(inputs: BTreeMap<StateKey, Value>) -> Self {
        Self { inputs }
    }

    pub fn get(&self, key: StateKey) -> Option<&Value> {
        self.inputs.get(&key)
    }

    /// String field of an object input, empty when missing
    pub fn field_str(&self, key: StateKey, field: &str) -> String {
        match self.get(key).and_then(|value| value.get(field)) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }

    /// The raw user prompt, when bound
    pub fn prompt(&self) -> String {
        match self.get(StateKey::Prompt) {
            Some(Value::String(s)) => s.clone(),
            _ => String::new(),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = StateKey> + '_ {
        self.inputs.keys().copied()
    }
}
