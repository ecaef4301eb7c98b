// Agent system modules
//
// This module contains the eight role agents of the build team and the
// pieces they share: prompt templates, reply parsing and default outputs.

pub mod agent;
pub mod errors;
pub mod fallbacks;
pub mod messages;
pub mod prompts;
pub mod registry;
pub mod types;

// Re-export main types
pub use agent::{Agent, RoleAgent};
pub use errors::AgentError;
pub use registry::AgentRegistry;
pub use types::{AgentResult, AgentRole, AgentStatus, ExecutionContext};
