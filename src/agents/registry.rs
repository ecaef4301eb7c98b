use std::collections::HashMap;
use std::sync::Arc;

use super::agent::{Agent, RoleAgent};
use super::types::AgentRole;
use crate::config::AppConfig;
use crate::llm::Generator;

/// Maps each role to the agent that fulfils it
#[derive(Clone, Default)]
pub struct AgentRegistry {
    agents: HashMap<AgentRole, Arc<dyn Agent>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with a generation-backed agent for every role
    pub fn from_config(config: &AppConfig, generator: Arc<dyn Generator>) -> Self {
        let mut registry = Self::new();
        for role in AgentRole::ALL {
            registry.register(Arc::new(RoleAgent::new(
                role,
                config.model_for(role),
                config.llm_max_tokens,
                Arc::clone(&generator),
            )));
        }
        registry
    }

    /// Register an agent under its own role, returning the one it replaces
    pub fn register(&mut self, agent: Arc<dyn Agent>) -> Option<Arc<dyn Agent>> {
        self.agents.insert(agent.role(), agent)
    }

    pub fn with_agent(mut self, agent: Arc<dyn Agent>) -> Self {
        self.register(agent);
        self
    }

    pub fn get(&self, role: AgentRole) -> Option<Arc<dyn Agent>> {
        self.agents.get(&role).cloned()
    }

    pub fn contains(&self, role: AgentRole) -> bool {
        self.agents.contains_key(&role)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

impl std::fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut roles: Vec<_> = self.agents.keys().map(AgentRole::key).collect();
        roles.sort_unstable();
        f.debug_struct("AgentRegistry").field("roles", &roles).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::types::{AgentResult, ExecutionContext};
    use crate::llm::{Generation, GenerationError, GenerationRequest};
    use async_trait::async_trait;
    use serde_json::json;

    struct SilentGenerator;

    #[async_trait]
    impl Generator for SilentGenerator {
        async fn generate(&self, _request: &GenerationRequest) -> Result<Generation, GenerationError> {
            Ok(Generation {
                content: String::new(),
            })
        }
    }

    struct FixedAgent;

    #[async_trait]
    impl Agent for FixedAgent {
        fn role(&self) -> AgentRole {
            AgentRole::Qa
        }

        fn preferred_model(&self) -> &str {
            "stub"
        }

        async fn execute(&self, _context: &ExecutionContext) -> AgentResult {
            AgentResult::completed(AgentRole::Qa, json!({"happy_path": []}))
        }
    }

    #[test]
    fn from_config_registers_all_roles_with_configured_models() {
        let mut config = AppConfig::new("k");
        config
            .agent_models
            .insert(AgentRole::Debugger, "custom/debugger".to_string());

        let registry = AgentRegistry::from_config(&config, Arc::new(SilentGenerator));

        assert_eq!(registry.len(), 8);
        let debugger = registry.get(AgentRole::Debugger).unwrap();
        assert_eq!(debugger.preferred_model(), "custom/debugger");
        assert_eq!(
            registry.get(AgentRole::Pm).unwrap().preferred_model(),
            "anthropic/claude-3.5-sonnet"
        );
    }

    #[test]
    fn with_agent_replaces_existing_role() {
        let config = AppConfig::new("k");
        let registry = AgentRegistry::from_config(&config, Arc::new(SilentGenerator))
            .with_agent(Arc::new(FixedAgent));

        assert_eq!(registry.len(), 8);
        assert_eq!(registry.get(AgentRole::Qa).unwrap().preferred_model(), "stub");
    }

    #[test]
    fn empty_registry_has_no_agents() {
        let registry = AgentRegistry::new();
        assert!(registry.is_empty());
        assert!(!registry.contains(AgentRole::Pm));
        assert!(registry.get(AgentRole::Pm).is_none());
    }
}
