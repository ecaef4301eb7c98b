use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use super::errors::AgentError;
use super::fallbacks::{self, ParseOutcome};
use super::messages::ChatMessage;
use super::prompts::{self, PromptTemplate};
use super::types::{AgentResult, AgentRole, ExecutionContext};
use crate::llm::{GenerationRequest, Generator};

/// A unit of work in the build workflow
///
/// Agents hold no per-run state and may be invoked concurrently. `execute`
/// never panics on malformed model output: unparseable replies are replaced
/// with the role's default value and reported as completed. Only a failed
/// generation call produces a failed result.
#[async_trait]
pub trait Agent: Send + Sync {
    fn role(&self) -> AgentRole;

    fn name(&self) -> &str {
        self.role().display_name()
    }

    fn preferred_model(&self) -> &str;

    async fn execute(&self, context: &ExecutionContext) -> AgentResult;
}

/// Generation-backed agent for any of the eight roles
pub struct RoleAgent {
    role: AgentRole,
    model: String,
    max_tokens: u32,
    template: PromptTemplate,
    generator: Arc<dyn Generator>,
}

impl RoleAgent {
    pub fn new(
        role: AgentRole,
        model: impl Into<String>,
        max_tokens: u32,
        generator: Arc<dyn Generator>,
    ) -> Self {
        Self {
            role,
            model: model.into(),
            max_tokens,
            template: prompts::for_role(role),
            generator,
        }
    }

    fn build_request(&self, context: &ExecutionContext) -> GenerationRequest {
        let user_prompt = self.template.render(&prompts::variables(context));
        GenerationRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(self.template.system.clone()),
                ChatMessage::user(user_prompt),
            ],
            temperature: self.role.temperature(),
            max_tokens: self.max_tokens,
        }
    }
}

#[async_trait]
impl Agent for RoleAgent {
    fn role(&self) -> AgentRole {
        self.role
    }

    fn preferred_model(&self) -> &str {
        &self.model
    }

    async fn execute(&self, context: &ExecutionContext) -> AgentResult {
        info!(role = %self.role, model = %self.model, "{} started", self.name());

        let request = self.build_request(context);
        let generation = match self.generator.generate(&request).await {
            Ok(generation) => generation,
            Err(e) => {
                let error = AgentError::from(e);
                warn!(role = %self.role, error = %error, "{} failed", self.name());
                return AgentResult::failed(self.role, error);
            }
        };

        let outcome = fallbacks::parse_output(self.role, &generation.content, context);
        if let ParseOutcome::UsedFallback(_) = &outcome {
            warn!(role = %self.role, "Reply was not in the expected shape, using default output");
        }

        let output = outcome.into_value();
        info!(
            role = %self.role,
            fields = fallbacks::field_count(&output),
            "{} complete",
            self.name()
        );

        AgentResult::completed(self.role, output)
    }
}
