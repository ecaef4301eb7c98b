// Prompt templates for the build team
//
// Each role has one versioned template. User templates reference context
// values with `{{name}}` placeholders filled in by `render`.

use std::collections::HashMap;

use serde_json::Value;

use super::types::{AgentRole, ExecutionContext};
use crate::workflow::plan::StateKey;

/// Prompt template structure
pub struct PromptTemplate {
    pub name: String,
    pub version: String,
    pub system: String,
    pub user_template: String,
}

impl PromptTemplate {
    /// Render the user template with variables
    ///
    /// Placeholders without a matching variable are left untouched.
    pub fn render(&self, variables: &HashMap<String, String>) -> String {
        let mut rendered = String::with_capacity(self.user_template.len());
        let mut rest = self.user_template.as_str();

        while let Some(start) = rest.find("{{") {
            rendered.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find("}}") {
                Some(end) => {
                    let name = after[..end].trim();
                    match variables.get(name) {
                        Some(value) => rendered.push_str(value),
                        None => rendered.push_str(&rest[start..start + 2 + end + 2]),
                    }
                    rest = &after[end + 2..];
                }
                None => {
                    rendered.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        rendered.push_str(rest);
        rendered
    }
}

/// Collect every template variable the context can supply
pub fn variables(context: &ExecutionContext) -> HashMap<String, String> {
    let mut vars = HashMap::new();
    vars.insert("prompt".to_string(), context.prompt());
    vars.insert(
        "summary".to_string(),
        context.field_str(StateKey::ProjectBrief, "summary"),
    );
    vars.insert(
        "design_direction".to_string(),
        context.field_str(StateKey::ProjectBrief, "design_direction"),
    );
    vars.insert(
        "target_users".to_string(),
        context.field_str(StateKey::ProjectBrief, "target_users"),
    );
    vars.insert(
        "colors".to_string(),
        context.field_str(StateKey::DesignSpec, "colors"),
    );
    vars.insert(
        "components".to_string(),
        context.field_str(StateKey::DesignSpec, "components"),
    );

    for field in ["html", "css", "js"] {
        let len = context.field_str(StateKey::FrontendCode, field).chars().count();
        vars.insert(format!("{field}_chars"), len.to_string());
    }

    let issues = context
        .get(StateKey::Review)
        .and_then(|review| review.get("issues"))
        .and_then(Value::as_array)
        .map(|issues| issues.iter().take(3).cloned().collect::<Vec<_>>())
        .unwrap_or_default();
    vars.insert("issues".to_string(), Value::Array(issues).to_string());

    vars
}

/// Template for a role
pub fn for_role(role: AgentRole) -> PromptTemplate {
    match role {
        AgentRole::Pm => library::project_brief(),
        AgentRole::Ui => library::design_spec(),
        AgentRole::Frontend => library::frontend_code(),
        AgentRole::Backend => library::backend_design(),
        AgentRole::Writer => library::content(),
        AgentRole::Reviewer => library::code_review(),
        AgentRole::Qa => library::test_plan(),
        AgentRole::Debugger => library::debug(),
    }
}

pub mod library {
    use super::PromptTemplate;

    fn template(name: &str, system: &str, user_template: &str) -> PromptTemplate {
        PromptTemplate {
            name: name.to_string(),
            version: "1.0.0".to_string(),
            system: system.to_string(),
            user_template: user_template.to_string(),
        }
    }

    pub fn project_brief() -> PromptTemplate {
        template(
            "project_brief",
            "You are a Project Manager. Analyze website requests and answer in JSON.",
            "User Request: {{prompt}}\n\n\
             Analyze this request and provide JSON with these exact keys:\n\
             - summary (1-2 lines)\n\
             - target_users\n\
             - key_features (array of 5-10 features)\n\
             - technical_requirements\n\
             - design_direction\n\
             - timeline_estimate\n\
             - success_metrics (array)",
        )
    }

    pub fn design_spec() -> PromptTemplate {
        template(
            "design_spec",
            "You are a UI/UX Designer. Produce design specifications in JSON.",
            "Project: {{summary}}\n\
             Design Direction: {{design_direction}}\n\
             Target Users: {{target_users}}\n\n\
             Provide JSON with keys:\n\
             - layout\n\
             - colors (object with primary, secondary, accent hex codes)\n\
             - typography (object with font_family, sizes)\n\
             - components (array)\n\
             - breakpoints (object)\n\
             - visual_hierarchy\n\
             - accessibility_notes",
        )
    }

    pub fn frontend_code() -> PromptTemplate {
        template(
            "frontend_code",
            "You are a Frontend Developer. Write complete, responsive, accessible websites.",
            "Generate complete modern HTML/CSS/JavaScript code for a website.\n\n\
             Project: {{summary}}\n\
             Design Colors: {{colors}}\n\
             Components needed: {{components}}\n\n\
             Requirements: responsive layout with Flexbox/Grid, semantic HTML with ARIA \
             labels, no external dependencies.\n\n\
             Return exactly three fenced blocks: ```html, ```css and ```js.",
        )
    }

    pub fn backend_design() -> PromptTemplate {
        template(
            "backend_design",
            "You are a Backend Developer. Design APIs and data models in JSON.",
            "Design backend architecture for: {{summary}}\n\n\
             Provide JSON with keys:\n\
             - database_models (array of objects with name, fields)\n\
             - api_endpoints (array with method, path, description, params, response)\n\
             - authentication\n\
             - error_handling\n\
             - validation_rules (array)",
        )
    }

    pub fn content() -> PromptTemplate {
        template(
            "content",
            "You are a Content Writer. Write engaging website copy in JSON.",
            "Write professional, engaging copy for: {{summary}}\n\n\
             Provide JSON with keys: page_title, meta_description, hero_headline, \
             hero_subheading, features (array of title + description), buttons, forms, \
             error_messages, footer_text",
        )
    }

    pub fn code_review() -> PromptTemplate {
        template(
            "code_review",
            "You are a Code Reviewer. Review code quality, performance, security and accessibility.",
            "Review this code and provide feedback:\n\n\
             Frontend Code:\n\
             HTML: {{html_chars}} chars\n\
             CSS: {{css_chars}} chars\n\
             JS: {{js_chars}} chars\n\n\
             Provide JSON with:\n\
             - issues (array of {severity, component, description, suggestion})\n\
             - improvements (array)\n\
             - score (1-10)\n\
             - summary",
        )
    }

    pub fn test_plan() -> PromptTemplate {
        template(
            "test_plan",
            "You are a QA Tester. Write thorough test plans in JSON.",
            "Create a comprehensive test plan for: {{summary}}\n\n\
             Provide JSON with arrays: happy_path, edge_cases, error_scenarios, \
             mobile_tests, performance_tests, accessibility_tests, \
             browser_compatibility, security_tests",
        )
    }

    pub fn debug() -> PromptTemplate {
        template(
            "debug",
            "You are a Debugger. Find root causes and provide fixes in JSON.",
            "Found issues in the code. Provide fixes:\n\n\
             Issues to fix:\n{{issues}}\n\n\
             Provide JSON with:\n\
             - fixes (array of {issue, root_cause, fixed_code, testing_approach})\n\
             - optimization_tips (array)\n\
             - performance_improvements (array)",
        )
    }
}
