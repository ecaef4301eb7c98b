//! Output parsing and per-role default values.
//!
//! Generation replies are free text. Structured roles expect a JSON object
//! somewhere in the reply; the frontend role expects fenced code blocks.
//! When a reply cannot be parsed, the role's default value is used instead so
//! a malformed reply never escapes the agent.

use serde_json::{json, Map, Value};

use super::types::{AgentRole, ExecutionContext};
use crate::workflow::plan::StateKey;

/// Maximum number of prompt characters copied into the default brief summary
const SUMMARY_CHARS: usize = 100;

/// Outcome of parsing one generation reply
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Parsed(Value),
    UsedFallback(Value),
}

impl ParseOutcome {
    pub fn used_fallback(&self) -> bool {
        matches!(self, ParseOutcome::UsedFallback(_))
    }

    pub fn into_value(self) -> Value {
        match self {
            ParseOutcome::Parsed(value) | ParseOutcome::UsedFallback(value) => value,
        }
    }
}

/// Parse a reply for `role`, falling back to the role's default value
pub fn parse_output(role: AgentRole, reply: &str, context: &ExecutionContext) -> ParseOutcome {
    let parsed = match role {
        AgentRole::Frontend => extract_frontend_code(reply),
        _ => extract_json_object(reply),
    };

    match parsed {
        Some(value) => ParseOutcome::Parsed(value),
        None => ParseOutcome::UsedFallback(default_output(role, context)),
    }
}

/// Parse the span from the first `{` to the last `}` as a JSON object
pub fn extract_json_object(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }

    match serde_json::from_str::<Value>(&text[start..=end]) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}

/// Content of the first fenced block tagged with one of `tags`
///
/// A fence only opens a block at the start of a line, so inline backticks in
/// prose are skipped.
pub fn extract_fenced_block(text: &str, tags: &[&str]) -> Option<String> {
    let mut rest = text;
    while let Some(open) = find_line_fence(rest) {
        let after_fence = &rest[open + 3..];
        let line_end = after_fence.find('\n')?;
        let tag = after_fence[..line_end].trim().to_ascii_lowercase();
        let body = &after_fence[line_end + 1..];
        let close = find_line_fence(body)?;

        if tags.iter().any(|t| *t == tag) {
            return Some(body[..close].trim().to_string());
        }
        rest = &body[close + 3..];
    }
    None
}

/// Byte offset of the first "```" that starts a line
fn find_line_fence(text: &str) -> Option<usize> {
    if text.starts_with("```") {
        return Some(0);
    }
    text.match_indices("\n```").next().map(|(at, _)| at + 1)
}

/// Extract `{html, css, js}` from a frontend reply
fn extract_frontend_code(reply: &str) -> Option<Value> {
    if let Some(html) = extract_fenced_block(reply, &["html"]).filter(|h| !h.is_empty()) {
        let css = extract_fenced_block(reply, &["css"]).unwrap_or_default();
        let js = extract_fenced_block(reply, &["js", "javascript"]).unwrap_or_default();
        return Some(json!({ "html": html, "css": css, "js": js }));
    }

    if let Some(value) = extract_json_object(reply) {
        let has_html = value
            .get("html")
            .and_then(Value::as_str)
            .is_some_and(|html| !html.trim().is_empty());
        if has_html {
            return Some(value);
        }
    }

    let trimmed = reply.trim();
    let lowered = trimmed.to_ascii_lowercase();
    if lowered.starts_with("<!doctype html") || lowered.starts_with("<html") {
        return Some(json!({ "html": trimmed, "css": "", "js": "" }));
    }

    None
}

/// Default value substituted for an unparseable reply
pub fn default_output(role: AgentRole, context: &ExecutionContext) -> Value {
    match role {
        AgentRole::Pm => default_brief(&context.prompt()),
        AgentRole::Ui => default_design_spec(),
        AgentRole::Frontend => default_frontend_code(&brief_summary(context)),
        AgentRole::Backend => default_backend_design(),
        AgentRole::Writer => default_content(&brief_summary(context)),
        AgentRole::Reviewer => default_review(),
        AgentRole::Qa => default_test_plan(),
        AgentRole::Debugger => default_debug(),
    }
}

fn brief_summary(context: &ExecutionContext) -> String {
    let summary = context.field_str(StateKey::ProjectBrief, "summary");
    if summary.trim().is_empty() {
        "Welcome".to_string()
    } else {
        summary
    }
}

fn default_brief(prompt: &str) -> Value {
    let summary: String = prompt.chars().take(SUMMARY_CHARS).collect();
    let summary = if summary.trim().is_empty() {
        "New website project".to_string()
    } else {
        summary
    };

    json!({
        "summary": summary,
        "target_users": "General users",
        "key_features": ["Core Feature 1", "Core Feature 2", "Core Feature 3"],
        "technical_requirements": "Modern web standards",
        "design_direction": "Modern and clean",
        "timeline_estimate": "2-4 hours",
        "success_metrics": ["Functional", "Responsive", "Fast"]
    })
}

fn default_design_spec() -> Value {
    json!({
        "layout": "Hero section + Features + Footer",
        "colors": { "primary": "#3498db", "secondary": "#2c3e50", "accent": "#e74c3c" },
        "typography": {
            "font_family": "Inter, sans-serif",
            "sizes": ["12px", "14px", "16px", "24px", "32px"]
        },
        "components": ["Header", "Hero", "Features", "CTA", "Footer"],
        "breakpoints": { "mobile": "320px", "tablet": "768px", "desktop": "1024px" },
        "visual_hierarchy": "Bold headers, subtle backgrounds",
        "accessibility_notes": "WCAG 2.1 AA compliant"
    })
}

fn default_frontend_code(title: &str) -> Value {
    let title = escape_html(title);
    let html = format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head>\n\
         <meta charset=\"UTF-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n\
         <title>{title}</title>\n\
         <link rel=\"stylesheet\" href=\"style.css\">\n\
         </head>\n\
         <body>\n\
         <header class=\"site-header\"><nav aria-label=\"Main\"><a href=\"#\">{title}</a></nav></header>\n\
         <main>\n\
         <section class=\"hero\">\n\
         <h1>{title}</h1>\n\
         <p>We create amazing experiences</p>\n\
         <button type=\"button\" id=\"cta\">Get Started</button>\n\
         </section>\n\
         <section class=\"features\" aria-label=\"Features\">\n\
         <article><h2>Fast</h2><p>Lightning quick performance</p></article>\n\
         <article><h2>Secure</h2><p>Enterprise-grade security</p></article>\n\
         <article><h2>Scalable</h2><p>Grows with your business</p></article>\n\
         </section>\n\
         </main>\n\
         <footer><p>&copy; {title}</p></footer>\n\
         <script src=\"script.js\"></script>\n\
         </body>\n\
         </html>"
    );
    let css = ":root { --primary: #3498db; --secondary: #2c3e50; --accent: #e74c3c; }\n\
               body { margin: 0; font-family: Inter, sans-serif; color: var(--secondary); }\n\
               .hero { padding: 4rem 1rem; text-align: center; }\n\
               .features { display: grid; grid-template-columns: repeat(auto-fit, minmax(200px, 1fr)); gap: 1rem; padding: 2rem 1rem; }\n\
               #cta { background: var(--primary); color: #fff; border: 0; padding: 0.75rem 1.5rem; }";
    let js = "document.getElementById('cta')?.addEventListener('click', () => {\n\
              document.querySelector('.features')?.scrollIntoView({ behavior: 'smooth' });\n\
              });";

    json!({ "html": html, "css": css, "js": js })
}

fn default_backend_design() -> Value {
    json!({
        "database_models": [
            { "name": "User", "fields": ["id", "email", "name", "created_at"] },
            { "name": "Project", "fields": ["id", "user_id", "title", "description"] }
        ],
        "api_endpoints": [
            {
                "method": "GET",
                "path": "/api/projects",
                "description": "Get all projects",
                "response": { "projects": [] }
            }
        ],
        "authentication": "JWT tokens",
        "error_handling": "RESTful error codes (400, 401, 404, 500)",
        "validation_rules": ["Email validation", "Required fields check"]
    })
}

fn default_content(page_title: &str) -> Value {
    json!({
        "page_title": page_title,
        "meta_description": "Professional website powered by FABRI8",
        "hero_headline": "Welcome to our website",
        "hero_subheading": "We create amazing experiences",
        "features": [
            { "title": "Fast", "description": "Lightning quick performance" },
            { "title": "Secure", "description": "Enterprise-grade security" },
            { "title": "Scalable", "description": "Grows with your business" }
        ],
        "buttons": { "cta": "Get Started", "learn_more": "Learn More" },
        "forms": [{ "name": "Email", "placeholder": "your@email.com" }],
        "error_messages": ["Please fill all required fields", "Invalid email format"],
        "footer_text": "© FABRI8. All rights reserved."
    })
}

fn default_review() -> Value {
    json!({
        "issues": [
            {
                "severity": "low",
                "component": "CSS",
                "description": "Consider using CSS custom properties for colors",
                "suggestion": "Use :root variables for better maintainability"
            }
        ],
        "improvements": ["Add loading states for better UX", "Implement error boundaries"],
        "score": 8,
        "summary": "Code is well-structured and follows best practices"
    })
}

fn default_test_plan() -> Value {
    json!({
        "happy_path": [
            "User lands on homepage",
            "User navigates to features section",
            "User clicks CTA button",
            "Form submission successful"
        ],
        "edge_cases": ["Empty form submission", "Very long input strings", "Special characters in forms"],
        "error_scenarios": ["Network timeout", "API errors"],
        "mobile_tests": ["iPhone 12", "Android latest"],
        "performance_tests": ["Page load < 3s", "First input delay < 100ms"],
        "accessibility_tests": ["Keyboard navigation", "Screen reader compatibility"],
        "browser_compatibility": ["Chrome", "Firefox", "Safari"],
        "security_tests": ["XSS prevention", "CSRF protection"]
    })
}

fn default_debug() -> Value {
    json!({
        "fixes": [
            {
                "issue": "Missing error handling",
                "root_cause": "Async operation without try-catch",
                "fixed_code": "wrap in try-catch block",
                "testing_approach": "Test with network errors"
            }
        ],
        "optimization_tips": ["Lazy load images", "Minify CSS and JS", "Use CSS containment"],
        "performance_improvements": ["Remove unused CSS", "Defer non-critical JS", "Implement caching"]
    })
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Number of top-level entries in an object output, used in log lines
pub fn field_count(value: &Value) -> usize {
    value.as_object().map(Map::len).unwrap_or(0)
}
