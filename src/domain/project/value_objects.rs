use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Longest prompt accepted from a client, in characters
pub const MAX_PROMPT_CHARS: usize = 10_000;

/// Website request submitted by a user
///
/// # Invariants
/// - Not empty or whitespace only
/// - At most `MAX_PROMPT_CHARS` characters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildPrompt(String);

impl BuildPrompt {
    /// Creates a new BuildPrompt
    ///
    /// # Example
    /// ```
    /// use fabri8_api::domain::project::value_objects::BuildPrompt;
    ///
    /// let prompt = BuildPrompt::new("Build a landing page for a bakery").expect("valid prompt");
    /// assert_eq!(prompt.as_str(), "Build a landing page for a bakery");
    /// assert!(BuildPrompt::new("   ").is_err());
    /// ```
    pub fn new(prompt: impl Into<String>) -> Result<Self, String> {
        let prompt = prompt.into();
        let trimmed = prompt.trim();
        if trimmed.is_empty() {
            return Err("Prompt cannot be empty".to_string());
        }
        if trimmed.chars().count() > MAX_PROMPT_CHARS {
            return Err(format!("Prompt exceeds {MAX_PROMPT_CHARS} characters"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BuildPrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Display name of a generated project, `Untitled` when none is given
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectName(String);

impl ProjectName {
    pub fn new(name: Option<&str>) -> Self {
        match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => Self(name.to_string()),
            None => Self("Untitled".to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Generated site sources
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontendCode {
    #[serde(default)]
    pub html: String,
    #[serde(default)]
    pub css: String,
    #[serde(default)]
    pub js: String,
}

impl FrontendCode {
    /// Read the html/css/js fields of a frontend output, missing fields empty
    pub fn from_value(value: &Value) -> Self {
        let field = |name: &str| {
            value
                .get(name)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        Self {
            html: field("html"),
            css: field("css"),
            js: field("js"),
        }
    }
}

/// Kinds of generated files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Html,
    Css,
    Js,
}

impl ArtifactKind {
    /// File name the artifact is written under
    pub fn file_name(&self) -> &'static str {
        match self {
            ArtifactKind::Html => "index.html",
            ArtifactKind::Css => "style.css",
            ArtifactKind::Js => "script.js",
        }
    }
}
