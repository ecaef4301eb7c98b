//! Application configuration.
//!
//! Built once at startup from the environment (after `.env` is loaded) and
//! passed by value into the components that need it.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::agents::types::AgentRole;

/// Errors raised while reading configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable not set")]
    Missing(&'static str),

    #[error("invalid value for {var}: {value}")]
    Invalid { var: String, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub openrouter_api_key: String,
    pub openrouter_base_url: String,
    pub app_referer: String,
    pub app_title: String,
    /// Generation calls allowed per second
    pub rate_limit_calls: u32,
    pub llm_max_tokens: u32,
    pub llm_timeout: Duration,
    pub agent_models: HashMap<AgentRole, String>,
    pub integration_delay: Duration,
    pub output_dir: PathBuf,
    pub server_host: String,
    pub server_port: u16,
    pub log_level: String,
}

impl AppConfig {
    /// Configuration with every optional setting at its default
    pub fn new(openrouter_api_key: impl Into<String>) -> Self {
        Self {
            openrouter_api_key: openrouter_api_key.into(),
            openrouter_base_url: "https://openrouter.ai/api/v1".to_string(),
            app_referer: "https://fabri8.vercel.app".to_string(),
            app_title: "Fabri8 - AI Website Builder".to_string(),
            rate_limit_calls: 100,
            llm_max_tokens: 4096,
            llm_timeout: Duration::from_secs(120),
            agent_models: AgentRole::ALL
                .into_iter()
                .map(|role| (role, role.default_model().to_string()))
                .collect(),
            integration_delay: Duration::from_millis(1000),
            output_dir: PathBuf::from("outputs"),
            server_host: "0.0.0.0".to_string(),
            server_port: 8000,
            log_level: "info".to_string(),
        }
    }

    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("OPENROUTER_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::Missing("OPENROUTER_API_KEY"))?;
        let mut config = Self::new(api_key);

        if let Some(url) = lookup("OPENROUTER_BASE_URL") {
            config.openrouter_base_url = url;
        }
        if let Some(referer) = lookup("APP_REFERER") {
            config.app_referer = referer;
        }
        if let Some(title) = lookup("APP_TITLE") {
            config.app_title = title;
        }
        if let Some(calls) = parse_var(&lookup, "RATE_LIMIT_CALLS")? {
            config.rate_limit_calls = calls;
        }
        if let Some(tokens) = parse_var(&lookup, "LLM_MAX_TOKENS")? {
            config.llm_max_tokens = tokens;
        }
        if let Some(secs) = parse_var(&lookup, "LLM_TIMEOUT_SECS")? {
            config.llm_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = parse_var(&lookup, "INTEGRATION_DELAY_MS")? {
            config.integration_delay = Duration::from_millis(ms);
        }
        if let Some(dir) = lookup("OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }
        if let Some(host) = lookup("SERVER_HOST") {
            config.server_host = host;
        }
        if let Some(port) = parse_var(&lookup, "SERVER_PORT")? {
            config.server_port = port;
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            config.log_level = level;
        }

        for role in AgentRole::ALL {
            let var = format!("AGENT_MODEL_{}", role.key().to_ascii_uppercase());
            if let Some(model) = lookup(&var).filter(|m| !m.trim().is_empty()) {
                config.agent_models.insert(role, model);
            }
        }

        Ok(config)
    }

    /// Model configured for a role
    pub fn model_for(&self, role: AgentRole) -> &str {
        self.agent_models
            .get(&role)
            .map(String::as_str)
            .unwrap_or_else(|| role.default_model())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = format!("{}:{}", self.server_host, self.server_port);
        raw.parse().map_err(|_| ConfigError::Invalid {
            var: "SERVER_HOST".to_string(),
            value: raw,
        })
    }
}

fn parse_var<F, T>(lookup: &F, name: &str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid {
                var: name.to_string(),
                value: raw,
            }),
    }
}
