//! Configuration management for skiff
//!
//! Settings live in `skiff.toml` (or a path given on the command line). Every
//! field has a default so a missing file or a partial file both work.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{Result, SkiffError};

/// Default config file name, looked up in the current directory
pub const CONFIG_FILE_NAME: &str = "skiff.toml";

/// Top-level skiff configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkiffConfig {
    /// Agent loop settings
    #[serde(default)]
    pub agent: AgentSettings,

    /// Context trimming settings
    #[serde(default)]
    pub context: ContextSettings,

    /// Sandbox location
    #[serde(default)]
    pub sandbox: SandboxSettings,

    /// Inference API settings
    #[serde(default)]
    pub api: ApiSettings,
}

/// Agent loop settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSettings {
    /// Model identifier sent to the inference API
    #[serde(default = "default_model")]
    pub model: String,

    /// Hard cap on model calls per user turn
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Maximum tokens per model response
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: usize,

    /// File holding the system instructions
    #[serde(default = "default_system_prompt_file")]
    pub system_prompt_file: Option<PathBuf>,
}

/// Context trimming settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextSettings {
    /// Trim once the last observed input token count exceeds this
    #[serde(default = "default_token_budget")]
    pub token_budget: u64,

    /// Fraction of the transcript kept by a trim
    #[serde(default = "default_keep_ratio")]
    pub keep_ratio: f64,
}

/// Sandbox location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SandboxSettings {
    /// Directory every tool is confined to; created if absent
    #[serde(default = "default_sandbox_root")]
    pub root: PathBuf,
}

/// Inference API settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Environment variable containing the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

// Default value providers
fn default_model() -> String {
    "claude-sonnet-4-5-20250929".to_string()
}

fn default_max_iterations() -> usize {
    20
}

fn default_max_output_tokens() -> usize {
    8192
}

fn default_system_prompt_file() -> Option<PathBuf> {
    Some(PathBuf::from("system.txt"))
}

fn default_token_budget() -> u64 {
    150_000
}

fn default_keep_ratio() -> f64 {
    0.5
}

fn default_sandbox_root() -> PathBuf {
    PathBuf::from("./code")
}

fn default_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}

fn default_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

impl SkiffConfig {
    /// Load configuration from `path`, or defaults when the file does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            SkiffError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default configuration to `path`
    pub fn write_default(path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(&Self::default())
            .map_err(|e| SkiffError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings the agent loop cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.agent.max_iterations == 0 {
            return Err(SkiffError::Config(
                "agent.max_iterations must be at least 1".to_string(),
            ));
        }
        if self.context.token_budget == 0 {
            return Err(SkiffError::Config(
                "context.token_budget must be greater than 0".to_string(),
            ));
        }
        let ratio = self.context.keep_ratio;
        if !(ratio > 0.0 && ratio <= 1.0) {
            return Err(SkiffError::Config(format!(
                "context.keep_ratio must be in (0, 1], got {}",
                ratio
            )));
        }
        Ok(())
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_iterations: default_max_iterations(),
            max_output_tokens: default_max_output_tokens(),
            system_prompt_file: default_system_prompt_file(),
        }
    }
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            token_budget: default_token_budget(),
            keep_ratio: default_keep_ratio(),
        }
    }
}

impl Default for SandboxSettings {
    fn default() -> Self {
        Self {
            root: default_sandbox_root(),
        }
    }
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
        }
    }
}
