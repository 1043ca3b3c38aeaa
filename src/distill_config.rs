//! Project configuration read from `.distill/distill.toml`.
//!
//! Every section is optional; a missing file yields the defaults below.
//!
//! ```toml
//! [course]
//! subject = "Computer Vision"
//! language = "Italian"
//!
//! [paths]
//! input_dir = "data/input"
//! output_dir = "data/output"
//!
//! [agents.teacher]
//! provider = "google"
//! model = "gemini-2.5-flash"
//! temperature = 0.0
//! history = true
//!
//! [agents.reviewer]
//! provider = "openai"
//! model = "gpt-4o-mini"
//!
//! [agents.editor]
//! provider = "google"
//! model = "gemini-2.5-flash"
//!
//! [providers.openai]
//! base_url = "https://api.openai.com/v1"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::agent::AgentRole;

/// Name of the configuration file inside `.distill/`.
pub const CONFIG_FILE: &str = "distill.toml";

/// LLM providers reachable through an OpenAI-compatible chat endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[serde(rename = "openai")]
    OpenAi,
    Google,
    Anthropic,
    #[serde(rename = "deepseek")]
    DeepSeek,
    Groq,
}

impl Provider {
    pub const ALL: [Provider; 5] = [
        Provider::OpenAi,
        Provider::Google,
        Provider::Anthropic,
        Provider::DeepSeek,
        Provider::Groq,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Google => "google",
            Provider::Anthropic => "anthropic",
            Provider::DeepSeek => "deepseek",
            Provider::Groq => "groq",
        }
    }

    /// Environment variable holding the provider's API key.
    pub fn api_key_env(self) -> &'static str {
        match self {
            Provider::OpenAi => "OPENAI_API_KEY",
            Provider::Google => "GOOGLE_API_KEY",
            Provider::Anthropic => "ANTHROPIC_API_KEY",
            Provider::DeepSeek => "DEEPSEEK_API_KEY",
            Provider::Groq => "GROQ_API_KEY",
        }
    }

    /// OpenAI-compatible base URL used when no override is configured.
    pub fn default_base_url(self) -> &'static str {
        match self {
            Provider::OpenAi => "https://api.openai.com/v1",
            Provider::Google => "https://generativelanguage.googleapis.com/v1beta/openai",
            Provider::Anthropic => "https://api.anthropic.com/v1",
            Provider::DeepSeek => "https://api.deepseek.com/v1",
            Provider::Groq => "https://api.groq.com/openai/v1",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Provider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == lower)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Invalid provider '{}'. Valid values: openai, google, anthropic, deepseek, groq",
                    s
                )
            })
    }
}

/// Course-level settings injected into every prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseConfig {
    #[serde(default = "default_subject")]
    pub subject: String,
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_subject() -> String {
    "Computer Vision".to_string()
}

fn default_language() -> String {
    "English".to_string()
}

impl Default for CourseConfig {
    fn default() -> Self {
        Self {
            subject: default_subject(),
            language: default_language(),
        }
    }
}

/// Input and output locations, relative to the project directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Materials live in `{input_dir}/m{module:03}_l{lesson:03}/`
    #[serde(default = "default_input_dir")]
    pub input_dir: String,
    /// Root of the intermediate artifacts and published handouts
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

fn default_input_dir() -> String {
    "data/input".to_string()
}

fn default_output_dir() -> String {
    "data/output".to_string()
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input_dir: default_input_dir(),
            output_dir: default_output_dir(),
        }
    }
}

/// Model settings for one agent role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSettings {
    pub provider: Provider,
    pub model: String,
    #[serde(default)]
    pub temperature: f64,
    /// Keep the conversation across calls instead of sending each prompt alone
    #[serde(default)]
    pub history: bool,
}

impl AgentSettings {
    fn new(provider: Provider, model: &str, history: bool) -> Self {
        Self {
            provider,
            model: model.to_string(),
            temperature: 0.0,
            history,
        }
    }
}

fn default_teacher() -> AgentSettings {
    AgentSettings::new(Provider::Google, "gemini-2.5-flash", true)
}

fn default_reviewer() -> AgentSettings {
    AgentSettings::new(Provider::OpenAi, "gpt-4o-mini", false)
}

fn default_editor() -> AgentSettings {
    AgentSettings::new(Provider::Google, "gemini-2.5-flash", false)
}

/// Agent settings per role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentsSection {
    #[serde(default = "default_teacher")]
    pub teacher: AgentSettings,
    #[serde(default = "default_reviewer")]
    pub reviewer: AgentSettings,
    #[serde(default = "default_editor")]
    pub editor: AgentSettings,
}

impl Default for AgentsSection {
    fn default() -> Self {
        Self {
            teacher: default_teacher(),
            reviewer: default_reviewer(),
            editor: default_editor(),
        }
    }
}

impl AgentsSection {
    pub fn for_role(&self, role: AgentRole) -> &AgentSettings {
        match role {
            AgentRole::Teacher => &self.teacher,
            AgentRole::Reviewer => &self.reviewer,
            AgentRole::Editor => &self.editor,
        }
    }
}

/// Per-provider endpoint override.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// The complete distill.toml structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DistillToml {
    #[serde(default)]
    pub course: CourseConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub agents: AgentsSection,
    /// Keyed by provider name (e.g. "openai")
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub providers: BTreeMap<String, ProviderOverride>,
}

impl DistillToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse distill.toml")
    }

    /// Load `distill.toml` from the `.distill` directory, or defaults if absent.
    pub fn load_or_default(distill_dir: &Path) -> Result<Self> {
        let config_path = distill_dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize distill.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Base URL for a provider, honoring `[providers.<name>]`.
    pub fn base_url(&self, provider: Provider) -> String {
        self.providers
            .get(provider.as_str())
            .and_then(|p| p.base_url.clone())
            .unwrap_or_else(|| provider.default_base_url().to_string())
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.course.subject.trim().is_empty() {
            warnings.push("course.subject is empty".to_string());
        }
        if self.course.language.trim().is_empty() {
            warnings.push("course.language is empty".to_string());
        }

        for role in AgentRole::ALL {
            let agent = self.agents.for_role(role);
            if agent.model.trim().is_empty() {
                warnings.push(format!("agents.{}.model is empty", role));
            }
            if !(0.0..=2.0).contains(&agent.temperature) {
                warnings.push(format!(
                    "agents.{}.temperature {} is outside 0.0-2.0",
                    role, agent.temperature
                ));
            }
        }

        for name in self.providers.keys() {
            if name.parse::<Provider>().is_err() {
                warnings.push(format!("Unknown provider section [providers.{}]", name));
            }
        }

        warnings
    }
}
