//! Provider API keys.
//!
//! Keys come from the process environment, after the project's `.env` has
//! been loaded with `dotenvy` by [`load_dotenv`]. The collected [`ApiKeys`] value is passed to whatever builds an
//! agent; nothing reads credentials from global state.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;

use crate::distill_config::Provider;
use crate::errors::AgentError;

/// Load `{project_dir}/.env` into the process environment.
///
/// Variables that are already set keep their values. Returns `Ok(false)` when
/// there is no `.env` file; a file that cannot be parsed is an error.
pub fn load_dotenv(project_dir: &Path) -> Result<bool> {
    let path = project_dir.join(".env");
    match dotenvy::from_path(&path) {
        Ok(()) => Ok(true),
        Err(e) if e.not_found() => Ok(false),
        Err(e) => Err(e).with_context(|| format!("Failed to load {}", path.display())),
    }
}

#[derive(Clone, Default)]
pub struct ApiKeys {
    keys: HashMap<Provider, String>,
}

impl std::fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut set = f.debug_map();
        for provider in Provider::ALL {
            set.entry(&provider.as_str(), &self.preview(provider));
        }
        set.finish()
    }
}

impl ApiKeys {
    /// Collect keys from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Collect keys through an arbitrary lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let keys = Provider::ALL
            .into_iter()
            .filter_map(|p| {
                lookup(p.api_key_env())
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
                    .map(|v| (p, v))
            })
            .collect();
        Self { keys }
    }

    pub fn get(&self, provider: Provider) -> Option<&str> {
        self.keys.get(&provider).map(String::as_str)
    }

    /// The key for `provider`, or an error naming the variable to set.
    pub fn require(&self, provider: Provider) -> Result<&str, AgentError> {
        self.get(provider).ok_or(AgentError::MissingApiKey {
            provider: provider.to_string(),
            env_var: provider.api_key_env(),
        })
    }

    /// First few characters of the key, enough to tell keys apart.
    pub fn preview(&self, provider: Provider) -> Option<String> {
        let visible = match provider {
            Provider::OpenAi => 8,
            Provider::Google => 2,
            Provider::Anthropic => 7,
            Provider::DeepSeek => 3,
            Provider::Groq => 4,
        };
        self.get(provider)
            .map(|key| key.chars().take(visible).collect())
    }
}
