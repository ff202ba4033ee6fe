//! Configuration management for Planforge.
//!
//! Handles loading and saving configuration from TOML files, with API keys
//! optionally taken from the environment.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use super::retry::RetryConfig;
use crate::hierarchy::DocumentKind;

/// Environment variables consulted for the Google key, in order.
pub const GOOGLE_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "GOOGLE_API_KEY"];

/// Environment variable consulted for the OpenRouter key.
pub const OPENROUTER_KEY_VAR: &str = "OPENROUTER_API_KEY";

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Text-generation settings
    pub generation: GenerationConfig,

    /// Backoff policy for rate-limited calls
    pub retry: RetrySettings,

    /// Initial batch and progress pacing
    pub orchestrator: OrchestratorSettings,

    /// Where project snapshots live
    pub storage: StorageConfig,
}

/// Recognised text-generation providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Google,
    OpenRouter,
}

impl ProviderKind {
    /// Provider name as used in logs and `providerUsed`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::OpenRouter => "openrouter",
        }
    }

    /// Default model for this provider.
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Google => "gemini-2.5-flash",
            Self::OpenRouter => "google/gemini-2.5-flash",
        }
    }

    /// Read this provider's key from the environment. Empty variables are
    /// skipped.
    pub fn key_from_env(&self) -> Option<String> {
        let vars: &[&str] = match self {
            Self::Google => &GOOGLE_KEY_VARS,
            Self::OpenRouter => &[OPENROUTER_KEY_VAR],
        };
        vars.iter().find_map(|var| std::env::var(var).ok().filter(|key| !key.trim().is_empty()))
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Primary provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Provider (google, openrouter)
    pub provider: ProviderKind,

    /// Model used for standard and grounded kinds
    pub model: String,

    /// Model used for deep-reasoning kinds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deep_model: Option<String>,

    /// API key; falls back to the provider's environment variable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Thinking budget (tokens) for deep-reasoning kinds
    pub thinking_budget: u32,

    /// Output token cap per document
    pub max_output_tokens: u32,

    /// Generate template skeletons when no credentials exist
    pub offline_fallback: bool,

    /// Ask the backend to stream tokens when it can
    pub stream: bool,

    /// Failover provider used once the primary is rate limited
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary: Option<SecondaryConfig>,

    /// Per-kind overrides keyed by kind slug
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub overrides: BTreeMap<String, KindOverride>,
}

/// Failover provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecondaryConfig {
    pub provider: ProviderKind,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

/// Per-kind generation overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KindOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking_budget: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grounded: Option<bool>,
}

/// Backoff settings, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub max_delay_ms: u64,
}

/// Orchestrator pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorSettings {
    /// Number of leading hierarchy categories generated on project creation
    pub initial_categories: usize,

    /// Pause between initial-batch documents
    pub settle_delay_ms: u64,

    /// Interval of synthetic progress updates
    pub progress_tick_ms: u64,
}

/// Storage settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding project snapshots
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("generation.model must not be empty")]
    EmptyModel,

    #[error("secondary provider {0} has no model")]
    EmptySecondaryModel(ProviderKind),

    #[error("retry.backoff_multiplier must be at least 1.0")]
    InvalidMultiplier,

    #[error("orchestrator.initial_categories must be between 0 and {max}, got {got}")]
    InvalidInitialCategories { got: usize, max: usize },

    #[error("orchestrator.progress_tick_ms must be positive")]
    ZeroProgressTick,

    #[error("generation.overrides has unknown document kind `{0}`")]
    UnknownOverrideKind(String),
}

impl Config {
    /// Load configuration from `explicit` when given, otherwise from the
    /// default locations.
    pub fn load_from(explicit: Option<&Path>) -> anyhow::Result<Self> {
        match explicit {
            Some(path) => Self::load_from_file(path),
            None => Self::load(),
        }
    }

    /// Load configuration from the default location.
    ///
    /// Looks for config in:
    /// 1. `.planforge.toml` in current directory
    /// 2. `~/.config/planforge/config.toml`
    /// 3. Falls back to defaults
    pub fn load() -> anyhow::Result<Self> {
        let local_config = PathBuf::from(".planforge.toml");
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Some(config_dir) = Self::config_dir() {
            let global_config = config_dir.join("config.toml");
            if global_config.exists() {
                return Self::load_from_file(&global_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check option ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.generation.model.trim().is_empty() {
            return Err(ConfigError::EmptyModel);
        }
        if let Some(secondary) = &self.generation.secondary {
            if secondary.model.trim().is_empty() {
                return Err(ConfigError::EmptySecondaryModel(secondary.provider));
            }
        }
        if let Some(key) =
            self.generation.overrides.keys().find(|key| key.parse::<DocumentKind>().is_err())
        {
            return Err(ConfigError::UnknownOverrideKind(key.clone()));
        }
        if self.retry.backoff_multiplier < 1.0 {
            return Err(ConfigError::InvalidMultiplier);
        }
        let max = crate::hierarchy::Category::ALL.len();
        if self.orchestrator.initial_categories > max {
            return Err(ConfigError::InvalidInitialCategories {
                got: self.orchestrator.initial_categories,
                max,
            });
        }
        if self.orchestrator.progress_tick_ms == 0 {
            return Err(ConfigError::ZeroProgressTick);
        }
        Ok(())
    }

    /// Get the config directory path.
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("planforge"))
    }

    /// Directory for project snapshots.
    pub fn projects_dir(&self) -> Option<PathBuf> {
        self.storage
            .data_dir
            .clone()
            .or_else(|| dirs::data_dir().map(|d| d.join("planforge").join("projects")))
    }
}

impl GenerationConfig {
    /// Primary API key from the file or the environment.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| self.provider.key_from_env())
    }

    /// Override for `kind`, if any.
    pub fn override_for(&self, kind: DocumentKind) -> Option<&KindOverride> {
        self.overrides.get(kind.as_str())
    }

    /// `model` as the configured provider names it. OpenRouter ids carry a
    /// vendor prefix; bare Gemini names get `google/`.
    pub fn provider_model(&self, model: &str) -> String {
        match self.provider {
            ProviderKind::OpenRouter if !model.contains('/') => format!("google/{model}"),
            _ => model.to_string(),
        }
    }
}

impl SecondaryConfig {
    /// Secondary API key from the file or the environment.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| self.provider.key_from_env())
    }
}

impl RetrySettings {
    pub fn to_retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_retries,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            backoff_multiplier: self.backoff_multiplier,
        }
    }
}

impl OrchestratorSettings {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn progress_tick(&self) -> Duration {
        Duration::from_millis(self.progress_tick_ms.max(1))
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Google,
            model: ProviderKind::Google.default_model().to_string(),
            deep_model: Some("gemini-2.5-pro".to_string()),
            api_key: None,
            thinking_budget: 8192,
            max_output_tokens: 16384,
            offline_fallback: false,
            stream: false,
            secondary: None,
            overrides: BTreeMap::new(),
        }
    }
}

impl Default for SecondaryConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::OpenRouter,
            model: ProviderKind::OpenRouter.default_model().to_string(),
            api_key: None,
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self { max_retries: 3, initial_delay_ms: 2000, backoff_multiplier: 2.0, max_delay_ms: 60_000 }
    }
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self { initial_categories: 2, settle_delay_ms: 1500, progress_tick_ms: 800 }
    }
}
