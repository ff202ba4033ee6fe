//! Core configuration and resilience primitives.
//!
//! This module contains the validated application configuration and the
//! retry/backoff machinery used by the generation client.

mod config;
mod retry;

pub use config::{
    Config, ConfigError, GenerationConfig, KindOverride, OrchestratorSettings, ProviderKind,
    RetrySettings, SecondaryConfig, StorageConfig, GOOGLE_KEY_VARS, OPENROUTER_KEY_VAR,
};
pub use retry::{
    retry_async, RecordingSleeper, RetryConfig, RetryResult, Sleeper, TokioSleeper,
};
