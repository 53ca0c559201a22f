// SPDX-License-Identifier: MIT

//! Provider selection - constructs chat models from the environment
//!
//! | Provider | Variables |
//! |----------|-----------|
//! | Ollama   | `OLLAMA_BASE_URL`, `OLLAMA_MODEL_NAME`, `OLLAMA_TEMPERATURE` |
//! | OpenAI   | `OPENAI_API_KEY`, `OPENAI_BASE_URL`, `OPENAI_MODEL_NAME`, `OPENAI_TEMPERATURE` |
//!
//! `LLM_PROVIDER` picks the provider when none is given explicitly.

use super::ollama::{self, OllamaModel};
use super::openai::{self, OpenAIModel};
use super::{ChatModel, GenerationConfig, Model};
use crate::adk::error::{LatticeError, ModelError};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

const DEFAULT_TEMPERATURE: f32 = 0.1;

/// Supported LLM backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Provider {
    Ollama,
    #[value(name = "openai")]
    OpenAI,
}

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::Ollama, Provider::OpenAI];

    /// Provider named by `LLM_PROVIDER`, if set
    pub fn from_env() -> Result<Option<Provider>, LatticeError> {
        match env::var("LLM_PROVIDER") {
            Ok(name) if !name.trim().is_empty() => Ok(Some(name.parse()?)),
            _ => Ok(None),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Ollama => write!(f, "ollama"),
            Provider::OpenAI => write!(f, "openai"),
        }
    }
}

impl FromStr for Provider {
    type Err = LatticeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(Provider::Ollama),
            "openai" => Ok(Provider::OpenAI),
            other => Err(ModelError::UnsupportedProvider(other.to_string()).into()),
        }
    }
}

/// Everything needed to construct a model for one provider
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    pub provider: Provider,
    pub model_name: String,
    pub base_url: String,
    pub temperature: f32,
    pub api_key: Option<String>,
}

impl ProviderConfig {
    /// Read the settings for `provider` from the process environment
    pub fn from_env(provider: Provider) -> Result<Self, LatticeError> {
        Self::from_lookup(provider, |key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(provider: Provider, lookup: F) -> Result<Self, LatticeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let prefix = match provider {
            Provider::Ollama => "OLLAMA",
            Provider::OpenAI => "OPENAI",
        };
        let var = |name: &str| {
            lookup(&format!("{}_{}", prefix, name)).filter(|v| !v.trim().is_empty())
        };

        let temperature = match var("TEMPERATURE") {
            Some(raw) => raw.trim().parse::<f32>().map_err(|_| {
                LatticeError::config(format!("{}_TEMPERATURE is not a number: {}", prefix, raw))
            })?,
            None => DEFAULT_TEMPERATURE,
        };

        let config = match provider {
            Provider::Ollama => Self {
                provider,
                model_name: var("MODEL_NAME").unwrap_or_else(|| "llama3.1:8b".to_string()),
                base_url: var("BASE_URL").unwrap_or_else(|| ollama::DEFAULT_BASE_URL.to_string()),
                temperature,
                api_key: None,
            },
            Provider::OpenAI => Self {
                provider,
                model_name: var("MODEL_NAME").unwrap_or_else(|| "gpt-4o-mini".to_string()),
                base_url: var("BASE_URL").unwrap_or_else(|| openai::DEFAULT_BASE_URL.to_string()),
                temperature,
                api_key: Some(
                    var("API_KEY")
                        .ok_or_else(|| ModelError::ApiKeyMissing("OPENAI_API_KEY".to_string()))?,
                ),
            },
        };

        log::debug!(
            "Using provider '{}' with model '{}'",
            config.provider,
            config.model_name
        );
        Ok(config)
    }

    /// Generation defaults derived from this configuration
    pub fn generation_config(&self) -> GenerationConfig {
        GenerationConfig {
            temperature: Some(self.temperature),
            ..Default::default()
        }
    }

    /// Backend plus generation defaults, ready for the workflows
    pub fn chat_model(&self) -> Result<ChatModel, LatticeError> {
        Ok(ChatModel::new(create_model(self)?).with_config(self.generation_config()))
    }
}

/// Create the backend described by `config`
pub fn create_model(config: &ProviderConfig) -> Result<Arc<dyn Model>, LatticeError> {
    match config.provider {
        Provider::Ollama => Ok(Arc::new(OllamaModel::new(
            config.model_name.clone(),
            config.base_url.clone(),
        ))),
        Provider::OpenAI => {
            let api_key = config
                .api_key
                .clone()
                .ok_or_else(|| ModelError::ApiKeyMissing("OPENAI_API_KEY".to_string()))?;
            Ok(Arc::new(OpenAIModel::new(
                config.model_name.clone(),
                api_key,
                config.base_url.clone(),
            )))
        }
    }
}
