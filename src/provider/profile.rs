//! Provider profile as it appears in configuration.

use crate::error::PipelineError;
use crate::provider::{ModelProvider, ModelProviderClient, ProviderFactory};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderType {
    #[serde(rename = "openai")]
    OpenAI,
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "ollama")]
    Ollama,
    #[serde(rename = "local")]
    LocalCustom,
}

impl ProviderType {
    pub fn parse(type_str: &str) -> Result<Self, PipelineError> {
        match type_str {
            "openai" => Ok(ProviderType::OpenAI),
            "anthropic" => Ok(ProviderType::Anthropic),
            "ollama" => Ok(ProviderType::Ollama),
            "local" => Ok(ProviderType::LocalCustom),
            _ => Err(PipelineError::ConfigError(format!(
                "Invalid provider type: {}. Must be openai, anthropic, ollama, or local",
                type_str
            ))),
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            ProviderType::OpenAI => "openai",
            ProviderType::Anthropic => "anthropic",
            ProviderType::Ollama => "ollama",
            ProviderType::LocalCustom => "local",
        }
    }

    pub fn default_endpoint(self) -> Option<&'static str> {
        match self {
            ProviderType::OpenAI => Some("https://api.openai.com/v1"),
            ProviderType::Ollama => Some("http://localhost:11434"),
            ProviderType::LocalCustom | ProviderType::Anthropic => None,
        }
    }

    /// Environment variable consulted when the profile carries no key.
    pub fn api_key_env_var(self) -> Option<&'static str> {
        match self {
            ProviderType::OpenAI => Some("OPENAI_API_KEY"),
            ProviderType::Anthropic => Some("ANTHROPIC_API_KEY"),
            ProviderType::Ollama | ProviderType::LocalCustom => None,
        }
    }
}

/// Which backend generates pages, and how to reach it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub provider_type: ProviderType,
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider_type: ProviderType::Ollama,
            model: "llama3.1".to_string(),
            api_key: None,
            endpoint: None,
        }
    }
}

impl ProviderConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.model.trim().is_empty() {
            return Err("Model name cannot be empty".to_string());
        }
        if let Some(endpoint) = &self.endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(format!(
                    "Endpoint must start with http:// or https://, got: {}",
                    endpoint
                ));
            }
        }
        if self.provider_type == ProviderType::LocalCustom && self.endpoint.is_none() {
            return Err("Local provider requires an endpoint".to_string());
        }
        Ok(())
    }

    /// Key from the profile, falling back to the provider's environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.is_empty())
            .or_else(|| {
                self.provider_type
                    .api_key_env_var()
                    .and_then(|var| std::env::var(var).ok())
                    .filter(|key| !key.is_empty())
            })
    }

    pub fn to_model_provider(&self) -> Result<ModelProvider, PipelineError> {
        self.validate().map_err(PipelineError::ConfigError)?;
        let model = self.model.clone();
        match self.provider_type {
            ProviderType::OpenAI => Ok(ModelProvider::OpenAI {
                model,
                api_key: self.require_api_key()?,
                base_url: self.endpoint.clone(),
            }),
            ProviderType::Anthropic => Ok(ModelProvider::Anthropic {
                model,
                api_key: self.require_api_key()?,
            }),
            ProviderType::Ollama => Ok(ModelProvider::Ollama {
                model,
                base_url: self.endpoint.clone(),
            }),
            ProviderType::LocalCustom => Ok(ModelProvider::LocalCustom {
                model,
                endpoint: self.endpoint.clone().unwrap_or_default(),
                api_key: self.resolve_api_key(),
            }),
        }
    }

    pub fn create_client(
        &self,
        request_timeout: Duration,
    ) -> Result<Box<dyn ModelProviderClient>, PipelineError> {
        ProviderFactory::create_client(&self.to_model_provider()?, request_timeout)
    }

    fn require_api_key(&self) -> Result<String, PipelineError> {
        self.resolve_api_key().ok_or_else(|| {
            PipelineError::ProviderNotConfigured(format!(
                "{} requires an API key (set api_key or {})",
                self.provider_type.slug(),
                self.provider_type.api_key_env_var().unwrap_or("an API key")
            ))
        })
    }
}
