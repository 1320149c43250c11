//! Configuration System
//!
//! Layered configuration: built-in defaults, then the global file, then workspace files,
//! then `PAGEWRIGHT__SECTION__KEY` environment overrides. Later sources win per key.

use crate::error::PipelineError;
use crate::logging::LoggingConfig;
use config::Environment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use crate::provider::{ProviderConfig, ProviderType};

mod merge;
mod sources;

pub use sources::global_file::global_config_path;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PagewrightConfig {
    /// Generation backend
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Generation parameters
    #[serde(default)]
    pub pipeline: PipelineSettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Parameters passed to the backend for every planner and content stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSettings {
    #[serde(default = "default_planner_max_tokens")]
    pub planner_max_tokens: u32,

    #[serde(default = "default_content_max_tokens")]
    pub content_max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Upper bound on one whole stream, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_planner_max_tokens() -> u32 {
    2048
}

fn default_content_max_tokens() -> u32 {
    1024
}

fn default_temperature() -> f32 {
    0.7
}

fn default_request_timeout_secs() -> u64 {
    120
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            planner_max_tokens: default_planner_max_tokens(),
            content_max_tokens: default_content_max_tokens(),
            temperature: default_temperature(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl PipelineSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.planner_max_tokens == 0 || self.content_max_tokens == 0 {
            return Err("Token limits must be greater than zero".to_string());
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(format!(
                "Temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err("Request timeout must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    Provider(String),
    Pipeline(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Provider(msg) => write!(f, "Provider: {}", msg),
            ValidationError::Pipeline(msg) => write!(f, "Pipeline: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl PagewrightConfig {
    /// Validate the entire configuration, collecting every problem.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = self.provider.validate() {
            errors.push(ValidationError::Provider(e));
        }
        if let Err(e) = self.pipeline.validate() {
            errors.push(ValidationError::Pipeline(e));
        }
        if let Err(e) = self.logging.validate() {
            errors.push(ValidationError::Logging(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Loads [`PagewrightConfig`] from every source.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a workspace, using the platform's global config file.
    pub fn load(workspace_root: &Path) -> Result<PagewrightConfig, PipelineError> {
        Self::load_with_global(workspace_root, global_config_path().as_deref())
    }

    /// Load configuration with an explicit global config file path.
    pub fn load_with_global(
        workspace_root: &Path,
        global_path: Option<&Path>,
    ) -> Result<PagewrightConfig, PipelineError> {
        let builder = merge::merge_policy::builder_with_defaults()?;
        let builder = sources::global_file::add_to_builder(builder, global_path)?;
        let builder = sources::workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = builder.add_source(
            Environment::with_prefix("PAGEWRIGHT")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: PagewrightConfig = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Load a single configuration file on top of the defaults.
    pub fn load_from_file(path: &Path) -> Result<PagewrightConfig, PipelineError> {
        let builder = merge::merge_policy::builder_with_defaults()?
            .add_source(config::File::from(PathBuf::from(path)));
        let config: PagewrightConfig = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Load and validate, flattening validation errors into one message.
    pub fn load_validated(workspace_root: &Path) -> Result<PagewrightConfig, PipelineError> {
        let config = Self::load(workspace_root)?;
        config.validate().map_err(|errors| {
            let error_msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            PipelineError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                error_msgs.join("\n")
            ))
        })?;
        Ok(config)
    }
}
