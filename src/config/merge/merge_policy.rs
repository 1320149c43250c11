//! Merge rules: built-in defaults sit underneath every other source.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("provider.provider_type", "ollama")?
        .set_default("provider.model", "llama3.1")?
        .set_default("pipeline.planner_max_tokens", 2048)?
        .set_default("pipeline.content_max_tokens", 1024)?
        .set_default("pipeline.temperature", 0.7)?
        .set_default("pipeline.request_timeout_secs", 120)?
        .set_default("logging.level", "info")?
        .set_default("logging.format", "text")?
        .set_default("logging.output", "stderr")
}
