//! CLI route: run context and dispatch of parsed commands.

use crate::cli::parse::Commands;
use crate::cli::presentation::{format_page_json, format_page_text, format_parse_json, PageSnapshot};
use crate::config::{ConfigLoader, PagewrightConfig};
use crate::error::PipelineError;
use crate::layout::parse;
use crate::pipeline::{PipelineController, PlannerStatus};
use crate::source::{ProviderSource, StreamSource};
use anyhow::{bail, Context};
use std::io::{IsTerminal, Read};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Runtime context for CLI execution: the loaded configuration.
pub struct RunContext {
    config: PagewrightConfig,
}

impl RunContext {
    /// Load configuration from `config_path` when given, otherwise from every layered source
    /// rooted at `config_root`.
    pub fn new(config_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, PipelineError> {
        let config = match config_path {
            Some(path) => ConfigLoader::load_from_file(&path)?,
            None => ConfigLoader::load(&config_root)?,
        };
        Ok(Self { config })
    }

    pub fn from_config(config: PagewrightConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PagewrightConfig {
        &self.config
    }

    pub async fn execute(&self, command: &Commands) -> anyhow::Result<String> {
        match command {
            Commands::Generate {
                topic,
                timeout_secs,
                format,
                no_color,
            } => {
                let source = self.provider_source()?;
                let color = !no_color && std::io::stdout().is_terminal();
                self.run_generate(
                    source,
                    topic,
                    Duration::from_secs(*timeout_secs),
                    format,
                    color,
                )
                .await
            }
            Commands::Parse { input, pretty } => {
                let markup = read_input(input)?;
                let outcome = parse(&markup);
                info!(
                    entities = outcome.closed.len(),
                    containers = outcome.document.containers.len(),
                    "Parsed layout markup"
                );
                Ok(format_parse_json(&outcome, *pretty)?)
            }
        }
    }

    fn provider_source(&self) -> anyhow::Result<Arc<dyn StreamSource>> {
        if let Err(errors) = self.config.validate() {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            bail!("Configuration validation failed:\n{}", messages.join("\n"));
        }
        let source = ProviderSource::from_config(&self.config)
            .context("Failed to set up the generation provider")?;
        Ok(Arc::new(source))
    }

    /// Run one page to completion (or timeout) against `source` and render it.
    pub async fn run_generate(
        &self,
        source: Arc<dyn StreamSource>,
        topic: &str,
        timeout: Duration,
        format: &str,
        color: bool,
    ) -> anyhow::Result<String> {
        if format != "text" && format != "json" {
            bail!("Invalid format: {} (must be 'text' or 'json')", format);
        }

        let controller = PipelineController::new(source);
        let handle = controller.begin(topic)?;
        let view = handle.view();

        let timed_out = match view.wait_until_settled(timeout).await {
            Ok(()) => false,
            Err(PipelineError::Timeout(_)) => {
                warn!(topic, timeout_secs = timeout.as_secs(), "Page did not settle in time");
                true
            }
            Err(e) => return Err(e.into()),
        };

        let page = PageSnapshot::capture(&view, timed_out);
        handle.dispose();

        if let PlannerStatus::Failed(error) = &page.planner {
            if page.layout.is_empty() {
                bail!("Layout stream failed before any section was planned: {}", error);
            }
        }

        info!(
            topic,
            sections = page.layout.entity_count(),
            timed_out,
            "Page generated"
        );
        match format {
            "json" => Ok(format_page_json(&page)?),
            _ => Ok(format_page_text(&page, color)),
        }
    }
}

fn read_input(input: &str) -> anyhow::Result<String> {
    if input == "-" {
        let mut markup = String::new();
        std::io::stdin()
            .read_to_string(&mut markup)
            .context("Failed to read markup from stdin")?;
        Ok(markup)
    } else {
        std::fs::read_to_string(input).with_context(|| format!("Failed to read {}", input))
    }
}
