//! Stream source backed by a model provider.
//!
//! Text chunks from the provider become `Content` events; a provider error ends the
//! stream with an `Error` event, and the end of the response body counts as `Done`.

use crate::config::{PagewrightConfig, PipelineSettings};
use crate::error::PipelineError;
use crate::prompt;
use crate::provider::{CompletionOptions, CompletionStream, ModelProviderClient};
use crate::source::StreamSource;
use crate::stream::{ContentRequest, EventStream, StreamEvent};
use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Arc;
use tracing::debug;

pub struct ProviderSource {
    client: Arc<dyn ModelProviderClient>,
    settings: PipelineSettings,
}

impl ProviderSource {
    pub fn new(client: Arc<dyn ModelProviderClient>, settings: PipelineSettings) -> Self {
        Self { client, settings }
    }

    /// Build the client named by the `[provider]` section.
    pub fn from_config(config: &PagewrightConfig) -> Result<Self, PipelineError> {
        let client = config
            .provider
            .create_client(config.pipeline.request_timeout())?;
        Ok(Self::new(Arc::from(client), config.pipeline.clone()))
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    fn options(&self, max_tokens: u32) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.settings.temperature),
            max_tokens: Some(max_tokens),
            ..CompletionOptions::default()
        }
    }
}

fn into_events(stream: CompletionStream) -> EventStream {
    Box::pin(stream.map(|chunk| match chunk {
        Ok(text) => StreamEvent::Content(text),
        Err(err) => StreamEvent::Error(err.to_string()),
    }))
}

#[async_trait]
impl StreamSource for ProviderSource {
    async fn open_planner(&self, topic: &str) -> Result<EventStream, PipelineError> {
        debug!(
            topic,
            provider = self.client.provider_name(),
            model = self.client.model_name(),
            "Opening planner stream"
        );
        let stream = self
            .client
            .stream(
                prompt::planner_messages(topic),
                self.options(self.settings.planner_max_tokens),
            )
            .await?;
        Ok(into_events(stream))
    }

    async fn open_content(&self, request: &ContentRequest) -> Result<EventStream, PipelineError> {
        debug!(entity_id = %request.entity_id, "Opening content stream");
        let stream = self
            .client
            .stream(
                prompt::content_messages(request),
                self.options(self.settings.content_max_tokens),
            )
            .await?;
        Ok(into_events(stream))
    }
}
