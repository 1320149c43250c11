//! Stream sources
//!
//! The generation backend is a black box that opens planner and content streams. Two
//! sources ship with the crate: [`ProviderSource`] talks to a model provider, and
//! [`ChannelSource`] is fed by hand (tests, replays, embedding hosts that already own
//! the transport).

use crate::error::PipelineError;
use crate::stream::{ContentRequest, EventStream};
use async_trait::async_trait;

pub mod channel;
pub mod provider;

pub use channel::{ChannelSource, EventSender};
pub use provider::ProviderSource;

#[async_trait]
pub trait StreamSource: Send + Sync {
    /// Open the planner stream for a page topic.
    async fn open_planner(&self, topic: &str) -> Result<EventStream, PipelineError>;

    /// Open the content stream for one closed entity.
    async fn open_content(&self, request: &ContentRequest) -> Result<EventStream, PipelineError>;
}
