//! Hand-fed stream source.
//!
//! Every opened stream is backed by an unbounded channel whose sending half is kept
//! here, so the caller decides exactly when each chunk, `done` or `error` arrives. Opens
//! are recorded in order.

use crate::error::PipelineError;
use crate::source::StreamSource;
use crate::stream::{ContentRequest, EventStream, StreamEvent};
use async_trait::async_trait;
use futures::channel::mpsc::{unbounded, UnboundedSender};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Sending half of one hand-fed stream.
#[derive(Clone, Debug)]
pub struct EventSender {
    sender: UnboundedSender<StreamEvent>,
}

impl EventSender {
    /// Deliver an event. Returns false once the receiving side has been dropped.
    pub fn send(&self, event: StreamEvent) -> bool {
        self.sender.unbounded_send(event).is_ok()
    }

    pub fn chunk(&self, text: &str) -> bool {
        self.send(StreamEvent::Content(text.to_string()))
    }

    pub fn done(&self) -> bool {
        self.send(StreamEvent::Done)
    }

    pub fn error(&self, message: &str) -> bool {
        self.send(StreamEvent::Error(message.to_string()))
    }

    /// End the stream without a terminal event.
    pub fn hang_up(&self) {
        self.sender.close_channel();
    }

    /// True once the consumer dropped the stream (closed or aborted).
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

#[derive(Default)]
struct ChannelState {
    planners: Vec<(String, EventSender)>,
    contents: Vec<(ContentRequest, EventSender)>,
    planner_failure: Option<String>,
    content_failures: HashMap<String, String>,
}

#[derive(Clone, Default)]
pub struct ChannelSource {
    state: Arc<Mutex<ChannelState>>,
    opened: Arc<Notify>,
}

impl ChannelSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent planner open fail with `message`.
    pub fn fail_planner_open(&self, message: &str) {
        self.state.lock().planner_failure = Some(message.to_string());
    }

    /// Make opening the content stream for `entity_id` fail with `message`.
    pub fn fail_content_open(&self, entity_id: &str, message: &str) {
        self.state
            .lock()
            .content_failures
            .insert(entity_id.to_string(), message.to_string());
    }

    pub fn planner_open_count(&self) -> usize {
        self.state.lock().planners.len()
    }

    pub fn planner_topics(&self) -> Vec<String> {
        self.state
            .lock()
            .planners
            .iter()
            .map(|(topic, _)| topic.clone())
            .collect()
    }

    /// Sender for the `index`-th planner stream opened.
    pub fn planner(&self, index: usize) -> Option<EventSender> {
        self.state
            .lock()
            .planners
            .get(index)
            .map(|(_, sender)| sender.clone())
    }

    /// Every content request, in open order.
    pub fn content_requests(&self) -> Vec<ContentRequest> {
        self.state
            .lock()
            .contents
            .iter()
            .map(|(request, _)| request.clone())
            .collect()
    }

    pub fn content_open_count(&self, entity_id: &str) -> usize {
        self.state
            .lock()
            .contents
            .iter()
            .filter(|(request, _)| request.entity_id == entity_id)
            .count()
    }

    /// Sender for the most recent content stream opened for `entity_id`.
    pub fn content(&self, entity_id: &str) -> Option<EventSender> {
        self.state
            .lock()
            .contents
            .iter()
            .rev()
            .find(|(request, _)| request.entity_id == entity_id)
            .map(|(_, sender)| sender.clone())
    }

    /// Wait for the `index`-th planner stream to be opened.
    pub async fn wait_for_planner(&self, index: usize, timeout: Duration) -> Option<EventSender> {
        self.wait_for(timeout, || self.planner(index)).await
    }

    /// Wait for a content stream for `entity_id` to be opened.
    pub async fn wait_for_content(&self, entity_id: &str, timeout: Duration) -> Option<EventSender> {
        self.wait_for(timeout, || self.content(entity_id)).await
    }

    async fn wait_for<T>(&self, timeout: Duration, lookup: impl Fn() -> Option<T>) -> Option<T> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let opened = self.opened.notified();
            if let Some(found) = lookup() {
                return Some(found);
            }
            if tokio::time::timeout_at(deadline, opened).await.is_err() {
                return lookup();
            }
        }
    }

    fn open(&self) -> (EventSender, EventStream) {
        let (sender, receiver) = unbounded();
        (EventSender { sender }, Box::pin(receiver))
    }
}

#[async_trait]
impl StreamSource for ChannelSource {
    async fn open_planner(&self, topic: &str) -> Result<EventStream, PipelineError> {
        let (sender, stream) = self.open();
        {
            let mut state = self.state.lock();
            if let Some(message) = state.planner_failure.clone() {
                return Err(PipelineError::ProviderRequestFailed(message));
            }
            state.planners.push((topic.to_string(), sender));
        }
        self.opened.notify_waiters();
        Ok(stream)
    }

    async fn open_content(&self, request: &ContentRequest) -> Result<EventStream, PipelineError> {
        let (sender, stream) = self.open();
        {
            let mut state = self.state.lock();
            if let Some(message) = state.content_failures.get(&request.entity_id).cloned() {
                return Err(PipelineError::ProviderRequestFailed(message));
            }
            state.contents.push((request.clone(), sender));
        }
        self.opened.notify_waiters();
        Ok(stream)
    }
}
