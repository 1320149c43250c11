//! Session state machine.
//!
//! One `PipelineCore` per session holds the chunk buffer, the registry, the content stream
//! manager, and the latest layout. Every stream callback goes through it under one lock,
//! and every callback checks the disposed latch before touching anything.

use crate::layout::{parse, LayoutDocument};
use crate::pipeline::buffer::ChunkBuffer;
use crate::pipeline::content::{ContentLauncher, ContentState, ContentStreamManager, StreamHandle};
use crate::pipeline::registry::EntityRegistry;
use crate::stream::StreamEvent;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

/// Progress of the planner stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "error")]
pub enum PlannerStatus {
    Streaming,
    Complete,
    Failed(String),
    /// Disposed while the planner was still streaming.
    Cancelled,
}

impl PlannerStatus {
    pub fn is_streaming(&self) -> bool {
        matches!(self, PlannerStatus::Streaming)
    }
}

pub struct PipelineCore {
    topic: String,
    buffer: ChunkBuffer,
    registry: EntityRegistry,
    content: ContentStreamManager,
    layout: Arc<LayoutDocument>,
    planner: PlannerStatus,
    planner_handle: Option<Box<dyn StreamHandle>>,
    disposed: bool,
    revision: watch::Sender<u64>,
}

impl PipelineCore {
    pub fn new(topic: impl Into<String>, launcher: Box<dyn ContentLauncher>) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            topic: topic.into(),
            buffer: ChunkBuffer::new(),
            registry: EntityRegistry::new(),
            content: ContentStreamManager::new(launcher),
            layout: Arc::new(LayoutDocument::default()),
            planner: PlannerStatus::Streaming,
            planner_handle: None,
            disposed: false,
            revision,
        }
    }

    /// Record the planner stream handle. Closed straight away if the planner already
    /// finished or the session is gone.
    pub fn attach_planner(&mut self, mut handle: Box<dyn StreamHandle>) {
        if self.disposed || !self.planner.is_streaming() {
            handle.close();
            return;
        }
        self.planner_handle = Some(handle);
    }

    pub fn on_planner_event(&mut self, event: StreamEvent) {
        if self.disposed {
            trace!(topic = %self.topic, "Dropping planner event after dispose");
            return;
        }
        if !self.planner.is_streaming() {
            trace!(topic = %self.topic, "Dropping planner event after planner finished");
            return;
        }

        match event {
            StreamEvent::Content(chunk) => self.ingest_planner_chunk(&chunk),
            StreamEvent::Done => {
                info!(
                    topic = %self.topic,
                    chunks = self.buffer.chunk_count(),
                    entities = self.registry.len(),
                    "Planner stream complete"
                );
                self.finish_planner(PlannerStatus::Complete);
            }
            StreamEvent::Error(message) => {
                warn!(topic = %self.topic, error = %message, "Planner stream failed; keeping partial layout");
                self.finish_planner(PlannerStatus::Failed(message));
            }
        }
    }

    fn ingest_planner_chunk(&mut self, chunk: &str) {
        self.buffer.append(chunk);
        let outcome = parse(self.buffer.as_str());
        self.layout = Arc::new(outcome.document);

        for entity in self.registry.filter_unprocessed(outcome.closed) {
            self.content.start(&entity, &self.topic);
        }
        self.bump();
    }

    fn finish_planner(&mut self, status: PlannerStatus) {
        self.planner = status;
        if let Some(mut handle) = self.planner_handle.take() {
            handle.close();
        }
        self.bump();
    }

    pub fn on_content_event(&mut self, entity_id: &str, event: StreamEvent) {
        if self.disposed {
            trace!(entity_id, "Dropping content event after dispose");
            return;
        }
        if self.content.apply(entity_id, event) {
            self.bump();
        }
    }

    /// Tear down the session. Returns false if it was already disposed.
    pub fn dispose(&mut self) -> bool {
        if self.disposed {
            return false;
        }
        self.disposed = true;

        if let Some(mut handle) = self.planner_handle.take() {
            handle.close();
        }
        if self.planner.is_streaming() {
            self.planner = PlannerStatus::Cancelled;
        }
        let open_streams = self.content.open_count();
        self.content.clear();
        self.registry.clear();
        self.buffer.clear();
        self.layout = Arc::new(LayoutDocument::default());

        debug!(topic = %self.topic, open_streams, "Session state cleared");
        self.bump();
        true
    }

    fn bump(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn layout(&self) -> Arc<LayoutDocument> {
        Arc::clone(&self.layout)
    }

    pub fn content_state(&self, entity_id: &str) -> Option<ContentState> {
        self.content.state(entity_id).cloned()
    }

    pub fn content_states(&self) -> Vec<(String, ContentState)> {
        self.content.states()
    }

    pub fn planner_status(&self) -> PlannerStatus {
        self.planner.clone()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Live while not disposed and either the planner or any content stream is open.
    pub fn is_active(&self) -> bool {
        !self.disposed && (self.planner.is_streaming() || self.content.open_count() > 0)
    }

    pub fn open_content_streams(&self) -> usize {
        self.content.open_count()
    }

    pub fn dispatched_count(&self) -> usize {
        self.content.dispatched_count()
    }

    pub fn buffered_bytes(&self) -> usize {
        self.buffer.len()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }
}
