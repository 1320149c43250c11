//! Stream events
//!
//! Both the planner stream and every content stream deliver the same shape: ordered text
//! chunks followed by exactly one terminal `done` or `error`. Loosely typed wire payloads
//! are validated into [`StreamEvent`] at the boundary so the pipeline never inspects raw
//! fields.

use crate::error::PipelineError;
use crate::layout::{Entity, SizeHint};
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// One event delivered by a planner or content stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Content(String),
    Done,
    Error(String),
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamEvent::Content(_))
    }

    /// Decode a JSON wire payload.
    ///
    /// Accepted shapes: `{"type":"content","content":".."}`, `{"type":"done"}`,
    /// `{"type":"error","message":".."}`.
    pub fn from_json(payload: &str) -> Result<Self, PipelineError> {
        let wire: WireEvent = serde_json::from_str(payload)?;
        Ok(wire.into())
    }

    /// Like [`StreamEvent::from_json`], but folds an undecodable payload into an error event.
    pub fn from_json_lossy(payload: &str) -> Self {
        Self::from_json(payload).unwrap_or_else(|e| StreamEvent::Error(e.to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireEvent {
    Content {
        #[serde(alias = "text", alias = "delta")]
        content: String,
    },
    Done,
    Error {
        #[serde(default = "unknown_error", alias = "error")]
        message: String,
    },
}

fn unknown_error() -> String {
    "unknown stream error".to_string()
}

impl From<WireEvent> for StreamEvent {
    fn from(wire: WireEvent) -> Self {
        match wire {
            WireEvent::Content { content } => StreamEvent::Content(content),
            WireEvent::Done => StreamEvent::Done,
            WireEvent::Error { message } => StreamEvent::Error(message),
        }
    }
}

/// Ordered event stream. Ending without a terminal event counts as `Done`.
pub type EventStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

/// Parameters of one content-generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRequest {
    pub entity_id: String,
    pub title: String,
    pub description: String,
    pub kind: String,
    pub size_hint: SizeHint,
    /// Page-level topic the planner stream was opened for.
    pub topic: String,
}

impl ContentRequest {
    pub fn for_entity(entity: &Entity, topic: &str) -> Self {
        Self {
            entity_id: entity.id.clone(),
            title: entity.title.clone(),
            description: entity.description.clone(),
            kind: entity.kind.clone(),
            size_hint: entity.size_hint,
            topic: topic.to_string(),
        }
    }
}
