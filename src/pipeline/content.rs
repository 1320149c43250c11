//! Content stream manager
//!
//! Opens one content stream per dispatched entity, folds its chunks into a per-entity
//! [`ContentState`], and closes the stream on its terminal event. The manager owns both
//! the open handles and the states; everyone else reads clones.

use crate::layout::{Entity, EntityPhase};
use crate::stream::{ContentRequest, StreamEvent};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, trace, warn};

/// An open stream that can be closed. Closing must be idempotent.
pub trait StreamHandle: Send {
    fn close(&mut self);
}

/// Opens content streams. Events for the opened stream are delivered back to the
/// manager through [`ContentStreamManager::apply`].
pub trait ContentLauncher: Send {
    fn launch(&mut self, request: ContentRequest) -> Box<dyn StreamHandle>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
    Pending,
    Streaming,
    Complete,
    Error,
}

impl ContentStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ContentStatus::Complete | ContentStatus::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ContentStatus::Pending => "pending",
            ContentStatus::Streaming => "streaming",
            ContentStatus::Complete => "complete",
            ContentStatus::Error => "error",
        }
    }
}

/// Generated content for one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentState {
    /// Append-only until the stream is terminal.
    pub accumulated_text: String,
    pub status: ContentStatus,
    pub error: Option<String>,
    pub chunk_count: usize,
}

impl ContentState {
    fn pending() -> Self {
        Self {
            accumulated_text: String::new(),
            status: ContentStatus::Pending,
            error: None,
            chunk_count: 0,
        }
    }

    /// Entity lifecycle phase implied by this state.
    pub fn phase(&self) -> EntityPhase {
        match self.status {
            ContentStatus::Pending => EntityPhase::Dispatched,
            ContentStatus::Streaming => EntityPhase::Streaming,
            ContentStatus::Complete => EntityPhase::Complete,
            ContentStatus::Error => EntityPhase::Errored,
        }
    }
}

pub struct ContentStreamManager {
    launcher: Box<dyn ContentLauncher>,
    handles: HashMap<String, Box<dyn StreamHandle>>,
    states: HashMap<String, ContentState>,
    /// Dispatch order, for ordered snapshots.
    order: Vec<String>,
}

impl ContentStreamManager {
    pub fn new(launcher: Box<dyn ContentLauncher>) -> Self {
        Self {
            launcher,
            handles: HashMap::new(),
            states: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Open the content stream for `entity`.
    ///
    /// A second start for the same id is ignored, even though the registry should never
    /// let one through. Returns whether a stream was opened.
    pub fn start(&mut self, entity: &Entity, topic: &str) -> bool {
        if self.handles.contains_key(&entity.id) || self.states.contains_key(&entity.id) {
            warn!(entity_id = %entity.id, "Ignoring duplicate content stream start");
            return false;
        }

        let request = ContentRequest::for_entity(entity, topic);
        debug!(
            entity_id = %entity.id,
            kind = %entity.kind,
            size_hint = entity.size_hint.as_str(),
            "Opening content stream"
        );
        let handle = self.launcher.launch(request);
        self.handles.insert(entity.id.clone(), handle);
        self.states.insert(entity.id.clone(), ContentState::pending());
        self.order.push(entity.id.clone());
        true
    }

    /// Apply one event from an entity's stream. Returns whether any state changed.
    ///
    /// Events for an id without an open handle (already terminal, closed, or unknown)
    /// are dropped.
    pub fn apply(&mut self, entity_id: &str, event: StreamEvent) -> bool {
        if !self.handles.contains_key(entity_id) {
            trace!(entity_id, "Dropping event for closed content stream");
            return false;
        }
        let Some(state) = self.states.get_mut(entity_id) else {
            return false;
        };

        match event {
            StreamEvent::Content(chunk) => {
                state.accumulated_text.push_str(&chunk);
                state.chunk_count += 1;
                state.status = ContentStatus::Streaming;
                return true;
            }
            StreamEvent::Done => {
                state.status = ContentStatus::Complete;
                debug!(
                    entity_id,
                    chunks = state.chunk_count,
                    bytes = state.accumulated_text.len(),
                    "Content stream complete"
                );
            }
            StreamEvent::Error(message) => {
                warn!(entity_id, error = %message, "Content stream failed");
                state.status = ContentStatus::Error;
                state.error = Some(message);
            }
        }

        if let Some(mut handle) = self.handles.remove(entity_id) {
            handle.close();
        }
        true
    }

    pub fn state(&self, entity_id: &str) -> Option<&ContentState> {
        self.states.get(entity_id)
    }

    /// All states in dispatch order.
    pub fn states(&self) -> Vec<(String, ContentState)> {
        self.order
            .iter()
            .filter_map(|id| self.states.get(id).map(|s| (id.clone(), s.clone())))
            .collect()
    }

    pub fn is_open(&self, entity_id: &str) -> bool {
        self.handles.contains_key(entity_id)
    }

    pub fn open_count(&self) -> usize {
        self.handles.len()
    }

    pub fn dispatched_count(&self) -> usize {
        self.order.len()
    }

    /// Close every open stream. States are kept.
    pub fn close_all(&mut self) {
        let open = self.handles.len();
        for (_, mut handle) in self.handles.drain() {
            handle.close();
        }
        if open > 0 {
            debug!(open, "Closed open content streams");
        }
    }

    /// Drop all states. Only valid once every handle is closed.
    pub(crate) fn clear(&mut self) {
        self.close_all();
        self.states.clear();
        self.order.clear();
    }
}
