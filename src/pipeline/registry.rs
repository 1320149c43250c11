//! Entity registry: the single point of at-most-once dispatch.
//!
//! One registry lives for exactly one session. It is cleared only by that session's
//! disposal; the parser and the content stream manager never consult it.

use crate::layout::Entity;
use std::collections::HashSet;
use tracing::debug;

#[derive(Debug, Default)]
pub struct EntityRegistry {
    seen: HashSet<String>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true the first time an id is offered, marking it seen.
    pub fn is_new(&mut self, entity_id: &str) -> bool {
        self.seen.insert(entity_id.to_string())
    }

    /// Keep only entities never seen before, in the given order.
    ///
    /// Duplicates within the same batch are filtered too.
    pub fn filter_unprocessed(&mut self, entities: Vec<Entity>) -> Vec<Entity> {
        let offered = entities.len();
        let fresh: Vec<Entity> = entities
            .into_iter()
            .filter(|entity| self.is_new(&entity.id))
            .collect();
        if !fresh.is_empty() {
            debug!(offered, fresh = fresh.len(), "Registry accepted new entities");
        }
        fresh
    }

    pub fn contains(&self, entity_id: &str) -> bool {
        self.seen.contains(entity_id)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.seen.clear();
    }
}
