//! Append-only accumulator for planner chunks.

/// Growing planner text. Chunks are only ever appended; the buffer is emptied once, when
/// the owning session is disposed.
#[derive(Debug, Default, Clone)]
pub struct ChunkBuffer {
    text: String,
    chunks: usize,
}

impl ChunkBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, chunk: &str) {
        self.text.push_str(chunk);
        self.chunks += 1;
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Number of chunks appended so far.
    pub fn chunk_count(&self) -> usize {
        self.chunks
    }

    pub(crate) fn clear(&mut self) {
        self.text.clear();
        self.chunks = 0;
    }
}
