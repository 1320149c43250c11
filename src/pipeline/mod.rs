//! Progressive generation pipeline
//!
//! Planner chunk -> [`ChunkBuffer`] -> [`crate::layout::parse`] -> [`EntityRegistry`] ->
//! [`ContentStreamManager::start`] for each entity seen for the first time. The
//! [`PipelineController`] owns the session lifecycle; [`PageView`] is the read surface.

pub mod buffer;
pub mod content;
pub mod controller;
pub mod session;
pub mod registry;

pub use buffer::ChunkBuffer;
pub use content::{ContentLauncher, ContentState, ContentStatus, ContentStreamManager, StreamHandle};
pub use controller::{DisposeHandle, PageView, PipelineController, TaskHandle};
pub use session::{PipelineCore, PlannerStatus};
pub use registry::EntityRegistry;
