//! Pagewright: Progressive Layout-and-Content Generation
//!
//! A planner stream emits page layout markup chunk by chunk. Every chunk re-parses the
//! accumulated markup, and each section that has become fully closed gets exactly one
//! content stream of its own, so the page fills in while the layout is still arriving.

pub mod cli;
pub mod config;
pub mod error;
pub mod layout;
pub mod logging;
pub mod pipeline;
pub mod prompt;
pub mod provider;
pub mod source;
pub mod stream;

pub use error::PipelineError;
pub use layout::{parse, Entity, LayoutDocument, ParseOutcome};
pub use pipeline::{DisposeHandle, PageView, PipelineController, PlannerStatus};
pub use source::StreamSource;
pub use stream::{ContentRequest, EventStream, StreamEvent};
