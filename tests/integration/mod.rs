//! Integration tests for the progressive page generation pipeline

mod content_streams;
mod model_providers;
mod pipeline_lifecycle;
mod test_utils;
