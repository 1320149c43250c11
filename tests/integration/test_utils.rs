//! Shared helpers for driving a session through a hand-fed source.

use pagewright::pipeline::{DisposeHandle, PageView, PipelineController};
use pagewright::source::{ChannelSource, EventSender};
use std::sync::Arc;
use std::time::Duration;

pub const WAIT: Duration = Duration::from_secs(5);

pub struct Harness {
    pub source: ChannelSource,
    pub controller: PipelineController,
}

impl Harness {
    pub fn new() -> Self {
        let source = ChannelSource::new();
        let controller = PipelineController::new(Arc::new(source.clone()));
        Self { source, controller }
    }

    /// Begin a session and wait for its planner stream to open.
    pub async fn begin(&self, key: &str) -> (DisposeHandle, EventSender) {
        let opened = self.source.planner_open_count();
        let handle = self.controller.begin(key).expect("begin");
        let planner = self
            .source
            .wait_for_planner(opened, WAIT)
            .await
            .expect("planner stream opened");
        (handle, planner)
    }

    pub async fn content(&self, entity_id: &str) -> EventSender {
        self.source
            .wait_for_content(entity_id, WAIT)
            .await
            .unwrap_or_else(|| panic!("content stream for {} opened", entity_id))
    }
}

/// Wait until `condition` holds for the view, re-checking on every revision.
pub async fn wait_until<F>(view: &PageView, condition: F)
where
    F: Fn(&PageView) -> bool,
{
    let mut revisions = view.subscribe();
    let deadline = tokio::time::Instant::now() + WAIT;
    loop {
        if condition(view) {
            return;
        }
        tokio::time::timeout_at(deadline, revisions.changed())
            .await
            .expect("condition reached before timeout")
            .expect("session alive");
    }
}

/// Wait until the consumer side of `sender` has been dropped.
pub async fn wait_closed(sender: &EventSender) {
    let deadline = tokio::time::Instant::now() + WAIT;
    while !sender.is_closed() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "stream was not closed in time"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Let spawned pump tasks run whatever they have queued.
pub async fn drain() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    tokio::time::sleep(Duration::from_millis(20)).await;
}
