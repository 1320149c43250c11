//! Property-based tests for at-most-once dispatch and append-only content

use super::support::{page_strategy, render, split_at_fractions};
use pagewright::layout::parse;
use pagewright::pipeline::{ContentLauncher, ContentStatus, PipelineCore, StreamHandle};
use pagewright::{ContentRequest, StreamEvent};
use proptest::prelude::*;
use std::sync::{Arc, Mutex};

struct NoopHandle;

impl StreamHandle for NoopHandle {
    fn close(&mut self) {}
}

#[derive(Clone, Default)]
struct CountingLauncher {
    launched: Arc<Mutex<Vec<String>>>,
}

impl ContentLauncher for CountingLauncher {
    fn launch(&mut self, request: ContentRequest) -> Box<dyn StreamHandle> {
        self.launched.lock().unwrap().push(request.entity_id);
        Box::new(NoopHandle)
    }
}

fn chunk_events() -> impl Strategy<Value = Vec<StreamEvent>> {
    prop::collection::vec(
        prop_oneof![
            6 => "[a-z ]{0,8}".prop_map(StreamEvent::Content),
            1 => Just(StreamEvent::Done),
            1 => "[a-z]{1,8}".prop_map(StreamEvent::Error),
        ],
        0..20,
    )
}

/// However the planner output is chunked, each entity is started exactly once and in
/// document order.
#[test]
fn test_each_entity_is_dispatched_exactly_once() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(page_strategy(), prop::collection::vec(0.0f64..=1.0, 0..12)),
            |(page, cuts)| {
                let markup = render(&page);
                let launcher = CountingLauncher::default();
                let mut core = PipelineCore::new("topic", Box::new(launcher.clone()));

                for chunk in split_at_fractions(&markup, &cuts) {
                    core.on_planner_event(StreamEvent::Content(chunk));
                }
                // re-delivering the whole page again must not dispatch anything new
                core.on_planner_event(StreamEvent::Content(String::new()));
                core.on_planner_event(StreamEvent::Done);

                let expected: Vec<String> = parse(&markup).closed.into_iter().map(|e| e.id).collect();
                let launched = launcher.launched.lock().unwrap().clone();
                prop_assert_eq!(&launched, &expected);
                prop_assert_eq!(core.dispatched_count(), expected.len());
                Ok(())
            },
        )
        .unwrap();
}

/// Accumulated text only ever grows until the stream is terminal, then never changes.
#[test]
fn test_content_is_append_only() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&chunk_events(), |events| {
            let launcher = CountingLauncher::default();
            let mut core = PipelineCore::new("topic", Box::new(launcher));
            core.on_planner_event(StreamEvent::Content(
                r#"<section id="x"><title>X</title></section>"#.to_string(),
            ));
            prop_assert!(core.content_state("x").is_some());

            let mut previous = core.content_state("x").unwrap();
            for event in events {
                core.on_content_event("x", event);
                let current = core.content_state("x").unwrap();
                if previous.status.is_terminal() {
                    prop_assert_eq!(&current, &previous);
                } else {
                    prop_assert!(current.accumulated_text.starts_with(&previous.accumulated_text));
                    prop_assert!(current.chunk_count >= previous.chunk_count);
                }
                if current.status == ContentStatus::Error {
                    prop_assert!(current.error.is_some());
                }
                previous = current;
            }
            Ok(())
        })
        .unwrap();
}

/// After dispose, no planner or content event changes anything.
#[test]
fn test_nothing_changes_after_dispose() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&(page_strategy(), chunk_events()), |(page, events)| {
            let markup = render(&page);
            let launcher = CountingLauncher::default();
            let mut core = PipelineCore::new("topic", Box::new(launcher.clone()));
            core.on_planner_event(StreamEvent::Content(markup.clone()));
            prop_assert!(core.dispose());
            prop_assert!(!core.dispose());

            let launched_before = launcher.launched.lock().unwrap().len();
            let revision = *core.subscribe().borrow();
            core.on_planner_event(StreamEvent::Content(markup));
            for event in events {
                core.on_content_event("s0", event);
            }

            prop_assert_eq!(*core.subscribe().borrow(), revision);
            prop_assert_eq!(launcher.launched.lock().unwrap().len(), launched_before);
            prop_assert!(core.layout().is_empty());
            prop_assert!(core.content_states().is_empty());
            prop_assert!(!core.is_active());
            Ok(())
        })
        .unwrap();
}
