//! Integration tests for per-entity content streams

use super::test_utils::{drain, wait_until, Harness, WAIT};
use pagewright::pipeline::{ContentStatus, PlannerStatus};
use pagewright::StreamEvent;

const TWO_SECTIONS: &str = concat!(
    r#"<row layout="two-column">"#,
    r#"<section id="left"><title>Left</title></section>"#,
    r#"<section id="right"><title>Right</title></section>"#,
    r#"</row>"#
);

#[tokio::test]
async fn test_content_accumulates_until_done() {
    let harness = Harness::new();
    let (handle, planner) = harness.begin("page").await;
    let view = handle.view();

    planner.chunk(TWO_SECTIONS);
    let left = harness.content("left").await;

    let mut seen = String::new();
    for chunk in ["Tides ", "rise ", "twice."] {
        left.chunk(chunk);
        seen.push_str(chunk);
        let expected = seen.clone();
        wait_until(&view, move |v| {
            v.content_state("left")
                .map(|s| s.accumulated_text == expected)
                .unwrap_or(false)
        })
        .await;
        assert_eq!(
            view.content_state("left").unwrap().status,
            ContentStatus::Streaming
        );
    }

    left.done();
    wait_until(&view, |v| {
        v.content_state("left").map(|s| s.status) == Some(ContentStatus::Complete)
    })
    .await;

    let state = view.content_state("left").unwrap();
    assert_eq!(state.accumulated_text, "Tides rise twice.");
    assert_eq!(state.chunk_count, 3);
    assert!(state.error.is_none());
    handle.dispose();
}

#[tokio::test]
async fn test_one_failing_stream_does_not_affect_siblings() {
    let harness = Harness::new();
    let (handle, planner) = harness.begin("page").await;
    let view = handle.view();

    planner.chunk(TWO_SECTIONS);
    planner.done();
    let left = harness.content("left").await;
    let right = harness.content("right").await;

    left.chunk("half a sen");
    left.error("model overloaded");
    right.chunk("Whole.");
    right.done();
    view.wait_until_settled(WAIT).await.unwrap();

    let left_state = view.content_state("left").unwrap();
    assert_eq!(left_state.status, ContentStatus::Error);
    assert_eq!(left_state.error.as_deref(), Some("model overloaded"));
    assert_eq!(left_state.accumulated_text, "half a sen");

    let right_state = view.content_state("right").unwrap();
    assert_eq!(right_state.status, ContentStatus::Complete);
    assert_eq!(right_state.accumulated_text, "Whole.");
    assert_eq!(view.planner_status(), PlannerStatus::Complete);
    handle.dispose();
}

#[tokio::test]
async fn test_content_open_failure_marks_only_that_entity() {
    let harness = Harness::new();
    harness.source.fail_content_open("left", "quota exhausted");
    let (handle, planner) = harness.begin("page").await;
    let view = handle.view();

    planner.chunk(TWO_SECTIONS);
    let right = harness.content("right").await;
    wait_until(&view, |v| {
        v.content_state("left").map(|s| s.status) == Some(ContentStatus::Error)
    })
    .await;

    let left_state = view.content_state("left").unwrap();
    assert!(left_state
        .error
        .as_deref()
        .unwrap_or_default()
        .contains("quota exhausted"));
    assert!(view.is_pipeline_active());

    right.done();
    planner.done();
    view.wait_until_settled(WAIT).await.unwrap();
    assert_eq!(
        view.content_state("right").unwrap().status,
        ContentStatus::Complete
    );
    handle.dispose();
}

#[tokio::test]
async fn test_stream_ending_without_terminal_event_completes() {
    let harness = Harness::new();
    let (handle, planner) = harness.begin("page").await;
    let view = handle.view();

    planner.chunk(TWO_SECTIONS);
    let left = harness.content("left").await;
    left.chunk("all there is");
    left.hang_up();
    planner.hang_up();

    wait_until(&view, |v| {
        v.content_state("left").map(|s| s.status) == Some(ContentStatus::Complete)
    })
    .await;
    wait_until(&view, |v| v.planner_status() == PlannerStatus::Complete).await;
    assert_eq!(
        view.content_state("left").unwrap().accumulated_text,
        "all there is"
    );
    handle.dispose();
}

#[tokio::test]
async fn test_events_after_terminal_are_ignored() {
    let harness = Harness::new();
    let (handle, planner) = harness.begin("page").await;
    let view = handle.view();

    planner.chunk(TWO_SECTIONS);
    let left = harness.content("left").await;
    left.send(StreamEvent::Content("final".to_string()));
    left.send(StreamEvent::Done);
    left.send(StreamEvent::Content(" extra".to_string()));
    left.send(StreamEvent::Error("late".to_string()));

    wait_until(&view, |v| {
        v.content_state("left").map(|s| s.status) == Some(ContentStatus::Complete)
    })
    .await;
    drain().await;

    let state = view.content_state("left").unwrap();
    assert_eq!(state.accumulated_text, "final");
    assert_eq!(state.status, ContentStatus::Complete);
    assert!(state.error.is_none());
    handle.dispose();
}

#[tokio::test]
async fn test_pipeline_stays_active_until_every_stream_is_terminal() {
    let harness = Harness::new();
    let (handle, planner) = harness.begin("page").await;
    let view = handle.view();

    planner.chunk(TWO_SECTIONS);
    planner.done();
    let left = harness.content("left").await;
    let right = harness.content("right").await;
    wait_until(&view, |v| v.planner_status() == PlannerStatus::Complete).await;
    assert!(view.is_pipeline_active());

    left.done();
    wait_until(&view, |v| {
        v.content_state("left").map(|s| s.status) == Some(ContentStatus::Complete)
    })
    .await;
    assert!(view.is_pipeline_active());

    right.done();
    view.wait_until_settled(WAIT).await.unwrap();
    assert!(!view.is_pipeline_active());

    let order: Vec<String> = view.content_states().into_iter().map(|(id, _)| id).collect();
    assert_eq!(order, vec!["left".to_string(), "right".to_string()]);
    handle.dispose();
}
