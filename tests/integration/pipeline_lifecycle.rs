//! Integration tests for session lifecycle: begin, dispatch, dispose

use super::test_utils::{drain, wait_closed, wait_until, Harness, WAIT};
use pagewright::error::PipelineError;
use pagewright::layout::SizeHint;
use pagewright::pipeline::{PipelineController, PlannerStatus};
use pagewright::source::ChannelSource;
use std::sync::Arc;

const ONE_SECTION: &str =
    r#"<row layout="full"><section id="1"><title>A</title><description>d</description></section>"#;

#[tokio::test]
async fn test_closed_section_starts_exactly_one_content_stream() {
    let harness = Harness::new();
    let (handle, planner) = harness.begin("page").await;
    let view = handle.view();

    planner.chunk(ONE_SECTION);
    harness.content("1").await;
    drain().await;

    let requests = harness.source.content_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].entity_id, "1");
    assert_eq!(requests[0].title, "A");
    assert_eq!(requests[0].description, "d");
    assert_eq!(requests[0].topic, "page");

    let layout = view.current_layout();
    assert_eq!(layout.entity_count(), 1);
    assert_eq!(layout.entity("1").map(|e| e.title.as_str()), Some("A"));
    handle.dispose();
}

#[tokio::test]
async fn test_truncated_section_waits_for_its_close_tag() {
    let harness = Harness::new();
    let (handle, planner) = harness.begin("page").await;
    let view = handle.view();

    planner.chunk(r#"<row layout="full"><section id="1"><title>A</title><description>d</description>"#);
    wait_until(&view, |v| v.current_layout().containers.len() == 1).await;
    drain().await;
    assert_eq!(harness.source.content_requests().len(), 0);
    assert_eq!(view.current_layout().entity_count(), 0);

    planner.chunk("</section>");
    harness.content("1").await;
    planner.chunk(r#"<section id="2"><title>B</title></section></row>"#);
    harness.content("2").await;
    drain().await;

    assert_eq!(harness.source.content_open_count("1"), 1);
    assert_eq!(harness.source.content_open_count("2"), 1);
    let ids: Vec<String> = view
        .current_layout()
        .entities()
        .map(|e| e.id.clone())
        .collect();
    assert_eq!(ids, vec!["1".to_string(), "2".to_string()]);
    handle.dispose();
}

#[tokio::test]
async fn test_char_by_char_planner_dispatches_each_entity_once() {
    let harness = Harness::new();
    let (handle, planner) = harness.begin("page").await;
    let view = handle.view();

    let markup = concat!(
        r#"<title>Tides</title><grid columns="2">"#,
        r#"<cell id="a" size="half"><title>Moon</title></cell>"#,
        r#"<cell id="b" size="half"><title>Sun</title></cell>"#,
        r#"</grid><section id="c"><title>Pools</title></section>"#
    );
    for ch in markup.chars() {
        planner.chunk(&ch.to_string());
    }
    planner.done();

    wait_until(&view, |v| v.planner_status() == PlannerStatus::Complete).await;
    for id in ["a", "b", "c"] {
        harness.content(id).await;
    }
    drain().await;

    let requested: Vec<String> = harness
        .source
        .content_requests()
        .into_iter()
        .map(|r| r.entity_id)
        .collect();
    assert_eq!(requested, vec!["a", "b", "c"]);
    assert_eq!(
        harness.source.content_requests()[0].size_hint,
        SizeHint::Half
    );
    assert_eq!(view.current_layout().title.as_deref(), Some("Tides"));
    handle.dispose();
}

#[tokio::test]
async fn test_duplicate_begin_shares_one_session() {
    let harness = Harness::new();
    let first = harness.controller.begin("page").unwrap();
    let second = harness.controller.begin("page").unwrap();

    assert_eq!(first.session_id(), second.session_id());
    harness.source.wait_for_planner(0, WAIT).await.unwrap();
    drain().await;
    assert_eq!(harness.source.planner_open_count(), 1);
    assert_eq!(harness.source.planner_topics(), vec!["page".to_string()]);

    second.dispose();
    assert!(first.is_disposed());
}

#[tokio::test]
async fn test_begin_for_another_key_replaces_the_session() {
    let harness = Harness::new();
    let (first, first_planner) = harness.begin("one").await;
    let (second, _second_planner) = harness.begin("two").await;

    assert!(first.is_disposed());
    assert!(!second.is_disposed());
    assert_ne!(first.session_id(), second.session_id());
    wait_closed(&first_planner).await;
    assert_eq!(
        harness.controller.current().map(|h| h.session_id()),
        Some(second.session_id())
    );

    harness.controller.dispose_active();
    assert!(second.is_disposed());
    assert!(harness.controller.current().is_none());
}

#[tokio::test]
async fn test_begin_again_after_dispose_opens_a_new_session() {
    let harness = Harness::new();
    let (first, _planner) = harness.begin("page").await;
    first.dispose();

    let (second, _planner) = harness.begin("page").await;
    assert_ne!(first.session_id(), second.session_id());
    assert_eq!(harness.source.planner_open_count(), 2);
    second.dispose();
}

#[tokio::test]
async fn test_dispose_tears_everything_down() {
    let harness = Harness::new();
    let (handle, planner) = harness.begin("page").await;
    let view = handle.view();

    planner.chunk(ONE_SECTION);
    let content = harness.content("1").await;
    content.chunk("partial");
    wait_until(&view, |v| {
        v.content_state("1")
            .map(|s| s.accumulated_text == "partial")
            .unwrap_or(false)
    })
    .await;

    handle.dispose();
    handle.dispose();
    assert!(handle.is_disposed());
    assert!(!view.is_pipeline_active());
    assert_eq!(view.planner_status(), PlannerStatus::Cancelled);
    assert!(view.current_layout().is_empty());
    assert!(view.content_state("1").is_none());

    wait_closed(&planner).await;
    wait_closed(&content).await;

    let revision = *view.subscribe().borrow();
    planner.chunk(r#"<section id="2"><title>B</title></section>"#);
    content.chunk(" more");
    content.done();
    drain().await;

    assert_eq!(*view.subscribe().borrow(), revision);
    assert!(view.current_layout().is_empty());
    assert!(view.content_states().is_empty());
    assert_eq!(harness.source.content_requests().len(), 1);
}

#[tokio::test]
async fn test_planner_error_keeps_partial_layout() {
    let harness = Harness::new();
    let (handle, planner) = harness.begin("page").await;
    let view = handle.view();

    planner.chunk(ONE_SECTION);
    planner.chunk(r#"<section id="2"><title>B"#);
    planner.error("connection reset");
    wait_until(&view, |v| !v.planner_status().is_streaming()).await;

    assert_eq!(
        view.planner_status(),
        PlannerStatus::Failed("connection reset".to_string())
    );
    assert_eq!(view.current_layout().entity_count(), 1);

    // the already dispatched section keeps streaming
    let content = harness.content("1").await;
    assert!(view.is_pipeline_active());
    content.chunk("body");
    content.done();
    view.wait_until_settled(WAIT).await.unwrap();
    assert_eq!(view.content_state("1").unwrap().accumulated_text, "body");
    assert_eq!(harness.source.content_open_count("2"), 0);
    handle.dispose();
}

#[tokio::test]
async fn test_planner_open_failure_fails_the_planner() {
    let harness = Harness::new();
    harness.source.fail_planner_open("backend offline");
    let handle = harness.controller.begin("page").unwrap();
    let view = handle.view();

    view.wait_until_settled(WAIT).await.unwrap();
    match view.planner_status() {
        PlannerStatus::Failed(message) => assert!(message.contains("backend offline")),
        other => panic!("expected failed planner, got {:?}", other),
    }
    assert!(view.current_layout().is_empty());
}

#[tokio::test]
async fn test_wait_until_settled_times_out_while_streaming() {
    let harness = Harness::new();
    let (handle, _planner) = harness.begin("page").await;
    let view = handle.view();

    let result = view
        .wait_until_settled(std::time::Duration::from_millis(30))
        .await;
    assert!(matches!(result, Err(PipelineError::Timeout(_))));

    handle.dispose();
    view.wait_until_settled(WAIT).await.unwrap();
}

#[test]
fn test_begin_requires_a_runtime() {
    let controller = PipelineController::new(Arc::new(ChannelSource::new()));
    let result = controller.begin("page");
    assert!(matches!(result, Err(PipelineError::RuntimeUnavailable(_))));
}
