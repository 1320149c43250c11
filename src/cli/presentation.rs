//! CLI presentation: render pages and parse results for the terminal.

use crate::layout::{LayoutDocument, ParseOutcome};
use crate::pipeline::{ContentState, ContentStatus, PageView, PlannerStatus};
use owo_colors::OwoColorize;
use serde::Serialize;
use std::sync::Arc;

/// Everything needed to render a page, captured at one instant.
#[derive(Debug, Clone, Serialize)]
pub struct PageSnapshot {
    pub topic: String,
    pub planner: PlannerStatus,
    pub layout: Arc<LayoutDocument>,
    pub content: Vec<(String, ContentState)>,
    /// True when the wait for unfinished streams gave up.
    pub timed_out: bool,
}

impl PageSnapshot {
    pub fn capture(view: &PageView, timed_out: bool) -> Self {
        Self {
            topic: view.topic(),
            planner: view.planner_status(),
            layout: view.current_layout(),
            content: view.content_states(),
            timed_out,
        }
    }

    fn content(&self, entity_id: &str) -> Option<&ContentState> {
        self.content
            .iter()
            .find(|(id, _)| id == entity_id)
            .map(|(_, state)| state)
    }
}

fn paint<F>(text: &str, color: bool, style: F) -> String
where
    F: FnOnce(&str) -> String,
{
    if color {
        style(text)
    } else {
        text.to_string()
    }
}

pub fn format_page_text(page: &PageSnapshot, color: bool) -> String {
    let mut out = String::new();
    let layout = &page.layout;

    let title = layout.title.as_deref().unwrap_or(page.topic.as_str());
    out.push_str(&paint(title, color, |t| t.bold().underline().to_string()));
    out.push('\n');

    if let Some(hero) = &layout.hero {
        out.push('\n');
        out.push_str(&paint(&hero.headline, color, |t| t.bold().to_string()));
        out.push('\n');
        if !hero.subheadline.is_empty() {
            out.push_str(&paint(&hero.subheadline, color, |t| t.dimmed().to_string()));
            out.push('\n');
        }
    }

    for entity in layout.entities() {
        out.push('\n');
        let heading = if entity.title.is_empty() {
            format!("## [{}]", entity.id)
        } else {
            format!("## {}", entity.title)
        };
        out.push_str(&paint(&heading, color, |t| t.bold().to_string()));
        out.push('\n');

        match page.content(&entity.id) {
            Some(state) if state.status == ContentStatus::Error => {
                if !state.accumulated_text.is_empty() {
                    out.push_str(state.accumulated_text.trim_end());
                    out.push('\n');
                }
                let message = format!(
                    "[error: {}]",
                    state.error.as_deref().unwrap_or("content stream failed")
                );
                out.push_str(&paint(&message, color, |t| t.red().to_string()));
                out.push('\n');
            }
            Some(state) if state.status == ContentStatus::Complete => {
                out.push_str(state.accumulated_text.trim_end());
                out.push('\n');
            }
            Some(state) => {
                if !state.accumulated_text.is_empty() {
                    out.push_str(state.accumulated_text.trim_end());
                    out.push('\n');
                }
                let status = format!("[{}]", state.status.as_str());
                out.push_str(&paint(&status, color, |t| t.yellow().to_string()));
                out.push('\n');
            }
            None => {
                out.push_str(&paint("[not started]", color, |t| t.yellow().to_string()));
                out.push('\n');
            }
        }
    }

    let footer = match &page.planner {
        PlannerStatus::Failed(error) => Some(format!("Layout stream failed: {}", error)),
        PlannerStatus::Cancelled => Some("Layout stream was cancelled".to_string()),
        PlannerStatus::Streaming | PlannerStatus::Complete => None,
    };
    if let Some(footer) = footer {
        out.push('\n');
        out.push_str(&paint(&footer, color, |t| t.red().to_string()));
        out.push('\n');
    }
    if page.timed_out {
        out.push('\n');
        out.push_str(&paint(
            "Page is incomplete: gave up waiting for open streams",
            color,
            |t| t.yellow().to_string(),
        ));
        out.push('\n');
    }

    out.trim_end().to_string()
}

pub fn format_page_json(page: &PageSnapshot) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(page)
}

pub fn format_parse_json(outcome: &ParseOutcome, pretty: bool) -> Result<String, serde_json::Error> {
    if pretty {
        serde_json::to_string_pretty(outcome)
    } else {
        serde_json::to_string(outcome)
    }
}
