//! Prompt construction for the planner and content streams.

use crate::provider::ChatMessage;
use crate::stream::ContentRequest;

const PLANNER_INSTRUCTIONS: &str = r#"You lay out web pages. Reply with markup only, no prose and no code fences.

Grammar:
- Optionally start with <title>Page title</title> and <hero><headline>..</headline><subheadline>..</subheadline></hero>.
- Group sections in containers: <row layout="full"> or <grid columns="3">.
- Each section is <section id="unique-id" kind="text" size="half"><title>..</title><description>..</description></section>.
- kind is one of: text, list, table, quote, code, image.
- size is one of: full, two-thirds, half, third, quarter, auto.
- Close every element you open. Keep ids unique across the page.
- Descriptions say what the section should contain; the content itself is written later."#;

const CONTENT_INSTRUCTIONS: &str = "You write one section of a web page. Reply with the section body only, \
as plain markdown. Do not repeat the section title. Match the length to the size hint.";

/// Messages that open the planner stream for `topic`.
pub fn planner_messages(topic: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(PLANNER_INSTRUCTIONS),
        ChatMessage::user(format!("Plan a page about: {}", topic.trim())),
    ]
}

/// Messages that open the content stream for one section.
pub fn content_messages(request: &ContentRequest) -> Vec<ChatMessage> {
    let mut brief = format!(
        "Page topic: {}\nSection title: {}\nSection kind: {}\nSize: {}",
        request.topic.trim(),
        request.title,
        request.kind,
        request.size_hint.as_str(),
    );
    if !request.description.is_empty() {
        brief.push_str("\nWhat to cover: ");
        brief.push_str(&request.description);
    }
    vec![
        ChatMessage::system(CONTENT_INSTRUCTIONS),
        ChatMessage::user(brief),
    ]
}
