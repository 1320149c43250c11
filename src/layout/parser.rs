//! Incremental layout parser
//!
//! A pure function over the whole planner buffer. Nothing is carried between calls: every
//! chunk re-derives the document from scratch, so a truncated tag simply contributes
//! nothing until the bytes that close it arrive.
//!
//! Recognition is delimiter matching, not tree building. Four levels are scanned:
//! document fields (`<title>`, `<hero>`), containers (`<row>`/`<grid>`), entities
//! (`<section>`/`<cell>`), and entity sub-fields (`<title>`, `<description>`). An element
//! counts only when both its start and end delimiters are present.
//!
//! An entity start tag inside a closed sub-field (`<title>Why <cell phones> matter</title>`)
//! is text. Container start tags always end a container body, and a document-level
//! `<title>` has no such protection: a structural start tag inside it marks the title as
//! unclosed.

use crate::layout::{Container, Entity, Hero, LayoutDocument, LayoutHint, SizeHint};
use regex::Regex;
use serde::Serialize;
use std::ops::Range;
use std::sync::OnceLock;

const CONTAINER_TAGS: &[&str] = &["row", "grid"];
const ENTITY_TAGS: &[&str] = &["section", "cell"];
const STRUCTURAL_TAGS: &[&str] = &["row", "grid", "section", "cell"];
const TOP_LEVEL_TAGS: &[&str] = &["row", "grid", "section", "cell", "title", "hero"];
const TEXT_FIELD_TAGS: &[&str] = &["title", "description", "headline", "subheadline"];

/// Positional ids start with this; explicit ids starting with it are escaped by doubling it.
const DERIVED_ID_PREFIX: char = '_';

const DEFAULT_KIND: &str = "text";

/// Result of one parse call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParseOutcome {
    pub document: LayoutDocument,
    /// Every closed entity in first-appearance order, duplicates included.
    pub closed: Vec<Entity>,
}

/// Parse the accumulated planner buffer.
///
/// Total: malformed or truncated input never fails, it only yields fewer entities.
pub fn parse(buffer: &str) -> ParseOutcome {
    let document = DocumentScanner::new(buffer).scan();
    let closed = document.entities().cloned().collect();
    ParseOutcome { document, closed }
}

/// A complete start tag.
#[derive(Debug, Clone, Copy)]
struct StartTag<'a> {
    name: &'static str,
    start: usize,
    /// Byte offset just past the closing `>`.
    end: usize,
    attrs: &'a str,
    self_closing: bool,
}

#[derive(Debug, Clone, Copy)]
enum TagScan<'a> {
    Found(StartTag<'a>),
    /// A start tag begins here but its `>` has not arrived yet.
    Incomplete(usize),
    NotFound,
}

impl TagScan<'_> {
    fn position(&self) -> Option<usize> {
        match self {
            TagScan::Found(tag) => Some(tag.start),
            TagScan::Incomplete(pos) => Some(*pos),
            TagScan::NotFound => None,
        }
    }
}

/// Find the next start tag named one of `names` at or after `from`, before `limit`.
fn next_start_tag<'a>(buf: &'a str, from: usize, limit: usize, names: &[&'static str]) -> TagScan<'a> {
    let region = &buf[from..limit];
    for (offset, _) in region.match_indices('<') {
        let start = from + offset;
        let rest = &buf[start + 1..limit];
        for name in names {
            if !rest.starts_with(name) {
                continue;
            }
            match rest[name.len()..].chars().next() {
                None => return TagScan::Incomplete(start),
                Some(c) if c == '>' || c == '/' || c.is_whitespace() => {}
                Some(_) => continue,
            }
            return match find_tag_end(buf, start + 1 + name.len(), limit) {
                Some(gt) => {
                    let inner = &buf[start + 1 + name.len()..gt];
                    let self_closing = inner.trim_end().ends_with('/');
                    let attrs = inner.trim_end().trim_end_matches('/');
                    TagScan::Found(StartTag {
                        name,
                        start,
                        end: gt + 1,
                        attrs,
                        self_closing,
                    })
                }
                None => TagScan::Incomplete(start),
            };
        }
    }
    TagScan::NotFound
}

/// Offset of the `>` ending a tag, skipping over quoted attribute values.
fn find_tag_end(buf: &str, from: usize, limit: usize) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (offset, c) in buf[from..limit].char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(c),
            (None, '>') => return Some(from + offset),
            (None, _) => {}
        }
    }
    None
}

/// Range of the matching `</name>` at or after `from`, before `limit`.
fn find_end_tag(buf: &str, name: &str, from: usize, limit: usize) -> Option<Range<usize>> {
    let needle = format!("</{}>", name);
    buf[from..limit]
        .find(&needle)
        .map(|offset| from + offset..from + offset + needle.len())
}

fn attribute_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"([A-Za-z_][\w:.-]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
            .expect("attribute pattern is valid")
    })
}

/// Permissive `key="value"` attribute list; order-insensitive, unknown keys retained but unused.
#[derive(Debug, Default)]
struct Attributes {
    pairs: Vec<(String, String)>,
}

impl Attributes {
    fn scan(raw: &str) -> Self {
        let pairs = attribute_pattern()
            .captures_iter(raw)
            .filter_map(|caps| {
                let key = caps.get(1)?.as_str().to_ascii_lowercase();
                let value = caps.get(2).or_else(|| caps.get(3))?.as_str();
                Some((key, decode_text(value)))
            })
            .collect();
        Self { pairs }
    }

    /// First value whose key matches any of `keys` (case-insensitive).
    fn get(&self, keys: &[&str]) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(key, _)| keys.iter().any(|k| k.eq_ignore_ascii_case(key)))
            .map(|(_, value)| value.as_str())
    }
}

/// Explicit ids never land in the positional namespace (`_<container>-<index>`).
fn explicit_id(id: &str) -> String {
    if id.starts_with(DERIVED_ID_PREFIX) {
        format!("{}{}", DERIVED_ID_PREFIX, id)
    } else {
        id.to_string()
    }
}

fn decode_text(raw: &str) -> String {
    html_escape::decode_html_entities(raw).trim().to_string()
}

/// Outcome of looking for the end of an element whose start tag is complete.
enum ElementSpan {
    /// Fully balanced: body range and offset just past the end tag.
    Closed { body: Range<usize>, end: usize },
    /// Another structural start tag arrived before the end tag; resume scanning there.
    Malformed { resume: usize },
    /// End tag not in the buffer yet.
    Dangling,
}

struct DocumentScanner<'a> {
    buf: &'a str,
    document: LayoutDocument,
}

impl<'a> DocumentScanner<'a> {
    fn new(buf: &'a str) -> Self {
        Self {
            buf,
            document: LayoutDocument::default(),
        }
    }

    fn scan(mut self) -> LayoutDocument {
        let len = self.buf.len();
        let mut pos = 0;

        while pos < len {
            let tag = match next_start_tag(self.buf, pos, len, TOP_LEVEL_TAGS) {
                TagScan::Found(tag) => tag,
                TagScan::Incomplete(_) | TagScan::NotFound => break,
            };

            let next = match tag.name {
                "row" | "grid" => Some(self.scan_container(tag)),
                "section" | "cell" => self.scan_orphan_entity(tag),
                "title" => self.scan_document_title(tag),
                "hero" => self.scan_hero(tag),
                _ => Some(tag.end),
            };

            match next {
                Some(next) if next > pos => pos = next,
                _ => break,
            }
        }

        self.document
    }

    /// Locate the end of a non-self-closing element, watching for structural start tags
    /// named in `interrupters` that would mean the element was never closed.
    fn element_span(&self, tag: &StartTag<'_>, limit: usize, interrupters: &[&'static str]) -> ElementSpan {
        let end_tag = find_end_tag(self.buf, tag.name, tag.end, limit);
        let bound = end_tag.as_ref().map(|end| end.start).unwrap_or(limit);
        let interrupt = self.next_interrupt(tag.end, bound, interrupters);

        match (end_tag, interrupt) {
            (Some(end), Some(next)) if next < end.start => ElementSpan::Malformed { resume: next },
            (Some(end), _) => ElementSpan::Closed {
                body: tag.end..end.start,
                end: end.end,
            },
            (None, Some(next)) => ElementSpan::Malformed { resume: next },
            (None, None) => ElementSpan::Dangling,
        }
    }

    /// First interrupting start tag in `from..limit`, skipping closed text fields.
    ///
    /// A text field counts as closed only when its end tag lies before `limit` and no other
    /// start tag of the same name precedes it, so an unclosed `<title>` cannot borrow a later
    /// sibling's `</title>` and hide that sibling's start tag.
    fn next_interrupt(&self, from: usize, limit: usize, interrupters: &[&'static str]) -> Option<usize> {
        let mut pos = from;
        loop {
            let interrupt = next_start_tag(self.buf, pos, limit, interrupters).position()?;
            let field = match next_start_tag(self.buf, pos, interrupt, TEXT_FIELD_TAGS) {
                TagScan::Found(field) => field,
                _ => return Some(interrupt),
            };
            if field.self_closing {
                pos = field.end;
                continue;
            }
            let end = match find_end_tag(self.buf, field.name, field.end, limit) {
                Some(end) => end,
                None => return Some(interrupt),
            };
            let reopened = next_start_tag(self.buf, field.end, end.start, &[field.name]).position();
            if reopened.is_some() {
                return Some(interrupt);
            }
            pos = end.end;
        }
    }

    /// Returns the offset where top-level scanning continues.
    fn scan_container(&mut self, tag: StartTag<'_>) -> usize {
        let layout = LayoutHint::from_attr(
            Attributes::scan(tag.attrs)
                .get(&["layout", "columns", "cols"])
                .unwrap_or(""),
        );
        let container_index = self.document.containers.len();

        if tag.self_closing {
            self.document.containers.push(Container {
                layout,
                entities: Vec::new(),
                implicit: false,
            });
            return tag.end;
        }

        let len = self.buf.len();
        let end_tag = find_end_tag(self.buf, tag.name, tag.end, len);
        let next_container = next_start_tag(self.buf, tag.end, len, CONTAINER_TAGS).position();

        let (body_end, resume) = match (end_tag, next_container) {
            (Some(end), Some(next)) if next < end.start => (next, next),
            (Some(end), _) => (end.start, end.end),
            (None, Some(next)) => (next, next),
            (None, None) => (len, len),
        };

        let entities = self.scan_entities(tag.end, body_end, container_index);
        self.document.containers.push(Container {
            layout,
            entities,
            implicit: false,
        });
        resume
    }

    /// Closed entities inside a container body, stopping at the first dangling one.
    fn scan_entities(&self, from: usize, limit: usize, container_index: usize) -> Vec<Entity> {
        let mut entities = Vec::new();
        let mut pos = from;

        while pos < limit {
            let tag = match next_start_tag(self.buf, pos, limit, ENTITY_TAGS) {
                TagScan::Found(tag) => tag,
                TagScan::Incomplete(_) | TagScan::NotFound => break,
            };

            if tag.self_closing {
                let index = entities.len();
                entities.push(self.build_entity(&tag, None, container_index, index));
                pos = tag.end;
                continue;
            }

            match self.element_span(&tag, limit, ENTITY_TAGS) {
                ElementSpan::Closed { body, end } => {
                    let index = entities.len();
                    entities.push(self.build_entity(&tag, Some(body), container_index, index));
                    pos = end;
                }
                ElementSpan::Malformed { resume } => pos = resume,
                ElementSpan::Dangling => break,
            }
        }

        entities
    }

    /// An entity outside any container is grouped into an implicit full-width container.
    fn scan_orphan_entity(&mut self, tag: StartTag<'_>) -> Option<usize> {
        let len = self.buf.len();
        let (body, next) = if tag.self_closing {
            (None, tag.end)
        } else {
            match self.element_span(&tag, len, STRUCTURAL_TAGS) {
                ElementSpan::Closed { body, end } => (Some(body), end),
                ElementSpan::Malformed { resume } => return Some(resume),
                ElementSpan::Dangling => return None,
            }
        };

        let reuse_last = self
            .document
            .containers
            .last()
            .map(|c| c.implicit)
            .unwrap_or(false);
        if !reuse_last {
            self.document.containers.push(Container {
                layout: LayoutHint::Full,
                entities: Vec::new(),
                implicit: true,
            });
        }

        let container_index = self.document.containers.len() - 1;
        let index = self.document.containers[container_index].entities.len();
        let entity = self.build_entity(&tag, body, container_index, index);
        self.document.containers[container_index].entities.push(entity);
        Some(next)
    }

    fn scan_document_title(&mut self, tag: StartTag<'_>) -> Option<usize> {
        if tag.self_closing {
            return Some(tag.end);
        }
        match self.element_span(&tag, self.buf.len(), STRUCTURAL_TAGS) {
            ElementSpan::Closed { body, end } => {
                if self.document.title.is_none() {
                    let title = decode_text(&self.buf[body]);
                    if !title.is_empty() {
                        self.document.title = Some(title);
                    }
                }
                Some(end)
            }
            ElementSpan::Malformed { resume } => Some(resume),
            ElementSpan::Dangling => None,
        }
    }

    fn scan_hero(&mut self, tag: StartTag<'_>) -> Option<usize> {
        if tag.self_closing {
            return Some(tag.end);
        }
        match self.element_span(&tag, self.buf.len(), STRUCTURAL_TAGS) {
            ElementSpan::Closed { body, end } => {
                if self.document.hero.is_none() {
                    let attrs = Attributes::scan(tag.attrs);
                    let headline = self
                        .child_text(&body, "headline")
                        .or_else(|| attrs.get(&["headline"]).map(str::to_string))
                        .unwrap_or_default();
                    let subheadline = self
                        .child_text(&body, "subheadline")
                        .or_else(|| attrs.get(&["subheadline"]).map(str::to_string))
                        .unwrap_or_default();
                    self.document.hero = Some(Hero {
                        headline,
                        subheadline,
                    });
                }
                Some(end)
            }
            ElementSpan::Malformed { resume } => Some(resume),
            ElementSpan::Dangling => None,
        }
    }

    /// Text of the first fully closed `<name>` child inside `body`.
    fn child_text(&self, body: &Range<usize>, name: &'static str) -> Option<String> {
        let tag = match next_start_tag(self.buf, body.start, body.end, &[name]) {
            TagScan::Found(tag) if !tag.self_closing => tag,
            _ => return None,
        };
        let end = find_end_tag(self.buf, name, tag.end, body.end)?;
        Some(decode_text(&self.buf[tag.end..end.start]))
    }

    /// Sub-fields are read only from a body whose end tag has already been located.
    fn build_entity(
        &self,
        tag: &StartTag<'_>,
        body: Option<Range<usize>>,
        container_index: usize,
        index: usize,
    ) -> Entity {
        let attrs = Attributes::scan(tag.attrs);

        let id = attrs
            .get(&["id"])
            .filter(|id| !id.is_empty())
            .map(explicit_id)
            .unwrap_or_else(|| format!("{}{}-{}", DERIVED_ID_PREFIX, container_index, index));

        let (title, description) = match &body {
            Some(body) => (
                self.child_text(body, "title"),
                self.child_text(body, "description"),
            ),
            None => (None, None),
        };

        Entity {
            id,
            title: title
                .or_else(|| attrs.get(&["title"]).map(str::to_string))
                .unwrap_or_default(),
            description: description
                .or_else(|| attrs.get(&["description"]).map(str::to_string))
                .unwrap_or_default(),
            kind: attrs
                .get(&["kind", "type"])
                .filter(|kind| !kind.is_empty())
                .unwrap_or(DEFAULT_KIND)
                .to_string(),
            size_hint: attrs
                .get(&["size", "size-hint", "sizehint", "size_hint", "width"])
                .map(SizeHint::from_attr)
                .unwrap_or_default(),
        }
    }
}
