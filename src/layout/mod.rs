//! Page layout model
//!
//! Structural result of parsing planner markup: a document with optional title and hero,
//! and an ordered list of containers, each holding the entities (sections) whose markup
//! was fully closed at parse time. Every parse produces a fresh [`LayoutDocument`].

pub mod parser;

pub use parser::{parse, ParseOutcome};

use serde::{Deserialize, Serialize};

/// Partial layout snapshot at one point in the planner stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutDocument {
    pub title: Option<String>,
    pub hero: Option<Hero>,
    pub containers: Vec<Container>,
}

impl LayoutDocument {
    /// All entities in layout order (container by container).
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.containers.iter().flat_map(|c| c.entities.iter())
    }

    pub fn entity(&self, entity_id: &str) -> Option<&Entity> {
        self.entities().find(|e| e.id == entity_id)
    }

    pub fn entity_count(&self) -> usize {
        self.containers.iter().map(|c| c.entities.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.hero.is_none() && self.containers.is_empty()
    }
}

/// Document-level introduction block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hero {
    pub headline: String,
    pub subheadline: String,
}

/// A grouping node with a layout hint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub layout: LayoutHint,
    pub entities: Vec<Entity>,
    /// Synthetic container for entities found outside any container tag.
    #[serde(default)]
    pub implicit: bool,
}

/// Layout hint carried by a container start tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutHint {
    Full,
    Columns(u8),
    Custom(String),
}

impl LayoutHint {
    /// Parse a `layout="..."` value.
    ///
    /// `full`, `single`, `wide` and empty map to [`LayoutHint::Full`]; any value carrying a
    /// column count (`2`, `two-column`, `3-col`, `columns-4`) maps to [`LayoutHint::Columns`].
    pub fn from_attr(value: &str) -> Self {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "" | "full" | "full-width" | "single" | "wide" | "1" | "one-column" => {
                return LayoutHint::Full
            }
            _ => {}
        }

        let digits: String = normalized.chars().filter(|c| c.is_ascii_digit()).collect();
        if let Ok(n) = digits.parse::<u8>() {
            if n == 1 {
                return LayoutHint::Full;
            }
            if n > 1 {
                return LayoutHint::Columns(n);
            }
        }

        let word_count = [("two", 2u8), ("three", 3), ("four", 4)]
            .iter()
            .find(|(word, _)| normalized.starts_with(word))
            .map(|(_, n)| *n);
        match word_count {
            Some(n) => LayoutHint::Columns(n),
            None => LayoutHint::Custom(value.trim().to_string()),
        }
    }

    pub fn columns(&self) -> u8 {
        match self {
            LayoutHint::Columns(n) => *n,
            _ => 1,
        }
    }
}

/// Width class of an entity inside its container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeHint {
    Full,
    TwoThirds,
    Half,
    Third,
    Quarter,
    #[default]
    Auto,
}

impl SizeHint {
    pub fn from_attr(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "full" | "wide" | "1" | "1/1" | "100%" => SizeHint::Full,
            "two-thirds" | "two_thirds" | "twothirds" | "2/3" => SizeHint::TwoThirds,
            "half" | "1/2" | "50%" => SizeHint::Half,
            "third" | "one-third" | "1/3" => SizeHint::Third,
            "quarter" | "one-quarter" | "1/4" | "25%" => SizeHint::Quarter,
            _ => SizeHint::Auto,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SizeHint::Full => "full",
            SizeHint::TwoThirds => "two-thirds",
            SizeHint::Half => "half",
            SizeHint::Third => "third",
            SizeHint::Quarter => "quarter",
            SizeHint::Auto => "auto",
        }
    }
}

/// The unit of content generation (a section or cell).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub title: String,
    pub description: String,
    pub kind: String,
    pub size_hint: SizeHint,
}

/// Entity lifecycle as seen across the pipeline.
///
/// The parser only ever emits entities that are at least `Closed`; `Open` entities stay
/// inside the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityPhase {
    Open,
    Closed,
    Dispatched,
    Streaming,
    Complete,
    Errored,
}
