//! Property-based tests for the incremental layout parser

use super::support::{page_strategy, render};
use pagewright::layout::{parse, Entity};
use proptest::prelude::*;

fn ids(entities: &[Entity]) -> Vec<String> {
    entities.iter().map(|e| e.id.clone()).collect()
}

/// `_<digits>-<digits>`, the shape of an id derived from position.
fn is_positional(id: &str) -> bool {
    let numbered = |part: &str| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit());
    id.strip_prefix('_')
        .and_then(|rest| rest.split_once('-'))
        .map(|(container, index)| numbered(container) && numbered(index))
        .unwrap_or(false)
}

/// Every prefix of a page yields a prefix of the full page's entity list, and never a
/// partially filled entity.
#[test]
fn test_prefix_parses_are_prefixes_of_the_full_parse() {
    // every byte offset is parsed, so keep the case count modest
    let mut runner = proptest::test_runner::TestRunner::new(ProptestConfig::with_cases(64));

    runner
        .run(&page_strategy(), |page| {
            let markup = render(&page);
            let full = parse(&markup).closed;
            let expected: usize = page.iter().map(|c| c.len()).sum();
            prop_assert_eq!(full.len(), expected);

            let mut previous: Vec<Entity> = Vec::new();
            for end in 0..=markup.len() {
                let closed = parse(&markup[..end]).closed;
                prop_assert!(closed.len() <= full.len());
                // exact equality rules out truncated titles or descriptions
                prop_assert_eq!(&closed[..], &full[..closed.len()]);
                prop_assert!(closed.len() >= previous.len());
                prop_assert_eq!(&closed[..previous.len()], &previous[..]);
                previous = closed;
            }
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_parse_is_deterministic() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&(page_strategy(), 0.0f64..=1.0), |(page, fraction)| {
            let markup = render(&page);
            let end = (markup.len() as f64 * fraction) as usize;
            let first = parse(&markup[..end]);
            let second = parse(&markup[..end]);
            prop_assert_eq!(first, second);
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_ids_are_unique_and_in_document_order() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&page_strategy(), |page| {
            let markup = render(&page);
            let outcome = parse(&markup);
            let expected: Vec<String> = (0..outcome.closed.len()).map(|i| format!("s{}", i)).collect();
            prop_assert_eq!(ids(&outcome.closed), expected);
            prop_assert_eq!(outcome.document.containers.len(), page.len());
            prop_assert_eq!(outcome.document.title.as_deref(), Some("Generated"));
            Ok(())
        })
        .unwrap();
}

proptest! {
    /// Arbitrary input never panics, ids are never empty, and a positional id always names
    /// the slot it sits in, so it cannot collide with an explicit id.
    #[test]
    fn parse_is_total(input in "(<|>|/|=|\"|'|[a-z _0-9-]|row|grid|section|cell|title|description|id){0,120}") {
        let outcome = parse(&input);
        for (c, container) in outcome.document.containers.iter().enumerate() {
            for (i, entity) in container.entities.iter().enumerate() {
                prop_assert!(!entity.id.is_empty());
                if is_positional(&entity.id) {
                    prop_assert_eq!(&entity.id, &format!("_{}-{}", c, i));
                }
            }
        }
        prop_assert_eq!(parse(&input), outcome);
    }

    #[test]
    fn parse_survives_arbitrary_unicode(input in "\\PC{0,200}") {
        let _ = parse(&input);
    }
}
