//! Classifier: a pure function assigning each ingested item a routing
//! decision (spec §4.5). Built as a declarative ordered-rule table per the
//! design notes ("regex-defined extractors... as a declarative table"),
//! rather than inline branching, so the routing policy is independently
//! unit-testable.

use regex::RegexSet;
use std::sync::OnceLock;

/// Text markers that force an item to the private route, regardless of
/// caller intent (spec §4.5 decision table, first row).
const PRIVATE_MARKERS: &[&str] = &[
    r"(?i)\buncertain\b",
    r"(?i)\bdoubt\b",
    r"(?i)\bworry\b",
    r"(?i)\bprivate\b",
    r"(?i)\bsecret\b",
    r"(?i)\bwondering\b",
];

fn private_marker_set() -> &'static RegexSet {
    static SET: OnceLock<RegexSet> = OnceLock::new();
    SET.get_or_init(|| RegexSet::new(PRIVATE_MARKERS).expect("private marker patterns are valid"))
}

/// What the caller/source asserts about an item before classification.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassifierHints {
    /// Caller explicitly marked this item as private.
    pub marked_private: bool,
    /// Caller explicitly marked this item as an insight, or it originates
    /// from the Insight Synthesizer.
    pub marked_insight: bool,
    /// The content is raw/binary/structured non-text rather than prose.
    pub is_raw_binary: bool,
}

/// Input to the Classifier: the text to inspect plus caller hints.
#[derive(Debug, Clone)]
pub struct ClassifierInput<'a> {
    pub text: &'a str,
    pub hints: ClassifierHints,
}

/// Where an item should be routed, and under what collection/namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    /// Raw Store / `private_memory` (opaque blob); a `semantic_hash` entry
    /// is additionally written to `identified_facts` (scope=private).
    Private,
    /// Semantic Store / `stored_memories`.
    Insight,
    /// Semantic Store / `raw_embeddings`; original bytes as a side-blob.
    RawEmbedding,
    /// Semantic Store / `identified_facts` as `type=custom`.
    Custom,
}

/// Classify an item per spec §4.5's decision table (first match wins).
#[must_use]
pub fn classify(input: &ClassifierInput<'_>) -> RouteDecision {
    if input.hints.marked_private || private_marker_set().is_match(input.text) {
        return RouteDecision::Private;
    }
    if input.hints.marked_insight {
        return RouteDecision::Insight;
    }
    if input.hints.is_raw_binary {
        return RouteDecision::RawEmbedding;
    }
    RouteDecision::Custom
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(text: &str, hints: ClassifierHints) -> ClassifierInput<'_> {
        ClassifierInput { text, hints }
    }

    #[test]
    fn private_marker_wins_over_insight_hint() {
        let hints = ClassifierHints {
            marked_insight: true,
            ..Default::default()
        };
        let decision = classify(&input("I'm uncertain about this approach", hints));
        assert_eq!(decision, RouteDecision::Private);
    }

    #[test]
    fn explicit_private_flag_routes_private() {
        let hints = ClassifierHints {
            marked_private: true,
            ..Default::default()
        };
        assert_eq!(classify(&input("ordinary text", hints)), RouteDecision::Private);
    }

    #[test]
    fn insight_hint_routes_to_stored_memories() {
        let hints = ClassifierHints {
            marked_insight: true,
            ..Default::default()
        };
        assert_eq!(classify(&input("a synthesized insight", hints)), RouteDecision::Insight);
    }

    #[test]
    fn raw_binary_routes_to_raw_embeddings() {
        let hints = ClassifierHints {
            is_raw_binary: true,
            ..Default::default()
        };
        assert_eq!(
            classify(&input("binary blob", hints)),
            RouteDecision::RawEmbedding
        );
    }

    #[test]
    fn plain_text_falls_through_to_custom() {
        assert_eq!(
            classify(&input("just a regular fact", ClassifierHints::default())),
            RouteDecision::Custom
        );
    }
}
