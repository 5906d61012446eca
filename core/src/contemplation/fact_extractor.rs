//! Fact Extractor (spec §4.3.1): a declarative regex + confidence table
//! per `FactType`, plus a fixed technical-term dictionary, rather than
//! extraction logic intermixed with parsing (spec §9).

use crate::types::{FactScope, FactType, IdentifiedFact};
use chrono::Utc;
use regex::Regex;
use serde_json::json;
use std::collections::HashMap;
use std::sync::OnceLock;
use uuid::Uuid;

struct FactPattern {
    regex: Regex,
    fact_type: FactType,
    confidence: f32,
}

fn fact_patterns() -> &'static Vec<FactPattern> {
    static PATTERNS: OnceLock<Vec<FactPattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let table: &[(&str, FactType, f32)] = &[
            (r"(?i)\bmy name is ([A-Za-z][\w' -]{0,40})", FactType::Identity, 0.9),
            (r"(?i)\bI go by ([A-Za-z][\w' -]{0,40})", FactType::Identity, 0.8),
            (r"(?i)\bI (?:prefer|like) ([\w\s.,'-]{3,60})", FactType::Preference, 0.8),
            (r"(?i)\bI (?:dislike|hate) ([\w\s.,'-]{3,60})", FactType::Preference, 0.8),
            (r"(?i)\bmust (?:not )?([\w\s.,'-]{3,60})", FactType::Constraint, 0.75),
            (r"(?i)\brequire[sd]? ([\w\s.,'-]{3,60})", FactType::Constraint, 0.7),
            (r"(?i)\bI (?:want|need|am trying) to ([\w\s.,'-]{3,60})", FactType::Goal, 0.8),
            (r"(?i)\bgoal is to ([\w\s.,'-]{3,60})", FactType::Goal, 0.85),
            (r"(?i)\bworking on ([\w\s.,'-]{3,60})", FactType::Context, 0.7),
            (r"(?i)\bin the context of ([\w\s.,'-]{3,60})", FactType::Context, 0.7),
            (r"(?i)\b(?:trust|rely on) ([\w\s.,'-]{3,60})", FactType::Relationship, 0.75),
            (
                r"(?i)\bby (next \w+|tomorrow|today|monday|tuesday|wednesday|thursday|friday|saturday|sunday|\d{4}-\d{2}-\d{2})\b",
                FactType::Timeline,
                0.85,
            ),
        ];
        table
            .iter()
            .map(|(pattern, fact_type, confidence)| FactPattern {
                regex: Regex::new(pattern).expect("fact extractor patterns are valid"),
                fact_type: *fact_type,
                confidence: *confidence,
            })
            .collect()
    })
}

/// Languages, frameworks, databases, and tools recognized as Technical
/// facts on direct, word-boundary, case-insensitive mention (spec §4.3.1).
const TECH_TERMS: &[&str] = &[
    "rust", "python", "javascript", "typescript", "go", "golang", "java", "kotlin", "swift",
    "react", "vue", "svelte", "angular", "django", "flask", "fastapi", "express", "axum",
    "postgres", "postgresql", "mysql", "sqlite", "redis", "mongodb", "docker", "kubernetes",
    "tokio", "grpc", "graphql", "terraform", "aws", "gcp", "azure",
];

fn tech_term_patterns() -> &'static Vec<(Regex, String)> {
    static PATTERNS: OnceLock<Vec<(Regex, String)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        TECH_TERMS
            .iter()
            .map(|term| {
                let pattern = format!(r"(?i)\b{}\b", regex::escape(term));
                (
                    Regex::new(&pattern).expect("tech term patterns are valid"),
                    (*term).to_string(),
                )
            })
            .collect()
    })
}

/// Extract facts from `text`, attributing each to `source_id`. Per spec
/// §4.3.1, dedupe by `(type, lowercased content)`, keeping the
/// highest-confidence candidate.
#[must_use]
pub fn extract_facts(text: &str, source_id: &str) -> Vec<IdentifiedFact> {
    let now = Utc::now();
    let mut best: HashMap<(FactType, String), IdentifiedFact> = HashMap::new();

    let mut consider = |fact_type: FactType, content: String, confidence: f32| {
        let content = content.trim();
        if content.is_empty() {
            return;
        }
        let key = (fact_type, content.to_lowercase());
        let candidate = IdentifiedFact {
            fact_id: Uuid::new_v4(),
            fact_type,
            content: json!(content),
            confidence,
            source: source_id.to_string(),
            timestamp: now,
            expiration: None,
            scope: FactScope::Session,
            version: 1,
            supersedes: None,
            superseded_by: None,
            evidence: vec![source_id.to_string()],
            context_keys: vec![],
            verification_status: crate::types::VerificationStatus::Active,
        };
        best.entry(key)
            .and_modify(|existing| {
                if candidate.confidence > existing.confidence {
                    *existing = candidate.clone();
                }
            })
            .or_insert(candidate);
    };

    for pattern in fact_patterns() {
        for captures in pattern.regex.captures_iter(text) {
            let content = captures
                .get(1)
                .or_else(|| captures.get(0))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            consider(pattern.fact_type, content, pattern.confidence);
        }
    }

    for (regex, term) in tech_term_patterns() {
        if regex.is_match(text) {
            consider(FactType::Technical, format!("uses {term}"), 0.9);
        }
    }

    best.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_identity_fact() {
        let facts = extract_facts("Hi, my name is Priya and I work remotely.", "msg-1");
        assert!(facts
            .iter()
            .any(|f| f.fact_type == FactType::Identity && f.content.to_string().contains("Priya")));
    }

    #[test]
    fn extracts_technical_fact_from_term_dictionary() {
        let facts = extract_facts("We deployed the service with Rust and Postgres.", "msg-2");
        assert!(facts.iter().any(|f| f.fact_type == FactType::Technical
            && f.content.to_string().to_lowercase().contains("rust")));
        assert!(facts.iter().any(|f| f.fact_type == FactType::Technical
            && f.content.to_string().to_lowercase().contains("postgres")));
    }

    #[test]
    fn deduplicates_keeping_highest_confidence() {
        let facts = extract_facts("I prefer dark mode. I prefer dark mode.", "msg-3");
        let preference_facts: Vec<_> = facts
            .iter()
            .filter(|f| f.fact_type == FactType::Preference)
            .collect();
        assert_eq!(preference_facts.len(), 1);
    }

    #[test]
    fn no_match_yields_no_facts() {
        let facts = extract_facts("just some unrelated text with nothing notable", "msg-4");
        assert!(facts.is_empty());
    }
}
