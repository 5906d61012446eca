//! Insight Synthesizer (spec §4.3.3): pluggable rules over facts and
//! patterns. Each rule must produce
//! `{title, description, evidence[], confidence, recommendations[]}` and
//! satisfy `confidence <= 0.9 * max(evidence.confidence)`.

use crate::types::{FactType, IdentifiedFact, Insight, Pattern, PatternType};
use chrono::Utc;
use uuid::Uuid;

/// A pluggable insight-generation rule (spec §4.3.3 "additional rules are
/// pluggable").
pub trait InsightRule {
    fn apply(&self, patterns: &[Pattern], facts: &[IdentifiedFact]) -> Vec<Insight>;
}

/// The one rule the spec currently defines: a recurring behavioral
/// decision pattern that correlates in time with Technical facts is said
/// to drive technology choices.
pub struct TechnologyChoiceRule {
    /// Window, in days, within which a Technical fact's extraction time
    /// must fall of any occurrence of the behavioral pattern.
    pub correlation_window_days: i64,
}

impl Default for TechnologyChoiceRule {
    fn default() -> Self {
        Self {
            correlation_window_days: 7,
        }
    }
}

impl InsightRule for TechnologyChoiceRule {
    fn apply(&self, patterns: &[Pattern], facts: &[IdentifiedFact]) -> Vec<Insight> {
        let technical_facts: Vec<&IdentifiedFact> =
            facts.iter().filter(|f| f.fact_type == FactType::Technical).collect();

        patterns
            .iter()
            .filter(|p| p.pattern_type == PatternType::Behavioral)
            .filter_map(|pattern| {
                let related: Vec<&IdentifiedFact> = technical_facts
                    .iter()
                    .filter(|fact| {
                        pattern.occurrences.iter().any(|occurrence| {
                            (fact.timestamp - occurrence.timestamp).num_days().abs()
                                <= self.correlation_window_days
                        })
                    })
                    .copied()
                    .collect();

                if related.is_empty() {
                    return None;
                }

                let max_evidence_confidence = related
                    .iter()
                    .map(|f| f.confidence)
                    .fold(pattern.confidence, f32::max);
                let confidence = (0.9 * pattern.confidence)
                    .min(0.8)
                    .min(0.9 * max_evidence_confidence);

                let mut evidence = vec![pattern.pattern_id.clone()];
                evidence.extend(related.iter().map(|f| f.fact_id.to_string()));

                Some(Insight {
                    insight_id: Uuid::new_v4(),
                    title: format!("`{}` drives technology choices", pattern.name),
                    description: format!(
                        "the behavioral pattern `{}` co-occurs with {} technical facts within {} days",
                        pattern.name,
                        related.len(),
                        self.correlation_window_days
                    ),
                    evidence,
                    confidence,
                    generated_at: Utc::now(),
                    recommendations: vec![],
                })
            })
            .collect()
    }
}

/// Run every registered rule and concatenate their output.
#[must_use]
pub fn synthesize_insights(
    rules: &[Box<dyn InsightRule>],
    patterns: &[Pattern],
    facts: &[IdentifiedFact],
) -> Vec<Insight> {
    rules.iter().flat_map(|rule| rule.apply(patterns, facts)).collect()
}

/// The default rule set (spec §4.3.3's one defined rule).
#[must_use]
pub fn default_rules() -> Vec<Box<dyn InsightRule>> {
    vec![Box::new(TechnologyChoiceRule::default())]
}
