//! Pattern Recognizer (spec §4.3.2): temporal, semantic, and behavioral
//! pattern detection over a set of data points drawn from the Semantic
//! Store.

use crate::types::{Occurrence, Pattern, PatternType};
use chrono::{DateTime, Utc};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// One unit of evidence the recognizer operates over: a timestamped item
/// with an optional explicit `type`/`action`/`event` field.
#[derive(Debug, Clone)]
pub struct DataPoint {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub tagged_field: Option<String>,
    pub content: String,
}

/// Signature of a point: its `type`/`action`/`event` field if present,
/// else an md5-prefix of the first 50 chars of content (spec §4.3.2).
#[must_use]
pub fn signature(point: &DataPoint) -> String {
    if let Some(field) = &point.tagged_field {
        return field.clone();
    }
    let prefix: String = point.content.chars().take(50).collect();
    format!("{:x}", md5::compute(prefix.as_bytes()))[..12].to_string()
}

const WINDOW_SIZES: [usize; 4] = [2, 3, 4, 5];

/// *Sequences*: signature tuples of fixed-size sliding windows repeating
/// at least 3 times.
#[must_use]
pub fn detect_sequences(points: &[DataPoint]) -> Vec<Pattern> {
    let mut sorted = points.to_vec();
    sorted.sort_by_key(|p| p.timestamp);
    let signatures: Vec<String> = sorted.iter().map(signature).collect();

    let mut patterns = Vec::new();
    for &w in &WINDOW_SIZES {
        if signatures.len() < w {
            continue;
        }
        let mut by_tuple: HashMap<Vec<String>, Vec<usize>> = HashMap::new();
        for start in 0..=(signatures.len() - w) {
            let tuple = signatures[start..start + w].to_vec();
            by_tuple.entry(tuple).or_default().push(start);
        }
        for (tuple, starts) in by_tuple {
            if starts.len() < 3 {
                continue;
            }
            let confidence = (0.5 + 0.1 * starts.len() as f32).min(0.9);
            let occurrences: Vec<Occurrence> = starts
                .iter()
                .map(|&start| Occurrence {
                    data_point_id: sorted[start].id.clone(),
                    timestamp: sorted[start].timestamp,
                })
                .collect();
            let first_seen = occurrences.iter().map(|o| o.timestamp).min().unwrap_or_else(Utc::now);
            let last_seen = occurrences.iter().map(|o| o.timestamp).max().unwrap_or_else(Utc::now);
            patterns.push(Pattern {
                pattern_id: format!("sequence_{w}_{}", tuple.join("-")),
                pattern_type: PatternType::Temporal,
                name: format!("repeating sequence of {w}: {}", tuple.join(" -> ")),
                description: format!("signature sequence {:?} repeated {} times", tuple, starts.len()),
                occurrences,
                confidence,
                indicators: tuple,
                first_seen,
                last_seen,
                period: None,
            });
        }
    }
    patterns
}

/// *Cycles*: groups of same-signature points whose inter-occurrence
/// intervals have low relative variance.
#[must_use]
pub fn detect_cycles(points: &[DataPoint]) -> Vec<Pattern> {
    let mut by_signature: HashMap<String, Vec<&DataPoint>> = HashMap::new();
    for point in points {
        by_signature.entry(signature(point)).or_default().push(point);
    }

    let mut patterns = Vec::new();
    for (sig, mut group) in by_signature {
        if group.len() < 3 {
            continue;
        }
        group.sort_by_key(|p| p.timestamp);
        let intervals: Vec<f64> = group
            .windows(2)
            .map(|pair| (pair[1].timestamp - pair[0].timestamp).num_seconds() as f64)
            .collect();
        let mean = intervals.iter().sum::<f64>() / intervals.len() as f64;
        if mean <= 0.0 {
            continue;
        }
        let variance =
            intervals.iter().map(|i| (i - mean).powi(2)).sum::<f64>() / intervals.len() as f64;
        let std = variance.sqrt();
        if std >= 0.3 * mean {
            continue;
        }
        let confidence = (0.6 + (1.0 - std / mean) as f32).min(0.9);
        let occurrences: Vec<Occurrence> = group
            .iter()
            .map(|p| Occurrence {
                data_point_id: p.id.clone(),
                timestamp: p.timestamp,
            })
            .collect();
        patterns.push(Pattern {
            pattern_id: format!("cycle_{sig}"),
            pattern_type: PatternType::Temporal,
            name: format!("cyclical recurrence of {sig}"),
            description: format!("{} occurrences with mean interval {mean:.0}s", group.len()),
            occurrences,
            confidence,
            indicators: vec![sig],
            first_seen: group.first().unwrap().timestamp,
            last_seen: group.last().unwrap().timestamp,
            period: Some(mean),
        });
    }
    patterns
}

/// Fixed keyword table for semantic topic clustering (spec §4.3.2).
const TOPICS: &[(&str, &[&str])] = &[
    ("performance", &["performance", "latency", "throughput", "slow", "optimi"]),
    ("testing", &["test", "tests", "testing", "coverage", "assert"]),
    ("security", &["security", "auth", "vulnerab", "exploit", "encrypt"]),
    ("architecture", &["architecture", "design", "module", "layer", "component"]),
    ("debugging", &["bug", "debug", "error", "crash", "stack trace"]),
];

/// *Semantic*: topic clusters with at least 3 keyword hits across points.
#[must_use]
pub fn detect_semantic_clusters(points: &[DataPoint]) -> Vec<Pattern> {
    let mut patterns = Vec::new();
    for (topic, keywords) in TOPICS {
        let hits: Vec<&DataPoint> = points
            .iter()
            .filter(|p| {
                let lower = p.content.to_lowercase();
                keywords.iter().any(|k| lower.contains(k))
            })
            .collect();
        if hits.len() < 3 {
            continue;
        }
        let confidence = (0.5 + 0.05 * hits.len() as f32).min(0.9);
        let occurrences: Vec<Occurrence> = hits
            .iter()
            .map(|p| Occurrence {
                data_point_id: p.id.clone(),
                timestamp: p.timestamp,
            })
            .collect();
        let first_seen = occurrences.iter().map(|o| o.timestamp).min().unwrap_or_else(Utc::now);
        let last_seen = occurrences.iter().map(|o| o.timestamp).max().unwrap_or_else(Utc::now);
        patterns.push(Pattern {
            pattern_id: format!("semantic_{topic}"),
            pattern_type: PatternType::Semantic,
            name: format!("recurring topic: {topic}"),
            description: format!("{} items touched on {topic}", hits.len()),
            occurrences,
            confidence,
            indicators: vec![(*topic).to_string()],
            first_seen,
            last_seen,
            period: None,
        });
    }
    patterns
}

fn decision_phrase_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:decided to|chose|selected|opted for|went with)\s+([\w\s.'-]{3,40})")
            .expect("decision phrase pattern is valid")
    })
}

/// *Behavioral*: decision phrases, categorized by the noun-phrase target
/// that follows. Categories with at least 2 occurrences emit a pattern.
#[must_use]
pub fn detect_behavioral_patterns(points: &[DataPoint]) -> Vec<Pattern> {
    let mut by_category: HashMap<String, Vec<&DataPoint>> = HashMap::new();
    for point in points {
        for captures in decision_phrase_regex().captures_iter(&point.content) {
            if let Some(target) = captures.get(1) {
                let category = target
                    .as_str()
                    .trim()
                    .split_whitespace()
                    .next()
                    .unwrap_or("")
                    .to_lowercase();
                if !category.is_empty() {
                    by_category.entry(category).or_default().push(point);
                }
            }
        }
    }

    let mut patterns = Vec::new();
    for (category, hits) in by_category {
        if hits.len() < 2 {
            continue;
        }
        let confidence = (0.6 + 0.05 * hits.len() as f32).min(0.9);
        let occurrences: Vec<Occurrence> = hits
            .iter()
            .map(|p| Occurrence {
                data_point_id: p.id.clone(),
                timestamp: p.timestamp,
            })
            .collect();
        let first_seen = occurrences.iter().map(|o| o.timestamp).min().unwrap_or_else(Utc::now);
        let last_seen = occurrences.iter().map(|o| o.timestamp).max().unwrap_or_else(Utc::now);
        patterns.push(Pattern {
            pattern_id: format!("behavioral_{category}"),
            pattern_type: PatternType::Behavioral,
            name: format!("recurring decisions about {category}"),
            description: format!("{} decisions involving {category}", hits.len()),
            occurrences,
            confidence,
            indicators: vec![category],
            first_seen,
            last_seen,
            period: None,
        });
    }
    patterns
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn point(id: &str, t: DateTime<Utc>, field: Option<&str>, content: &str) -> DataPoint {
        DataPoint {
            id: id.to_string(),
            timestamp: t,
            tagged_field: field.map(str::to_string),
            content: content.to_string(),
        }
    }

    #[test]
    fn repeating_signature_window_is_detected_as_sequence() {
        let now = Utc::now();
        let points: Vec<DataPoint> = (0..9)
            .map(|i| {
                let field = if i % 2 == 0 { "a" } else { "b" };
                point(&i.to_string(), now + Duration::minutes(i), Some(field), "")
            })
            .collect();
        let patterns = detect_sequences(&points);
        assert!(!patterns.is_empty());
        assert!(patterns.iter().all(|p| p.confidence <= 0.9));
    }

    #[test]
    fn regular_interval_is_detected_as_cycle() {
        let now = Utc::now();
        let points = vec![
            point("1", now, Some("standup"), ""),
            point("2", now + Duration::hours(24), Some("standup"), ""),
            point("3", now + Duration::hours(48), Some("standup"), ""),
            point("4", now + Duration::hours(72), Some("standup"), ""),
        ];
        let patterns = detect_cycles(&points);
        assert_eq!(patterns.len(), 1);
        assert!((patterns[0].period.unwrap() - 86400.0).abs() < 1.0);
    }

    #[test]
    fn topic_with_enough_hits_is_detected() {
        let now = Utc::now();
        let points = vec![
            point("1", now, None, "we need to fix the failing test"),
            point("2", now, None, "added test coverage for the module"),
            point("3", now, None, "testing the new endpoint"),
        ];
        let patterns = detect_semantic_clusters(&points);
        assert!(patterns.iter().any(|p| p.name.contains("testing")));
    }

    #[test]
    fn repeated_decision_category_is_detected() {
        let now = Utc::now();
        let points = vec![
            point("1", now, None, "we decided to postgres for storage"),
            point("2", now, None, "later chose postgres again for the cache layer"),
        ];
        let patterns = detect_behavioral_patterns(&points);
        assert!(patterns.iter().any(|p| p.indicators.contains(&"postgres".to_string())));
    }
}
