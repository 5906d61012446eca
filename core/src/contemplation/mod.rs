//! Contemplation Engine (spec §4.3): continuously derives facts,
//! patterns, and insights from the Semantic Store. Never touches Raw
//! Store private blobs beyond their `semantic_hash` — this module holds
//! no `Arc<dyn RawStore>` at all.

pub mod fact_extractor;
pub mod insight_synthesizer;
pub mod pattern_recognizer;

use crate::contemplation::insight_synthesizer::{default_rules, synthesize_insights, InsightRule};
use crate::contemplation::pattern_recognizer::{
    detect_behavioral_patterns, detect_cycles, detect_semantic_clusters, detect_sequences,
    DataPoint,
};
use crate::error::Result;
use crate::retrieval::cache::QueryCache;
use crate::storage::traits::{SemanticHit, SemanticStore, UpsertRow};
use crate::types::{FactType, IdentifiedFact, Insight, Pattern};
use chrono::{DateTime, Utc};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Collections the engine reads unprocessed items from (spec §4.3 step 1).
const SOURCE_COLLECTIONS: &[&str] = &["conversations", "analysis_results"];

/// Items gathered per cycle, per spec §4.3.
const BATCH_SIZE: usize = 100;

/// Minimum confidence for a fact to be written during a cycle (spec §4.3
/// step 2; the Fact Extractor itself has no confidence floor, this is the
/// cycle's own gate).
const FACT_CONFIDENCE_FLOOR: f32 = 0.6;

/// Threshold of newly extracted facts before the Pattern Recognizer runs
/// (spec §4.3 step 3).
const PATTERN_TRIGGER: usize = 10;

/// Threshold of newly detected patterns before the Insight Synthesizer
/// runs (spec §4.3 step 4).
const INSIGHT_TRIGGER: usize = 3;

/// In-memory insight-cache TTL (spec §4.3 step 5).
const INSIGHT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Which analytical lens a cycle runs under (spec §4.3 "Three modes").
/// Selects which pattern-recognition sweeps run; fact extraction and
/// insight synthesis are mode-independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Timeline analysis and pattern-evolution: the temporal sweeps.
    Reflective,
    /// Cross-domain links between disparate clusters: the semantic sweep.
    Connective,
    /// Crystallizes themes behind recurring decisions: the behavioral sweep.
    Generative,
}

/// A gathered hit paired with the collection it came from, so Step 2 can
/// flag it back against its real source instead of a fixed collection.
struct GatheredHit {
    collection: &'static str,
    hit: SemanticHit,
}

/// Timestamp for a data point, read from `metadata.first_timestamp` (set
/// by conversation chunks) or `metadata.timestamp` (set by other
/// sources), falling back to now when neither parses (spec §4.3.2 data
/// points are "timestamped"; this is the best-effort source for that).
fn point_timestamp(metadata: &serde_json::Value) -> DateTime<Utc> {
    ["first_timestamp", "timestamp"]
        .iter()
        .find_map(|key| metadata.get(key).and_then(serde_json::Value::as_str))
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
}

/// The explicit `type`/`action`/`event` field driving `signature()` (spec
/// §4.3.2), read off whichever of those keys is present in `metadata`.
fn point_tag(metadata: &serde_json::Value) -> Option<String> {
    ["type", "action", "event"]
        .iter()
        .find_map(|key| metadata.get(key).and_then(serde_json::Value::as_str))
        .map(str::to_string)
}

/// Outcome of one contemplation cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub items_gathered: usize,
    pub facts_written: usize,
    pub patterns_written: usize,
    pub insights_written: usize,
}

/// Drives the gather -> extract -> recognize -> synthesize -> cache cycle.
pub struct ContemplationEngine {
    semantic: Arc<dyn SemanticStore>,
    rules: Vec<Box<dyn InsightRule>>,
    processed_items: parking_lot::Mutex<HashSet<String>>,
    known_pattern_ids: parking_lot::Mutex<HashSet<String>>,
    insight_cache: QueryCache<Vec<Insight>>,
}

impl ContemplationEngine {
    #[must_use]
    pub fn new(semantic: Arc<dyn SemanticStore>) -> Self {
        Self {
            semantic,
            rules: default_rules(),
            processed_items: parking_lot::Mutex::new(HashSet::new()),
            known_pattern_ids: parking_lot::Mutex::new(HashSet::new()),
            insight_cache: QueryCache::with_capacity_and_ttl(256, INSIGHT_CACHE_TTL),
        }
    }

    /// Gate per spec §4.3: a cycle only proceeds if system load is low.
    #[must_use]
    pub fn should_run(cpu_percent: f32, memory_percent: f32) -> bool {
        cpu_percent < 30.0 && memory_percent < 70.0
    }

    /// Run one contemplation cycle under `mode`.
    #[instrument(skip(self))]
    pub async fn run_cycle(&self, mode: Mode) -> Result<CycleReport> {
        let mut report = CycleReport::default();

        // Step 1: gather unprocessed items.
        let mut gathered: Vec<GatheredHit> = Vec::new();
        for &collection in SOURCE_COLLECTIONS {
            let hits = self.semantic.unflagged(collection, "processed", BATCH_SIZE).await?;
            gathered.extend(hits.into_iter().filter(|hit| !self.processed_items.lock().contains(&hit.id)).map(
                |hit| GatheredHit { collection, hit },
            ));
            if gathered.len() >= BATCH_SIZE {
                gathered.truncate(BATCH_SIZE);
                break;
            }
        }
        report.items_gathered = gathered.len();

        // Step 2: fact extraction.
        let mut new_facts: Vec<IdentifiedFact> = Vec::new();
        for gathered_hit in &gathered {
            let hit = &gathered_hit.hit;
            let facts = fact_extractor::extract_facts(&hit.document, &hit.id);
            for fact in facts.into_iter().filter(|f| f.confidence >= FACT_CONFIDENCE_FLOOR) {
                new_facts.push(fact);
            }
            self.processed_items.lock().insert(hit.id.clone());
            self.semantic
                .set_flag(gathered_hit.collection, &hit.id, "processed", true)
                .await
                .ok();
        }
        if !new_facts.is_empty() {
            let rows: Vec<UpsertRow> = new_facts
                .iter()
                .map(|f| UpsertRow {
                    id: f.fact_id.to_string(),
                    embedding: None,
                    document: f.content.to_string(),
                    metadata: json!({ "type": f.fact_type, "confidence": f.confidence }),
                })
                .collect();
            self.semantic.upsert("identified_facts", rows).await?;
        }
        report.facts_written = new_facts.len();

        // Step 3: pattern recognition.
        let mut new_patterns: Vec<Pattern> = Vec::new();
        if new_facts.len() >= PATTERN_TRIGGER {
            let points: Vec<DataPoint> = gathered
                .iter()
                .map(|gathered_hit| {
                    let hit = &gathered_hit.hit;
                    DataPoint {
                        id: hit.id.clone(),
                        timestamp: point_timestamp(&hit.metadata),
                        tagged_field: point_tag(&hit.metadata),
                        content: hit.document.clone(),
                    }
                })
                .collect();

            let detected = match mode {
                Mode::Reflective => {
                    let mut p = detect_sequences(&points);
                    p.extend(detect_cycles(&points));
                    p
                }
                Mode::Connective => detect_semantic_clusters(&points),
                Mode::Generative => detect_behavioral_patterns(&points),
            };

            let mut known = self.known_pattern_ids.lock();
            for pattern in detected {
                if known.insert(pattern.pattern_id.clone()) {
                    new_patterns.push(pattern);
                }
            }
        }
        if !new_patterns.is_empty() {
            let rows: Vec<UpsertRow> = new_patterns
                .iter()
                .map(|p| UpsertRow {
                    id: p.pattern_id.clone(),
                    embedding: None,
                    document: p.description.clone(),
                    metadata: json!({ "type": p.pattern_type, "confidence": p.confidence }),
                })
                .collect();
            self.semantic.upsert("patterns", rows).await?;
        }
        report.patterns_written = new_patterns.len();

        // Step 4: insight synthesis.
        let mut new_insights: Vec<Insight> = Vec::new();
        if new_patterns.len() >= INSIGHT_TRIGGER {
            let technical_facts: Vec<IdentifiedFact> = new_facts
                .iter()
                .filter(|f| f.fact_type == FactType::Technical)
                .cloned()
                .collect();
            new_insights = synthesize_insights(&self.rules, &new_patterns, &technical_facts);
        }
        if !new_insights.is_empty() {
            let rows: Vec<UpsertRow> = new_insights
                .iter()
                .map(|i| UpsertRow {
                    id: i.insight_id.to_string(),
                    embedding: None,
                    document: i.description.clone(),
                    metadata: json!({ "title": i.title, "confidence": i.confidence }),
                })
                .collect();
            self.semantic.upsert("insights", rows).await?;
        }
        report.insights_written = new_insights.len();

        // Step 5: refresh the in-memory insight cache.
        let cache_key =
            crate::retrieval::cache::CacheKey::new("contemplation:latest_insights".to_string());
        self.insight_cache.put(cache_key, new_insights);

        Ok(report)
    }

    /// The most recently cached insight batch, if the TTL hasn't expired.
    #[must_use]
    pub fn cached_insights(&self) -> Option<Arc<Vec<Insight>>> {
        let key =
            crate::retrieval::cache::CacheKey::new("contemplation:latest_insights".to_string());
        self.insight_cache.get(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::traits::SemanticHit;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeSemantic {
        unprocessed: Mutex<Vec<SemanticHit>>,
        analysis_results: Mutex<Vec<SemanticHit>>,
        upserts: Mutex<Vec<(String, usize)>>,
        flagged: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl SemanticStore for FakeSemantic {
        async fn upsert(&self, collection: &str, rows: Vec<UpsertRow>) -> Result<()> {
            self.upserts.lock().unwrap().push((collection.to_string(), rows.len()));
            Ok(())
        }
        async fn query_semantic(&self, _: &str, _: &[f32], _: usize) -> Result<Vec<SemanticHit>> {
            Ok(vec![])
        }
        async fn query_keyword(&self, _: &str, _: &str, _: usize) -> Result<Vec<SemanticHit>> {
            Ok(vec![])
        }
        async fn unflagged(&self, collection: &str, _: &str, limit: usize) -> Result<Vec<SemanticHit>> {
            let source = match collection {
                "conversations" => &self.unprocessed,
                "analysis_results" => &self.analysis_results,
                _ => return Ok(vec![]),
            };
            Ok(source.lock().unwrap().iter().take(limit).cloned().collect())
        }
        async fn set_flag(&self, collection: &str, id: &str, _: &str, _: bool) -> Result<()> {
            self.flagged.lock().unwrap().push((collection.to_string(), id.to_string()));
            Ok(())
        }
        async fn count(&self, _: &str) -> Result<usize> {
            Ok(0)
        }
    }

    fn hit(id: &str, text: &str) -> SemanticHit {
        SemanticHit {
            id: id.to_string(),
            document: text.to_string(),
            metadata: json!({}),
            score: 1.0,
        }
    }

    #[tokio::test]
    async fn cycle_with_no_items_writes_nothing() {
        let store = Arc::new(FakeSemantic::default());
        let engine = ContemplationEngine::new(store);
        let report = engine.run_cycle(Mode::Reflective).await.unwrap();
        assert_eq!(report.items_gathered, 0);
        assert_eq!(report.facts_written, 0);
    }

    #[tokio::test]
    async fn cycle_extracts_facts_from_gathered_items() {
        let store = Arc::new(FakeSemantic::default());
        store
            .unprocessed
            .lock()
            .unwrap()
            .push(hit("c1", "we use Rust and Postgres for this service"));
        let engine = ContemplationEngine::new(store);

        let report = engine.run_cycle(Mode::Reflective).await.unwrap();
        assert_eq!(report.items_gathered, 1);
        assert!(report.facts_written >= 1);
    }

    #[tokio::test]
    async fn processed_items_are_not_regathered_across_cycles() {
        let store = Arc::new(FakeSemantic::default());
        store.unprocessed.lock().unwrap().push(hit("c1", "uses Rust"));
        let engine = ContemplationEngine::new(store);

        engine.run_cycle(Mode::Reflective).await.unwrap();
        let second = engine.run_cycle(Mode::Reflective).await.unwrap();
        assert_eq!(second.items_gathered, 0);
    }

    #[tokio::test]
    async fn set_flag_targets_each_hits_own_collection() {
        let store = Arc::new(FakeSemantic::default());
        store.unprocessed.lock().unwrap().push(hit("c1", "uses Rust"));
        store.analysis_results.lock().unwrap().push(hit("a1", "uses Postgres"));
        let engine = ContemplationEngine::new(store.clone());

        engine.run_cycle(Mode::Reflective).await.unwrap();

        let flagged = store.flagged.lock().unwrap();
        assert!(flagged.contains(&("conversations".to_string(), "c1".to_string())));
        assert!(flagged.contains(&("analysis_results".to_string(), "a1".to_string())));
    }

    #[test]
    fn point_timestamp_parses_first_timestamp_and_falls_back_to_now() {
        let metadata = json!({ "first_timestamp": "2026-01-01T00:00:00Z" });
        let parsed = point_timestamp(&metadata);
        assert_eq!(parsed.to_rfc3339(), "2026-01-01T00:00:00+00:00");

        let missing = json!({});
        let fallback = point_timestamp(&missing);
        assert!(fallback <= Utc::now());
    }

    #[test]
    fn point_tag_reads_type_action_or_event() {
        assert_eq!(point_tag(&json!({ "type": "decision" })).as_deref(), Some("decision"));
        assert_eq!(point_tag(&json!({ "action": "deploy" })).as_deref(), Some("deploy"));
        assert_eq!(point_tag(&json!({})), None);
    }

    #[test]
    fn should_run_gates_on_cpu_and_memory() {
        assert!(ContemplationEngine::should_run(10.0, 10.0));
        assert!(!ContemplationEngine::should_run(50.0, 10.0));
        assert!(!ContemplationEngine::should_run(10.0, 80.0));
    }
}
