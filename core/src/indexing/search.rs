//! Search contract (spec §4.2): queries a collection's semantic and
//! keyword indices in parallel, merges hits by content-hash dedup, and
//! re-ranks by recency and exact-substring match.

use crate::error::Result;
use crate::storage::traits::{ContentKind, EmbeddingService, SemanticHit, SemanticStore};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::instrument;

/// A merged, re-ranked search result.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub id: String,
    pub document: String,
    pub metadata: serde_json::Value,
    pub score: f32,
}

fn content_hash(document: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(document.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Recency boost: `max(0, 1 - age_days / 365)` (spec §4.2's re-rank
/// formula). `created_at` is read from `metadata.created_at` if present
/// and parseable; hits without a usable timestamp get zero boost.
fn recency_boost(metadata: &serde_json::Value, now: DateTime<Utc>) -> f32 {
    let Some(raw) = metadata.get("created_at").and_then(serde_json::Value::as_str) else {
        return 0.0;
    };
    let Ok(created_at) = DateTime::parse_from_rfc3339(raw) else {
        return 0.0;
    };
    let age_days = (now - created_at.with_timezone(&Utc)).num_seconds() as f32 / 86400.0;
    (1.0 - age_days / 365.0).max(0.0)
}

/// Re-rank one merged hit per spec §4.2: `score * (1 + recency_boost *
/// 0.2) * (1.5 if the query substring appears in the document, else 1.0)`.
fn rerank(hit: &SemanticHit, query: &str, now: DateTime<Utc>) -> f32 {
    let boost = recency_boost(&hit.metadata, now);
    let substring_multiplier = if query.is_empty() {
        1.0
    } else if hit.document.to_lowercase().contains(&query.to_lowercase()) {
        1.5
    } else {
        1.0
    };
    hit.score * (1.0 + boost * 0.2) * substring_multiplier
}

/// Run the search contract against `collection`: embed `query`, fan out a
/// semantic and a keyword query concurrently, merge by content hash
/// (first occurrence wins — semantic hits are merged in before keyword
/// hits, so a semantic score wins a tie), re-rank, and return the top
/// `limit` results sorted by descending score.
///
/// On embedding-service unavailability, degrades to keyword-only search
/// (spec §7) rather than failing the whole query.
#[instrument(skip(semantic, embeddings, query))]
pub async fn search(
    semantic: &Arc<dyn SemanticStore>,
    embeddings: &Arc<dyn EmbeddingService>,
    collection: &str,
    query: &str,
    limit: usize,
    now: DateTime<Utc>,
) -> Result<Vec<SearchResult>> {
    // Over-fetch before re-ranking and truncating, since re-ranking can
    // reorder within the candidate set.
    let fetch_limit = limit.saturating_mul(3).max(limit);

    let semantic_hits = match embeddings.embed(query, ContentKind::General).await {
        Ok(embedding) => semantic.query_semantic(collection, &embedding, fetch_limit).await?,
        Err(crate::error::Error::EmbeddingUnavailable) => Vec::new(),
        Err(e) => return Err(e),
    };
    let keyword_hits = semantic.query_keyword(collection, query, fetch_limit).await?;

    let mut seen = std::collections::HashSet::new();
    let mut merged = Vec::new();
    for hit in semantic_hits.into_iter().chain(keyword_hits) {
        let key = content_hash(&hit.document);
        if seen.insert(key) {
            merged.push(hit);
        }
    }

    let mut results: Vec<SearchResult> = merged
        .iter()
        .map(|hit| SearchResult {
            id: hit.id.clone(),
            document: hit.document.clone(),
            metadata: hit.metadata.clone(),
            score: rerank(hit, query, now),
        })
        .collect();

    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    results.truncate(limit);
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::traits::UpsertRow;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeSemantic {
        semantic_hits: Mutex<Vec<SemanticHit>>,
        keyword_hits: Mutex<Vec<SemanticHit>>,
    }

    #[async_trait]
    impl SemanticStore for FakeSemantic {
        async fn upsert(&self, _: &str, _: Vec<UpsertRow>) -> Result<()> {
            Ok(())
        }
        async fn query_semantic(&self, _: &str, _: &[f32], limit: usize) -> Result<Vec<SemanticHit>> {
            Ok(self.semantic_hits.lock().unwrap().iter().take(limit).cloned().collect())
        }
        async fn query_keyword(&self, _: &str, _: &str, limit: usize) -> Result<Vec<SemanticHit>> {
            Ok(self.keyword_hits.lock().unwrap().iter().take(limit).cloned().collect())
        }
        async fn unflagged(&self, _: &str, _: &str, _: usize) -> Result<Vec<SemanticHit>> {
            Ok(vec![])
        }
        async fn set_flag(&self, _: &str, _: &str, _: &str, _: bool) -> Result<()> {
            Ok(())
        }
        async fn count(&self, _: &str) -> Result<usize> {
            Ok(0)
        }
    }

    struct FakeEmbedder;
    #[async_trait]
    impl EmbeddingService for FakeEmbedder {
        async fn embed(&self, _: &str, _: ContentKind) -> Result<Vec<f32>> {
            Ok(vec![0.0; 4])
        }
        fn dimension(&self) -> usize {
            4
        }
    }

    struct UnavailableEmbedder;
    #[async_trait]
    impl EmbeddingService for UnavailableEmbedder {
        async fn embed(&self, _: &str, _: ContentKind) -> Result<Vec<f32>> {
            Err(crate::error::Error::EmbeddingUnavailable)
        }
        fn dimension(&self) -> usize {
            4
        }
    }

    fn hit(id: &str, document: &str, score: f32) -> SemanticHit {
        SemanticHit {
            id: id.to_string(),
            document: document.to_string(),
            metadata: json!({}),
            score,
        }
    }

    #[tokio::test]
    async fn duplicate_content_across_sources_is_deduped() {
        let store = Arc::new(FakeSemantic::default());
        store.semantic_hits.lock().unwrap().push(hit("s1", "uses Rust for the backend", 0.9));
        store.keyword_hits.lock().unwrap().push(hit("k1", "uses Rust for the backend", 0.5));
        let semantic: Arc<dyn SemanticStore> = store;
        let embeddings: Arc<dyn EmbeddingService> = Arc::new(FakeEmbedder);

        let results = search(&semantic, &embeddings, "conversations", "Rust", 10, Utc::now())
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "s1");
    }

    #[tokio::test]
    async fn substring_match_is_boosted_above_non_matching_higher_score() {
        let store = Arc::new(FakeSemantic::default());
        store.semantic_hits.lock().unwrap().push(hit("a", "completely unrelated text", 0.81));
        store.semantic_hits.lock().unwrap().push(hit("b", "we picked Rust for this", 0.6));
        let semantic: Arc<dyn SemanticStore> = store;
        let embeddings: Arc<dyn EmbeddingService> = Arc::new(FakeEmbedder);

        let results = search(&semantic, &embeddings, "conversations", "Rust", 10, Utc::now())
            .await
            .unwrap();
        assert_eq!(results[0].id, "b");
    }

    #[tokio::test]
    async fn embedding_unavailable_degrades_to_keyword_only() {
        let store = Arc::new(FakeSemantic::default());
        store.keyword_hits.lock().unwrap().push(hit("k1", "keyword only hit", 0.4));
        let semantic: Arc<dyn SemanticStore> = store;
        let embeddings: Arc<dyn EmbeddingService> = Arc::new(UnavailableEmbedder);

        let results = search(&semantic, &embeddings, "conversations", "keyword", 10, Utc::now())
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "k1");
    }

    #[tokio::test]
    async fn limit_truncates_after_reranking() {
        let store = Arc::new(FakeSemantic::default());
        for i in 0..5 {
            store
                .semantic_hits
                .lock()
                .unwrap()
                .push(hit(&format!("s{i}"), "some content", 1.0 - i as f32 * 0.1));
        }
        let semantic: Arc<dyn SemanticStore> = store;
        let embeddings: Arc<dyn EmbeddingService> = Arc::new(FakeEmbedder);

        let results = search(&semantic, &embeddings, "conversations", "", 2, Utc::now())
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
    }
}
