//! Storage Orchestrator: routes every write to the Raw Store or Semantic
//! Store based on the Classifier's decision, and enforces the privacy
//! partition (spec §4.5).

pub mod circuit_breaker;
pub mod classifier;
pub mod traits;

use crate::error::{Error, Result};
use crate::storage::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use crate::storage::classifier::{classify, ClassifierHints, ClassifierInput, RouteDecision};
use crate::storage::traits::{ContentKind, EmbeddingService, RawStore, SemanticStore, UpsertRow};
use serde_json::json;
use std::sync::Arc;
use tracing::instrument;

/// What the caller wants written, before classification.
#[derive(Debug, Clone)]
pub struct StoreRequest {
    pub content: String,
    pub metadata: serde_json::Value,
    pub hints: ClassifierHints,
    /// Deterministic id for idempotent upserts (spec §4.5 "idempotent
    /// upserts... all writes include a deterministic id").
    pub id: String,
}

/// Where a `store` call ended up routing the content, and its id.
#[derive(Debug, Clone)]
pub struct StoreOutcome {
    pub id: String,
    pub routed_to: &'static str,
}

/// Mediates all storage writes across the Raw Store and Semantic Store.
pub struct Orchestrator {
    raw: Arc<dyn RawStore>,
    semantic: Arc<dyn SemanticStore>,
    embeddings: Arc<dyn EmbeddingService>,
    circuit: CircuitBreaker,
}

impl Orchestrator {
    /// Build an orchestrator over the given backend handles.
    #[must_use]
    pub fn new(
        raw: Arc<dyn RawStore>,
        semantic: Arc<dyn SemanticStore>,
        embeddings: Arc<dyn EmbeddingService>,
    ) -> Self {
        Self {
            raw,
            semantic,
            embeddings,
            circuit: CircuitBreaker::new(CircuitBreakerConfig::default()),
        }
    }

    /// Route and write `request`, per spec §4.5's classifier decision table.
    #[instrument(skip(self, request), fields(id = %request.id))]
    pub async fn store(&self, request: StoreRequest) -> Result<StoreOutcome> {
        let decision = classify(&ClassifierInput {
            text: &request.content,
            hints: request.hints,
        });

        match decision {
            RouteDecision::Private => self.store_private(request).await,
            RouteDecision::Insight => {
                self.upsert_semantic("stored_memories", request, ContentKind::General)
                    .await
            }
            RouteDecision::RawEmbedding => {
                self.store_raw_embedding(request).await
            }
            RouteDecision::Custom => {
                self.upsert_semantic("identified_facts", request, ContentKind::General)
                    .await
            }
        }
    }

    async fn store_private(&self, request: StoreRequest) -> Result<StoreOutcome> {
        let semantic_hash = format!("{:x}", md5::compute(request.content.as_bytes()));

        self.circuit
            .call(|| async {
                self.raw
                    .put(
                        "private_memory",
                        &request.id,
                        request.content.clone().into_bytes(),
                    )
                    .await
            })
            .await?;

        // Only the hash crosses the privacy boundary (spec §4.5, §7).
        let hash_row = UpsertRow {
            id: format!("{}_hash", request.id),
            embedding: None,
            document: semantic_hash.clone(),
            metadata: json!({
                "scope": "private",
                "visibility": "sensitive",
                "semantic_hash": semantic_hash,
            }),
        };
        self.circuit
            .call(|| async { self.semantic.upsert("identified_facts", vec![hash_row.clone()]).await })
            .await?;

        Ok(StoreOutcome {
            id: request.id,
            routed_to: "raw_store/private_memory",
        })
    }

    async fn store_raw_embedding(&self, request: StoreRequest) -> Result<StoreOutcome> {
        self.circuit
            .call(|| async {
                self.raw
                    .put(
                        "raw_embeddings_sideblob",
                        &request.id,
                        request.content.clone().into_bytes(),
                    )
                    .await
            })
            .await?;
        self.upsert_semantic("raw_embeddings", request, ContentKind::General)
            .await
    }

    async fn upsert_semantic(
        &self,
        collection: &'static str,
        request: StoreRequest,
        kind: ContentKind,
    ) -> Result<StoreOutcome> {
        let embedding = match self.embeddings.embed(&request.content, kind).await {
            Ok(v) => Some(v),
            Err(Error::EmbeddingUnavailable) => None,
            Err(e) => return Err(e),
        };

        let mut metadata = request.metadata.clone();
        if embedding.is_none() {
            if let Some(obj) = metadata.as_object_mut() {
                obj.insert("embedding_pending".to_string(), json!(true));
            }
        }

        let row = UpsertRow {
            id: request.id.clone(),
            embedding,
            document: request.content.clone(),
            metadata,
        };

        self.circuit
            .call(|| async { self.semantic.upsert(collection, vec![row.clone()]).await })
            .await?;

        Ok(StoreOutcome {
            id: request.id,
            routed_to: collection,
        })
    }

    /// Read a non-private blob back from the Raw Store. Callers MUST NOT
    /// use this for `private_memory` content (spec §7's privacy-boundary
    /// violation); that guard lives at the call sites that hold the
    /// namespace, not here, since the orchestrator itself never inspects
    /// private bytes either.
    pub async fn read_raw(&self, namespace: &str, id: &str) -> Result<Vec<u8>> {
        if namespace == "private_memory" {
            return Err(Error::PrivacyViolation(format!(
                "attempted read-through of private_memory blob {id}"
            )));
        }
        self.raw.get(namespace, id).await
    }

    /// Access to the underlying Semantic Store, for components (indexing,
    /// contemplation) that read/query collections directly.
    #[must_use]
    pub fn semantic(&self) -> &Arc<dyn SemanticStore> {
        &self.semantic
    }

    /// Access to the underlying Raw Store, for components that write
    /// conversation backups / codebase snapshots directly by namespace.
    #[must_use]
    pub fn raw(&self) -> &Arc<dyn RawStore> {
        &self.raw
    }

    /// Access to the Embedding Service, for indexers that need to embed
    /// chunk text themselves rather than through `store`.
    #[must_use]
    pub fn embeddings(&self) -> &Arc<dyn EmbeddingService> {
        &self.embeddings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::traits::SemanticHit;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct InMemoryRaw {
        blobs: Mutex<std::collections::HashMap<(String, String), Vec<u8>>>,
    }

    #[async_trait]
    impl RawStore for InMemoryRaw {
        async fn put(&self, namespace: &str, id: &str, bytes: Vec<u8>) -> Result<()> {
            self.blobs
                .lock()
                .unwrap()
                .insert((namespace.to_string(), id.to_string()), bytes);
            Ok(())
        }

        async fn get(&self, namespace: &str, id: &str) -> Result<Vec<u8>> {
            self.blobs
                .lock()
                .unwrap()
                .get(&(namespace.to_string(), id.to_string()))
                .cloned()
                .ok_or_else(|| Error::NotFound(format!("{namespace}/{id}")))
        }

        async fn stored_hash(&self, _namespace: &str, _id: &str) -> Result<Option<String>> {
            Ok(None)
        }

        async fn list_ids(&self, namespace: &str) -> Result<Vec<String>> {
            Ok(self
                .blobs
                .lock()
                .unwrap()
                .keys()
                .filter(|(ns, _)| ns == namespace)
                .map(|(_, id)| id.clone())
                .collect())
        }

        async fn delete(&self, namespace: &str, id: &str) -> Result<()> {
            self.blobs
                .lock()
                .unwrap()
                .remove(&(namespace.to_string(), id.to_string()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct InMemorySemantic {
        rows: Mutex<std::collections::HashMap<String, Vec<UpsertRow>>>,
    }

    #[async_trait]
    impl SemanticStore for InMemorySemantic {
        async fn upsert(&self, collection: &str, rows: Vec<UpsertRow>) -> Result<()> {
            self.rows
                .lock()
                .unwrap()
                .entry(collection.to_string())
                .or_default()
                .extend(rows);
            Ok(())
        }

        async fn query_semantic(
            &self,
            _collection: &str,
            _embedding: &[f32],
            _limit: usize,
        ) -> Result<Vec<SemanticHit>> {
            Ok(vec![])
        }

        async fn query_keyword(
            &self,
            _collection: &str,
            _text: &str,
            _limit: usize,
        ) -> Result<Vec<SemanticHit>> {
            Ok(vec![])
        }

        async fn unflagged(
            &self,
            _collection: &str,
            _flag_key: &str,
            _limit: usize,
        ) -> Result<Vec<SemanticHit>> {
            Ok(vec![])
        }

        async fn set_flag(
            &self,
            _collection: &str,
            _id: &str,
            _flag_key: &str,
            _value: bool,
        ) -> Result<()> {
            Ok(())
        }

        async fn count(&self, collection: &str) -> Result<usize> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .get(collection)
                .map_or(0, Vec::len))
        }
    }

    struct HashingEmbedder {
        dim: usize,
    }

    #[async_trait]
    impl EmbeddingService for HashingEmbedder {
        async fn embed(&self, text: &str, _kind: ContentKind) -> Result<Vec<f32>> {
            let mut v = vec![0.0f32; self.dim];
            for (i, b) in text.bytes().enumerate() {
                v[i % self.dim] += f32::from(b);
            }
            let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm > 0.0 {
                for x in &mut v {
                    *x /= norm;
                }
            }
            Ok(v)
        }

        fn dimension(&self) -> usize {
            self.dim
        }
    }

    fn orchestrator() -> Orchestrator {
        Orchestrator::new(
            Arc::new(InMemoryRaw::default()),
            Arc::new(InMemorySemantic::default()),
            Arc::new(HashingEmbedder { dim: 8 }),
        )
    }

    #[tokio::test]
    async fn private_marker_routes_to_raw_store_and_writes_hash_only() {
        let orch = orchestrator();
        let outcome = orch
            .store(StoreRequest {
                content: "I'm uncertain whether this is right".to_string(),
                metadata: json!({}),
                hints: ClassifierHints::default(),
                id: "item-1".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(outcome.routed_to, "raw_store/private_memory");
        assert!(orch.raw.get("private_memory", "item-1").await.is_ok());
    }

    #[tokio::test]
    async fn reading_private_memory_through_orchestrator_is_rejected() {
        let orch = orchestrator();
        let err = orch.read_raw("private_memory", "item-1").await.unwrap_err();
        assert!(err.is_privacy_violation());
    }

    #[tokio::test]
    async fn plain_content_routes_to_identified_facts() {
        let orch = orchestrator();
        let outcome = orch
            .store(StoreRequest {
                content: "uses library X".to_string(),
                metadata: json!({}),
                hints: ClassifierHints::default(),
                id: "fact-1".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(outcome.routed_to, "identified_facts");
    }

    #[tokio::test]
    async fn insight_hint_routes_to_stored_memories() {
        let orch = orchestrator();
        let outcome = orch
            .store(StoreRequest {
                content: "a synthesized insight".to_string(),
                metadata: json!({}),
                hints: ClassifierHints {
                    marked_insight: true,
                    ..Default::default()
                },
                id: "insight-1".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(outcome.routed_to, "stored_memories");
    }
}
