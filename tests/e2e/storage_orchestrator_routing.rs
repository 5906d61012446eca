//! End-to-end scenario: the Storage Orchestrator wired to the real redb Raw
//! Store and libSQL Semantic Store adapters (not the in-memory mocks core's
//! own unit tests use), exercising the classifier's routing decisions and
//! the privacy boundary across actual crate boundaries (spec §4.5, §7).

use noesis_core::storage::classifier::ClassifierHints;
use noesis_core::storage::{Orchestrator, StoreRequest};
use noesis_storage_raw::RedbRawStore;
use noesis_storage_semantic::LibsqlSemanticStore;
use noesis_test_utils::HashingEmbeddingService;
use serde_json::json;
use std::sync::Arc;

async fn orchestrator(temp_dir: &tempfile::TempDir) -> Orchestrator {
    let raw = RedbRawStore::open(&temp_dir.path().join("raw.redb")).unwrap();
    let semantic = LibsqlSemanticStore::new(":memory:", "").await.unwrap();
    semantic.initialize_schema().await.unwrap();

    Orchestrator::new(
        Arc::new(raw),
        Arc::new(semantic),
        Arc::new(HashingEmbeddingService::new(32)),
    )
}

#[tokio::test]
async fn plain_fact_lands_in_identified_facts_and_is_queryable_by_keyword() {
    let temp_dir = tempfile::tempdir().unwrap();
    let orch = orchestrator(&temp_dir).await;

    let outcome = orch
        .store(StoreRequest {
            content: "the project uses tokio for async scheduling".to_string(),
            metadata: json!({}),
            hints: ClassifierHints::default(),
            id: "fact-1".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(outcome.routed_to, "identified_facts");

    let hits = orch
        .semantic()
        .query_keyword("identified_facts", "tokio", 10)
        .await
        .unwrap();
    assert!(hits.iter().any(|h| h.id == "fact-1"));
}

#[tokio::test]
async fn private_content_never_surfaces_through_read_raw() {
    let temp_dir = tempfile::tempdir().unwrap();
    let orch = orchestrator(&temp_dir).await;

    orch.store(StoreRequest {
        content: "I'm worried this migration will corrupt production data".to_string(),
        metadata: json!({}),
        hints: ClassifierHints::default(),
        id: "secret-1".to_string(),
    })
    .await
    .unwrap();

    let err = orch.read_raw("private_memory", "secret-1").await.unwrap_err();
    assert!(err.is_privacy_violation());

    // Only the semantic_hash marker crosses into the Semantic Store.
    let hits = orch
        .semantic()
        .query_keyword("identified_facts", "secret-1_hash", 10)
        .await
        .unwrap();
    assert!(hits.is_empty(), "FTS indexes document text, not ids, so a direct id search finds nothing");

    let count = orch.semantic().count("identified_facts").await.unwrap();
    assert_eq!(count, 1, "the hash marker row was written even though the blob itself stayed private");
}

#[tokio::test]
async fn insight_hint_is_retrievable_by_semantic_similarity_to_itself() {
    let temp_dir = tempfile::tempdir().unwrap();
    let orch = orchestrator(&temp_dir).await;

    orch.store(StoreRequest {
        content: "retry storms correlate with the circuit breaker staying half-open too long".to_string(),
        metadata: json!({}),
        hints: ClassifierHints {
            marked_insight: true,
            ..Default::default()
        },
        id: "insight-1".to_string(),
    })
    .await
    .unwrap();

    let query_embedding = orch
        .embeddings()
        .embed(
            "retry storms correlate with the circuit breaker staying half-open too long",
            noesis_core::storage::traits::ContentKind::General,
        )
        .await
        .unwrap();

    let hits = orch
        .semantic()
        .query_semantic("stored_memories", &query_embedding, 5)
        .await
        .unwrap();
    assert_eq!(hits.first().map(|h| h.id.as_str()), Some("insight-1"));
}
