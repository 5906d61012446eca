//! Capability traits at the Storage Orchestrator's two backend seams, plus
//! the Embedding Service contract (spec §2, §6). Per the design notes'
//! "no ad-hoc singletons" rule, components receive these as explicit `Arc<dyn
//! ..>` trait objects passed into their constructors rather than reaching for
//! a global client.

use crate::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Content-type hint passed to the Embedding Service so it can route to a
/// general-purpose or code-specialized model (spec §2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    General,
    Code,
}

/// Produces a fixed-dimension, unit-norm embedding for a piece of text.
///
/// Implementations are black-box per spec §1 (the embedding model itself is
/// out of scope); this trait is the seam a real model sits behind.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// Embed `text`, returning a unit-norm vector of [`Self::dimension`] length.
    async fn embed(&self, text: &str, kind: ContentKind) -> Result<Vec<f32>>;

    /// The fixed dimension this service produces, checked against
    /// `storage.chroma_dimensions` (spec §6).
    fn dimension(&self) -> usize;
}

/// One row returned from a Semantic Store query.
#[derive(Debug, Clone)]
pub struct SemanticHit {
    pub id: String,
    pub document: String,
    pub metadata: Value,
    /// Semantic score (`1 - distance`) or keyword score (negated rank),
    /// per spec §4.2's search-contract scoring.
    pub score: f32,
}

/// A single upsert row: id, embedding, document text, metadata.
#[derive(Debug, Clone)]
pub struct UpsertRow {
    pub id: String,
    pub embedding: Option<Vec<f32>>,
    pub document: String,
    pub metadata: Value,
}

/// The vector-DB-plus-full-text-index backend (spec §2 "Semantic Store
/// adapter"): three named collections (`stored_memories`, `identified_facts`,
/// `raw_embeddings`) plus indexer-owned collections (`conversations`,
/// `codebase`, `code_symbols`, `patterns`, `insights`, `analysis_results`).
#[async_trait]
pub trait SemanticStore: Send + Sync {
    /// Idempotent upsert of rows into `collection` (deterministic ids).
    async fn upsert(&self, collection: &str, rows: Vec<UpsertRow>) -> Result<()>;

    /// Vector similarity query against `collection`.
    async fn query_semantic(
        &self,
        collection: &str,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<SemanticHit>>;

    /// Full-text keyword query against `collection`.
    async fn query_keyword(
        &self,
        collection: &str,
        text: &str,
        limit: usize,
    ) -> Result<Vec<SemanticHit>>;

    /// Fetch up to `limit` rows from `collection` whose metadata flag
    /// `processed` (or `indexed`/etc., by `flag_key`) is not `true` — used
    /// by the Contemplation Engine and Memory Indexer to find unprocessed
    /// items (spec §4.2.3, §4.3 step 1).
    async fn unflagged(
        &self,
        collection: &str,
        flag_key: &str,
        limit: usize,
    ) -> Result<Vec<SemanticHit>>;

    /// Set a boolean metadata flag on a row (e.g. `processed = true`).
    async fn set_flag(&self, collection: &str, id: &str, flag_key: &str, value: bool)
        -> Result<()>;

    /// Count of rows currently in `collection`, used to trigger the Memory
    /// Indexer's optimization tasks past a configurable threshold.
    async fn count(&self, collection: &str) -> Result<usize>;
}

/// The append-only, content-addressed blob backend (spec §2 "Raw Store
/// adapter"): conversation backups, codebase snapshots, and opaque
/// `private_memory` blobs.
#[async_trait]
pub trait RawStore: Send + Sync {
    /// Append-write `bytes` under `namespace`/`id`. Writes within a
    /// namespace are serialized by the caller (spec §5).
    async fn put(&self, namespace: &str, id: &str, bytes: Vec<u8>) -> Result<()>;

    /// Read back a previously stored blob.
    async fn get(&self, namespace: &str, id: &str) -> Result<Vec<u8>>;

    /// The stored content hash for `id`, if any — used by reindex-decision
    /// checks (spec §4.2.1, §4.2.2) without reading the blob back.
    async fn stored_hash(&self, namespace: &str, id: &str) -> Result<Option<String>>;

    /// Every id currently stored under `namespace`, used by the
    /// Session-Continuity Bridge to find the most-recent unactivated
    /// bridge and by its retention sweep (spec §4.4) without needing a
    /// separate index.
    async fn list_ids(&self, namespace: &str) -> Result<Vec<String>>;

    /// Remove a blob, used by the Session-Continuity Bridge's retention
    /// sweep (spec §4.4) to actually drop expired bridges. Conversation
    /// backups and codebase snapshots are otherwise append-only; this is
    /// exercised only by retention, not by the indexing pipeline.
    async fn delete(&self, namespace: &str, id: &str) -> Result<()>;
}
