//! Indexing Pipeline (spec §4.2): turns new or changed raw content into
//! chunks, embeddings, and metadata written to the two stores, with
//! at-most-once semantics per `(source, content-hash)`.
//!
//! Per the design notes' capability-set replacement for class-hierarchy
//! indexers, a source-specific indexer is just a record of four
//! capabilities — classify, chunk, embed, persist — rather than a base
//! class with overrides. [`conversation`] and [`codebase`] each implement
//! those capabilities directly as plain functions operating on their own
//! source type; nothing here requires them to share an implementation,
//! only the `IndexOutcome` contract.

pub mod codebase;
pub mod conversation;
pub mod memory_indexer;
pub mod search;
pub mod watcher;

/// Summary of one `index` call, used for scheduler task results and the
/// batching coroutine's per-item accounting.
#[derive(Debug, Clone, Default)]
pub struct IndexOutcome {
    pub source_id: String,
    pub chunks_written: usize,
    pub facts_written: usize,
    pub skipped_unchanged: bool,
}

/// Bounded-channel batching in front of the per-source indexers (spec
/// §4.2 "Batching"): drains up to `BATCH_SIZE` items, or every
/// `BATCH_INTERVAL`, whichever comes first. Failures within a batch do
/// not fail the batch — each item's outcome is independent.
pub const BATCH_SIZE: usize = 10;
pub const BATCH_INTERVAL: std::time::Duration = std::time::Duration::from_secs(5);

/// One item submitted to the indexing pipeline's batching channel.
#[derive(Debug, Clone)]
pub struct IndexingJob {
    pub source_id: String,
    pub raw: String,
}

/// Drains up to `BATCH_SIZE` jobs from `pending`, leaving the rest for the
/// next tick. A thin helper around the batching rule so the channel-based
/// coroutine (owned by the facade, which holds the runtime) can reuse the
/// exact same slicing logic under test.
#[must_use]
pub fn take_batch(pending: &mut Vec<IndexingJob>) -> Vec<IndexingJob> {
    let n = pending.len().min(BATCH_SIZE);
    pending.drain(..n).collect()
}
