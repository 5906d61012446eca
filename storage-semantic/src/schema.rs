//! Database schema for the Semantic Store adapter (spec §2, §4.5).
//!
//! Every named collection (`stored_memories`, `identified_facts`,
//! `raw_embeddings`, `conversations`, `codebase`, `code_symbols`,
//! `patterns`, `insights`, `analysis_results`) lives in one physical
//! table, partitioned by a `collection` column, rather than one table per
//! collection. Embeddings are stored as a flat little-endian `f32` blob;
//! cosine similarity is computed in Rust over candidate rows rather than
//! relying on a vector index, since the collection set and row counts a
//! single-user daemon accumulates stay well within what a full scan over
//! one collection can handle interactively.

/// The single table backing every named collection.
pub const CREATE_ITEMS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS items (
    collection TEXT NOT NULL,
    id TEXT NOT NULL,
    document TEXT NOT NULL,
    embedding BLOB,
    metadata TEXT NOT NULL,
    created_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
    updated_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
    PRIMARY KEY (collection, id)
)
"#;

/// Speeds up `unflagged` scans (spec §4.2.3, §4.3 step 1) and `count`.
pub const CREATE_ITEMS_COLLECTION_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_items_collection
ON items(collection)
"#;

/// Speeds up recency-boosted re-ranking in the search contract (spec §4.2).
pub const CREATE_ITEMS_CREATED_AT_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_items_created_at
ON items(collection, created_at DESC)
"#;
