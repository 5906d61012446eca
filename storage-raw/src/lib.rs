//! # Noesis Storage (redb)
//!
//! redb-backed Raw Store adapter (spec §2 "Raw Store adapter"): an
//! append-only, content-addressed blob store for conversation backups,
//! codebase snapshots, session-continuity bridges, and opaque
//! `private_memory` blobs.
//!
//! Blobs are keyed by `namespace` + `id`; both composite key tables are
//! updated inside a single write transaction so a blob and its content
//! hash never drift apart. Every redb call is synchronous, so each
//! operation is pushed onto a blocking thread the way the teacher's
//! cache layer does.
//!
//! ## Example
//!
//! ```no_run
//! use noesis_storage_raw::RedbRawStore;
//! use std::path::Path;
//!
//! # async fn example() -> noesis_core::Result<()> {
//! let store = RedbRawStore::open(Path::new("./raw.redb"))?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use noesis_core::error::{Error, Result};
use noesis_core::storage::traits::RawStore;
use redb::{Database, ReadableTable, TableDefinition};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Composite-keyed blob table: key is `"{namespace}\0{id}"`.
const BLOBS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("blobs");

/// Composite-keyed content-hash table, updated alongside `BLOBS_TABLE` in
/// the same write transaction.
const HASHES_TABLE: TableDefinition<&str, &str> = TableDefinition::new("hashes");

/// Above this size a `put` is rejected outright rather than risking an
/// unbounded redb page-cache blowup (spec §7: "an unreadable/oversized
/// raw file is an input error, not a crash").
pub const MAX_BLOB_SIZE: usize = 50_000_000;

fn composite_key(namespace: &str, id: &str) -> String {
    format!("{namespace}\0{id}")
}

fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// redb-backed [`RawStore`].
pub struct RedbRawStore {
    db: Arc<Database>,
}

impl RedbRawStore {
    /// Open (creating if absent) the redb database at `path`, ensuring
    /// both tables exist.
    pub fn open(path: &Path) -> Result<Self> {
        let db = Database::create(path)
            .map_err(|e| Error::PermanentStorage(format!("failed to open raw store: {e}")))?;

        let write_txn = db
            .begin_write()
            .map_err(|e| Error::TransientStorage(format!("failed to begin write transaction: {e}")))?;
        {
            let _ = write_txn
                .open_table(BLOBS_TABLE)
                .map_err(|e| Error::PermanentStorage(format!("failed to open blobs table: {e}")))?;
            let _ = write_txn
                .open_table(HASHES_TABLE)
                .map_err(|e| Error::PermanentStorage(format!("failed to open hashes table: {e}")))?;
        }
        write_txn
            .commit()
            .map_err(|e| Error::TransientStorage(format!("failed to commit transaction: {e}")))?;

        Ok(Self { db: Arc::new(db) })
    }

    /// An in-memory store, useful for tests that don't want a temp file.
    #[cfg(any(test, feature = "in-memory"))]
    pub fn in_memory() -> Result<Self> {
        let db = Database::builder()
            .create_with_backend(redb::backends::InMemoryBackend::new())
            .map_err(|e| Error::PermanentStorage(format!("failed to create in-memory raw store: {e}")))?;
        Ok(Self { db: Arc::new(db) })
    }
}

#[async_trait]
impl RawStore for RedbRawStore {
    async fn put(&self, namespace: &str, id: &str, bytes: Vec<u8>) -> Result<()> {
        if bytes.len() > MAX_BLOB_SIZE {
            return Err(Error::InvalidInput(format!(
                "blob {namespace}/{id} is {} bytes, exceeds the {MAX_BLOB_SIZE} byte limit",
                bytes.len()
            )));
        }

        let db = Arc::clone(&self.db);
        let key = composite_key(namespace, id);
        let hash = content_hash(&bytes);

        debug!(namespace, id, size = bytes.len(), "writing raw blob");

        tokio::task::spawn_blocking(move || {
            let write_txn = db
                .begin_write()
                .map_err(|e| Error::TransientStorage(format!("failed to begin write transaction: {e}")))?;
            {
                let mut blobs = write_txn
                    .open_table(BLOBS_TABLE)
                    .map_err(|e| Error::PermanentStorage(format!("failed to open blobs table: {e}")))?;
                blobs
                    .insert(key.as_str(), bytes.as_slice())
                    .map_err(|e| Error::TransientStorage(format!("failed to insert blob: {e}")))?;

                let mut hashes = write_txn
                    .open_table(HASHES_TABLE)
                    .map_err(|e| Error::PermanentStorage(format!("failed to open hashes table: {e}")))?;
                hashes
                    .insert(key.as_str(), hash.as_str())
                    .map_err(|e| Error::TransientStorage(format!("failed to insert hash: {e}")))?;
            }
            write_txn
                .commit()
                .map_err(|e| Error::TransientStorage(format!("failed to commit transaction: {e}")))?;
            Ok(())
        })
        .await
        .map_err(|e| Error::TransientStorage(format!("blocking task join error: {e}")))?
    }

    async fn get(&self, namespace: &str, id: &str) -> Result<Vec<u8>> {
        let db = Arc::clone(&self.db);
        let key = composite_key(namespace, id);
        let namespace = namespace.to_string();
        let id = id.to_string();

        tokio::task::spawn_blocking(move || {
            let read_txn = db
                .begin_read()
                .map_err(|e| Error::TransientStorage(format!("failed to begin read transaction: {e}")))?;
            let table = read_txn
                .open_table(BLOBS_TABLE)
                .map_err(|e| Error::PermanentStorage(format!("failed to open blobs table: {e}")))?;

            table
                .get(key.as_str())
                .map_err(|e| Error::TransientStorage(format!("failed to read blob: {e}")))?
                .map(|guard| guard.value().to_vec())
                .ok_or_else(|| Error::NotFound(format!("{namespace}/{id}")))
        })
        .await
        .map_err(|e| Error::TransientStorage(format!("blocking task join error: {e}")))?
    }

    async fn stored_hash(&self, namespace: &str, id: &str) -> Result<Option<String>> {
        let db = Arc::clone(&self.db);
        let key = composite_key(namespace, id);

        tokio::task::spawn_blocking(move || {
            let read_txn = db
                .begin_read()
                .map_err(|e| Error::TransientStorage(format!("failed to begin read transaction: {e}")))?;
            let table = read_txn
                .open_table(HASHES_TABLE)
                .map_err(|e| Error::PermanentStorage(format!("failed to open hashes table: {e}")))?;

            Ok(table
                .get(key.as_str())
                .map_err(|e| Error::TransientStorage(format!("failed to read hash: {e}")))?
                .map(|guard| guard.value().to_string()))
        })
        .await
        .map_err(|e| Error::TransientStorage(format!("blocking task join error: {e}")))?
    }

    async fn list_ids(&self, namespace: &str) -> Result<Vec<String>> {
        let db = Arc::clone(&self.db);
        let prefix = format!("{namespace}\0");

        tokio::task::spawn_blocking(move || {
            let read_txn = db
                .begin_read()
                .map_err(|e| Error::TransientStorage(format!("failed to begin read transaction: {e}")))?;
            let table = read_txn
                .open_table(BLOBS_TABLE)
                .map_err(|e| Error::PermanentStorage(format!("failed to open blobs table: {e}")))?;

            let mut ids = Vec::new();
            let iter = table
                .iter()
                .map_err(|e| Error::TransientStorage(format!("failed to iterate blobs: {e}")))?;
            for entry in iter {
                let (key_guard, _) =
                    entry.map_err(|e| Error::TransientStorage(format!("failed to read entry: {e}")))?;
                let key = key_guard.value();
                if let Some(id) = key.strip_prefix(prefix.as_str()) {
                    ids.push(id.to_string());
                }
            }
            Ok(ids)
        })
        .await
        .map_err(|e| Error::TransientStorage(format!("blocking task join error: {e}")))?
    }

    async fn delete(&self, namespace: &str, id: &str) -> Result<()> {
        let db = Arc::clone(&self.db);
        let key = composite_key(namespace, id);

        tokio::task::spawn_blocking(move || {
            let write_txn = db
                .begin_write()
                .map_err(|e| Error::TransientStorage(format!("failed to begin write transaction: {e}")))?;
            {
                let mut blobs = write_txn
                    .open_table(BLOBS_TABLE)
                    .map_err(|e| Error::PermanentStorage(format!("failed to open blobs table: {e}")))?;
                blobs
                    .remove(key.as_str())
                    .map_err(|e| Error::TransientStorage(format!("failed to delete blob: {e}")))?;

                let mut hashes = write_txn
                    .open_table(HASHES_TABLE)
                    .map_err(|e| Error::PermanentStorage(format!("failed to open hashes table: {e}")))?;
                hashes
                    .remove(key.as_str())
                    .map_err(|e| Error::TransientStorage(format!("failed to delete hash: {e}")))?;
            }
            write_txn
                .commit()
                .map_err(|e| Error::TransientStorage(format!("failed to commit transaction: {e}")))?;
            Ok(())
        })
        .await
        .map_err(|e| Error::TransientStorage(format!("blocking task join error: {e}")))?
    }
}

impl std::fmt::Debug for RedbRawStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbRawStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> RedbRawStore {
        RedbRawStore::in_memory().unwrap()
    }

    #[tokio::test]
    async fn put_then_get_round_trips_bytes() {
        let store = store();
        store.put("conversations", "c1", b"hello".to_vec()).await.unwrap();
        let bytes = store.get("conversations", "c1").await.unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[tokio::test]
    async fn get_missing_blob_is_not_found() {
        let store = store();
        let err = store.get("conversations", "missing").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn stored_hash_matches_content_hash_and_changes_on_overwrite() {
        let store = store();
        store.put("codebase", "f1", b"version one".to_vec()).await.unwrap();
        let hash1 = store.stored_hash("codebase", "f1").await.unwrap().unwrap();

        store.put("codebase", "f1", b"version two".to_vec()).await.unwrap();
        let hash2 = store.stored_hash("codebase", "f1").await.unwrap().unwrap();

        assert_ne!(hash1, hash2);
    }

    #[tokio::test]
    async fn stored_hash_is_none_for_unknown_id() {
        let store = store();
        assert!(store.stored_hash("codebase", "nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_ids_only_returns_entries_for_the_requested_namespace() {
        let store = store();
        store.put("bridges", "b1", b"x".to_vec()).await.unwrap();
        store.put("bridges", "b2", b"y".to_vec()).await.unwrap();
        store.put("private_memory", "p1", b"z".to_vec()).await.unwrap();

        let mut ids = store.list_ids("bridges").await.unwrap();
        ids.sort();
        assert_eq!(ids, vec!["b1".to_string(), "b2".to_string()]);
    }

    #[tokio::test]
    async fn delete_removes_blob_and_hash() {
        let store = store();
        store.put("bridges", "b1", b"x".to_vec()).await.unwrap();
        store.delete("bridges", "b1").await.unwrap();

        assert!(store.get("bridges", "b1").await.is_err());
        assert!(store.stored_hash("bridges", "b1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn oversized_blob_is_rejected_as_invalid_input() {
        let store = store();
        let big = vec![0u8; MAX_BLOB_SIZE + 1];
        let err = store.put("codebase", "huge", big).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn namespaces_with_shared_ids_do_not_collide() {
        let store = store();
        store.put("conversations", "1", b"convo".to_vec()).await.unwrap();
        store.put("codebase", "1", b"code".to_vec()).await.unwrap();

        assert_eq!(store.get("conversations", "1").await.unwrap(), b"convo");
        assert_eq!(store.get("codebase", "1").await.unwrap(), b"code");
    }
}
