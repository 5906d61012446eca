#![allow(clippy::expect_used)]

//! # Noesis Storage (libSQL/Turso)
//!
//! libSQL/Turso-backed Semantic Store adapter (spec §2 "Semantic Store
//! adapter"): the vector-DB-plus-full-text-index half of the Storage
//! Orchestrator's two backends. Every named collection (`stored_memories`,
//! `identified_facts`, `raw_embeddings`, `conversations`, `codebase`,
//! `code_symbols`, `patterns`, `insights`, `analysis_results`) lives in one
//! physical table partitioned by a `collection` column, with an FTS5
//! shadow table for keyword search.
//!
//! This crate provides:
//! - Connection management for libSQL/Turso databases, local or remote
//! - SQL schema creation and migration
//! - [`noesis_core::storage::traits::SemanticStore`] CRUD and query
//!   operations over named collections
//! - Retry logic for transient failures
//!
//! ## Example
//!
//! ```no_run
//! use noesis_storage_semantic::LibsqlSemanticStore;
//!
//! # async fn example() -> noesis_core::error::Result<()> {
//! let store = LibsqlSemanticStore::new("file:semantic.db", "").await?;
//! store.initialize_schema().await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use libsql::{Builder, Connection, Database};
use noesis_core::error::{Error, Result};
use noesis_core::storage::traits::{SemanticHit, SemanticStore, UpsertRow};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub mod compression;
pub mod fts5_schema;
pub mod metrics;
pub mod pool;
pub mod prepared;
mod schema;
pub mod transport;

pub use pool::{ConnectionPool, PoolConfig, PoolStatistics};

/// libSQL/Turso-backed [`SemanticStore`].
pub struct LibsqlSemanticStore {
    db: Arc<Database>,
    pool: Option<Arc<ConnectionPool>>,
    config: TursoConfig,
}

/// Configuration for the libSQL/Turso-backed Semantic Store.
#[derive(Debug, Clone)]
pub struct TursoConfig {
    /// Maximum retry attempts for failed operations.
    pub max_retries: u32,
    /// Base delay for exponential backoff (milliseconds).
    pub retry_base_delay_ms: u64,
    /// Maximum delay for exponential backoff (milliseconds).
    pub retry_max_delay_ms: u64,
    /// Enable connection pooling.
    pub enable_pooling: bool,
    /// Candidates fetched per collection before ranking a semantic query
    /// (spec §4.2 search contract runs a full-collection comparison; this
    /// bounds it for collections that grow large).
    pub semantic_scan_limit: usize,
}

impl Default for TursoConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_base_delay_ms: 100,
            retry_max_delay_ms: 5000,
            enable_pooling: true,
            semantic_scan_limit: 5000,
        }
    }
}

impl LibsqlSemanticStore {
    /// Create a new store instance.
    ///
    /// # Arguments
    ///
    /// * `url` - Database URL (only `libsql://`, `file:`, or `:memory:` protocols allowed)
    /// * `token` - Authentication token (required for `libsql://`, empty for local files)
    ///
    /// # Security
    ///
    /// This method enforces secure connections:
    /// - Remote connections must use `libsql://` protocol with a valid token
    /// - HTTP/HTTPS protocols are rejected to prevent insecure connections
    /// - Local `file:` and `:memory:` databases are allowed without tokens
    pub async fn new(url: &str, token: &str) -> Result<Self> {
        Self::with_config(url, token, TursoConfig::default()).await
    }

    /// Build a store from an already-open [`Database`] (used by tests with
    /// local file-based databases).
    pub fn from_database(db: Database) -> Result<Self> {
        Ok(Self {
            db: Arc::new(db),
            pool: None,
            config: TursoConfig::default(),
        })
    }

    /// Create a store instance with custom configuration.
    ///
    /// # Security
    ///
    /// Enforces the same URL-scheme and token checks as [`Self::new`].
    pub async fn with_config(url: &str, token: &str, config: TursoConfig) -> Result<Self> {
        info!("Connecting to semantic store at {}", url);
        Self::validate_url(url, token)?;

        let db = Self::open(url, token).await?;
        let db = Arc::new(db);

        let pool = if config.enable_pooling {
            let pool_config = PoolConfig::default();
            let max_conn = pool_config.max_connections;
            let pool = ConnectionPool::new(Arc::clone(&db), pool_config).await?;
            info!("Connection pool enabled with {} max connections", max_conn);
            Some(Arc::new(pool))
        } else {
            info!("Connection pooling disabled");
            None
        };

        info!("Successfully connected to semantic store");
        Ok(Self { db, pool, config })
    }

    /// Create a store instance with custom pool configuration.
    pub async fn new_with_pool_config(
        url: &str,
        token: &str,
        config: TursoConfig,
        pool_config: PoolConfig,
    ) -> Result<Self> {
        info!("Connecting to semantic store at {}", url);
        Self::validate_url(url, token)?;

        let db = Arc::new(Self::open(url, token).await?);
        let pool = ConnectionPool::new(Arc::clone(&db), pool_config.clone()).await?;
        info!(
            "Connection pool enabled with {} max connections",
            pool_config.max_connections
        );

        Ok(Self {
            db,
            pool: Some(Arc::new(pool)),
            config,
        })
    }

    fn validate_url(url: &str, token: &str) -> Result<()> {
        if !url.starts_with("libsql://") && !url.starts_with("file:") && !url.starts_with(":memory:") {
            return Err(Error::PermanentStorage(format!(
                "insecure database URL: {url}. Only libsql://, file:, or :memory: protocols are allowed"
            )));
        }
        if url.starts_with("libsql://") && token.trim().is_empty() {
            return Err(Error::PermanentStorage(
                "authentication token required for remote connections".to_string(),
            ));
        }
        Ok(())
    }

    async fn open(url: &str, token: &str) -> Result<Database> {
        if url.starts_with("libsql://") {
            Builder::new_remote(url.to_string(), token.to_string())
                .build()
                .await
                .map_err(|e| Error::TransientStorage(format!("failed to connect: {e}")))
        } else {
            let path = url.strip_prefix("file:").unwrap_or(url);
            Builder::new_local(path)
                .build()
                .await
                .map_err(|e| Error::TransientStorage(format!("failed to connect: {e}")))
        }
    }

    /// Create the `items` table, its indexes, and the FTS5 shadow table
    /// and sync triggers. Safe to call multiple times.
    pub async fn initialize_schema(&self) -> Result<()> {
        info!("Initializing semantic store schema");
        let conn = self.get_connection().await?;

        self.execute_with_retry(&conn, schema::CREATE_ITEMS_TABLE).await?;
        self.execute_with_retry(&conn, schema::CREATE_ITEMS_COLLECTION_INDEX)
            .await?;
        self.execute_with_retry(&conn, schema::CREATE_ITEMS_CREATED_AT_INDEX)
            .await?;
        self.execute_with_retry(&conn, fts5_schema::CREATE_ITEMS_FTS_TABLE)
            .await?;
        self.execute_with_retry(&conn, fts5_schema::CREATE_ITEMS_FTS_TRIGGERS)
            .await?;

        info!("Schema initialization complete");
        Ok(())
    }

    /// Get a database connection, pooled if enabled.
    async fn get_connection(&self) -> Result<Connection> {
        if let Some(ref pool) = self.pool {
            let pooled_conn = pool.get().await?;
            pooled_conn.into_inner()
        } else {
            self.db
                .connect()
                .map_err(|e| Error::TransientStorage(format!("failed to get connection: {e}")))
        }
    }

    /// Pool statistics, if pooling is enabled.
    pub async fn pool_statistics(&self) -> Option<PoolStatistics> {
        match &self.pool {
            Some(pool) => Some(pool.statistics().await),
            None => None,
        }
    }

    /// Verify database connectivity.
    pub async fn health_check(&self) -> Result<bool> {
        let conn = self.get_connection().await?;
        match conn.query("SELECT 1", ()).await {
            Ok(_) => Ok(true),
            Err(e) => {
                error!("health check failed: {e}");
                Ok(false)
            }
        }
    }

    /// Execute a SQL statement with exponential-backoff retry (spec §7
    /// "transient store errors ... retried with exponential backoff").
    async fn execute_with_retry(&self, conn: &Connection, sql: &str) -> Result<()> {
        let mut attempts = 0;
        let mut delay = Duration::from_millis(self.config.retry_base_delay_ms);

        loop {
            match conn.execute(sql, ()).await {
                Ok(_) => {
                    if attempts > 0 {
                        debug!("SQL succeeded after {attempts} retries");
                    }
                    return Ok(());
                }
                Err(e) => {
                    attempts += 1;
                    if attempts >= self.config.max_retries {
                        error!("SQL failed after {attempts} attempts: {e}");
                        return Err(Error::TransientStorage(format!(
                            "SQL execution failed after {attempts} retries: {e}"
                        )));
                    }
                    warn!("SQL attempt {attempts} failed: {e}, retrying...");
                    tokio::time::sleep(delay).await;
                    delay = std::cmp::min(delay * 2, Duration::from_millis(self.config.retry_max_delay_ms));
                }
            }
        }
    }

    fn encode_embedding(vector: &[f32]) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(vector.len() * 4);
        for v in vector {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes
    }

    fn decode_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    /// Cosine similarity between two unit-norm vectors reduces to a dot
    /// product; vectors coming from the Embedding Service are unit-norm by
    /// contract (spec §2), so this is what `query_semantic` uses directly
    /// rather than normalizing on every comparison.
    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() || a.is_empty() {
            return 0.0;
        }
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }
}

#[async_trait]
impl SemanticStore for LibsqlSemanticStore {
    async fn upsert(&self, collection: &str, rows: Vec<UpsertRow>) -> Result<()> {
        let conn = self.get_connection().await?;
        for row in rows {
            let embedding_bytes = row.embedding.as_deref().map(Self::encode_embedding);
            conn.execute(
                "INSERT INTO items (collection, id, document, embedding, metadata, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, strftime('%s','now')) \
                 ON CONFLICT(collection, id) DO UPDATE SET \
                   document = excluded.document, \
                   embedding = excluded.embedding, \
                   metadata = excluded.metadata, \
                   updated_at = excluded.updated_at",
                libsql::params![
                    collection.to_string(),
                    row.id,
                    row.document,
                    embedding_bytes,
                    row.metadata.to_string(),
                ],
            )
            .await
            .map_err(|e| Error::TransientStorage(format!("upsert into {collection} failed: {e}")))?;
        }
        Ok(())
    }

    async fn query_semantic(
        &self,
        collection: &str,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<SemanticHit>> {
        let conn = self.get_connection().await?;
        let mut rows = conn
            .query(
                "SELECT id, document, embedding, metadata FROM items \
                 WHERE collection = ?1 AND embedding IS NOT NULL \
                 ORDER BY created_at DESC LIMIT ?2",
                libsql::params![collection.to_string(), self.config.semantic_scan_limit as i64],
            )
            .await
            .map_err(|e| Error::TransientStorage(format!("semantic query on {collection} failed: {e}")))?;

        let mut scored: Vec<SemanticHit> = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| Error::TransientStorage(format!("row read failed: {e}")))?
        {
            let id: String = row.get(0).map_err(|e| Error::TransientStorage(e.to_string()))?;
            let document: String = row.get(1).map_err(|e| Error::TransientStorage(e.to_string()))?;
            let embedding_bytes: Vec<u8> = row.get(2).map_err(|e| Error::TransientStorage(e.to_string()))?;
            let metadata_raw: String = row.get(3).map_err(|e| Error::TransientStorage(e.to_string()))?;
            let metadata: Value = serde_json::from_str(&metadata_raw)?;

            let candidate = Self::decode_embedding(&embedding_bytes);
            let score = Self::cosine_similarity(embedding, &candidate);
            scored.push(SemanticHit { id, document, metadata, score });
        }

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        Ok(scored)
    }

    async fn query_keyword(&self, collection: &str, text: &str, limit: usize) -> Result<Vec<SemanticHit>> {
        let conn = self.get_connection().await?;
        let mut rows = conn
            .query(
                "SELECT i.id, i.document, i.metadata, bm25(items_fts) AS rank \
                 FROM items_fts f JOIN items i ON i.collection = f.collection AND i.id = f.id \
                 WHERE f.collection = ?1 AND items_fts MATCH ?2 \
                 ORDER BY rank LIMIT ?3",
                libsql::params![collection.to_string(), text.to_string(), limit as i64],
            )
            .await
            .map_err(|e| Error::TransientStorage(format!("keyword query on {collection} failed: {e}")))?;

        let mut hits = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| Error::TransientStorage(format!("row read failed: {e}")))?
        {
            let id: String = row.get(0).map_err(|e| Error::TransientStorage(e.to_string()))?;
            let document: String = row.get(1).map_err(|e| Error::TransientStorage(e.to_string()))?;
            let metadata_raw: String = row.get(2).map_err(|e| Error::TransientStorage(e.to_string()))?;
            let rank: f64 = row.get(3).map_err(|e| Error::TransientStorage(e.to_string()))?;
            let metadata: Value = serde_json::from_str(&metadata_raw)?;
            // bm25() is lower-is-better; negate so higher score means a
            // better keyword match, matching the semantic-score convention
            // (spec §4.2: "keyword score = negated rank").
            hits.push(SemanticHit { id, document, metadata, score: -rank as f32 });
        }
        Ok(hits)
    }

    async fn unflagged(&self, collection: &str, flag_key: &str, limit: usize) -> Result<Vec<SemanticHit>> {
        let conn = self.get_connection().await?;
        let mut rows = conn
            .query(
                "SELECT id, document, metadata FROM items \
                 WHERE collection = ?1 \
                   AND (json_extract(metadata, '$.' || ?2) IS NULL \
                        OR json_extract(metadata, '$.' || ?2) != 1) \
                 ORDER BY created_at ASC LIMIT ?3",
                libsql::params![collection.to_string(), flag_key.to_string(), limit as i64],
            )
            .await
            .map_err(|e| Error::TransientStorage(format!("unflagged scan on {collection} failed: {e}")))?;

        let mut hits = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| Error::TransientStorage(format!("row read failed: {e}")))?
        {
            let id: String = row.get(0).map_err(|e| Error::TransientStorage(e.to_string()))?;
            let document: String = row.get(1).map_err(|e| Error::TransientStorage(e.to_string()))?;
            let metadata_raw: String = row.get(2).map_err(|e| Error::TransientStorage(e.to_string()))?;
            let metadata: Value = serde_json::from_str(&metadata_raw)?;
            hits.push(SemanticHit { id, document, metadata, score: 0.0 });
        }
        Ok(hits)
    }

    async fn set_flag(&self, collection: &str, id: &str, flag_key: &str, value: bool) -> Result<()> {
        let conn = self.get_connection().await?;
        conn.execute(
            "UPDATE items SET metadata = json_set(metadata, '$.' || ?1, ?2), \
             updated_at = strftime('%s','now') WHERE collection = ?3 AND id = ?4",
            libsql::params![flag_key.to_string(), value, collection.to_string(), id.to_string()],
        )
        .await
        .map_err(|e| Error::TransientStorage(format!("set_flag on {collection}/{id} failed: {e}")))?;
        Ok(())
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let conn = self.get_connection().await?;
        let mut rows = conn
            .query(
                "SELECT COUNT(*) FROM items WHERE collection = ?1",
                libsql::params![collection.to_string()],
            )
            .await
            .map_err(|e| Error::TransientStorage(format!("count on {collection} failed: {e}")))?;
        if let Some(row) = rows
            .next()
            .await
            .map_err(|e| Error::TransientStorage(format!("row read failed: {e}")))?
        {
            let n: i64 = row.get(0).map_err(|e| Error::TransientStorage(e.to_string()))?;
            Ok(n as usize)
        } else {
            Ok(0)
        }
    }
}
