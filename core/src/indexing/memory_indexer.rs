//! Memory Indexer (spec §4.2.3): periodically walks `stored_memories`,
//! `identified_facts`, and `raw_embeddings` for unindexed items, enriches
//! and re-embeds them, and emits optimization tasks once a collection
//! grows past a configurable threshold.

use crate::error::Result;
use crate::scheduler::task::{Priority, Task};
use crate::storage::traits::{ContentKind, EmbeddingService, SemanticStore};
use std::sync::Arc;

/// Collections the Memory Indexer sweeps for unindexed items (spec
/// §4.2.3).
const SWEPT_COLLECTIONS: &[&str] = &["stored_memories", "identified_facts", "raw_embeddings"];

/// Flag key marking an item as already (re-)indexed.
const INDEXED_FLAG: &str = "indexed";

/// Default batch size per sweep pass, matching the pipeline's own
/// batching rule (spec §4.2's "Batching").
const SWEEP_BATCH_SIZE: usize = 10;

/// Report for one sweep across all swept collections.
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    pub re_embedded: usize,
    pub optimization_tasks: Vec<Task>,
}

/// One pass of the Memory Indexer: re-embed unindexed items in each
/// swept collection, then emit an optimization task for any collection
/// whose count has grown past `optimize_threshold`.
pub async fn sweep(
    semantic: &Arc<dyn SemanticStore>,
    embeddings: &Arc<dyn EmbeddingService>,
    optimize_threshold: usize,
) -> Result<SweepReport> {
    let mut report = SweepReport::default();

    for collection in SWEPT_COLLECTIONS {
        let unindexed = semantic.unflagged(collection, INDEXED_FLAG, SWEEP_BATCH_SIZE).await?;
        for item in unindexed {
            let embedding = embeddings.embed(&item.document, ContentKind::General).await?;
            semantic
                .upsert(
                    collection,
                    vec![crate::storage::traits::UpsertRow {
                        id: item.id.clone(),
                        embedding: Some(embedding),
                        document: item.document.clone(),
                        metadata: item.metadata.clone(),
                    }],
                )
                .await?;
            semantic.set_flag(collection, &item.id, INDEXED_FLAG, true).await?;
            report.re_embedded += 1;
        }

        let count = semantic.count(collection).await?;
        if count > optimize_threshold {
            report.optimization_tasks.push(
                Task::new(format!("optimize_{collection}"), Priority::Low),
            );
        }
    }

    Ok(report)
}
