//! Conversation Indexer (spec §4.2.1): sliding-window chunking over a
//! session's messages, fact extraction over the concatenated content, and
//! the reindex-on-change decision.

use crate::contemplation::fact_extractor::extract_facts;
use crate::error::Result;
use crate::storage::traits::{ContentKind, EmbeddingService, RawStore, SemanticStore, UpsertRow};
use crate::types::{ConversationSession, MessageFrame, Role};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Sliding-window size over messages (spec §4.2.1).
const WINDOW_SIZE: usize = 5;
/// Overlap between consecutive windows.
const OVERLAP: usize = 2;
/// Step between window starts, derived from window size and overlap.
const STEP: usize = WINDOW_SIZE - OVERLAP;

/// One window of messages ready to embed and persist.
#[derive(Debug, Clone)]
pub struct ConversationChunk {
    pub chunk_id: String,
    pub session_id: String,
    pub chunk_index: usize,
    pub start_message: usize,
    pub end_message: usize,
    pub text: String,
    pub first_timestamp: chrono::DateTime<chrono::Utc>,
    pub participants: Vec<String>,
}

fn role_label(role: Role) -> &'static str {
    match role {
        Role::Steward => "steward",
        Role::Assistant => "assistant",
        Role::System => "system",
    }
}

/// Build the overlapping 5-message/step-3 windows for a session (spec
/// §4.2.1). Chunk text is `"{role}: {content}"` lines joined by blank
/// lines.
#[must_use]
pub fn chunk_messages(session_id: &str, messages: &[MessageFrame]) -> Vec<ConversationChunk> {
    if messages.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    let mut chunk_index = 0;
    loop {
        let end = (start + WINDOW_SIZE).min(messages.len());
        let window = &messages[start..end];

        let text = window
            .iter()
            .map(|m| format!("{}: {}", role_label(m.role), m.content))
            .collect::<Vec<_>>()
            .join("\n\n");

        let participants: BTreeSet<&'static str> = window.iter().map(|m| role_label(m.role)).collect();

        chunks.push(ConversationChunk {
            chunk_id: format!("{session_id}_{chunk_index}"),
            session_id: session_id.to_string(),
            chunk_index,
            start_message: start,
            end_message: end.saturating_sub(1),
            text,
            first_timestamp: window[0].timestamp,
            participants: participants.into_iter().map(str::to_string).collect(),
        });

        chunk_index += 1;
        if end >= messages.len() {
            break;
        }
        start += STEP;
    }
    chunks
}

/// Whether `session` needs reindexing: its serialized content hash
/// differs from the stored hash for `ids[0] = "{session_id}_0"` (spec
/// §4.2.1's reindex decision).
pub async fn needs_reindex(
    raw: &Arc<dyn RawStore>,
    session: &ConversationSession,
) -> Result<bool> {
    let current_hash = content_hash(session);
    let namespace = "conversation_backups";
    let id = format!("{}_0", session.session_id);
    let stored = raw.stored_hash(namespace, &id).await?;
    Ok(stored.as_deref() != Some(current_hash.as_str()))
}

fn content_hash(session: &ConversationSession) -> String {
    let mut hasher = Sha256::new();
    for message in &session.messages {
        hasher.update(message.content.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Index one conversation session: chunk, embed, upsert chunks and
/// per-message keyword rows, and extract facts over the concatenated
/// content (spec §4.2.1).
pub async fn index_session(
    semantic: &Arc<dyn SemanticStore>,
    embeddings: &Arc<dyn EmbeddingService>,
    session: &ConversationSession,
) -> Result<super::IndexOutcome> {
    let session_id = session.session_id.to_string();
    let chunks = chunk_messages(&session_id, &session.messages);

    let mut chunk_rows = Vec::with_capacity(chunks.len());
    for chunk in &chunks {
        let embedding = embeddings.embed(&chunk.text, ContentKind::General).await?;
        chunk_rows.push(UpsertRow {
            id: chunk.chunk_id.clone(),
            embedding: Some(embedding),
            document: chunk.text.clone(),
            metadata: json!({
                "session_id": chunk.session_id,
                "chunk_index": chunk.chunk_index,
                "start_message": chunk.start_message,
                "end_message": chunk.end_message,
                "first_timestamp": chunk.first_timestamp,
                "participants": chunk.participants,
            }),
        });
    }
    if !chunk_rows.is_empty() {
        semantic.upsert("conversations", chunk_rows).await?;
    }

    let mut message_rows = Vec::with_capacity(session.messages.len());
    for message in &session.messages {
        message_rows.push(UpsertRow {
            id: format!("{session_id}_msg_{}", message.sequence_number),
            embedding: None,
            document: message.content.clone(),
            metadata: json!({
                "session_id": session_id,
                "sequence_number": message.sequence_number,
                "role": role_label(message.role),
            }),
        });
    }
    if !message_rows.is_empty() {
        semantic.upsert("conversations_keyword", message_rows).await?;
    }

    let concatenated = session
        .messages
        .iter()
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    let facts = extract_facts(&concatenated, &session_id);
    if !facts.is_empty() {
        let fact_rows: Vec<UpsertRow> = facts
            .iter()
            .map(|f| UpsertRow {
                id: format!("{session_id}_{}", f.fact_id),
                embedding: None,
                document: f.content.to_string(),
                metadata: json!({ "type": f.fact_type, "confidence": f.confidence }),
            })
            .collect();
        semantic.upsert("identified_facts", fact_rows).await?;
    }

    Ok(super::IndexOutcome {
        source_id: session_id,
        chunks_written: chunks.len(),
        facts_written: facts.len(),
        skipped_unchanged: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MessageSemantics, RelationshipMetrics, TechnicalContext};
    use chrono::Utc;
    use std::collections::HashMap;
    use uuid::Uuid;

    fn message(session_id: Uuid, seq: u64, role: Role, content: &str) -> MessageFrame {
        MessageFrame {
            message_id: Uuid::new_v4(),
            session_id,
            sequence_number: seq,
            role,
            content: content.to_string(),
            content_type: "text/plain".to_string(),
            timestamp: Utc::now(),
            semantic: MessageSemantics::default(),
            code_context: None,
            references: vec![],
            impact: None,
            edit_history: vec![],
        }
    }

    #[test]
    fn twelve_messages_yield_four_overlapping_chunks() {
        let session_id = Uuid::new_v4();
        let messages: Vec<MessageFrame> = (0..12)
            .map(|i| message(session_id, i, Role::Steward, &format!("msg {i}")))
            .collect();

        let chunks = chunk_messages(&session_id.to_string(), &messages);
        // windows start at 0, 3, 6, 9 -> 4 chunks, last one short (9..12).
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[0].start_message, 0);
        assert_eq!(chunks[0].end_message, 4);
        assert_eq!(chunks[1].start_message, 3);
        assert_eq!(chunks[3].start_message, 9);
        assert_eq!(chunks[3].end_message, 11);
    }

    #[test]
    fn chunk_ids_are_deterministic_per_session_and_index() {
        let session_id = Uuid::new_v4();
        let messages: Vec<MessageFrame> =
            (0..5).map(|i| message(session_id, i, Role::Assistant, "hi")).collect();
        let chunks = chunk_messages(&session_id.to_string(), &messages);
        assert_eq!(chunks[0].chunk_id, format!("{session_id}_0"));
    }

    #[test]
    fn empty_session_yields_no_chunks() {
        assert!(chunk_messages("s1", &[]).is_empty());
    }

    fn session_with_messages(messages: Vec<MessageFrame>) -> ConversationSession {
        ConversationSession {
            session_id: Uuid::new_v4(),
            started_at: Utc::now(),
            ended_at: None,
            steward_id: "steward".to_string(),
            assistant_instance_id: "a1".to_string(),
            summary: String::new(),
            progress: 0.0,
            emotional_arc: None,
            relationship_metrics: RelationshipMetrics::default(),
            technical_context: TechnicalContext::default(),
            continuity: Default::default(),
            indexed: false,
            messages,
            extra: HashMap::new(),
        }
    }

    #[test]
    fn content_hash_changes_when_messages_change() {
        let s1 = session_with_messages(vec![message(Uuid::new_v4(), 1, Role::Steward, "a")]);
        let s2 = session_with_messages(vec![message(Uuid::new_v4(), 1, Role::Steward, "b")]);
        assert_ne!(content_hash(&s1), content_hash(&s2));
    }
}
