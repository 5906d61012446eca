//! # Test Utilities
//!
//! Shared test fixtures for the `noesis` workspace's crates, mirroring the
//! teacher's own `test-utils` crate: sample sessions, deterministic
//! embeddings, and temp-dir helpers so every crate's test suite builds data
//! the same way.

use async_trait::async_trait;
use chrono::Utc;
use noesis_core::storage::traits::{ContentKind, EmbeddingService};
use noesis_core::types::{
    CognitiveState, CollaborationStyle, Continuity, ConversationSession, ConversationState,
    FactScope, FactType, IdentifiedFact, MessageFrame, MessageSemantics, Momentum, Pattern,
    PatternType, RelationshipMetrics, RelationshipState, Role, TechnicalContext,
    VerificationStatus, WorkContext,
};
use noesis_core::Result;
use std::collections::HashMap;
use uuid::Uuid;

/// A deterministic, dependency-free stand-in for a real embedding model
/// (spec §1's black-box Embedding Service). Hashes the input text with
/// `sha2` into a fixed-dimension vector and normalizes it, so the same text
/// always produces the same unit-norm embedding across test runs, and
/// embeddings of distinct strings never collide in practice.
#[derive(Debug, Clone)]
pub struct HashingEmbeddingService {
    dimension: usize,
}

impl HashingEmbeddingService {
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for HashingEmbeddingService {
    fn default() -> Self {
        Self::new(384)
    }
}

#[async_trait]
impl EmbeddingService for HashingEmbeddingService {
    async fn embed(&self, text: &str, kind: ContentKind) -> Result<Vec<f32>> {
        use sha2::{Digest, Sha256};

        let mut vector = Vec::with_capacity(self.dimension);
        let mut counter: u32 = 0;
        let prefix = match kind {
            ContentKind::General => "general",
            ContentKind::Code => "code",
        };

        while vector.len() < self.dimension {
            let mut hasher = Sha256::new();
            hasher.update(prefix.as_bytes());
            hasher.update(text.as_bytes());
            hasher.update(counter.to_le_bytes());
            let digest = hasher.finalize();
            for chunk in digest.chunks_exact(4) {
                if vector.len() >= self.dimension {
                    break;
                }
                let bytes = [chunk[0], chunk[1], chunk[2], chunk[3]];
                let as_u32 = u32::from_le_bytes(bytes);
                // Map into [-1, 1] so the result resembles a trained embedding.
                vector.push((as_u32 as f32 / u32::MAX as f32) * 2.0 - 1.0);
            }
            counter += 1;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Create a test conversation session with a handful of messages and no
/// continuity state — the common starting point for indexing-pipeline and
/// contemplation-engine tests.
#[must_use]
pub fn create_test_session(steward_id: &str) -> ConversationSession {
    let session_id = Uuid::new_v4();
    let started_at = Utc::now();

    ConversationSession {
        session_id,
        started_at,
        ended_at: Some(started_at + chrono::Duration::minutes(30)),
        steward_id: steward_id.to_string(),
        assistant_instance_id: "test-assistant".to_string(),
        summary: String::new(),
        progress: 0.0,
        emotional_arc: Some(Momentum::Building),
        relationship_metrics: RelationshipMetrics {
            trust_level: 0.5,
            collaboration_style: Some(CollaborationStyle::Collaborative),
        },
        technical_context: TechnicalContext {
            project_root: Some("/workspace/project".to_string()),
            languages: vec!["rust".to_string()],
        },
        continuity: Continuity::default(),
        indexed: false,
        messages: create_test_messages(session_id, 3),
        extra: HashMap::new(),
    }
}

/// Create `count` alternating steward/assistant messages for `session_id`.
#[must_use]
pub fn create_test_messages(session_id: Uuid, count: u64) -> Vec<MessageFrame> {
    (1..=count)
        .map(|sequence_number| {
            let role = if sequence_number % 2 == 1 {
                Role::Steward
            } else {
                Role::Assistant
            };
            MessageFrame {
                message_id: Uuid::new_v4(),
                session_id,
                sequence_number,
                role,
                content: format!("Test message {sequence_number}"),
                content_type: "text/plain".to_string(),
                timestamp: Utc::now(),
                semantic: MessageSemantics::default(),
                code_context: None,
                references: vec![],
                impact: None,
                edit_history: vec![],
            }
        })
        .collect()
}

/// Create a test `IdentifiedFact` of the given type, active by default.
#[must_use]
pub fn create_test_fact(fact_type: FactType, content: &str) -> IdentifiedFact {
    IdentifiedFact {
        fact_id: Uuid::new_v4(),
        fact_type,
        content: serde_json::json!(content),
        confidence: 0.8,
        source: "test".to_string(),
        timestamp: Utc::now(),
        expiration: None,
        scope: FactScope::Project,
        version: 1,
        supersedes: None,
        superseded_by: None,
        evidence: vec![],
        context_keys: vec![],
        verification_status: VerificationStatus::Active,
    }
}

/// Create a test `Pattern` of the given type and confidence.
#[must_use]
pub fn create_test_pattern(pattern_type: PatternType, confidence: f32) -> Pattern {
    let now = Utc::now();
    Pattern {
        pattern_id: Uuid::new_v4().to_string(),
        pattern_type,
        name: "test pattern".to_string(),
        description: "A pattern created for tests".to_string(),
        occurrences: vec![],
        confidence,
        indicators: vec![],
        first_seen: now,
        last_seen: now,
        period: None,
    }
}

/// Create a default conversation-state snapshot for Session-Continuity
/// Bridge tests, with one blocking, user-owned pending decision.
#[must_use]
pub fn create_test_conversation_state() -> ConversationState {
    ConversationState {
        active_topics: vec!["storage orchestrator".to_string()],
        momentum: Some(Momentum::Steady),
        decisions: vec!["use libsql for the semantic store".to_string()],
        pending_decisions: vec!["which compression codec to default to".to_string()],
    }
}

/// Create a default working-context snapshot for bridge tests.
#[must_use]
pub fn create_test_work_context() -> WorkContext {
    WorkContext {
        current_task: Some("implement session bridge".to_string()),
        progress: 0.6,
        open_files: vec!["core/src/bridge/mod.rs".to_string()],
        recent_operations: vec!["ran unit tests".to_string()],
        blocking_issues: vec![],
        uncommitted_changes: true,
        test_status: noesis_core::types::TestStatus::Passing,
    }
}

/// Create a default cognitive-state snapshot for bridge tests.
#[must_use]
pub fn create_test_cognitive_state() -> CognitiveState {
    CognitiveState {
        approach: Some("incremental refactor".to_string()),
        working_hypothesis: None,
        confidence: 0.7,
        breakthrough_proximity: noesis_core::types::BreakthroughProximity::Approaching,
    }
}

/// Create a default relationship-state snapshot for bridge tests.
#[must_use]
pub fn create_test_relationship_state() -> RelationshipState {
    RelationshipState {
        trust_level: 0.6,
        communication_style: Some(CollaborationStyle::Collaborative),
        established_patterns: vec!["prefers terse responses".to_string()],
    }
}
