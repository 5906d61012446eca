//! Data model: the entities shared by every subsystem (spec §3).
//!
//! Times are UTC; ids are `Uuid`s; embeddings are unit-norm `Vec<f32>`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Flow momentum of an in-progress conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Momentum {
    Building,
    Steady,
    WindingDown,
}

/// How the steward and assistant have been collaborating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollaborationStyle {
    Directive,
    Collaborative,
    Exploratory,
    Autonomous,
}

/// Detected intent of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Question,
    Request,
    Statement,
    Feedback,
    Correction,
}

/// Classifier marker kind found in text (spec §4.5 decision table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerType {
    Uncertain,
    Doubt,
    Worry,
    Private,
    Secret,
    Wondering,
}

/// Broad shape of a conversation, used by timeline/reflective analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationType {
    Debugging,
    FeatureWork,
    Planning,
    Review,
    Exploration,
}

/// Test status recorded in a session's work context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    Passing,
    Failing,
    Unknown,
}

/// Role of the speaker of a `MessageFrame`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Steward,
    Assistant,
    System,
}

/// Classification of an `IdentifiedFact` (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactType {
    Identity,
    Technical,
    Preference,
    Constraint,
    Goal,
    Context,
    Relationship,
    Timeline,
    Insight,
    Custom,
}

/// Whether a fact is the live version, has been replaced, or has expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Active,
    Superseded,
    Expired,
}

/// Visibility scope of an `IdentifiedFact`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactScope {
    Global,
    Project,
    Session,
    Steward,
}

/// Kind of recurring structure a `Pattern` captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    Temporal,
    Semantic,
    Behavioral,
    Structural,
}

/// The continuity metadata threaded through a `ConversationSession`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Continuity {
    pub previous_session: Option<Uuid>,
    pub next_session: Option<Uuid>,
    pub handoff_notes: Option<String>,
    #[serde(default)]
    pub open_threads: Vec<String>,
}

/// A bounded dialogue record (spec §3 `ConversationSession`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSession {
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub steward_id: String,
    pub assistant_instance_id: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub progress: f32,
    pub emotional_arc: Option<Momentum>,
    pub relationship_metrics: RelationshipMetrics,
    pub technical_context: TechnicalContext,
    #[serde(default)]
    pub continuity: Continuity,
    #[serde(default)]
    pub indexed: bool,
    #[serde(default)]
    pub messages: Vec<MessageFrame>,
    /// Unrecognized keys preserved verbatim across rewrite (spec §6:
    /// "unknown fields MUST be preserved").
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl ConversationSession {
    /// Whether `ended_at >= started_at`, per spec §3's invariant.
    #[must_use]
    pub fn has_valid_span(&self) -> bool {
        self.ended_at.is_none_or(|end| end >= self.started_at)
    }
}

/// Relationship-tracking metrics carried on a session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelationshipMetrics {
    pub trust_level: f32,
    pub collaboration_style: Option<CollaborationStyle>,
}

/// Technical working context carried on a session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TechnicalContext {
    pub project_root: Option<String>,
    #[serde(default)]
    pub languages: Vec<String>,
}

/// Semantic annotations attached to a `MessageFrame`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageSemantics {
    pub embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub entities: Vec<String>,
    pub intent: Option<Intent>,
    /// In `[-1, 1]`.
    pub sentiment: Option<f32>,
}

/// One message within a session (spec §3 `MessageFrame`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageFrame {
    pub message_id: Uuid,
    pub session_id: Uuid,
    /// Monotonic, >= 1 within the session.
    pub sequence_number: u64,
    pub role: Role,
    pub content: String,
    pub content_type: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub semantic: MessageSemantics,
    pub code_context: Option<String>,
    #[serde(default)]
    pub references: Vec<Uuid>,
    pub impact: Option<String>,
    #[serde(default)]
    pub edit_history: Vec<String>,
}

/// The unit of indexing (spec §3 `Chunk`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: String,
    pub source_id: String,
    pub source_type: String,
    pub content: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub embedding: Option<Vec<f32>>,
    pub start: u64,
    pub end: u64,
}

/// A typed, dated, evidenced assertion (spec §3 `IdentifiedFact`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifiedFact {
    pub fact_id: Uuid,
    #[serde(rename = "type")]
    pub fact_type: FactType,
    pub content: serde_json::Value,
    /// In `[0, 1]`.
    pub confidence: f32,
    pub source: String,
    pub timestamp: DateTime<Utc>,
    pub expiration: Option<DateTime<Utc>>,
    pub scope: FactScope,
    /// >= 1.
    pub version: u32,
    pub supersedes: Option<Uuid>,
    pub superseded_by: Option<Uuid>,
    #[serde(default)]
    pub evidence: Vec<String>,
    #[serde(default)]
    pub context_keys: Vec<String>,
    #[serde(default = "default_active")]
    pub verification_status: VerificationStatus,
}

fn default_active() -> VerificationStatus {
    VerificationStatus::Active
}

impl IdentifiedFact {
    /// Deduplication key used by the Fact Extractor (spec §4.3.1):
    /// `(type, lowercased content)`.
    #[must_use]
    pub fn dedup_key(&self) -> (FactType, String) {
        (self.fact_type, self.content.to_string().to_lowercase())
    }
}

/// A single occurrence backing a `Pattern`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Occurrence {
    pub data_point_id: String,
    pub timestamp: DateTime<Utc>,
}

/// A recurring structure detected over data points (spec §3 `Pattern`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pattern {
    pub pattern_id: String,
    #[serde(rename = "type")]
    pub pattern_type: PatternType,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub occurrences: Vec<Occurrence>,
    /// In `[0, 1]`, bounded by 0.99.
    pub confidence: f32,
    #[serde(default)]
    pub indicators: Vec<String>,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub period: Option<f64>,
}

impl Pattern {
    /// Confidence growth on a new occurrence, bounded at 0.99 per spec §3.
    pub fn bump_confidence(&mut self, delta: f32) {
        self.confidence = (self.confidence + delta).min(0.99);
    }

    /// Whether this pattern should be archived (confidence dropped below 0.3).
    #[must_use]
    pub fn should_archive(&self) -> bool {
        self.confidence < 0.3
    }
}

/// A synthesized conclusion over facts and patterns (spec §3 `Insight`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    pub insight_id: Uuid,
    pub title: String,
    pub description: String,
    /// Ids of facts and patterns this insight is derived from.
    pub evidence: Vec<String>,
    pub confidence: f32,
    pub generated_at: DateTime<Utc>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

/// Opaque bytes stored in the Raw Store (spec §3 `PrivateBlob`). The core
/// never inspects `content` beyond its length; `semantic_hash` is the only
/// thing derived code may reason about.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivateBlob {
    pub blob_id: String,
    /// Fingerprint supplied by the external encryptor.
    pub semantic_hash: String,
    pub created_at: DateTime<Utc>,
    pub source: String,
    #[serde(skip)]
    pub content: Vec<u8>,
}

/// Conversation-state snapshot captured into a `SessionBridge`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationState {
    #[serde(default)]
    pub active_topics: Vec<String>,
    pub momentum: Option<Momentum>,
    #[serde(default)]
    pub decisions: Vec<String>,
    /// Decisions raised but not yet resolved; each becomes a blocking,
    /// user-owned open loop in the derived handoff (spec §4.4).
    #[serde(default)]
    pub pending_decisions: Vec<String>,
}

/// Working-context snapshot captured into a `SessionBridge`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkContext {
    pub current_task: Option<String>,
    /// In `[0, 1]`.
    pub progress: f32,
    #[serde(default)]
    pub open_files: Vec<String>,
    #[serde(default)]
    pub recent_operations: Vec<String>,
    #[serde(default)]
    pub blocking_issues: Vec<String>,
    pub uncommitted_changes: bool,
    pub test_status: TestStatus,
}

impl Default for TestStatus {
    fn default() -> Self {
        TestStatus::Unknown
    }
}

/// Cognitive-state snapshot captured into a `SessionBridge`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CognitiveState {
    pub approach: Option<String>,
    pub working_hypothesis: Option<String>,
    /// In `[0, 1]`.
    pub confidence: f32,
    pub breakthrough_proximity: BreakthroughProximity,
}

/// How close the session is to a breakthrough moment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakthroughProximity {
    #[default]
    Far,
    Approaching,
    Close,
}

/// Relationship-state snapshot captured into a `SessionBridge`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelationshipState {
    /// In `[0, 1]`.
    pub trust_level: f32,
    pub communication_style: Option<CollaborationStyle>,
    #[serde(default)]
    pub established_patterns: Vec<String>,
}

/// Who owns resolving an open loop in a handoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopOwner {
    User,
    Assistant,
}

/// A single open loop derived for the successor session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenLoop {
    pub description: String,
    pub blocking: bool,
    pub owner: LoopOwner,
}

/// Greeting style chosen by how long the gap since the prior session was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestedGreeting {
    ResumeShort,
    WelcomeBack,
    LongGapReintroduction,
}

/// Continuation hints derived for the successor session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContinuationHints {
    pub suggested_greeting: SuggestedGreeting,
}

/// The handoff payload derived from a captured bridge (spec §4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Handoff {
    pub immediate_priority: String,
    #[serde(default)]
    pub critical_context: Vec<String>,
    #[serde(default)]
    pub open_loops: Vec<OpenLoop>,
    pub continuation_hints: ContinuationHints,
    pub time_context: String,
}

/// Per-subsection content hashes recorded at capture time, letting
/// activation detect and reset only the corrupted subsection instead of
/// failing the whole bridge (spec §4.4's partial-restore path).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeChecksums {
    pub conversation_state: String,
    pub work_context: String,
    pub cognitive_state: String,
    pub relationship_state: String,
}

/// The handoff record bridging two sessions (spec §3 `SessionBridge`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionBridge {
    pub bridge_id: Uuid,
    pub from_session: Uuid,
    pub to_session: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub activated_at: Option<DateTime<Utc>>,
    pub conversation_state: ConversationState,
    pub work_context: WorkContext,
    pub cognitive_state: CognitiveState,
    pub relationship_state: RelationshipState,
    pub handoff: Handoff,
    /// Overall checksum over every subsection (spec §3: "verifies on read").
    pub checksum: String,
    /// Per-subsection checksums backing the partial-restore path.
    #[serde(default)]
    pub field_checksums: BridgeChecksums,
    pub version: u32,
}
