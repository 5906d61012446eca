//! Session-Continuity Bridge (spec §4.4): captures a session's working
//! state at shutdown, persists it through the Raw Store under the
//! `bridges` namespace, derives a handoff for the successor session, and
//! activates the most recent unactivated bridge on startup with a
//! checksum-verified, partial-restore-on-corruption read path.

use crate::error::{Error, Result};
use crate::storage::traits::RawStore;
use crate::types::{
    BreakthroughProximity, BridgeChecksums, CognitiveState, ConversationState, ContinuationHints,
    Handoff, LoopOwner, OpenLoop, RelationshipState, SessionBridge, SuggestedGreeting, TestStatus,
    WorkContext,
};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{instrument, warn};
use uuid::Uuid;

/// Raw Store namespace bridges are persisted under (spec §6: `conversations/bridges/`).
const NAMESPACE: &str = "bridges";

fn hash_json(value: &serde_json::Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Derive the handoff payload from a captured bridge's state (spec §4.4
/// "Handoff derivation"). `now` is the instant the gap-aware greeting is
/// computed against `bridge.created_at` — called with a near-zero gap at
/// capture time, and recomputed against the real gap at activation.
#[must_use]
pub fn derive_handoff(
    conversation: &ConversationState,
    work: &WorkContext,
    cognitive: &CognitiveState,
    from_session: Uuid,
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Handoff {
    let immediate_priority = if let Some(issue) = work.blocking_issues.first() {
        format!("resolve first blocking issue: {issue}")
    } else if cognitive.breakthrough_proximity == BreakthroughProximity::Close {
        format!(
            "complete breakthrough: {}",
            cognitive
                .working_hypothesis
                .as_deref()
                .unwrap_or("current hypothesis")
        )
    } else {
        format!(
            "continue current task: {}",
            work.current_task.as_deref().unwrap_or("resume where left off")
        )
    };

    let mut open_loops = Vec::new();
    if work.uncommitted_changes {
        open_loops.push(OpenLoop {
            description: "uncommitted changes in the working tree".to_string(),
            blocking: false,
            owner: LoopOwner::User,
        });
    }
    if work.test_status == TestStatus::Failing {
        open_loops.push(OpenLoop {
            description: "test suite is failing".to_string(),
            blocking: true,
            owner: LoopOwner::Assistant,
        });
    }
    for decision in &conversation.pending_decisions {
        open_loops.push(OpenLoop {
            description: decision.clone(),
            blocking: true,
            owner: LoopOwner::User,
        });
    }

    let gap = now - created_at;
    let suggested_greeting = if gap < chrono::Duration::hours(1) {
        SuggestedGreeting::ResumeShort
    } else if gap < chrono::Duration::hours(24) {
        SuggestedGreeting::WelcomeBack
    } else {
        SuggestedGreeting::LongGapReintroduction
    };

    Handoff {
        immediate_priority,
        critical_context: conversation.active_topics.clone(),
        open_loops,
        continuation_hints: ContinuationHints { suggested_greeting },
        time_context: format!("session {from_session} paused {gap} before this handoff"),
    }
}

/// Compute the per-subsection and overall checksums for a bridge's state
/// (spec §3: "`checksum` verifies on read").
#[must_use]
pub fn compute_checksums(
    conversation: &ConversationState,
    work: &WorkContext,
    cognitive: &CognitiveState,
    relationship: &RelationshipState,
) -> BridgeChecksums {
    BridgeChecksums {
        conversation_state: hash_json(&serde_json::json!(conversation)),
        work_context: hash_json(&serde_json::json!(work)),
        cognitive_state: hash_json(&serde_json::json!(cognitive)),
        relationship_state: hash_json(&serde_json::json!(relationship)),
    }
}

fn overall_checksum(checksums: &BridgeChecksums) -> String {
    hash_json(&serde_json::json!(checksums))
}

/// Mediates Session-Continuity Bridge capture, persistence, and
/// activation over the Raw Store.
pub struct BridgeManager {
    raw: Arc<dyn RawStore>,
}

impl BridgeManager {
    #[must_use]
    pub fn new(raw: Arc<dyn RawStore>) -> Self {
        Self { raw }
    }

    /// Capture a new bridge from `from_session`'s final state and persist
    /// it (spec §4.4 "Capture").
    #[instrument(skip(self, conversation, work, cognitive, relationship))]
    pub async fn capture(
        &self,
        from_session: Uuid,
        conversation: ConversationState,
        work: WorkContext,
        cognitive: CognitiveState,
        relationship: RelationshipState,
        now: DateTime<Utc>,
    ) -> Result<SessionBridge> {
        let field_checksums = compute_checksums(&conversation, &work, &cognitive, &relationship);
        let checksum = overall_checksum(&field_checksums);
        let handoff = derive_handoff(&conversation, &work, &cognitive, from_session, now, now);

        let bridge = SessionBridge {
            bridge_id: Uuid::new_v4(),
            from_session,
            to_session: None,
            created_at: now,
            activated_at: None,
            conversation_state: conversation,
            work_context: work,
            cognitive_state: cognitive,
            relationship_state: relationship,
            handoff,
            checksum,
            field_checksums,
            version: 1,
        };

        self.persist(&bridge).await?;
        Ok(bridge)
    }

    async fn persist(&self, bridge: &SessionBridge) -> Result<()> {
        let bytes = serde_json::to_vec(bridge)?;
        self.raw
            .put(NAMESPACE, &bridge.bridge_id.to_string(), bytes)
            .await
    }

    async fn load(&self, bridge_id: Uuid) -> Result<SessionBridge> {
        let bytes = self.raw.get(NAMESPACE, &bridge_id.to_string()).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Find the most-recently-created bridge with no `to_session` set.
    pub async fn find_latest_unactivated(&self) -> Result<Option<SessionBridge>> {
        let ids = self.raw.list_ids(NAMESPACE).await?;
        let mut latest: Option<SessionBridge> = None;
        for id in ids {
            let Ok(parsed_id) = id.parse::<Uuid>() else {
                continue;
            };
            let bridge = self.load(parsed_id).await?;
            if bridge.to_session.is_some() {
                continue;
            }
            if latest.as_ref().is_none_or(|l| bridge.created_at > l.created_at) {
                latest = Some(bridge);
            }
        }
        Ok(latest)
    }

    /// Verify `bridge`'s checksum, applying the partial-restore path on
    /// mismatch: only the subsection whose own hash no longer matches is
    /// reset to its default value; every other field survives intact
    /// (spec §4.4 "Activation": "on mismatch, partial-restore... and log
    /// a warning, not an error").
    fn verify_and_restore(mut bridge: SessionBridge) -> SessionBridge {
        let recomputed = compute_checksums(
            &bridge.conversation_state,
            &bridge.work_context,
            &bridge.cognitive_state,
            &bridge.relationship_state,
        );

        if overall_checksum(&recomputed) == bridge.checksum {
            return bridge;
        }

        if recomputed.conversation_state != bridge.field_checksums.conversation_state {
            warn!(bridge_id = %bridge.bridge_id, subsection = "conversation_state", "bridge checksum mismatch, restoring default");
            bridge.conversation_state = ConversationState::default();
        }
        if recomputed.work_context != bridge.field_checksums.work_context {
            warn!(bridge_id = %bridge.bridge_id, subsection = "work_context", "bridge checksum mismatch, restoring default");
            bridge.work_context = WorkContext::default();
        }
        if recomputed.cognitive_state != bridge.field_checksums.cognitive_state {
            warn!(bridge_id = %bridge.bridge_id, subsection = "cognitive_state", "bridge checksum mismatch, restoring default");
            bridge.cognitive_state = CognitiveState::default();
        }
        if recomputed.relationship_state != bridge.field_checksums.relationship_state {
            warn!(bridge_id = %bridge.bridge_id, subsection = "relationship_state", "bridge checksum mismatch, restoring default");
            bridge.relationship_state = RelationshipState::default();
        }

        let restored = compute_checksums(
            &bridge.conversation_state,
            &bridge.work_context,
            &bridge.cognitive_state,
            &bridge.relationship_state,
        );
        bridge.checksum = overall_checksum(&restored);
        bridge.field_checksums = restored;
        bridge
    }

    /// Activate the most recent unactivated bridge for `new_session_id`,
    /// verifying its checksum (with partial restore on mismatch),
    /// recomputing the gap-aware handoff, persisting the activation, and
    /// returning the assembled startup context (spec §4.4 "Activation").
    ///
    /// Returns `Ok(None)` if there is no bridge to activate — callers fall
    /// back to a fresh context (spec §6 `session_start`).
    #[instrument(skip(self))]
    pub async fn activate(
        &self,
        new_session_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<(SessionBridge, Handoff)>> {
        let Some(bridge) = self.find_latest_unactivated().await? else {
            return Ok(None);
        };

        let mut bridge = Self::verify_and_restore(bridge);
        bridge.to_session = Some(new_session_id);
        bridge.activated_at = Some(now);

        let handoff = derive_handoff(
            &bridge.conversation_state,
            &bridge.work_context,
            &bridge.cognitive_state,
            bridge.from_session,
            bridge.created_at,
            now,
        );

        self.persist(&bridge).await?;
        Ok(Some((bridge, handoff)))
    }

    /// Prune activated bridges older than `retention_days` and
    /// unactivated bridges older than `2 * retention_days` (spec §4.4
    /// "Retention"). Returns the ids removed.
    #[instrument(skip(self))]
    pub async fn prune(&self, retention_days: u32, now: DateTime<Utc>) -> Result<Vec<Uuid>> {
        let activated_horizon = chrono::Duration::days(i64::from(retention_days));
        let unactivated_horizon = chrono::Duration::days(i64::from(retention_days) * 2);

        let mut pruned = Vec::new();
        for id in self.raw.list_ids(NAMESPACE).await? {
            let Ok(parsed_id) = id.parse::<Uuid>() else {
                continue;
            };
            let bridge = self.load(parsed_id).await?;
            let age = now - bridge.created_at;
            let expired = if bridge.activated_at.is_some() {
                age > activated_horizon
            } else {
                age > unactivated_horizon
            };
            if expired {
                self.raw.delete(NAMESPACE, &id).await?;
                pruned.push(parsed_id);
            }
        }
        Ok(pruned)
    }
}

/// Declared checksum-mismatch error used outside the partial-restore path
/// (e.g. by callers that need a hard failure rather than the scheduler's
/// cooperative degrade). Not raised by [`BridgeManager::activate`] itself.
pub fn hard_checksum_error(bridge_id: Uuid) -> Error {
    Error::ChecksumMismatch { bridge_id }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::traits::RawStore;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct InMemoryRaw {
        blobs: Mutex<HashMap<(String, String), Vec<u8>>>,
    }

    #[async_trait]
    impl RawStore for InMemoryRaw {
        async fn put(&self, namespace: &str, id: &str, bytes: Vec<u8>) -> Result<()> {
            self.blobs
                .lock()
                .unwrap()
                .insert((namespace.to_string(), id.to_string()), bytes);
            Ok(())
        }

        async fn get(&self, namespace: &str, id: &str) -> Result<Vec<u8>> {
            self.blobs
                .lock()
                .unwrap()
                .get(&(namespace.to_string(), id.to_string()))
                .cloned()
                .ok_or_else(|| Error::NotFound(format!("{namespace}/{id}")))
        }

        async fn stored_hash(&self, _namespace: &str, _id: &str) -> Result<Option<String>> {
            Ok(None)
        }

        async fn list_ids(&self, namespace: &str) -> Result<Vec<String>> {
            Ok(self
                .blobs
                .lock()
                .unwrap()
                .keys()
                .filter(|(ns, _)| ns == namespace)
                .map(|(_, id)| id.clone())
                .collect())
        }

        async fn delete(&self, namespace: &str, id: &str) -> Result<()> {
            self.blobs
                .lock()
                .unwrap()
                .remove(&(namespace.to_string(), id.to_string()));
            Ok(())
        }
    }

    fn work_context_with_blocking_test() -> WorkContext {
        WorkContext {
            test_status: TestStatus::Failing,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn capture_then_activate_round_trips_except_to_session_and_activated_at() {
        let raw: Arc<dyn RawStore> = Arc::new(InMemoryRaw::default());
        let manager = BridgeManager::new(raw);
        let from_session = Uuid::new_v4();
        let now = Utc::now();

        let captured = manager
            .capture(
                from_session,
                ConversationState::default(),
                WorkContext::default(),
                CognitiveState::default(),
                RelationshipState::default(),
                now,
            )
            .await
            .unwrap();

        let new_session = Uuid::new_v4();
        let (activated, _handoff) = manager.activate(new_session, now).await.unwrap().unwrap();

        assert_eq!(activated.bridge_id, captured.bridge_id);
        assert_eq!(activated.conversation_state.active_topics, captured.conversation_state.active_topics);
        assert_eq!(activated.to_session, Some(new_session));
        assert!(activated.activated_at.is_some());
    }

    #[tokio::test]
    async fn blocking_test_failure_produces_blocking_assistant_owned_loop() {
        let raw: Arc<dyn RawStore> = Arc::new(InMemoryRaw::default());
        let manager = BridgeManager::new(raw);
        let now = Utc::now();

        manager
            .capture(
                Uuid::new_v4(),
                ConversationState::default(),
                work_context_with_blocking_test(),
                CognitiveState::default(),
                RelationshipState::default(),
                now,
            )
            .await
            .unwrap();

        let (_, handoff) = manager.activate(Uuid::new_v4(), now).await.unwrap().unwrap();
        assert!(handoff
            .open_loops
            .iter()
            .any(|l| l.blocking && l.owner == LoopOwner::Assistant));
        assert_eq!(handoff.immediate_priority, "continue current task: resume where left off");
    }

    #[tokio::test]
    async fn corrupted_work_context_is_reset_to_default_others_survive() {
        let raw: Arc<dyn RawStore> = Arc::new(InMemoryRaw::default());
        let manager = BridgeManager::new(raw);
        let now = Utc::now();

        let mut bridge = manager
            .capture(
                Uuid::new_v4(),
                ConversationState {
                    active_topics: vec!["topic-a".to_string()],
                    ..Default::default()
                },
                WorkContext {
                    current_task: Some("finish the parser".to_string()),
                    ..Default::default()
                },
                CognitiveState::default(),
                RelationshipState::default(),
                now,
            )
            .await
            .unwrap();

        // Corrupt work_context without updating its checksum.
        bridge.work_context.current_task = Some("corrupted".to_string());
        manager.persist(&bridge).await.unwrap();

        let (restored, _) = manager.activate(Uuid::new_v4(), now).await.unwrap().unwrap();
        assert_eq!(restored.work_context.current_task, None);
        assert_eq!(restored.conversation_state.active_topics, vec!["topic-a".to_string()]);
    }

    #[tokio::test]
    async fn no_bridge_yields_none() {
        let raw: Arc<dyn RawStore> = Arc::new(InMemoryRaw::default());
        let manager = BridgeManager::new(raw);
        assert!(manager.activate(Uuid::new_v4(), Utc::now()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn prune_sweeps_bridges_past_retention_horizons() {
        let raw: Arc<dyn RawStore> = Arc::new(InMemoryRaw::default());
        let manager = BridgeManager::new(raw);
        let old = Utc::now() - chrono::Duration::days(40);

        let bridge = manager
            .capture(
                Uuid::new_v4(),
                ConversationState::default(),
                WorkContext::default(),
                CognitiveState::default(),
                RelationshipState::default(),
                old,
            )
            .await
            .unwrap();

        let pruned = manager.prune(30, Utc::now()).await.unwrap();
        assert_eq!(pruned, vec![bridge.bridge_id]);
    }
}
