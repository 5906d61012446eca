//! End-to-end scenario: a Session-Continuity Bridge captured over the real
//! redb Raw Store, then activated by a successor session after a gap long
//! enough to change the suggested greeting (spec §4.4).

use chrono::Utc;
use noesis_core::types::SuggestedGreeting;
use noesis_core::BridgeManager;
use noesis_storage_raw::RedbRawStore;
use noesis_test_utils::{
    create_test_cognitive_state, create_test_conversation_state, create_test_relationship_state,
    create_test_work_context,
};
use std::sync::Arc;
use uuid::Uuid;

#[tokio::test]
async fn long_gap_between_sessions_produces_a_reintroduction_greeting() {
    let temp_dir = tempfile::tempdir().unwrap();
    let raw = RedbRawStore::open(&temp_dir.path().join("raw.redb")).unwrap();
    let manager = BridgeManager::new(Arc::new(raw));

    let from_session = Uuid::new_v4();
    let captured_at = Utc::now() - chrono::Duration::days(2);

    let captured = manager
        .capture(
            from_session,
            create_test_conversation_state(),
            create_test_work_context(),
            create_test_cognitive_state(),
            create_test_relationship_state(),
            captured_at,
        )
        .await
        .unwrap();

    let to_session = Uuid::new_v4();
    let (activated, handoff) = manager.activate(to_session, Utc::now()).await.unwrap().unwrap();

    assert_eq!(activated.bridge_id, captured.bridge_id);
    assert_eq!(activated.to_session, Some(to_session));
    assert_eq!(
        handoff.continuation_hints.suggested_greeting,
        SuggestedGreeting::LongGapReintroduction
    );
    // The session's one pending decision becomes a blocking, user-owned open loop.
    assert!(handoff.open_loops.iter().any(|l| l.blocking));
}

#[tokio::test]
async fn retention_sweep_drops_bridges_past_their_horizon() {
    let temp_dir = tempfile::tempdir().unwrap();
    let raw = RedbRawStore::open(&temp_dir.path().join("raw.redb")).unwrap();
    let manager = BridgeManager::new(Arc::new(raw));

    let ancient = Utc::now() - chrono::Duration::days(90);
    let bridge = manager
        .capture(
            Uuid::new_v4(),
            create_test_conversation_state(),
            create_test_work_context(),
            create_test_cognitive_state(),
            create_test_relationship_state(),
            ancient,
        )
        .await
        .unwrap();

    let pruned = manager.prune(30, Utc::now()).await.unwrap();
    assert_eq!(pruned, vec![bridge.bridge_id]);
    assert!(manager.activate(Uuid::new_v4(), Utc::now()).await.unwrap().is_none());
}
