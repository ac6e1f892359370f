use huddle_core::ControlMessage;

use crate::integration::{create_test_registry, init_tracing};
use crate::utils::{TestPeer, wait_for_members};

#[tokio::test]
async fn test_rejoin_replaces_connection() {
    init_tracing();

    let rooms = create_test_registry();
    let (mut alice, _) = TestPeer::joined(&rooms, "M1", "alice").await.unwrap();
    let (mut old_bob, _) = TestPeer::joined(&rooms, "M1", "bob").await.unwrap();
    alice
        .wait_for(|m| matches!(m, ControlMessage::ParticipantJoined(_)))
        .await
        .unwrap();

    let (_new_bob, existing) = TestPeer::joined(&rooms, "M1", "bob").await.unwrap();
    assert_eq!(existing, vec!["alice".into()]);

    // Alice rebuilds her link: left, then joined again.
    alice
        .wait_for(|m| matches!(m, ControlMessage::ParticipantLeft { .. }))
        .await
        .expect("Rejoin should announce the old membership leaving");
    alice
        .wait_for(|m| matches!(m, ControlMessage::ParticipantJoined(p) if p.id.as_str() == "bob"))
        .await
        .expect("Rejoin should announce bob again");

    // The old socket closing late must not evict the new one.
    old_bob.connection.close().await;
    assert_eq!(alice.next_quiet().await, None);
    wait_for_members(&rooms, "M1", &["alice", "bob"]).await.unwrap();
}
