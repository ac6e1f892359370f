use huddle_core::{ControlMessage, ParticipantId};

use crate::integration::{create_test_registry, init_tracing};
use crate::utils::{TestPeer, wait_for_members};

#[tokio::test]
async fn test_three_peers_join() {
    init_tracing();

    let rooms = create_test_registry();

    let (mut alice, seen_by_alice) = TestPeer::joined(&rooms, "M1", "alice").await.unwrap();
    let (mut bob, seen_by_bob) = TestPeer::joined(&rooms, "M1", "bob").await.unwrap();
    let (_carol, seen_by_carol) = TestPeer::joined(&rooms, "M1", "carol").await.unwrap();

    assert!(seen_by_alice.is_empty());
    assert_eq!(seen_by_bob, vec![ParticipantId::from("alice")]);
    assert_eq!(
        seen_by_carol,
        vec![ParticipantId::from("alice"), ParticipantId::from("bob")]
    );

    for expected in ["bob", "carol"] {
        let joined = alice
            .wait_for(|m| matches!(m, ControlMessage::ParticipantJoined(_)))
            .await
            .unwrap();
        assert!(matches!(joined, ControlMessage::ParticipantJoined(p) if p.id.as_str() == expected));
    }
    let joined = bob
        .wait_for(|m| matches!(m, ControlMessage::ParticipantJoined(_)))
        .await
        .unwrap();
    assert!(matches!(joined, ControlMessage::ParticipantJoined(p) if p.id.as_str() == "carol"));

    wait_for_members(&rooms, "M1", &["alice", "bob", "carol"]).await.unwrap();
}
