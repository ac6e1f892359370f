use huddle_core::ControlMessage;

use crate::integration::{create_test_registry, init_tracing};
use crate::utils::{TestPeer, wait_for_members};

#[tokio::test]
async fn test_route_to_absent_peer_dropped() {
    init_tracing();

    let rooms = create_test_registry();
    let (mut alice, _) = TestPeer::joined(&rooms, "M1", "alice").await.unwrap();
    let (mut bob, _) = TestPeer::joined(&rooms, "M1", "bob").await.unwrap();

    bob.send(ControlMessage::Leave {
        meeting_id: "M1".into(),
        user_id: "bob".into(),
    })
    .await;
    alice
        .wait_for(|m| matches!(m, ControlMessage::ParticipantLeft { .. }))
        .await
        .unwrap();

    // Alice's offer races bob's departure.
    alice
        .send(ControlMessage::Offer {
            from: None,
            to: "bob".into(),
            meeting_id: "M1".into(),
            sdp: "v=0".to_owned(),
        })
        .await;

    assert_eq!(alice.next_quiet().await, None, "A miss is silent, not an error");
    assert_eq!(bob.output.count_kind("offer").await, 0);
    wait_for_members(&rooms, "M1", &["alice"]).await.unwrap();
}
