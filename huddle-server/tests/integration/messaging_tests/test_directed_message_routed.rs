use huddle_core::{ControlMessage, IceCandidate};

use crate::integration::{create_test_registry, init_tracing};
use crate::utils::TestPeer;

#[tokio::test]
async fn test_offer_answer_and_ice_are_routed() {
    init_tracing();

    let rooms = create_test_registry();
    let (mut alice, _) = TestPeer::joined(&rooms, "M1", "alice").await.unwrap();
    let (mut bob, _) = TestPeer::joined(&rooms, "M1", "bob").await.unwrap();
    let (mut carol, _) = TestPeer::joined(&rooms, "M1", "carol").await.unwrap();

    alice
        .send(ControlMessage::Offer {
            from: None,
            to: "bob".into(),
            meeting_id: "M1".into(),
            sdp: "v=0 alice-offer".to_owned(),
        })
        .await;

    let offer = bob
        .wait_for(|m| matches!(m, ControlMessage::Offer { .. }))
        .await
        .expect("Bob should receive the offer");
    assert_eq!(
        offer,
        ControlMessage::Offer {
            from: Some("alice".into()),
            to: "bob".into(),
            meeting_id: "M1".into(),
            sdp: "v=0 alice-offer".to_owned(),
        },
        "Payload is delivered verbatim with the sender stamped"
    );

    bob.send(ControlMessage::Answer {
        from: None,
        to: "alice".into(),
        meeting_id: "M1".into(),
        sdp: "v=0 bob-answer".to_owned(),
    })
    .await;
    bob.send(ControlMessage::IceCandidate {
        from: None,
        to: "alice".into(),
        meeting_id: "M1".into(),
        candidate: IceCandidate::new("candidate:1 1 udp 2122260223 10.0.0.2 50000 typ host"),
    })
    .await;

    let answer = alice
        .wait_for(|m| matches!(m, ControlMessage::Answer { .. }))
        .await
        .unwrap();
    assert_eq!(answer.sender().map(|s| s.as_str()), Some("bob"));
    let ice = alice
        .wait_for(|m| matches!(m, ControlMessage::IceCandidate { .. }))
        .await
        .unwrap();
    assert_eq!(ice.sender().map(|s| s.as_str()), Some("bob"));

    // Directed traffic is never seen by a third party.
    assert!(carol.output.count_kind("offer").await == 0);
    assert!(carol.output.count_kind("answer").await == 0);
    assert!(carol.output.count_kind("ice-candidate").await == 0);
    while let Some(msg) = carol.next_quiet().await {
        assert!(!msg.is_directed(), "Carol received {msg:?}");
    }
}
