use huddle_client::NegotiationState;
use huddle_core::{ControlMessage, IceCandidate};

use crate::integration::init_tracing;
use crate::utils::{DirectPeer, exchange};

fn candidate_from(from: &str, to: &str, candidate: IceCandidate) -> ControlMessage {
    ControlMessage::IceCandidate {
        from: Some(from.into()),
        to: to.into(),
        meeting_id: "M1".into(),
        candidate,
    }
}

#[tokio::test]
async fn test_ice_before_offer_is_queued() {
    init_tracing();

    let mut alice = DirectPeer::new("alice");
    let mut bob = DirectPeer::new("bob");
    alice.manager.on_peer_joined(&"bob".into()).await.unwrap();
    bob.manager.on_peer_joined(&"alice".into()).await.unwrap();
    alice.pump_link_events().await;

    let sent = alice.drain();
    let (offer, candidates): (Vec<_>, Vec<_>) = sent
        .into_iter()
        .partition(|m| matches!(m, ControlMessage::Offer { .. }));
    assert_eq!(candidates.len(), 1);

    // Candidate overtakes the offer.
    for msg in candidates {
        bob.deliver(msg).await.unwrap();
    }
    let link = bob.manager.link(&"alice".into()).unwrap();
    assert_eq!(link.pending_candidates(), 1);
    assert_eq!(link.negotiation_state(), NegotiationState::Idle);
    assert!(bob.transport.latest("alice").unwrap().candidates.is_empty());

    for msg in offer {
        bob.deliver(msg).await.unwrap();
    }
    let link = bob.manager.link(&"alice".into()).unwrap();
    assert_eq!(link.pending_candidates(), 0);
    assert_eq!(bob.transport.latest("alice").unwrap().candidates.len(), 1);

    exchange(&mut alice, &mut bob).await;
    assert_eq!(
        alice.manager.link(&"bob".into()).unwrap().negotiation_state(),
        NegotiationState::Stable
    );
}

#[tokio::test]
async fn test_malformed_candidate_dropped() {
    init_tracing();

    let mut bob = DirectPeer::new("bob");
    bob.manager.on_peer_joined(&"alice".into()).await.unwrap();

    bob.deliver(candidate_from("alice", "bob", IceCandidate::new("not a candidate")))
        .await
        .unwrap();
    bob.deliver(candidate_from("alice", "bob", IceCandidate::new("")))
        .await
        .unwrap();

    assert_eq!(bob.manager.link(&"alice".into()).unwrap().pending_candidates(), 0);
}
