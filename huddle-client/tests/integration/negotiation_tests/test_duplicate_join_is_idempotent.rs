use crate::integration::init_tracing;
use crate::utils::DirectPeer;

#[tokio::test]
async fn test_duplicate_join_is_idempotent() {
    init_tracing();

    let mut alice = DirectPeer::new("alice");
    alice.manager.on_peer_joined(&"bob".into()).await.unwrap();
    alice.manager.on_peer_joined(&"bob".into()).await.unwrap();

    assert_eq!(alice.manager.link_count(), 1);
    assert_eq!(alice.transport.connect_count(), 1);
    assert_eq!(alice.transport.total_offers(), 1);
    assert_eq!(alice.drain().len(), 1, "only one offer went out");
}

#[tokio::test]
async fn test_join_for_self_is_ignored() {
    init_tracing();

    let mut alice = DirectPeer::new("alice");
    alice.manager.on_peer_joined(&"alice".into()).await.unwrap();

    assert_eq!(alice.manager.link_count(), 0);
    assert_eq!(alice.transport.connect_count(), 0);
}
