use huddle_client::MeetError;

use crate::integration::init_tracing;
use crate::utils::DirectPeer;

#[tokio::test]
async fn test_capture_attaches_to_open_links() {
    init_tracing();

    let mut alice = DirectPeer::new("alice");
    alice.manager.on_peer_joined(&"bob".into()).await.unwrap();
    alice.manager.on_peer_joined(&"carol".into()).await.unwrap();
    assert_eq!(alice.manager.link(&"bob".into()).unwrap().tracks().audio, None);

    let handle = alice.manager.start_local_capture(true, true).await.unwrap();
    assert_eq!(handle.audio.as_ref().map(|t| t.id().clone()), Some(alice.media.mic_id()));

    for remote in ["bob", "carol"] {
        let link = alice.manager.link(&remote.into()).unwrap();
        assert_eq!(link.tracks().audio, Some(alice.media.mic_id()));
        assert_eq!(link.tracks().video, Some(alice.media.cam_id()));
        assert_eq!(alice.transport.latest(remote).unwrap().video, Some(alice.media.cam_id()));
    }
    assert_eq!(alice.transport.total_offers(), 2, "attaching tracks does not renegotiate");
}

#[tokio::test]
async fn test_denied_capture_leaves_links_untouched() {
    init_tracing();

    let mut alice = DirectPeer::new("alice");
    alice.media.deny(true);
    alice.manager.on_peer_joined(&"bob".into()).await.unwrap();

    let err = alice.manager.start_local_capture(true, true).await.unwrap_err();
    assert!(matches!(err, MeetError::MediaUnavailable(_)));
    assert!(alice.manager.local_media().is_empty());
    assert_eq!(alice.manager.link_count(), 1);
}

#[tokio::test]
async fn test_stop_capture_releases_devices() {
    init_tracing();

    let mut alice = DirectPeer::new("alice");
    alice.manager.start_local_capture(true, true).await.unwrap();
    alice.manager.on_peer_joined(&"bob".into()).await.unwrap();

    alice.manager.stop_local_capture().await;

    let link = alice.manager.link(&"bob".into()).unwrap();
    assert_eq!(link.tracks().audio, None);
    assert_eq!(link.tracks().video, None);
    assert_eq!(
        alice.media.released(),
        vec![alice.media.mic_id(), alice.media.cam_id()]
    );
}
