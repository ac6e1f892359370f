use huddle_client::SessionEvent;

use crate::integration::{create_test_registry, init_tracing};
use crate::utils::{TestClient, settle};

#[tokio::test]
async fn test_video_toggle_updates_presence() {
    init_tracing();

    let rooms = create_test_registry();
    let mut a = TestClient::joined(&rooms, "M1", "A").await;
    let mut b = TestClient::joined(&rooms, "M1", "B").await;
    settle(&mut [&mut a, &mut b]).await;
    b.events();

    let a_offers = a.transport.total_offers();
    let b_offers = b.transport.total_offers();
    let b_answers = b.transport.latest("A").unwrap().answers_created;

    a.handle.toggle_video(false).unwrap();
    settle(&mut [&mut a, &mut b]).await;

    let seen = b.session.presence().get(&"A".into()).unwrap();
    assert!(!seen.video);
    assert!(seen.audio);
    assert!(!a.session.presence().get(&"A".into()).unwrap().video);
    assert!(b.events().contains(&SessionEvent::ParticipantsChanged));

    assert_eq!(a.transport.total_offers(), a_offers);
    assert_eq!(b.transport.total_offers(), b_offers);
    assert_eq!(b.transport.latest("A").unwrap().answers_created, b_answers);

    // A late joiner gets the current media state in its snapshot.
    let mut c = TestClient::joined(&rooms, "M1", "C").await;
    settle(&mut [&mut a, &mut b, &mut c]).await;
    assert!(!c.session.presence().get(&"A".into()).unwrap().video);
}

#[tokio::test]
async fn test_screen_share_and_hand_are_visible_remotely() {
    init_tracing();

    let rooms = create_test_registry();
    let mut a = TestClient::joined(&rooms, "M1", "A").await;
    let mut b = TestClient::joined(&rooms, "M1", "B").await;
    settle(&mut [&mut a, &mut b]).await;

    a.handle.start_screen_share().unwrap();
    b.handle.raise_hand(true).unwrap();
    settle(&mut [&mut a, &mut b]).await;

    assert!(b.session.presence().get(&"A".into()).unwrap().screen_sharing);
    assert!(a.session.presence().get(&"A".into()).unwrap().screen_sharing);
    assert_eq!(a.session.presence().raised_hands(), vec![b.id()]);
    assert_eq!(a.transport.connect_count(), 1);

    a.handle.stop_screen_share().unwrap();
    settle(&mut [&mut a, &mut b]).await;
    assert!(!b.session.presence().get(&"A".into()).unwrap().screen_sharing);
}
