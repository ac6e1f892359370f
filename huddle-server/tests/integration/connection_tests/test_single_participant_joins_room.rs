use huddle_core::MeetingId;

use crate::integration::{create_test_registry, init_tracing};
use crate::utils::{TestPeer, wait_for_members};

#[tokio::test]
async fn test_single_participant_joins_room() {
    init_tracing();

    let rooms = create_test_registry();

    let (_alice, existing) = TestPeer::joined(&rooms, "M1", "alice")
        .await
        .expect("Join failed");

    assert!(existing.is_empty(), "First joiner sees nobody");
    assert!(rooms.contains(&MeetingId::from("M1")));
    assert_eq!(rooms.room_count(), 1);
    wait_for_members(&rooms, "M1", &["alice"])
        .await
        .expect("Registry should list alice");
}
