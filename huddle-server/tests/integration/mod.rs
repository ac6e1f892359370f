pub mod connection_tests;
pub mod multi_peer_tests;

use huddle_server::RoomManager;
use tracing::Level;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn create_test_registry() -> RoomManager {
    RoomManager::new(100)
}
