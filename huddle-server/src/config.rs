use huddle_core::IceServerConfig;
use std::net::SocketAddr;

/// Runtime settings of the signaling relay.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub bind: SocketAddr,
    /// Handed to every client in the `ice-config` greeting.
    pub ice_servers: Vec<IceServerConfig>,
    /// Capacity of each room's command queue.
    pub room_queue: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 3000)),
            ice_servers: vec![IceServerConfig::stun("stun:stun.l.google.com:19302")],
            room_queue: 100,
        }
    }
}
