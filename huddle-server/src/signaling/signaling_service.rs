use crate::config::RelayConfig;
use crate::room::RoomManager;
use crate::signaling::Connection;
use dashmap::DashMap;
use huddle_core::{ConnectionId, ControlMessage, IceServerConfig};
use std::sync::Arc;
use tokio::sync::mpsc;

struct SignalingInner {
    connections: DashMap<ConnectionId, mpsc::UnboundedSender<ControlMessage>>,
    ice_servers: Vec<IceServerConfig>,
}

/// Shared relay state handed to every websocket: the room registry plus the
/// set of live connections.
#[derive(Clone)]
pub struct SignalingService {
    inner: Arc<SignalingInner>,
    rooms: RoomManager,
}

impl SignalingService {
    pub fn new(config: &RelayConfig) -> Self {
        Self::with_rooms(RoomManager::new(config.room_queue), config.ice_servers.clone())
    }

    pub fn with_rooms(rooms: RoomManager, ice_servers: Vec<IceServerConfig>) -> Self {
        Self {
            inner: Arc::new(SignalingInner {
                connections: DashMap::new(),
                ice_servers,
            }),
            rooms,
        }
    }

    pub fn rooms(&self) -> &RoomManager {
        &self.rooms
    }

    pub fn get_ice_servers(&self) -> Vec<IceServerConfig> {
        self.inner.ice_servers.clone()
    }

    pub fn connection_count(&self) -> usize {
        self.inner.connections.len()
    }

    /// Register a new client channel and greet it with the ICE configuration.
    pub fn open(&self, tx: mpsc::UnboundedSender<ControlMessage>) -> Connection {
        let id = ConnectionId::new();
        let _ = tx.send(ControlMessage::IceConfig {
            ice_servers: self.get_ice_servers(),
        });
        self.inner.connections.insert(id, tx.clone());
        Connection::new(id, self.rooms.clone(), Arc::new(tx))
    }

    pub fn remove(&self, id: &ConnectionId) {
        self.inner.connections.remove(id);
    }
}
