use huddle_core::IceServerConfig;
use webrtc::ice_transport::ice_server::RTCIceServer;

/// ICE configuration for the webrtc-backed transport.
#[derive(Debug, Clone)]
pub struct RtcConfig {
    pub ice_servers: Vec<IceServerConfig>,
}

impl RtcConfig {
    /// Use the list a relay announced in `ice-config`.
    pub fn from_ice_servers(ice_servers: &[IceServerConfig]) -> Self {
        if ice_servers.is_empty() {
            return Self::default();
        }
        Self {
            ice_servers: ice_servers.to_vec(),
        }
    }

    pub(crate) fn rtc_ice_servers(&self) -> Vec<RTCIceServer> {
        self.ice_servers
            .iter()
            .map(|s| RTCIceServer {
                urls: s.urls.clone(),
                username: s.username.clone().unwrap_or_default(),
                credential: s.credential.clone().unwrap_or_default(),
            })
            .collect()
    }
}

impl Default for RtcConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![IceServerConfig::stun("stun:stun.l.google.com:19302")],
        }
    }
}
