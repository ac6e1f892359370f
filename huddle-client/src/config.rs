use std::time::Duration;

/// Client-side tunables of a meeting session.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Websocket URL of the signaling relay, e.g. `ws://127.0.0.1:3000/ws`.
    pub relay_url: String,
    pub display_name: Option<String>,
    /// A link not connected within this window is torn down.
    pub negotiation_timeout: Duration,
    pub chat_capacity: usize,
    pub reaction_capacity: usize,
    /// How long a reaction stays visible.
    pub reaction_ttl: Duration,
    pub housekeeping_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            relay_url: "ws://127.0.0.1:3000/ws".to_owned(),
            display_name: None,
            negotiation_timeout: Duration::from_secs(30),
            chat_capacity: 200,
            reaction_capacity: 50,
            reaction_ttl: Duration::from_secs(5),
            housekeeping_interval: Duration::from_secs(1),
        }
    }
}
