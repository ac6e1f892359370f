mod chat;
mod config;
mod error;
mod manager;
mod media;
mod peer_link;
mod presence;
pub mod rtc;
mod session;
mod signaling;
mod transport;

pub use chat::*;
pub use config::*;
pub use error::*;
pub use manager::*;
pub use media::*;
pub use peer_link::*;
pub use presence::*;
pub use session::*;
pub use signaling::*;
pub use transport::*;
