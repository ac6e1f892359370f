mod rtc_config;
mod rtc_connection;

pub use rtc_config::*;
pub use rtc_connection::*;
