use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use huddle_core::IceServerConfig;
use huddle_server::RelayConfig;
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "huddle", version, about = "Signaling relay for mesh video meetings")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the signaling relay.
    Serve {
        #[arg(long, default_value = "0.0.0.0:3000")]
        bind: SocketAddr,

        /// STUN server announced to clients; repeat for several.
        #[arg(long, default_value = "stun:stun.l.google.com:19302")]
        stun: Vec<String>,

        #[arg(long)]
        turn_url: Option<String>,

        #[arg(long, requires = "turn_url")]
        turn_username: Option<String>,

        #[arg(long, requires = "turn_url")]
        turn_credential: Option<String>,

        /// Capacity of each room's command queue.
        #[arg(long, default_value_t = 100)]
        room_queue: usize,

        /// Used when RUST_LOG is unset.
        #[arg(long, default_value = "info")]
        log_level: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            bind,
            stun,
            turn_url,
            turn_username,
            turn_credential,
            room_queue,
            log_level,
        } => {
            init_tracing(&log_level)?;

            let mut ice_servers: Vec<IceServerConfig> =
                stun.into_iter().map(IceServerConfig::stun).collect();
            if let Some(url) = turn_url {
                ice_servers.push(IceServerConfig {
                    urls: vec![url],
                    username: turn_username,
                    credential: turn_credential,
                });
            }

            let config = RelayConfig {
                bind,
                ice_servers,
                room_queue,
            };

            println!("{}", "📡 Starting huddle relay...".green().bold());
            println!("   🔌 Websocket: ws://{}/ws", config.bind);
            for server in &config.ice_servers {
                println!("   🧊 ICE:       {}", server.urls.join(", "));
            }

            huddle_server::serve(config).await?;
            println!("{}", "👋 Relay stopped".cyan());
        }
    }

    Ok(())
}

fn init_tracing(default_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .context("Invalid log level")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("{e}"))
        .context("Failed to install tracing subscriber")
}
