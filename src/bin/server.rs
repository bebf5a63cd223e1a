//! The Figgie server binary: hosts the `RoomRegistry` and both transport
//! listeners.

use std::net::SocketAddr;

use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use figgie_server::config::EngineConfig;
use figgie_server::registry::{RoomChoice, RoomRegistry};
use figgie_server::transport::{tcp, ws};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Debug,
    Info,
    Error,
}

impl LogLevel {
    fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "figgie-server")]
struct Args {
    /// Address the async-RPC (TCP) listener binds to.
    #[arg(long = "server", default_value = "0.0.0.0:58828")]
    server: SocketAddr,

    /// Address the WebSocket listener binds to.
    #[arg(long = "ws-server", default_value = "0.0.0.0:58829")]
    ws_server: SocketAddr,

    #[arg(long = "log-level", value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// Room to host connections in; omit to auto-join the default room.
    #[arg(long = "room")]
    room: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(args.log_level.as_filter()))
        .init();

    let room_choice = match args.room {
        Some(name) => RoomChoice::Named(name),
        None => RoomChoice::AutoJoin,
    };

    let registry = RoomRegistry::new(EngineConfig::from_env());

    info!(tcp = %args.server, ws = %args.ws_server, "starting figgie-server");

    let tcp_registry = registry.clone();
    let tcp_choice = room_choice.clone();
    let tcp_addr = args.server;
    let tcp_task = tokio::spawn(async move { tcp::serve(tcp_addr, tcp_registry, tcp_choice).await });

    let ws_registry = registry.clone();
    let ws_choice = room_choice.clone();
    let ws_addr = args.ws_server;
    let ws_task = tokio::spawn(async move { ws::serve(ws_addr, ws_registry, ws_choice).await });

    tokio::select! {
        res = tcp_task => { res??; }
        res = ws_task => { res??; }
    }
    Ok(())
}
