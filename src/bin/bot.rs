//! Minimal bot client: speaks just enough of the wire protocol to log in,
//! sit down, and ready up. No trading strategy is implemented here —
//! that's explicitly out of scope; this binary only
//! proves out the CLI/connection surface the server expects from bots.
//!
//! The connection multiplexes two frame kinds onto one stream: `reply`
//! (the synchronous answer to the command just sent) and `update` (a
//! `PlayerUpdate` pushed whenever the room has one for this subscriber,
//! independent of anything this bot sent). A broadcast can be queued for
//! this connection before its own command's reply is — e.g. the
//! `PlayerJoined` the room fans out to a freshly logged-in user is
//! enqueued before the `Login` ack is even written — so a reply is never
//! assumed to be the very next frame on the wire. Every frame read is
//! dispatched by its name instead.

use std::collections::HashMap;
use std::net::SocketAddr;

use clap::Parser;
use tokio::net::TcpStream;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use figgie_server::error::RpcError;
use figgie_server::market::{PartialHand, Size, Username};
use figgie_server::protocol::{decode_frame, decode_payload, encode, Broadcast, Command, PlayerUpdate, RpcReply};
use figgie_server::room::user::SeatChoice;
use figgie_server::transport::{read_frame, write_frame};

/// Matches `EngineConfig::default().hand_size` — the bot has no access to
/// the room's actual config, only what spec.md documents as the default.
const DEFAULT_HAND_SIZE: u32 = 10;

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
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
#[command(name = "figgie-bot")]
struct Args {
    #[arg(long = "server", default_value = "127.0.0.1:58828")]
    server: SocketAddr,

    #[arg(long = "log-level", value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// Suffixes the bot's username (e.g. `-which 2` logs in as `bot2`).
    #[arg(long = "which", default_value_t = 1)]
    which: u32,
}

const FRAME_NAME: &str = "command";
const REPLY_NAME: &str = "reply";
const UPDATE_NAME: &str = "update";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(args.log_level.as_filter()))
        .init();

    let username = format!("bot{}", args.which);
    let mut stream = TcpStream::connect(args.server).await?;
    info!(%username, server = %args.server, "connecting");

    send(&mut stream, &Command::Login(username.clone())).await?;
    await_reply(&mut stream).await?.expect_ok("login")?;
    info!(%username, "logged in");

    send(&mut stream, &Command::StartPlaying(SeatChoice::Anywhere)).await?;
    await_reply(&mut stream).await?.expect_ok("start-playing")?;

    send(&mut stream, &Command::SetReady(true)).await?;
    await_reply(&mut stream).await?.expect_ok("ready")?;
    info!(%username, "seated and ready, idling on the update stream");

    // Observer view of every other player's hand, reconstructed from the
    // public `Exec` broadcasts on the update stream — nobody but a player
    // themself is ever sent their own `Hand` in full.
    let mut partial_hands: HashMap<Username, PartialHand> = HashMap::new();

    // No more commands are sent past this point, but the stream may still
    // carry nothing but `update` frames from here on.
    loop {
        let bytes = match read_frame(&mut stream).await? {
            Some(bytes) => bytes,
            None => break,
        };
        match dispatch_frame(&bytes)? {
            Frame::Update(update) => {
                track_partial_hands(&mut partial_hands, &update);
                info!(?update, "update");
            }
            Frame::Reply(_) => warn!("unexpected reply frame while idling, ignoring"),
        }
    }
    Ok(())
}

/// Folds a `PlayerUpdate` into the running `PartialHand` reconstruction:
/// `NewRound` resets every holder to fully-unknown (hands are redealt),
/// and `Exec` reveals both sides of the trade it records.
fn track_partial_hands(partial_hands: &mut HashMap<Username, PartialHand>, update: &PlayerUpdate) {
    let PlayerUpdate::Broadcast(broadcast) = update else {
        return;
    };
    match broadcast {
        Broadcast::NewRound => partial_hands.clear(),
        Broadcast::Exec(exec) => {
            let suit = exec.order.symbol;
            let aggressor_dir = exec.order.dir;
            let total_aggressor_size: Size = exec.fills.iter().fold(Size::ZERO, |acc, f| acc + f.size);
            if !total_aggressor_size.is_zero() {
                partial_hands
                    .entry(exec.order.owner.clone())
                    .or_insert_with(|| PartialHand::unknown(Size::new(DEFAULT_HAND_SIZE)))
                    .observe_trade(suit, aggressor_dir, total_aggressor_size);
            }
            for fill in &exec.fills {
                partial_hands
                    .entry(fill.counterparty_owner.clone())
                    .or_insert_with(|| PartialHand::unknown(Size::new(DEFAULT_HAND_SIZE)))
                    .observe_trade(suit, aggressor_dir.other(), fill.size);
            }
        }
        _ => {}
    }
}

/// A frame read off the wire, demultiplexed by its `(name, version)` tag
/// rather than its position in the stream.
enum Frame {
    Reply(Result<RpcReply, RpcError>),
    Update(PlayerUpdate),
}

impl Frame {
    /// Consumes a `Reply`, turning an `Err` reply into an `anyhow::Error`;
    /// panics if called on an `Update` (only used right after sending a
    /// command, where an update seen first is handled before this runs).
    fn expect_ok(self, rpc: &str) -> anyhow::Result<()> {
        match self {
            Frame::Reply(Ok(_)) => Ok(()),
            Frame::Reply(Err(e)) => Err(anyhow::anyhow!("{rpc} rejected: {e}")),
            Frame::Update(_) => unreachable!("await_reply only returns Frame::Reply"),
        }
    }
}

fn dispatch_frame(bytes: &[u8]) -> anyhow::Result<Frame> {
    let (name, payload) = decode_frame(bytes).map_err(anyhow::Error::from)?;
    if name == REPLY_NAME {
        let reply: Result<RpcReply, RpcError> = decode_payload(&payload).map_err(anyhow::Error::from)?;
        Ok(Frame::Reply(reply))
    } else if name == UPDATE_NAME {
        let update: PlayerUpdate = decode_payload(&payload).map_err(anyhow::Error::from)?;
        Ok(Frame::Update(update))
    } else {
        Err(anyhow::anyhow!("unexpected frame name `{name}`"))
    }
}

/// Reads frames until a `reply` frame arrives, logging any `update` frames
/// encountered along the way — the room may have queued a broadcast for
/// this connection before the reply to the command just sent.
async fn await_reply(stream: &mut TcpStream) -> anyhow::Result<Frame> {
    loop {
        let bytes = read_frame(stream)
            .await?
            .ok_or_else(|| anyhow::anyhow!("server closed the connection while awaiting a reply"))?;
        match dispatch_frame(&bytes)? {
            Frame::Update(update) => info!(?update, "update (ahead of the reply it raced with)"),
            reply @ Frame::Reply(_) => return Ok(reply),
        }
    }
}

async fn send(stream: &mut TcpStream, command: &Command) -> anyhow::Result<()> {
    let bytes = encode(FRAME_NAME, command)?;
    write_frame(stream, &bytes).await?;
    Ok(())
}
