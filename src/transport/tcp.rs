//! The async-RPC transport: one `Command`
//! frame in, one `RpcReply` frame out, plus an independent stream of
//! `PlayerUpdate` frames pushed as they're produced. The first frame on a
//! connection must be a `Command::Login`; everything before that is
//! rejected without ever reaching a `Room`.

use std::net::SocketAddr;

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::protocol::{decode, encode, Command, RpcReply};
use crate::registry::{RoomChoice, RoomRegistry};
use crate::room::RoomHandle;

const FRAME_NAME: &str = "command";
const REPLY_NAME: &str = "reply";
const UPDATE_NAME: &str = "update";
const OUTBOUND_QUEUE_CAPACITY: usize = 256;

pub async fn serve(addr: SocketAddr, registry: RoomRegistry, room_choice: RoomChoice) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "async-RPC listener started");
    loop {
        let (socket, peer) = listener.accept().await?;
        let registry = registry.clone();
        let room_choice = room_choice.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(socket, registry, room_choice).await {
                warn!(%peer, error = %e, "connection ended with error");
            }
        });
    }
}

async fn handle_connection(
    socket: TcpStream,
    registry: RoomRegistry,
    room_choice: RoomChoice,
) -> anyhow::Result<()> {
    let (mut read_half, mut write_half) = socket.into_split();

    let raw = match super::read_frame(&mut read_half).await? {
        Some(bytes) => decode::<Command>(FRAME_NAME, &bytes)?,
        None => return Ok(()),
    };
    let login_name = match raw {
        Command::Login(name) => name,
        // Chat alone is declared `Login_first`; every other pre-login
        // command (notably `StartPlaying`/`SetReady`) is `Not_logged_in`.
        Command::Chat(_) => {
            let bytes = encode(REPLY_NAME, &Err::<RpcReply, _>(crate::error::RpcError::LoginFirst))?;
            super::write_frame(&mut write_half, &bytes).await?;
            return Ok(());
        }
        _ => {
            let bytes = encode(REPLY_NAME, &Err::<RpcReply, _>(crate::error::RpcError::NotLoggedIn))?;
            super::write_frame(&mut write_half, &bytes).await?;
            return Ok(());
        }
    };

    let (username, handle, mut updates_rx) = match registry.login(room_choice, &login_name).await {
        Ok(ok) => ok,
        Err(e) => {
            let bytes = encode(REPLY_NAME, &Err::<RpcReply, _>(e))?;
            super::write_frame(&mut write_half, &bytes).await?;
            return Ok(());
        }
    };
    {
        let bytes = encode(REPLY_NAME, &Ok::<_, crate::error::RpcError>(RpcReply::Ack))?;
        super::write_frame(&mut write_half, &bytes).await?;
    }
    info!(%username, "logged in over async-RPC");

    let (out_tx, mut out_rx) = mpsc::channel::<Vec<u8>>(OUTBOUND_QUEUE_CAPACITY);

    let writer_task = tokio::spawn(async move {
        while let Some(bytes) = out_rx.recv().await {
            if super::write_frame(&mut write_half, &bytes).await.is_err() {
                break;
            }
        }
        let _ = write_half.shutdown().await;
    });

    let update_out_tx = out_tx.clone();
    let update_forwarder = tokio::spawn(async move {
        while let Some(update) = updates_rx.recv().await {
            match encode(UPDATE_NAME, &update) {
                Ok(bytes) => {
                    if update_out_tx.send(bytes).await.is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });

    read_commands(&mut read_half, &handle, &username, out_tx).await;

    registry.disconnect(&username).await;
    update_forwarder.abort();
    writer_task.abort();
    Ok(())
}

async fn read_commands(
    read_half: &mut (impl tokio::io::AsyncRead + Unpin),
    handle: &RoomHandle,
    username: &crate::market::Username,
    out_tx: mpsc::Sender<Vec<u8>>,
) {
    loop {
        let bytes = match super::read_frame(read_half).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => break,
            Err(_) => break,
        };
        let command = match decode::<Command>(FRAME_NAME, &bytes) {
            Ok(c) => c,
            Err(_) => break,
        };
        let reply = handle.call(username.clone(), command).await;
        let encoded = match encode(REPLY_NAME, &reply) {
            Ok(bytes) => bytes,
            Err(_) => break,
        };
        if out_tx.send(encoded).await.is_err() {
            break;
        }
    }
}
