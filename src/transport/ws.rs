//! The WebSocket transport. Carries the
//! same `Command`/`RpcReply`/`PlayerUpdate` frames as `transport::tcp`,
//! just over binary WebSocket messages instead of raw length-prefixed TCP.

use std::net::SocketAddr;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::protocol::{decode, encode, Command, RpcReply};
use crate::registry::{RoomChoice, RoomRegistry};

const FRAME_NAME: &str = "command";
const REPLY_NAME: &str = "reply";
const UPDATE_NAME: &str = "update";
const OUTBOUND_QUEUE_CAPACITY: usize = 256;

#[derive(Clone)]
struct AppState {
    registry: RoomRegistry,
    room_choice: RoomChoice,
}

pub async fn serve(addr: SocketAddr, registry: RoomRegistry, room_choice: RoomChoice) -> anyhow::Result<()> {
    let state = AppState { registry, room_choice };
    let app = Router::new().route("/", get(upgrade)).with_state(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "websocket listener started");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state.registry, state.room_choice))
}

async fn handle_socket(socket: WebSocket, registry: RoomRegistry, room_choice: RoomChoice) {
    let (mut sink, mut stream) = socket.split();

    let raw = match stream.next().await {
        Some(Ok(Message::Binary(bytes))) => match decode::<Command>(FRAME_NAME, &bytes) {
            Ok(command) => command,
            Err(e) => {
                warn!(error = %e, "malformed first frame");
                return;
            }
        },
        _ => return,
    };
    let login_name = match raw {
        Command::Login(name) => name,
        // Chat alone is declared `Login_first`; every other pre-login
        // command (notably `StartPlaying`/`SetReady`) is `Not_logged_in`.
        Command::Chat(_) => {
            if let Ok(bytes) = encode(REPLY_NAME, &Err::<RpcReply, _>(crate::error::RpcError::LoginFirst)) {
                let _ = sink.send(Message::Binary(bytes)).await;
            }
            return;
        }
        _ => {
            if let Ok(bytes) = encode(REPLY_NAME, &Err::<RpcReply, _>(crate::error::RpcError::NotLoggedIn)) {
                let _ = sink.send(Message::Binary(bytes)).await;
            }
            return;
        }
    };

    let (username, handle, mut updates_rx) = match registry.login(room_choice, &login_name).await {
        Ok(ok) => ok,
        Err(e) => {
            if let Ok(bytes) = encode(REPLY_NAME, &Err::<RpcReply, _>(e)) {
                let _ = sink.send(Message::Binary(bytes)).await;
            }
            return;
        }
    };
    match encode(REPLY_NAME, &Ok::<_, crate::error::RpcError>(RpcReply::Ack)) {
        Ok(bytes) => {
            if sink.send(Message::Binary(bytes)).await.is_err() {
                return;
            }
        }
        Err(_) => return,
    }
    info!(%username, "logged in over websocket");

    let (out_tx, mut out_rx) = mpsc::channel::<Vec<u8>>(OUTBOUND_QUEUE_CAPACITY);

    let writer_task = tokio::spawn(async move {
        while let Some(bytes) = out_rx.recv().await {
            if sink.send(Message::Binary(bytes)).await.is_err() {
                break;
            }
        }
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

    while let Some(msg) = stream.next().await {
        let bytes = match msg {
            Ok(Message::Binary(bytes)) => bytes,
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => continue,
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

    registry.disconnect(&username).await;
    update_forwarder.abort();
    writer_task.abort();
}
