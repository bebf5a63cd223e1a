//! The server-wide `Room` registry.
//!
//! This is the only process-wide mutable structure: the set of live rooms
//! and the set of usernames currently logged in anywhere on the server
//! (`Username` is unique across the whole server, not just within a room).
//! It is touched only on `Login` and on room creation/teardown, never on
//! the per-room hot path, so a single coarse `RwLock` is enough.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tracing::info;

use crate::config::EngineConfig;
use crate::error::RpcError;
use crate::market::Username;
use crate::protocol::PlayerUpdate;
use crate::room::dispatcher::{RoomActor, RoomHandle};

/// Which room a connecting client joins.
#[derive(Debug, Clone)]
pub enum RoomChoice {
    Named(String),
    AutoJoin,
}

/// The name auto-join resolves to: every server hosts a default room that
/// is created lazily on first use.
const AUTO_JOIN_ROOM: &str = "lobby";

struct Inner {
    config: EngineConfig,
    rooms: HashMap<String, RoomHandle>,
    /// Username -> the room it's logged into, so `disconnect` and a future
    /// re-login can find the right room without scanning every room.
    usernames: HashMap<Username, String>,
}

/// Cheaply-cloneable handle to the process-wide registry. Transports hold
/// one of these and call `login` for every new connection.
#[derive(Clone)]
pub struct RoomRegistry {
    inner: Arc<RwLock<Inner>>,
}

impl RoomRegistry {
    pub fn new(config: EngineConfig) -> Self {
        RoomRegistry {
            inner: Arc::new(RwLock::new(Inner {
                config,
                rooms: HashMap::new(),
                usernames: HashMap::new(),
            })),
        }
    }

    /// Resolves `choice` to a room (creating it if this is its first use),
    /// then logs `raw` into it. Enforces server-wide username uniqueness
    /// before delegating to the room, since a room only knows about its own
    /// users.
    pub async fn login(
        &self,
        choice: RoomChoice,
        raw: &str,
    ) -> Result<(Username, RoomHandle, mpsc::Receiver<PlayerUpdate>), RpcError> {
        let username = Username::parse(raw).ok_or(RpcError::InvalidUsername)?;

        let room_name = {
            let mut inner = self.inner.write().await;
            if inner.usernames.contains_key(&username) {
                return Err(RpcError::AlreadyLoggedIn);
            }
            let name = match choice {
                RoomChoice::Named(name) => name,
                RoomChoice::AutoJoin => AUTO_JOIN_ROOM.to_string(),
            };
            if !inner.rooms.contains_key(&name) {
                spawn_room(&mut inner, name.clone());
            }
            inner.usernames.insert(username.clone(), name.clone());
            name
        };

        let handle = {
            let inner = self.inner.read().await;
            inner.rooms.get(&room_name).cloned().expect("just spawned")
        };

        match handle.login(raw).await {
            Ok((username, updates_rx)) => Ok((username, handle, updates_rx)),
            Err(e) => {
                // Room rejected the login (e.g. full, already started); undo
                // the server-wide reservation so the username is free again.
                let mut inner = self.inner.write().await;
                inner.usernames.remove(&username);
                Err(e)
            }
        }
    }

    /// Releases `username`'s server-wide reservation and forwards the
    /// disconnect to its room.
    pub async fn disconnect(&self, username: &Username) {
        let handle = {
            let mut inner = self.inner.write().await;
            let room_name = inner.usernames.remove(username);
            room_name.and_then(|name| inner.rooms.get(&name).cloned())
        };
        if let Some(handle) = handle {
            handle.disconnect(username.clone()).await;
        }
    }
}

fn spawn_room(inner: &mut Inner, name: String) {
    let (actor, handle) = RoomActor::new(inner.config);
    info!(room = %name, "spawning room");
    tokio::spawn(actor.run());
    inner.rooms.insert(name, handle);
}
