//! `RoomActor`: the single-writer task that owns a `Room` and its
//! subscriber fan-out. All state mutation and broadcast
//! emission happens here, serialized by the actor's own message loop —
//! nothing else ever touches a `Room` directly.

use std::time::{Duration, Instant};

use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::error::RpcError;
use crate::market::Username;
use crate::protocol::{Broadcast, Command, GetUpdateKind, PlayerUpdate, RpcReply};
use crate::room::broadcast::{Subscribers, SUBSCRIBER_QUEUE_CAPACITY};
use crate::room::room::Room;

/// Ceiling on how long the actor sleeps between round-timeout checks when
/// no round is active; just needs to be long enough not to busy-poll.
const IDLE_POLL: Duration = Duration::from_secs(3600);

enum RoomMessage {
    Login {
        raw: String,
        updates_tx: mpsc::Sender<PlayerUpdate>,
        reply_tx: oneshot::Sender<Result<Username, RpcError>>,
    },
    Command {
        sender: Username,
        command: Command,
        reply_tx: oneshot::Sender<Result<RpcReply, RpcError>>,
    },
    Disconnect {
        username: Username,
    },
}

/// A cheaply-cloneable, transport-agnostic handle to a running `RoomActor`.
/// Both the TCP and WebSocket listeners talk to the room only through this.
#[derive(Clone)]
pub struct RoomHandle {
    tx: mpsc::Sender<RoomMessage>,
}

impl RoomHandle {
    /// Logs a username into the room, returning its update stream.
    pub async fn login(
        &self,
        raw: impl Into<String>,
    ) -> Result<(Username, mpsc::Receiver<PlayerUpdate>), RpcError> {
        let (updates_tx, updates_rx) = mpsc::channel(SUBSCRIBER_QUEUE_CAPACITY);
        let (reply_tx, reply_rx) = oneshot::channel();
        let sent = self
            .tx
            .send(RoomMessage::Login {
                raw: raw.into(),
                updates_tx,
                reply_tx,
            })
            .await;
        if sent.is_err() {
            return Err(RpcError::NotInARoom);
        }
        let username = reply_rx.await.map_err(|_| RpcError::NotInARoom)??;
        Ok((username, updates_rx))
    }

    /// Sends an authenticated command and awaits its synchronous reply.
    pub async fn call(&self, sender: Username, command: Command) -> Result<RpcReply, RpcError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let sent = self
            .tx
            .send(RoomMessage::Command {
                sender,
                command,
                reply_tx,
            })
            .await;
        if sent.is_err() {
            return Err(RpcError::NotInARoom);
        }
        reply_rx.await.map_err(|_| RpcError::NotInARoom)?
    }

    pub async fn disconnect(&self, username: Username) {
        let _ = self.tx.send(RoomMessage::Disconnect { username }).await;
    }
}

pub struct RoomActor {
    room: Room,
    subscribers: Subscribers,
    rx: mpsc::Receiver<RoomMessage>,
}

impl RoomActor {
    /// Builds an actor and its handle. The caller is responsible for
    /// spawning `actor.run()` on a task.
    pub fn new(config: EngineConfig) -> (RoomActor, RoomHandle) {
        let (tx, rx) = mpsc::channel(1024);
        let actor = RoomActor {
            room: Room::new(config),
            subscribers: Subscribers::new(),
            rx,
        };
        (actor, RoomHandle { tx })
    }

    pub async fn run(mut self) {
        info!("room actor starting");
        loop {
            let timeout = self
                .room
                .round
                .as_ref()
                .map(|_| self.room.time_remaining_or_zero(Instant::now()))
                .unwrap_or(IDLE_POLL);

            tokio::select! {
                _ = tokio::time::sleep(timeout) => {
                    if self.room.round_is_over(Instant::now()) {
                        self.finish_round();
                    }
                }
                msg = self.rx.recv() => {
                    match msg {
                        Some(msg) => self.handle(msg),
                        None => break,
                    }
                }
            }
        }
        info!("room actor shutting down");
    }

    fn handle(&mut self, msg: RoomMessage) {
        match msg {
            RoomMessage::Login {
                raw,
                updates_tx,
                reply_tx,
            } => self.handle_login(raw, updates_tx, reply_tx),
            RoomMessage::Command {
                sender,
                command,
                reply_tx,
            } => self.handle_command(sender, command, reply_tx),
            RoomMessage::Disconnect { username } => self.handle_disconnect(username),
        }
    }

    fn handle_login(
        &mut self,
        raw: String,
        updates_tx: mpsc::Sender<PlayerUpdate>,
        reply_tx: oneshot::Sender<Result<Username, RpcError>>,
    ) {
        match self.room.login(&raw) {
            Ok((username, broadcasts)) => {
                self.subscribers.insert(username.clone(), updates_tx);
                self.fan_out(broadcasts);
                let _ = reply_tx.send(Ok(username));
            }
            Err(e) => {
                let _ = reply_tx.send(Err(e));
            }
        }
    }

    fn handle_command(
        &mut self,
        sender: Username,
        command: Command,
        reply_tx: oneshot::Sender<Result<RpcReply, RpcError>>,
    ) {
        let result = self.dispatch(&sender, command);
        let _ = reply_tx.send(result);
    }

    fn dispatch(&mut self, sender: &Username, command: Command) -> Result<RpcReply, RpcError> {
        match command {
            Command::Login(_) => unreachable!("Login is handled via RoomMessage::Login"),
            Command::StartPlaying(choice) => {
                let seat = self.room.start_playing(sender, choice)?;
                Ok(RpcReply::Seat(seat))
            }
            Command::SetReady(is_ready) => {
                let mut rng = rand::thread_rng();
                let (broadcasts, started) =
                    self.room
                        .set_ready(sender, is_ready, Instant::now(), &mut rng)?;
                self.fan_out(broadcasts);
                if let Some(started) = started {
                    for (username, hand) in started.hands {
                        self.subscribers.send_to(&username, PlayerUpdate::Hand(hand));
                    }
                }
                Ok(RpcReply::Ack)
            }
            Command::PlaceOrder(wire) => {
                let broadcasts = self.room.place_order(sender, wire)?;
                self.fan_out(broadcasts);
                Ok(RpcReply::Ack)
            }
            Command::CancelOrder(id) => {
                let broadcasts = self.room.cancel_order(sender, id)?;
                self.fan_out(broadcasts);
                Ok(RpcReply::Ack)
            }
            Command::CancelAll => {
                let broadcasts = self.room.cancel_all(sender)?;
                self.fan_out(broadcasts);
                Ok(RpcReply::Ack)
            }
            Command::Chat(msg) => {
                if !self.room.users.contains_key(sender) {
                    return Err(RpcError::LoginFirst);
                }
                self.fan_out(vec![Broadcast::Chat(sender.clone(), msg)]);
                Ok(RpcReply::Ack)
            }
            Command::GetUpdate(kind) => {
                let round = self.room.round.as_ref().ok_or(RpcError::GameNotInProgress)?;
                match kind {
                    GetUpdateKind::Hand => {
                        let hand = round.hands.get(sender).copied().unwrap_or_default();
                        self.subscribers.send_to(sender, PlayerUpdate::Hand(hand));
                    }
                    GetUpdateKind::Market => {
                        self.subscribers
                            .send_to(sender, PlayerUpdate::Market(round.book.clone()));
                    }
                }
                Ok(RpcReply::Ack)
            }
            Command::TimeRemaining => {
                let remaining = self.room.time_remaining(Instant::now())?;
                Ok(RpcReply::TimeRemaining(remaining))
            }
        }
    }

    fn handle_disconnect(&mut self, username: Username) {
        self.room.disconnect(&username);
        if !self.room.users.contains_key(&username) {
            self.subscribers.remove(&username);
        }
    }

    fn finish_round(&mut self) {
        let broadcasts = self.room.end_round();
        self.fan_out(broadcasts);
    }

    fn fan_out(&mut self, broadcasts: Vec<Broadcast>) {
        for broadcast in broadcasts {
            let dropped = self
                .subscribers
                .broadcast(&PlayerUpdate::Broadcast(broadcast));
            for username in dropped {
                warn!(%username, "subscriber queue full, dropping connection");
                self.room.disconnect(&username);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::{Dir, OrderId, Suit};
    use crate::room::user::SeatChoice;
    use crate::round::OrderWire;

    async fn seat_and_ready_all(handle: &RoomHandle, names: &[&str]) -> Vec<mpsc::Receiver<PlayerUpdate>> {
        let mut streams = Vec::new();
        let mut usernames = Vec::new();
        for name in names {
            let (username, rx) = handle.login(*name).await.unwrap();
            usernames.push(username);
            streams.push(rx);
        }
        for username in &usernames {
            handle
                .call(username.clone(), Command::StartPlaying(SeatChoice::Anywhere))
                .await
                .unwrap();
        }
        for username in &usernames {
            handle
                .call(username.clone(), Command::SetReady(true))
                .await
                .unwrap();
        }
        streams
    }

    #[tokio::test]
    async fn round_starts_once_table_is_full_and_ready() {
        let (actor, handle) = RoomActor::new(EngineConfig::default());
        tokio::spawn(actor.run());

        let mut streams = seat_and_ready_all(&handle, &["a", "b", "c", "d"]).await;

        // Every subscriber observes PlayerJoined x4 and PlayerReady x4
        // (the last of which also carries NewRound) before its own Hand.
        for stream in streams.iter_mut() {
            let mut saw_new_round = false;
            for _ in 0..9 {
                if let Some(PlayerUpdate::Broadcast(Broadcast::NewRound)) = stream.recv().await {
                    saw_new_round = true;
                }
            }
            assert!(saw_new_round);

            let hand_update = stream.recv().await.unwrap();
            match hand_update {
                PlayerUpdate::Hand(h) => assert_eq!(h.total(), crate::market::Size::new(10)),
                other => panic!("expected a Hand update, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn order_execution_is_observed_in_the_same_order_by_every_subscriber() {
        // A single command's broadcasts arrive in the same order on
        // every subscriber's stream.
        let (actor, handle) = RoomActor::new(EngineConfig::default());
        tokio::spawn(actor.run());
        let mut streams = seat_and_ready_all(&handle, &["a", "b", "c", "d"]).await;
        for stream in streams.iter_mut() {
            // drain lobby broadcasts + the private Hand update
            for _ in 0..10 {
                stream.recv().await;
            }
        }

        let a = Username::parse("a").unwrap();
        let b = Username::parse("b").unwrap();
        handle
            .call(
                a.clone(),
                Command::PlaceOrder(OrderWire {
                    id: OrderId(1),
                    owner: a.clone(),
                    symbol: Suit::Hearts,
                    dir: Dir::Buy,
                    price: 10,
                    size: 3,
                }),
            )
            .await
            .unwrap();
        handle
            .call(
                b.clone(),
                Command::PlaceOrder(OrderWire {
                    id: OrderId(2),
                    owner: b.clone(),
                    symbol: Suit::Hearts,
                    dir: Dir::Sell,
                    price: 8,
                    size: 2,
                }),
            )
            .await
            .unwrap();

        // Drain each subscriber's stream fully and compare sequences.
        let mut sequences = Vec::new();
        for stream in streams.iter_mut() {
            let mut seq = Vec::new();
            while let Ok(update) = stream.try_recv() {
                seq.push(format!("{update:?}"));
            }
            sequences.push(seq);
        }
        for seq in &sequences[1..] {
            assert_eq!(seq, &sequences[0]);
        }
        assert!(sequences[0].iter().any(|s| s.contains("Exec")));
    }

    #[tokio::test]
    async fn cancel_after_fill_returns_no_such_order() {
        // A cancel racing a fill sees No_such_order once the sell has
        // already consumed the resting order.
        let (actor, handle) = RoomActor::new(EngineConfig::default());
        tokio::spawn(actor.run());
        let mut streams = seat_and_ready_all(&handle, &["a", "b", "c", "d"]).await;
        for stream in streams.iter_mut() {
            for _ in 0..10 {
                stream.recv().await;
            }
        }

        let a = Username::parse("a").unwrap();
        let b = Username::parse("b").unwrap();
        handle
            .call(
                a.clone(),
                Command::PlaceOrder(OrderWire {
                    id: OrderId(1),
                    owner: a.clone(),
                    symbol: Suit::Diamonds,
                    dir: Dir::Buy,
                    price: 7,
                    size: 5,
                }),
            )
            .await
            .unwrap();
        handle
            .call(
                b.clone(),
                Command::PlaceOrder(OrderWire {
                    id: OrderId(2),
                    owner: b.clone(),
                    symbol: Suit::Diamonds,
                    dir: Dir::Sell,
                    price: 7,
                    size: 5,
                }),
            )
            .await
            .unwrap();

        let err = handle
            .call(a.clone(), Command::CancelOrder(OrderId(1)))
            .await
            .unwrap_err();
        assert_eq!(err, RpcError::NoSuchOrder);
    }
}
