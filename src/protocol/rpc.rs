//! The typed RPC surface and update-stream vocabulary.
//!
//! These types are transport-agnostic: both the length-prefixed TCP
//! listener and the WebSocket listener encode/decode the same `Command`,
//! `RpcReply`, and `PlayerUpdate` values (see `protocol::wire`,
//! `transport`).

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::book::Book;
use crate::market::{Hand, OrderId, Username};
use crate::matching::Exec;
use crate::round::{OrderWire, RoundOverResult};
use crate::room::user::{Seat, SeatChoice};

/// Which half of per-round state a `GetUpdate` query asks for; the actual
/// value is delivered asynchronously on the `PlayerUpdate` stream rather
/// than as the RPC's own reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GetUpdateKind {
    Hand,
    Market,
}

/// Every command a client connection can send, named after the wire RPCs
/// it corresponds to. `sender` is attached by the transport/dispatcher
/// from the connection's authenticated identity, not carried on the wire
/// for most commands — except `Login`, which establishes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Command {
    Login(String),
    StartPlaying(SeatChoice),
    SetReady(bool),
    PlaceOrder(OrderWire),
    CancelOrder(OrderId),
    CancelAll,
    Chat(String),
    GetUpdate(GetUpdateKind),
    TimeRemaining,
}

/// The synchronous reply to a `Command`, on success. `Login`'s real
/// response is the `PlayerUpdate` stream it opens; its synchronous reply
/// is just an ack that the stream is live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RpcReply {
    Ack,
    Seat(Seat),
    TimeRemaining(Duration),
}

/// Canonical, per-room events fanned out to every subscriber. Views are derived at the
/// subscriber edge, not filtered here.
/// Cloned once per subscriber when fanned out (see `room::broadcast`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Broadcast {
    PlayerJoined(Username),
    PlayerReady { who: Username, is_ready: bool },
    Chat(Username, String),
    NewRound,
    Exec(Exec),
    Out(crate::market::RestingOrder),
    RoundOver(RoundOverResult),
    Scores(HashMap<Username, i64>),
}

/// One message on a subscriber's update stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PlayerUpdate {
    Broadcast(Broadcast),
    Hand(Hand),
    Market(Book),
}
