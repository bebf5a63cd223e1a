//! The RPC error taxonomy: every rejection an RPC can return.
//!
//! All variants are non-fatal, recoverable responses to the sender — none
//! of them mutate room state. Fatal invariant violations (card/cash
//! non-conservation, negative hands) are never represented here; they are
//! logged and terminate the `Room` task instead (see `room::dispatcher`).

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum RpcError {
    // ── Auth/session ──
    #[error("not logged in")]
    NotLoggedIn,
    #[error("already logged in")]
    AlreadyLoggedIn,
    #[error("invalid username")]
    InvalidUsername,
    #[error("not in a room")]
    NotInARoom,
    #[error("log in first")]
    LoginFirst,

    // ── Lifecycle ──
    #[error("game not in progress")]
    GameNotInProgress,
    #[error("game already started")]
    GameAlreadyStarted,
    #[error("you're not playing")]
    YoureNotPlaying,
    #[error("you're already playing")]
    YoureAlreadyPlaying,
    #[error("already playing")]
    AlreadyPlaying,
    #[error("game is full")]
    GameIsFull,
    #[error("seat occupied")]
    SeatOccupied,

    // ── Order validity ──
    #[error("owner is not sender")]
    OwnerIsNotSender,
    #[error("duplicate order id")]
    DuplicateOrderId,
    #[error("price must be non-negative")]
    PriceMustBeNonnegative,
    #[error("price too high")]
    PriceTooHigh,
    #[error("size must be positive")]
    SizeMustBePositive,
    #[error("not enough to sell")]
    NotEnoughToSell,
    #[error("no such order")]
    NoSuchOrder,
}
