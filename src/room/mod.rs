//! The room lobby/seating state machine, its single-writer actor, and the
//! per-room broadcast fabric.

pub mod broadcast;
pub mod dispatcher;
pub mod room;
pub mod user;

pub use broadcast::Subscribers;
pub use dispatcher::{RoomActor, RoomHandle};
pub use room::{Room, RoundStarted};
