//! Figgie: a real-time multiplayer card-and-trading game server.
//!
//! The core is the game room engine: an authoritative state
//! machine managing per-room lobby/seating state (`room`), round
//! orchestration (`round`), a continuous price-time-priority limit-order
//! book per suit (`book`, `matching`), and a totally-ordered broadcast
//! stream to subscribers (`room::broadcast`). `protocol` defines the wire
//! types both transports (`transport`) speak, and `registry` is the only
//! process-wide mutable structure outside a single room.

pub mod book;
pub mod config;
pub mod error;
pub mod market;
pub mod matching;
pub mod protocol;
pub mod registry;
pub mod room;
pub mod round;
pub mod transport;
