//! Per-user role and seating state within a `Room`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Seat {
    North,
    East,
    South,
    West,
}

impl Seat {
    pub const ALL: [Seat; 4] = [Seat::North, Seat::East, Seat::South, Seat::West];
}

/// The seat a `StartPlaying` command asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeatChoice {
    Anywhere,
    In(Seat),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Waiting { is_ready: bool },
    Playing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub seat: Seat,
    pub phase: Phase,
    /// Cumulative score across rounds this session.
    pub score: i64,
    /// Cleared on disconnect; the player is kept (not removed) while a
    /// round is in progress so resting orders survive.
    pub is_connected: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerRole {
    Observer,
    Player(Player),
}

#[derive(Debug, Clone)]
pub struct User {
    pub role: PlayerRole,
}

impl User {
    pub fn observer() -> Self {
        User {
            role: PlayerRole::Observer,
        }
    }

    pub fn as_player(&self) -> Option<&Player> {
        match &self.role {
            PlayerRole::Player(p) => Some(p),
            PlayerRole::Observer => None,
        }
    }

    pub fn as_player_mut(&mut self) -> Option<&mut Player> {
        match &mut self.role {
            PlayerRole::Player(p) => Some(p),
            PlayerRole::Observer => None,
        }
    }
}
