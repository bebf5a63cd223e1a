//! `Room`: lobby/seating state machine and round ownership.

use std::collections::HashMap;
use std::time::Instant;

use rand::Rng;

use crate::config::EngineConfig;
use crate::error::RpcError;
use crate::market::{Hand, OrderId, Username};
use crate::protocol::Broadcast;
use crate::round::{compose_deck, deal, OrderWire, Round};
use crate::room::user::{Phase, Player, PlayerRole, Seat, SeatChoice, User};

/// Hands dealt when a round starts, keyed by player — delivered to each
/// player privately as a `PlayerUpdate::Hand`, never broadcast.
pub struct RoundStarted {
    pub hands: HashMap<Username, Hand>,
}

pub struct Room {
    pub config: EngineConfig,
    pub users: HashMap<Username, User>,
    pub seating: HashMap<Seat, Username>,
    pub round: Option<Round>,
}

impl Room {
    pub fn new(config: EngineConfig) -> Self {
        Room {
            config,
            users: HashMap::new(),
            seating: HashMap::new(),
            round: None,
        }
    }

    pub fn login(&mut self, raw: &str) -> Result<(Username, Vec<Broadcast>), RpcError> {
        let username = Username::parse(raw).ok_or(RpcError::InvalidUsername)?;
        if self.users.contains_key(&username) {
            return Err(RpcError::AlreadyLoggedIn);
        }
        if self.round.is_some() {
            return Err(RpcError::GameAlreadyStarted);
        }
        if self.users.len() >= self.config.players_per_room {
            return Err(RpcError::GameIsFull);
        }
        self.users.insert(username.clone(), User::observer());
        Ok((username.clone(), vec![Broadcast::PlayerJoined(username)]))
    }

    pub fn start_playing(&mut self, username: &Username, choice: SeatChoice) -> Result<Seat, RpcError> {
        if self.round.is_some() {
            return Err(RpcError::GameAlreadyStarted);
        }
        let user = self.users.get(username).ok_or(RpcError::NotInARoom)?;
        if matches!(user.role, PlayerRole::Player(_)) {
            return Err(RpcError::YoureAlreadyPlaying);
        }

        let seat = match choice {
            SeatChoice::In(s) => {
                if self.seating.contains_key(&s) {
                    return Err(RpcError::SeatOccupied);
                }
                s
            }
            SeatChoice::Anywhere => Seat::ALL
                .into_iter()
                .find(|s| !self.seating.contains_key(s))
                .ok_or(RpcError::SeatOccupied)?,
        };

        self.seating.insert(seat, username.clone());
        let user = self.users.get_mut(username).expect("checked above");
        user.role = PlayerRole::Player(Player {
            seat,
            phase: Phase::Waiting { is_ready: false },
            score: 0,
            is_connected: true,
        });
        Ok(seat)
    }

    /// Sets a player's readiness. If this achieves unanimous readiness
    /// across a full table, starts a round and returns its dealt hands.
    pub fn set_ready(
        &mut self,
        username: &Username,
        is_ready: bool,
        now: Instant,
        rng: &mut impl Rng,
    ) -> Result<(Vec<Broadcast>, Option<RoundStarted>), RpcError> {
        if self.round.is_some() {
            return Err(RpcError::GameAlreadyStarted);
        }
        let user = self.users.get_mut(username).ok_or(RpcError::NotInARoom)?;
        let player = user.as_player_mut().ok_or(RpcError::YoureNotPlaying)?;
        match player.phase {
            Phase::Playing => return Err(RpcError::AlreadyPlaying),
            Phase::Waiting { .. } => player.phase = Phase::Waiting { is_ready },
        }

        let mut broadcasts = vec![Broadcast::PlayerReady {
            who: username.clone(),
            is_ready,
        }];

        let all_ready = self.seating.len() == self.config.players_per_room
            && self.users.values().all(|u| match &u.role {
                PlayerRole::Player(p) => matches!(p.phase, Phase::Waiting { is_ready: true }),
                PlayerRole::Observer => true,
            });

        if !all_ready {
            return Ok((broadcasts, None));
        }

        let started = self.start_round(now, rng);
        broadcasts.push(Broadcast::NewRound);
        Ok((broadcasts, Some(started)))
    }

    fn start_round(&mut self, now: Instant, rng: &mut impl Rng) -> RoundStarted {
        let composition = compose_deck(rng);
        let players: Vec<Username> = Seat::ALL
            .iter()
            .filter_map(|s| self.seating.get(s).cloned())
            .collect();
        let dealt = deal(rng, &composition, players.len(), self.config.hand_size);

        let mut hands = HashMap::new();
        for (player, hand) in players.iter().zip(dealt.into_iter()) {
            hands.insert(player.clone(), hand);
            if let Some(p) = self
                .users
                .get_mut(player)
                .and_then(|u| u.as_player_mut())
            {
                p.phase = Phase::Playing;
            }
        }

        self.round = Some(Round::new(
            composition.gold,
            hands.clone(),
            self.config.round_duration,
            now,
            self.config.pot,
            self.config.per_gold_card_bonus,
        ));

        RoundStarted { hands }
    }

    pub fn place_order(
        &mut self,
        username: &Username,
        wire: OrderWire,
    ) -> Result<Vec<Broadcast>, RpcError> {
        self.require_playing(username)?;
        let round = self.round.as_mut().ok_or(RpcError::GameNotInProgress)?;
        let outcome = round.place_order(username, wire, self.config.max_price)?;

        let mut broadcasts: Vec<Broadcast> = outcome.outs.into_iter().map(Broadcast::Out).collect();
        broadcasts.push(Broadcast::Exec(outcome.exec));
        Ok(broadcasts)
    }

    pub fn cancel_order(&mut self, username: &Username, id: OrderId) -> Result<Vec<Broadcast>, RpcError> {
        self.require_playing(username)?;
        let round = self.round.as_mut().ok_or(RpcError::GameNotInProgress)?;
        let cancelled = round.cancel_order(username, id)?;
        Ok(vec![Broadcast::Out(cancelled)])
    }

    pub fn cancel_all(&mut self, username: &Username) -> Result<Vec<Broadcast>, RpcError> {
        self.require_playing(username)?;
        let round = self.round.as_mut().ok_or(RpcError::GameNotInProgress)?;
        let cancelled = round.cancel_all(username);
        Ok(cancelled.into_iter().map(Broadcast::Out).collect())
    }

    pub fn time_remaining(&self, now: Instant) -> Result<std::time::Duration, RpcError> {
        let round = self.round.as_ref().ok_or(RpcError::GameNotInProgress)?;
        Ok(round.time_remaining(now))
    }

    /// Like `time_remaining`, but `Duration::ZERO` when no round is active.
    /// Used by `RoomActor` to size its next timer-poll sleep.
    pub fn time_remaining_or_zero(&self, now: Instant) -> std::time::Duration {
        self.round
            .as_ref()
            .map(|r| r.time_remaining(now))
            .unwrap_or(std::time::Duration::ZERO)
    }

    fn require_playing(&self, username: &Username) -> Result<(), RpcError> {
        let user = self.users.get(username).ok_or(RpcError::NotInARoom)?;
        let player = user.as_player().ok_or(RpcError::YoureNotPlaying)?;
        if !matches!(player.phase, Phase::Playing) {
            return Err(RpcError::YoureNotPlaying);
        }
        if self.round.is_none() {
            return Err(RpcError::GameNotInProgress);
        }
        Ok(())
    }

    /// Whether the active round (if any) has run past its duration.
    pub fn round_is_over(&self, now: Instant) -> bool {
        self.round.as_ref().map(|r| r.is_over(now)).unwrap_or(false)
    }

    /// Ends the active round: flushes outs, computes scores, folds them
    /// into cumulative per-player scores, resets every seated player to
    /// `Waiting{is_ready=false}`, and removes anyone who disconnected
    /// mid-round.
    pub fn end_round(&mut self) -> Vec<Broadcast> {
        let round = match self.round.take() {
            Some(r) => r,
            None => return Vec::new(),
        };
        let (outs, result) = round.finish();

        let mut broadcasts: Vec<Broadcast> = outs.into_iter().map(Broadcast::Out).collect();

        let mut cumulative = HashMap::new();
        let disconnected: Vec<Username> = self
            .users
            .iter()
            .filter_map(|(u, user)| {
                user.as_player().and_then(|p| {
                    if !p.is_connected {
                        Some(u.clone())
                    } else {
                        None
                    }
                })
            })
            .collect();

        for (username, delta) in &result.scores_this_round {
            if let Some(player) = self.users.get_mut(username).and_then(|u| u.as_player_mut()) {
                player.score += delta;
                player.phase = Phase::Waiting { is_ready: false };
            }
        }
        for (username, user) in &self.users {
            if let Some(p) = user.as_player() {
                cumulative.insert(username.clone(), p.score);
            }
        }

        broadcasts.push(Broadcast::RoundOver(result));
        broadcasts.push(Broadcast::Scores(cumulative));

        for username in disconnected {
            if let Some(seat) = self
                .users
                .get(&username)
                .and_then(|u| u.as_player())
                .map(|p| p.seat)
            {
                self.seating.remove(&seat);
            }
            self.users.remove(&username);
        }

        broadcasts
    }

    /// A client disconnect: mid-round players are kept (orders survive);
    /// everyone else is removed immediately.
    pub fn disconnect(&mut self, username: &Username) {
        let mid_round_player = self.round.is_some()
            && self
                .users
                .get(username)
                .map(|u| u.as_player().is_some())
                .unwrap_or(false);

        if mid_round_player {
            if let Some(p) = self.users.get_mut(username).and_then(|u| u.as_player_mut()) {
                p.is_connected = false;
            }
            return;
        }

        if let Some(seat) = self
            .users
            .get(username)
            .and_then(|u| u.as_player())
            .map(|p| p.seat)
        {
            self.seating.remove(&seat);
        }
        self.users.remove(username);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn seat_and_ready(room: &mut Room, rng: &mut StdRng, now: Instant, names: &[&str]) -> Option<RoundStarted> {
        let mut started = None;
        let users: Vec<Username> = names
            .iter()
            .map(|n| {
                let (u, _) = room.login(n).unwrap();
                u
            })
            .collect();
        for u in &users {
            room.start_playing(u, SeatChoice::Anywhere).unwrap();
        }
        for u in &users {
            let (_, maybe_started) = room.set_ready(u, true, now, rng).unwrap();
            if maybe_started.is_some() {
                started = maybe_started;
            }
        }
        started
    }

    #[test]
    fn login_rejects_duplicate_and_invalid_username() {
        let mut room = Room::new(EngineConfig::default());
        room.login("a").unwrap();
        assert_eq!(room.login("a").unwrap_err(), RpcError::AlreadyLoggedIn);
        assert_eq!(room.login("").unwrap_err(), RpcError::InvalidUsername);
    }

    #[test]
    fn login_rejects_when_room_full() {
        let mut room = Room::new(EngineConfig::default());
        for n in ["a", "b", "c", "d"] {
            room.login(n).unwrap();
        }
        assert_eq!(room.login("e").unwrap_err(), RpcError::GameIsFull);
    }

    #[test]
    fn start_playing_rejects_occupied_seat_and_double_seating() {
        let mut room = Room::new(EngineConfig::default());
        let (a, _) = room.login("a").unwrap();
        let (b, _) = room.login("b").unwrap();
        room.start_playing(&a, SeatChoice::In(Seat::North)).unwrap();
        assert_eq!(
            room.start_playing(&b, SeatChoice::In(Seat::North)).unwrap_err(),
            RpcError::SeatOccupied
        );
        assert_eq!(
            room.start_playing(&a, SeatChoice::Anywhere).unwrap_err(),
            RpcError::YoureAlreadyPlaying
        );
    }

    #[test]
    fn unanimous_ready_with_full_table_starts_round() {
        let mut room = Room::new(EngineConfig::default());
        let mut rng = StdRng::seed_from_u64(1);
        let now = Instant::now();
        let started = seat_and_ready(&mut room, &mut rng, now, &["a", "b", "c", "d"]);
        assert!(started.is_some());
        assert!(room.round.is_some());
        let started = started.unwrap();
        assert_eq!(started.hands.len(), 4);
        for (_, hand) in &started.hands {
            assert_eq!(hand.total(), crate::market::Size::new(10));
        }
    }

    #[test]
    fn set_ready_rejects_non_player() {
        let mut room = Room::new(EngineConfig::default());
        let (a, _) = room.login("a").unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let err = room
            .set_ready(&a, true, Instant::now(), &mut rng)
            .unwrap_err();
        assert_eq!(err, RpcError::YoureNotPlaying);
    }

    #[test]
    fn end_round_resets_phases_and_accumulates_scores() {
        let mut room = Room::new(EngineConfig::default());
        let mut rng = StdRng::seed_from_u64(7);
        let now = Instant::now();
        seat_and_ready(&mut room, &mut rng, now, &["a", "b", "c", "d"]);
        assert!(room.round.is_some());

        let broadcasts = room.end_round();
        assert!(room.round.is_none());
        assert!(matches!(broadcasts.last(), Some(Broadcast::Scores(_))));
        assert!(matches!(
            broadcasts[broadcasts.len() - 2],
            Broadcast::RoundOver(_)
        ));
        for user in room.users.values() {
            if let Some(p) = user.as_player() {
                assert_eq!(p.phase, Phase::Waiting { is_ready: false });
            }
        }
    }

    #[test]
    fn disconnect_mid_round_keeps_player_disconnect_outside_round_removes() {
        let mut room = Room::new(EngineConfig::default());
        let mut rng = StdRng::seed_from_u64(3);
        let now = Instant::now();
        seat_and_ready(&mut room, &mut rng, now, &["a", "b", "c", "d"]);
        let a = Username::parse("a").unwrap();
        room.disconnect(&a);
        assert!(room.users.contains_key(&a));
        assert!(!room.users[&a].as_player().unwrap().is_connected);

        room.end_round();
        assert!(!room.users.contains_key(&a));
    }
}
