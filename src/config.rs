//! Room/engine configuration. Every value is overridable via environment
//! variables, layered over built-in defaults.

use std::time::Duration;

use crate::market::Price;

#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Reward split among the gold-majority holder(s) at round end.
    pub pot: Price,
    /// Wall-clock span of a round, measured against a monotonic clock.
    pub round_duration: Duration,
    /// Per-card bonus paid for each gold-suit card held at round end.
    pub per_gold_card_bonus: Price,
    /// Total cards in the deck.
    pub deck_size: u32,
    /// Cards dealt to each player.
    pub hand_size: u32,
    /// Seats per room; a round only starts once this many players are
    /// seated and unanimously ready.
    pub players_per_room: usize,
    /// Ceiling on any order's price, inclusive.
    pub max_price: Price,
    /// Default async-RPC (length-prefixed TCP) listen port.
    pub rpc_port: u16,
    /// Default WebSocket listen port.
    pub ws_port: u16,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let pot = Price::new(100);
        EngineConfig {
            pot,
            round_duration: Duration::from_secs(240),
            per_gold_card_bonus: Price::new(10),
            deck_size: 40,
            hand_size: 10,
            players_per_room: 4,
            max_price: Price::new(100 * pot.0),
            rpc_port: 58828,
            ws_port: 58829,
        }
    }
}

impl EngineConfig {
    /// Applies overrides from the environment on top of the defaults.
    /// Malformed values are ignored, leaving the default in place.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(v) = std::env::var("FIGGIE_POT") {
            if let Ok(p) = v.parse() {
                cfg.pot = Price::new(p);
                cfg.max_price = Price::new(100 * p);
            }
        }
        if let Ok(v) = std::env::var("FIGGIE_ROUND_DURATION_SECS") {
            if let Ok(secs) = v.parse() {
                cfg.round_duration = Duration::from_secs(secs);
            }
        }
        if let Ok(v) = std::env::var("FIGGIE_PER_GOLD_CARD_BONUS") {
            if let Ok(p) = v.parse() {
                cfg.per_gold_card_bonus = Price::new(p);
            }
        }
        if let Ok(v) = std::env::var("FIGGIE_MAX_PRICE") {
            if let Ok(p) = v.parse() {
                cfg.max_price = Price::new(p);
            }
        }
        if let Ok(v) = std::env::var("FIGGIE_RPC_PORT") {
            if let Ok(p) = v.parse() {
                cfg.rpc_port = p;
            }
        }
        if let Ok(v) = std::env::var("FIGGIE_WS_PORT") {
            if let Ok(p) = v.parse() {
                cfg.ws_port = p;
            }
        }
        cfg
    }
}
