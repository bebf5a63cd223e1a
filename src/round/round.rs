//! `Round`: one deal-to-scoring cycle.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::book::Book;
use crate::error::RpcError;
use crate::market::{Dir, Hand, Order, OrderId, Price, RestingOrder, Size, Suit, Username};
use crate::matching::{match_order, Exec};

/// An order as it arrives over the wire, before price/size have been
/// validated into the typed `Price`/`Size` newtypes. Carries signed values
/// so out-of-range submissions (negative price, non-positive size) can be
/// rejected with a specific error kind rather than silently clamped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderWire {
    pub id: OrderId,
    pub owner: Username,
    pub symbol: Suit,
    pub dir: Dir,
    pub price: i64,
    pub size: i64,
}

#[derive(Debug, Clone)]
pub struct PlaceOrderOutcome {
    pub exec: Exec,
    pub outs: Vec<RestingOrder>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundOverResult {
    pub gold: Suit,
    pub hands: HashMap<Username, Hand>,
    pub scores_this_round: HashMap<Username, i64>,
}

pub struct Round {
    pub gold: Suit,
    pub hands: HashMap<Username, Hand>,
    pub cash: HashMap<Username, i64>,
    pub book: Book,
    pub next_order_seq: u64,
    pub start_time: Instant,
    pub duration: Duration,
    /// `(pot, per_gold_card_bonus)`, copied in from `EngineConfig` at round
    /// start so `finish` doesn't need a config reference threaded through.
    scoring: (u32, u32),
    pending_id_dedup: HashMap<Username, HashSet<OrderId>>,
}

impl Round {
    pub fn new(
        gold: Suit,
        hands: HashMap<Username, Hand>,
        duration: Duration,
        start_time: Instant,
        pot: Price,
        per_gold_card_bonus: Price,
    ) -> Self {
        let cash = hands.keys().map(|u| (u.clone(), 0i64)).collect();
        Round {
            gold,
            hands,
            cash,
            book: Book::default(),
            next_order_seq: 0,
            start_time,
            duration,
            scoring: (pot.0, per_gold_card_bonus.0),
            pending_id_dedup: HashMap::new(),
        }
    }

    fn next_seq(&mut self) -> u64 {
        let seq = self.next_order_seq;
        self.next_order_seq += 1;
        seq
    }

    pub fn time_remaining(&self, now: Instant) -> Duration {
        self.duration
            .saturating_sub(now.saturating_duration_since(self.start_time))
    }

    pub fn is_over(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.start_time) >= self.duration
    }

    /// Validates and applies an inbound order. `sender` is the authenticated connection
    /// owner; `wire.owner` must match it (`Owner_is_not_sender`).
    pub fn place_order(
        &mut self,
        sender: &Username,
        wire: OrderWire,
        max_price: Price,
    ) -> Result<PlaceOrderOutcome, RpcError> {
        if &wire.owner != sender {
            return Err(RpcError::OwnerIsNotSender);
        }
        if wire.price < 0 {
            return Err(RpcError::PriceMustBeNonnegative);
        }
        if wire.price > i64::from(max_price.0) {
            return Err(RpcError::PriceTooHigh);
        }
        if wire.size <= 0 {
            return Err(RpcError::SizeMustBePositive);
        }

        let already_used = self
            .pending_id_dedup
            .get(sender)
            .map(|ids| ids.contains(&wire.id))
            .unwrap_or(false);
        if already_used {
            return Err(RpcError::DuplicateOrderId);
        }

        let price = Price::new(wire.price as u32);
        let size = Size::new(wire.size as u32);

        if wire.dir == Dir::Sell {
            let owned = self
                .hands
                .get(sender)
                .map(|h| h.get(wire.symbol))
                .unwrap_or(Size::ZERO);
            let already_resting = self.book.resting_sell_size_for(wire.symbol, sender);
            if owned.saturating_sub(already_resting) < size {
                return Err(RpcError::NotEnoughToSell);
            }
        }

        self.pending_id_dedup
            .entry(sender.clone())
            .or_default()
            .insert(wire.id);

        let order = Order {
            id: wire.id,
            owner: sender.clone(),
            symbol: wire.symbol,
            dir: wire.dir,
            price,
            size,
        };
        let seq = self.next_seq();
        let outcome = match_order(&mut self.book, order, seq);
        self.apply_exec(&outcome.exec);

        Ok(PlaceOrderOutcome {
            exec: outcome.exec,
            outs: outcome.outs,
        })
    }

    /// Applies the card/cash transfers of every fill in `exec` to
    /// `hands`/`cash`.
    fn apply_exec(&mut self, exec: &Exec) {
        let aggressor = &exec.order.owner;
        for fill in &exec.fills {
            let (buyer, seller) = match exec.order.dir {
                Dir::Buy => (aggressor.clone(), fill.counterparty_owner.clone()),
                Dir::Sell => (fill.counterparty_owner.clone(), aggressor.clone()),
            };
            let amount = fill.price.extend(fill.size);

            self.hands
                .entry(buyer.clone())
                .or_insert_with(Hand::empty)
                .add(exec.order.symbol, fill.size);
            self.hands
                .entry(seller.clone())
                .or_insert_with(Hand::empty)
                .remove(exec.order.symbol, fill.size);

            *self.cash.entry(buyer).or_insert(0) -= amount;
            *self.cash.entry(seller).or_insert(0) += amount;
        }
    }

    /// Cancels a single resting order owned by `sender`. By the time this
    /// runs, the order may already have been filled or partially filled by
    /// a command processed earlier in room order — in that case this
    /// returns `No_such_order`.
    pub fn cancel_order(&mut self, sender: &Username, id: OrderId) -> Result<RestingOrder, RpcError> {
        for &suit in &Suit::ALL {
            for &dir in &[Dir::Buy, Dir::Sell] {
                let half = self.book.side(suit, dir);
                let owned = half
                    .iter()
                    .any(|o| o.id == id && &o.owner == sender);
                if owned {
                    return Ok(self
                        .book
                        .remove(suit, dir, id)
                        .expect("just confirmed presence"));
                }
            }
        }
        Err(RpcError::NoSuchOrder)
    }

    pub fn cancel_all(&mut self, sender: &Username) -> Vec<RestingOrder> {
        self.book.cancel_all_for_owner(sender)
    }

    /// Flushes every resting order (as `Out`s), then computes final scores.
    /// Outs are produced first, `Round_over` (this result) after.
    pub fn finish(mut self) -> (Vec<RestingOrder>, RoundOverResult) {
        let outs = self.book.drain_all();
        let gold = self.gold;

        let gold_counts: HashMap<Username, u32> = self
            .hands
            .iter()
            .map(|(u, h)| (u.clone(), h.get(gold).0))
            .collect();
        let max_count = gold_counts.values().copied().max().unwrap_or(0);
        let winners: Vec<Username> = gold_counts
            .iter()
            .filter(|(_, &count)| count == max_count && max_count > 0)
            .map(|(u, _)| u.clone())
            .collect();
        let pot_share = if winners.is_empty() {
            0
        } else {
            i64::from(self.pot_value()) / winners.len() as i64
        };

        let per_card_bonus = i64::from(self.per_gold_card_bonus_value());
        let mut scores_this_round = HashMap::new();
        for (user, cash) in self.cash.drain() {
            let gold_held = gold_counts.get(&user).copied().unwrap_or(0);
            let mut score = cash + i64::from(gold_held) * per_card_bonus;
            if winners.contains(&user) {
                score += pot_share;
            }
            scores_this_round.insert(user, score);
        }

        (
            outs,
            RoundOverResult {
                gold,
                hands: self.hands,
                scores_this_round,
            },
        )
    }

    fn pot_value(&self) -> u32 {
        self.scoring.0
    }

    fn per_gold_card_bonus_value(&self) -> u32 {
        self.scoring.1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str) -> Username {
        Username::parse(name).unwrap()
    }

    fn round_with(hands: HashMap<Username, Hand>) -> Round {
        Round::new(
            Suit::Hearts,
            hands,
            Duration::from_secs(240),
            Instant::now(),
            Price::new(100),
            Price::new(10),
        )
    }

    fn wire(id: u64, owner: &Username, symbol: Suit, dir: Dir, price: i64, size: i64) -> OrderWire {
        OrderWire {
            id: OrderId(id),
            owner: owner.clone(),
            symbol,
            dir,
            price,
            size,
        }
    }

    #[test]
    fn rejects_mismatched_owner() {
        let a = user("a");
        let b = user("b");
        let mut hands = HashMap::new();
        hands.insert(a.clone(), Hand::empty());
        hands.insert(b.clone(), Hand::empty());
        let mut round = round_with(hands);

        let order = wire(1, &a, Suit::Hearts, Dir::Buy, 5, 1);
        let err = round.place_order(&b, order, Price::new(10_000)).unwrap_err();
        assert_eq!(err, RpcError::OwnerIsNotSender);
    }

    #[test]
    fn rejects_negative_price_and_oversized_price_and_size() {
        let a = user("a");
        let mut hands = HashMap::new();
        hands.insert(a.clone(), Hand::empty());
        let mut round = round_with(hands);
        let max_price = Price::new(10_000);

        let neg = wire(1, &a, Suit::Hearts, Dir::Buy, -1, 1);
        assert_eq!(
            round.place_order(&a, neg, max_price).unwrap_err(),
            RpcError::PriceMustBeNonnegative
        );

        let too_high = wire(2, &a, Suit::Hearts, Dir::Buy, 10_001, 1);
        assert_eq!(
            round.place_order(&a, too_high, max_price).unwrap_err(),
            RpcError::PriceTooHigh
        );

        let zero_size = wire(3, &a, Suit::Hearts, Dir::Buy, 5, 0);
        assert_eq!(
            round.place_order(&a, zero_size, max_price).unwrap_err(),
            RpcError::SizeMustBePositive
        );
    }

    #[test]
    fn rejects_duplicate_order_id_from_same_owner() {
        let a = user("a");
        let mut hands = HashMap::new();
        hands.insert(a.clone(), Hand::empty());
        let mut round = round_with(hands);
        let max_price = Price::new(10_000);

        round
            .place_order(&a, wire(1, &a, Suit::Hearts, Dir::Buy, 5, 1), max_price)
            .unwrap();
        let err = round
            .place_order(&a, wire(1, &a, Suit::Hearts, Dir::Buy, 6, 1), max_price)
            .unwrap_err();
        assert_eq!(err, RpcError::DuplicateOrderId);
    }

    #[test]
    fn rejects_sell_larger_than_hand_in_one_shot() {
        // A holds 1 Club and tries to sell 2: rejected outright, no partial
        // resting, no broadcast-worthy side effect.
        let a = user("a");
        let mut hand = Hand::empty();
        hand.add(Suit::Clubs, Size::new(1));
        let mut hands = HashMap::new();
        hands.insert(a.clone(), hand);
        let mut round = round_with(hands);

        let err = round
            .place_order(&a, wire(1, &a, Suit::Clubs, Dir::Sell, 5, 2), Price::new(10_000))
            .unwrap_err();
        assert_eq!(err, RpcError::NotEnoughToSell);
        assert!(round.book.side(Suit::Clubs, Dir::Sell).is_empty());
    }

    #[test]
    fn rejects_sell_beyond_hand_minus_resting() {
        // a holds 2 Hearts, already resting a sell of 2; a third sell
        // attempt of any size should be rejected.
        let a = user("a");
        let mut hand = Hand::empty();
        hand.add(Suit::Hearts, Size::new(2));
        let mut hands = HashMap::new();
        hands.insert(a.clone(), hand);
        let mut round = round_with(hands);
        let max_price = Price::new(10_000);

        round
            .place_order(&a, wire(1, &a, Suit::Hearts, Dir::Sell, 10, 2), max_price)
            .unwrap();
        let err = round
            .place_order(&a, wire(2, &a, Suit::Hearts, Dir::Sell, 11, 1), max_price)
            .unwrap_err();
        assert_eq!(err, RpcError::NotEnoughToSell);
    }

    #[test]
    fn fill_transfers_cards_and_cash_between_parties() {
        let a = user("a");
        let b = user("b");
        let mut a_hand = Hand::empty();
        a_hand.add(Suit::Hearts, Size::new(3));
        let mut hands = HashMap::new();
        hands.insert(a.clone(), a_hand);
        hands.insert(b.clone(), Hand::empty());
        let mut round = round_with(hands);
        let max_price = Price::new(10_000);

        round
            .place_order(&a, wire(1, &a, Suit::Hearts, Dir::Sell, 10, 2), max_price)
            .unwrap();
        round
            .place_order(&b, wire(2, &b, Suit::Hearts, Dir::Buy, 10, 2), max_price)
            .unwrap();

        assert_eq!(round.hands[&a].get(Suit::Hearts), Size::new(1));
        assert_eq!(round.hands[&b].get(Suit::Hearts), Size::new(2));
        assert_eq!(round.cash[&a], 20);
        assert_eq!(round.cash[&b], -20);
    }

    #[test]
    fn cancel_order_removes_resting_order() {
        let a = user("a");
        let mut hands = HashMap::new();
        hands.insert(a.clone(), Hand::empty());
        let mut round = round_with(hands);
        let max_price = Price::new(10_000);

        round
            .place_order(&a, wire(1, &a, Suit::Hearts, Dir::Buy, 5, 1), max_price)
            .unwrap();
        let cancelled = round.cancel_order(&a, OrderId(1)).unwrap();
        assert_eq!(cancelled.id, OrderId(1));
        assert_eq!(
            round.cancel_order(&a, OrderId(1)).unwrap_err(),
            RpcError::NoSuchOrder
        );
    }

    #[test]
    fn finish_pays_pot_to_sole_gold_holder_and_bonus_to_all_holders() {
        let a = user("a");
        let b = user("b");
        let mut a_hand = Hand::empty();
        a_hand.add(Suit::Hearts, Size::new(3)); // gold
        let b_hand = Hand::empty();
        let mut hands = HashMap::new();
        hands.insert(a.clone(), a_hand);
        hands.insert(b.clone(), b_hand);
        let round = round_with(hands);

        let (outs, result) = round.finish();
        assert!(outs.is_empty());
        assert_eq!(result.gold, Suit::Hearts);
        // a holds all 3 gold cards: wins the full pot (100) plus 3*10 bonus.
        assert_eq!(result.scores_this_round[&a], 100 + 30);
        assert_eq!(result.scores_this_round[&b], 0);
    }

    #[test]
    fn finish_scores_four_players_by_gold_holdings() {
        let a = user("a");
        let b = user("b");
        let c = user("c");
        let d = user("d");
        let mut a_hand = Hand::empty();
        a_hand.add(Suit::Spades, Size::new(5));
        let mut b_hand = Hand::empty();
        b_hand.add(Suit::Spades, Size::new(3));
        let mut c_hand = Hand::empty();
        c_hand.add(Suit::Spades, Size::new(1));
        let mut d_hand = Hand::empty();
        d_hand.add(Suit::Spades, Size::new(1));
        let mut hands = HashMap::new();
        hands.insert(a.clone(), a_hand);
        hands.insert(b.clone(), b_hand);
        hands.insert(c.clone(), c_hand);
        hands.insert(d.clone(), d_hand);
        let mut round = round_with(hands);
        round.gold = Suit::Spades;

        let (_, result) = round.finish();
        assert_eq!(result.gold, Suit::Spades);
        assert_eq!(result.scores_this_round[&a], 100 + 50);
        assert_eq!(result.scores_this_round[&b], 30);
        assert_eq!(result.scores_this_round[&c], 10);
        assert_eq!(result.scores_this_round[&d], 10);
    }

    #[test]
    fn finish_splits_pot_evenly_with_truncation_on_ties() {
        let a = user("a");
        let b = user("b");
        let mut a_hand = Hand::empty();
        a_hand.add(Suit::Hearts, Size::new(1));
        let mut b_hand = Hand::empty();
        b_hand.add(Suit::Hearts, Size::new(1));
        let mut hands = HashMap::new();
        hands.insert(a.clone(), a_hand);
        hands.insert(b.clone(), b_hand);
        let mut round = round_with(hands);
        round.scoring = (101, 10); // odd pot, truncates when split 2 ways

        let (_, result) = round.finish();
        assert_eq!(result.scores_this_round[&a], 50 + 10);
        assert_eq!(result.scores_this_round[&b], 50 + 10);
    }

    #[test]
    fn finish_flushes_resting_orders_as_outs_before_returning() {
        let a = user("a");
        let mut hands = HashMap::new();
        hands.insert(a.clone(), Hand::empty());
        let mut round = round_with(hands);
        round
            .place_order(&a, wire(1, &a, Suit::Hearts, Dir::Buy, 5, 1), Price::new(10_000))
            .unwrap();

        let (outs, _) = round.finish();
        assert_eq!(outs.len(), 1);
        assert_eq!(outs[0].id, OrderId(1));
    }
}
