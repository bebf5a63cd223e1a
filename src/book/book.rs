//! `Book`: the four-suit collection of per-side order books.

use serde::{Deserialize, Serialize};

use crate::book::half_book::HalfBook;
use crate::market::{Dir, DirPair, OrderId, RestingOrder, Suit, Username};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    books: [DirPair<HalfBook>; 4],
}

impl Default for Book {
    fn default() -> Self {
        let side = || DirPair::new(HalfBook::new(Dir::Buy), HalfBook::new(Dir::Sell));
        Book {
            books: [side(), side(), side(), side()],
        }
    }
}

impl Book {
    pub fn side(&self, symbol: Suit, dir: Dir) -> &HalfBook {
        self.books[crate::market::suit::suit_index(symbol)].get(dir)
    }

    pub fn side_mut(&mut self, symbol: Suit, dir: Dir) -> &mut HalfBook {
        self.books[crate::market::suit::suit_index(symbol)].get_mut(dir)
    }

    /// `true` iff `best_buy.price < best_sell.price` for every suit where
    /// both sides are non-empty.
    pub fn is_non_crossed(&self) -> bool {
        Suit::ALL.iter().all(|&suit| {
            let buy = self.side(suit, Dir::Buy).peek_best();
            let sell = self.side(suit, Dir::Sell).peek_best();
            match (buy, sell) {
                (Some(b), Some(s)) => b.price < s.price,
                _ => true,
            }
        })
    }

    /// No resting buy/sell pair with the same owner crosses, for any suit.
    pub fn no_self_cross_resting(&self) -> bool {
        Suit::ALL.iter().all(|&suit| {
            let buys = self.side(suit, Dir::Buy);
            let sells = self.side(suit, Dir::Sell);
            buys.iter().all(|b| {
                sells
                    .iter()
                    .all(|s| !(b.owner == s.owner && b.price >= s.price))
            })
        })
    }

    pub fn remove(&mut self, symbol: Suit, dir: Dir, id: OrderId) -> Option<RestingOrder> {
        self.side_mut(symbol, dir).remove(id)
    }

    /// Cancels every resting order owned by `owner`, across all suits and
    /// sides, returning the removed orders.
    pub fn cancel_all_for_owner(&mut self, owner: &Username) -> Vec<RestingOrder> {
        let mut removed = Vec::new();
        for &suit in &Suit::ALL {
            removed.extend(self.side_mut(suit, Dir::Buy).cancel_by_owner(owner));
            removed.extend(self.side_mut(suit, Dir::Sell).cancel_by_owner(owner));
        }
        removed
    }

    /// Every resting order across the whole book, used to flush `Out`s at
    /// round end.
    pub fn drain_all(&mut self) -> Vec<RestingOrder> {
        let mut drained = Vec::new();
        for &suit in &Suit::ALL {
            while let Some(o) = self.side_mut(suit, Dir::Buy).pop_best() {
                drained.push(o);
            }
            while let Some(o) = self.side_mut(suit, Dir::Sell).pop_best() {
                drained.push(o);
            }
        }
        drained
    }

    /// Total resting sell size an owner has posted in `symbol` — used by
    /// the `Not_enough_to_sell` precheck.
    pub fn resting_sell_size_for(&self, symbol: Suit, owner: &Username) -> crate::market::Size {
        self.side(symbol, Dir::Sell)
            .iter()
            .filter(|o| &o.owner == owner)
            .fold(crate::market::Size::ZERO, |acc, o| acc + o.remaining)
    }
}
