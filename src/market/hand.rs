//! `Hand`: a player's cards, indexed by suit. `PartialHand` is the view an
//! observer has of another player's hand (own-hand visibility only;
//! everything else is disclosed only in aggregate through fills).

use serde::{Deserialize, Serialize};

use super::dir::Dir;
use super::size::Size;
use super::suit::{suit_index, Suit};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hand([Size; 4]);

impl Default for Hand {
    fn default() -> Self {
        Hand::empty()
    }
}

impl Hand {
    pub fn empty() -> Self {
        Hand([Size::ZERO; 4])
    }

    pub fn from_counts(counts: [u32; 4]) -> Self {
        Hand(counts.map(Size::new))
    }

    pub fn get(&self, suit: Suit) -> Size {
        self.0[suit_index(suit)]
    }

    pub fn set(&mut self, suit: Suit, size: Size) {
        self.0[suit_index(suit)] = size;
    }

    pub fn add(&mut self, suit: Suit, size: Size) {
        self.0[suit_index(suit)] += size;
    }

    /// Panics if `size` exceeds the current holding — callers must check
    /// `Sell coverage` before calling this.
    pub fn remove(&mut self, suit: Suit, size: Size) {
        self.0[suit_index(suit)] -= size;
    }

    pub fn total(&self) -> Size {
        self.0.iter().fold(Size::ZERO, |acc, &s| acc + s)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Suit, Size)> + '_ {
        Suit::ALL.into_iter().map(move |s| (s, self.get(s)))
    }

    /// Applies `f` pointwise over two hands, suit by suit.
    pub fn map2(a: &Hand, b: &Hand, mut f: impl FnMut(Size, Size) -> Size) -> Hand {
        let mut out = Hand::empty();
        for suit in Suit::ALL {
            out.set(suit, f(a.get(suit), b.get(suit)));
        }
        out
    }

}

/// What an observer knows about another player's hand: any suit-counts
/// revealed by market activity, plus the remaining unknown count.
///
/// Partial-information hiding happens at the subscriber edge: a player
/// only ever receives their own `Hand` in full; everyone else's holdings
/// are reconstructed client-side from the public `Exec` broadcasts that
/// name `suit`/`dir`/`size` for both sides of every trade, starting from
/// `PartialHand::unknown(hand_size)` and folding in each trade the owner
/// was party to via [`PartialHand::observe_trade`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialHand {
    pub known: Hand,
    pub unknown: Size,
}

impl PartialHand {
    /// The view before any trade has revealed anything about the holder:
    /// their whole `hand_size`-card hand is unattributed.
    pub fn unknown(hand_size: Size) -> PartialHand {
        PartialHand {
            known: Hand::empty(),
            unknown: hand_size,
        }
    }

    pub fn total(&self) -> Size {
        self.known.total() + self.unknown
    }

    /// Folds in one trade the holder was party to, on the `dir` side, for
    /// `size` of `suit`.
    ///
    /// A buy is unambiguous: the holder's hand just grew by `size` of
    /// `suit`, so the known count for `suit` grows by the same amount.
    ///
    /// A sell only proves the holder had `size` of `suit` *before* the
    /// trade — cards which are now gone — it does not say where those
    /// cards came from. Whatever part of `size` is already accounted for in
    /// `known` is drawn from there first; any remainder must have come out
    /// of the still-unattributed bucket, so it is drawn from `unknown`
    /// instead. Either way `total()` shrinks by exactly `size`, matching
    /// the holder's real hand.
    pub fn observe_trade(&mut self, suit: Suit, dir: Dir, size: Size) {
        match dir {
            Dir::Buy => self.known.add(suit, size),
            Dir::Sell => {
                let from_known = self.known.get(suit).min(size);
                self.known.remove(suit, from_known);
                let from_unknown = size.saturating_sub(from_known);
                self.unknown = self.unknown.saturating_sub(from_unknown);
            }
        }
    }
}
