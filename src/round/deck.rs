//! Deck composition and dealing.
//!
//! The 40-card deck splits into two same-color suit pairs: a "minority"
//! color totalling 18 cards (split 8/10) and a "majority" color totalling
//! 22 cards (split 10/12). The gold suit is the minority color's 10-card
//! suit — the same-color partner of the 8-card suit.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::market::{Hand, Suit};

#[derive(Debug, Clone, Copy)]
pub struct DeckComposition {
    pub counts: [u32; 4],
    pub gold: Suit,
}

const BLACK_PAIR: (Suit, Suit) = (Suit::Spades, Suit::Clubs);
const RED_PAIR: (Suit, Suit) = (Suit::Hearts, Suit::Diamonds);

/// Randomly picks which color is the minority (8/10) vs. majority (10/12)
/// color, then which suit within each pair gets the larger count.
pub fn compose_deck(rng: &mut impl Rng) -> DeckComposition {
    let (minority, majority) = if rng.gen_bool(0.5) {
        (BLACK_PAIR, RED_PAIR)
    } else {
        (RED_PAIR, BLACK_PAIR)
    };

    let (eight_suit, gold) = if rng.gen_bool(0.5) {
        (minority.0, minority.1)
    } else {
        (minority.1, minority.0)
    };

    let (twelve_suit, ten_major) = if rng.gen_bool(0.5) {
        (majority.0, majority.1)
    } else {
        (majority.1, majority.0)
    };

    let mut counts = [0u32; 4];
    for &(suit, count) in &[(eight_suit, 8), (gold, 10), (ten_major, 10), (twelve_suit, 12)] {
        counts[crate::market::suit::suit_index(suit)] = count;
    }

    DeckComposition { counts, gold }
}

/// Shuffles the composed deck and deals `hand_size` cards to each of
/// `players` seats in turn. `counts.iter().sum() == players * hand_size`
/// must hold (true for the classic 40-card / 4-player / 10-card deal).
pub fn deal(rng: &mut impl Rng, composition: &DeckComposition, players: usize, hand_size: u32) -> Vec<Hand> {
    let mut cards: Vec<Suit> = Vec::with_capacity(composition.counts.iter().sum::<u32>() as usize);
    for suit in Suit::ALL {
        let count = composition.counts[crate::market::suit::suit_index(suit)];
        cards.extend(std::iter::repeat(suit).take(count as usize));
    }
    cards.shuffle(rng);

    let mut hands = vec![Hand::empty(); players];
    let mut card_iter = cards.into_iter();
    for hand in hands.iter_mut() {
        for _ in 0..hand_size {
            let suit = card_iter.next().expect("deck sized for players * hand_size");
            hand.add(suit, crate::market::Size::new(1));
        }
    }
    hands
}
