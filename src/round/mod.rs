//! Round orchestration: deck composition/dealing and the live round state
//! machine.

pub mod deck;
pub mod round;

pub use deck::{compose_deck, deal, DeckComposition};
pub use round::{OrderWire, PlaceOrderOutcome, Round, RoundOverResult};
