//! The matching engine: given a resting book and an incoming order,
//! produces an `Exec` and the updated book.

pub mod engine;

pub use engine::{match_order, Exec, Fill, MatchOutcome};
