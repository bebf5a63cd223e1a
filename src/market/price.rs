//! `Price`: a non-negative currency unit, bounded by a room's configured ceiling.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A non-negative integer currency unit.
///
/// Orders carry a `Price`; validity against a room's ceiling (`MAX_PRICE`,
/// `100 * pot` by convention) is checked by the caller, not by this type —
/// the bound is a per-room configuration value, not a universal constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Price(pub u32);

impl Price {
    pub const ZERO: Price = Price(0);

    pub fn new(value: u32) -> Self {
        Price(value)
    }

    pub fn in_bounds(self, max: Price) -> bool {
        self <= max
    }

    /// `self * size`, widened to `i64` for use in a signed cash ledger.
    pub fn extend(self, size: super::size::Size) -> i64 {
        i64::from(self.0) * i64::from(size.0)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
