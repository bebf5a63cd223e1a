//! `Order` and `OrderId`: the unit of trading intent.
//!
//! `OrderId`s are client-assigned and dense per owner: the
//! engine never generates one. Uniqueness is enforced per `(owner, round)`.

use serde::{Deserialize, Serialize};

use super::dir::Dir;
use super::price::Price;
use super::size::Size;
use super::suit::Suit;
use super::username::Username;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(pub u64);

/// An inbound order as submitted by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub owner: Username,
    pub symbol: Suit,
    pub dir: Dir,
    pub price: Price,
    pub size: Size,
}

impl Order {
    /// `price >= 0 ∧ price <= max_price ∧ size > 0`.
    pub fn is_well_formed(&self, max_price: Price) -> bool {
        self.price.in_bounds(max_price) && !self.size.is_zero()
    }
}

/// An order resting in a `HalfBook`. Carries the room-monotonic entry
/// sequence number used for time priority, and the size remaining after
/// any partial fills.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestingOrder {
    pub id: OrderId,
    pub owner: Username,
    pub symbol: Suit,
    pub dir: Dir,
    pub price: Price,
    pub size: Size,
    pub remaining: Size,
    pub seq: u64,
}

impl RestingOrder {
    pub fn from_order(order: Order, seq: u64) -> Self {
        RestingOrder {
            id: order.id,
            owner: order.owner,
            symbol: order.symbol,
            dir: order.dir,
            price: order.price,
            size: order.size,
            remaining: order.size,
            seq,
        }
    }

    pub fn as_order(&self) -> Order {
        Order {
            id: self.id,
            owner: self.owner.clone(),
            symbol: self.symbol,
            dir: self.dir,
            price: self.price,
            size: self.size,
        }
    }
}
