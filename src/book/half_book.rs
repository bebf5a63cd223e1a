//! `HalfBook`: one side (buy or sell) of one suit's resting orders, held in
//! price-time priority order.

use serde::{Deserialize, Serialize};

use crate::market::{Dir, OrderId, RestingOrder, Username};

/// Resting orders for a single `(symbol, dir)`, kept sorted by priority:
/// Buys descending price then ascending seq; Sells ascending price then
/// ascending seq.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HalfBook {
    dir: Option<Dir>,
    orders: Vec<RestingOrder>,
}

impl HalfBook {
    pub fn new(dir: Dir) -> Self {
        HalfBook {
            dir: Some(dir),
            orders: Vec::new(),
        }
    }

    fn priority_key(&self, order: &RestingOrder) -> (i64, u64) {
        match self.dir {
            Some(Dir::Buy) => (-i64::from(order.price.0), order.seq),
            _ => (i64::from(order.price.0), order.seq),
        }
    }

    /// Inserts `order` at its priority position. Stable with respect to
    /// ties: entries with equal price keep arrival (seq) order.
    pub fn add(&mut self, order: RestingOrder) {
        let key = self.priority_key(&order);
        let pos = self
            .orders
            .partition_point(|o| self.priority_key(o) <= key);
        self.orders.insert(pos, order);
    }

    /// The highest-priority resting order, if any.
    pub fn peek_best(&self) -> Option<&RestingOrder> {
        self.orders.first()
    }

    pub fn peek_best_mut(&mut self) -> Option<&mut RestingOrder> {
        self.orders.first_mut()
    }

    /// Removes and returns the head order.
    pub fn pop_best(&mut self) -> Option<RestingOrder> {
        if self.orders.is_empty() {
            None
        } else {
            Some(self.orders.remove(0))
        }
    }

    /// O(n) removal by id.
    pub fn remove(&mut self, id: OrderId) -> Option<RestingOrder> {
        let pos = self.orders.iter().position(|o| o.id == id)?;
        Some(self.orders.remove(pos))
    }

    /// Removes every resting order owned by `owner`, returning them.
    pub fn cancel_by_owner(&mut self, owner: &Username) -> Vec<RestingOrder> {
        let mut removed = Vec::new();
        self.orders.retain(|o| {
            if &o.owner == owner {
                removed.push(o.clone());
                false
            } else {
                true
            }
        });
        removed
    }

    pub fn iter(&self) -> impl Iterator<Item = &RestingOrder> {
        self.orders.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::{Price, Size};

    fn order(id: u64, owner: &str, price: u32, seq: u64) -> RestingOrder {
        RestingOrder {
            id: OrderId(id),
            owner: Username::parse(owner).unwrap(),
            symbol: crate::market::Suit::Spades,
            dir: Dir::Buy,
            price: Price(price),
            size: Size(1),
            remaining: Size(1),
            seq,
        }
    }

    #[test]
    fn buy_side_orders_descending_price_then_ascending_seq() {
        let mut book = HalfBook::new(Dir::Buy);
        book.add(order(1, "a", 10, 0));
        book.add(order(2, "b", 12, 1));
        book.add(order(3, "c", 12, 2));
        book.add(order(4, "d", 8, 3));

        let ids: Vec<u64> = book.iter().map(|o| o.id.0).collect();
        assert_eq!(ids, vec![2, 3, 1, 4]);
    }

    #[test]
    fn sell_side_orders_ascending_price_then_ascending_seq() {
        let mut book = HalfBook::new(Dir::Sell);
        book.add(order(1, "a", 10, 0));
        book.add(order(2, "b", 8, 1));
        book.add(order(3, "c", 8, 2));

        let ids: Vec<u64> = book.iter().map(|o| o.id.0).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn remove_by_id() {
        let mut book = HalfBook::new(Dir::Buy);
        book.add(order(1, "a", 10, 0));
        book.add(order(2, "b", 11, 1));
        let removed = book.remove(OrderId(1));
        assert!(removed.is_some());
        assert_eq!(book.len(), 1);
        assert!(book.remove(OrderId(1)).is_none());
    }

    #[test]
    fn cancel_by_owner_removes_all_matching() {
        let mut book = HalfBook::new(Dir::Buy);
        book.add(order(1, "a", 10, 0));
        book.add(order(2, "a", 11, 1));
        book.add(order(3, "b", 9, 2));
        let removed = book.cancel_by_owner(&Username::parse("a").unwrap());
        assert_eq!(removed.len(), 2);
        assert_eq!(book.len(), 1);
    }
}
