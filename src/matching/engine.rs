//! The matching engine: price-time priority matching with a self-cross
//! policy that cancels the resting order rather than filling against it.

use serde::{Deserialize, Serialize};

use crate::book::Book;
use crate::market::{Dir, Order, Price, RestingOrder, Size};

/// An atomic transfer of `size` at `price` against one resting order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fill {
    pub counterparty_id: crate::market::OrderId,
    pub counterparty_owner: crate::market::Username,
    pub price: Price,
    pub size: Size,
}

/// The record produced by matching one inbound order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exec {
    pub order: Order,
    pub fills: Vec<Fill>,
    pub remainder_posted: Size,
}

/// The full outcome of submitting `order` to the book: the `Exec`, plus
/// every resting order that left the book while processing it — whether
/// by the self-cross policy or by being fully filled. Callers emit these
/// as `Out` broadcasts, in the order they occurred, before the `Exec`
/// broadcast that summarizes the whole match.
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    pub exec: Exec,
    pub outs: Vec<RestingOrder>,
}

fn crosses(dir: Dir, incoming_price: Price, resting_price: Price) -> bool {
    match dir {
        Dir::Buy => incoming_price >= resting_price,
        Dir::Sell => incoming_price <= resting_price,
    }
}

/// Matches `order` against `book`, mutating it in place. `next_seq` is the
/// room-monotonic sequence number to assign if a remainder is posted to the
/// book (callers own the counter so ids stay dense across the whole room).
pub fn match_order(book: &mut Book, order: Order, next_seq: u64) -> MatchOutcome {
    let opp_dir = order.dir.other();
    let mut remaining = order.size;
    let mut fills = Vec::new();
    let mut outs = Vec::new();

    loop {
        if remaining.is_zero() {
            break;
        }
        let opp = book.side_mut(order.symbol, opp_dir);
        let crosses_now = match opp.peek_best() {
            Some(best) => crosses(order.dir, order.price, best.price),
            None => false,
        };
        if !crosses_now {
            break;
        }

        let best_owner_matches = opp
            .peek_best()
            .map(|best| best.owner == order.owner)
            .unwrap_or(false);

        if best_owner_matches {
            // Self-cross policy: cancel the resting order, no fill.
            let cancelled = opp.pop_best().expect("peeked Some above");
            outs.push(cancelled);
            continue;
        }

        let best = opp.peek_best_mut().expect("peeked Some above");
        let fill_size = std::cmp::min(remaining, best.remaining);
        let fill_price = best.price;
        let counterparty_id = best.id;
        let counterparty_owner = best.owner.clone();

        best.remaining -= fill_size;
        let best_exhausted = best.remaining.is_zero();
        if best_exhausted {
            // Fully filled: leaves the book, so it gets an `Out` too.
            outs.push(opp.pop_best().expect("just decremented this order"));
        }

        remaining -= fill_size;
        fills.push(Fill {
            counterparty_id,
            counterparty_owner,
            price: fill_price,
            size: fill_size,
        });
    }

    if !remaining.is_zero() {
        let mut to_rest = order.clone();
        to_rest.size = remaining;
        let resting = RestingOrder::from_order(to_rest, next_seq);
        book.side_mut(order.symbol, order.dir).add(resting);
    }

    MatchOutcome {
        exec: Exec {
            order,
            fills,
            remainder_posted: remaining,
        },
        outs,
    }
}
