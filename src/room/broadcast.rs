//! Per-room subscriber fan-out. Each subscriber is a bounded
//! `mpsc` queue fed only by the room's single-writer task, so ordering
//! within a subscriber is automatically FIFO and ordering across
//! subscribers is automatically total (every send happens on the same
//! task, in the same order). A full queue means a slow subscriber; rather
//! than stall everyone else, that subscriber is dropped.

use std::collections::HashMap;

use tokio::sync::mpsc;

use crate::market::Username;
use crate::protocol::PlayerUpdate;

pub const SUBSCRIBER_QUEUE_CAPACITY: usize = 256;

#[derive(Default)]
pub struct Subscribers {
    senders: HashMap<Username, mpsc::Sender<PlayerUpdate>>,
}

impl Subscribers {
    pub fn new() -> Self {
        Subscribers {
            senders: HashMap::new(),
        }
    }

    pub fn insert(&mut self, username: Username, sender: mpsc::Sender<PlayerUpdate>) {
        self.senders.insert(username, sender);
    }

    pub fn remove(&mut self, username: &Username) {
        self.senders.remove(username);
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }

    /// Fans `update` out to every subscriber. Subscribers whose queue is
    /// full or closed are dropped and returned so the caller can tear down
    /// their connection.
    pub fn broadcast(&mut self, update: &PlayerUpdate) -> Vec<Username> {
        let mut dropped = Vec::new();
        for (username, sender) in &self.senders {
            if sender.try_send(update.clone()).is_err() {
                dropped.push(username.clone());
            }
        }
        for username in &dropped {
            self.senders.remove(username);
        }
        dropped
    }

    /// Sends a value to exactly one subscriber (used for private `Hand`
    /// updates). Returns `false` if that subscriber was dropped as a
    /// result.
    pub fn send_to(&mut self, username: &Username, update: PlayerUpdate) -> bool {
        let full_or_closed = match self.senders.get(username) {
            Some(sender) => sender.try_send(update).is_err(),
            None => return false,
        };
        if full_or_closed {
            self.senders.remove(username);
        }
        !full_or_closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::Hand;

    fn user(name: &str) -> Username {
        Username::parse(name).unwrap()
    }

    #[tokio::test]
    async fn broadcast_delivers_to_every_subscriber_in_order() {
        let mut subs = Subscribers::new();
        let (tx_a, mut rx_a) = mpsc::channel(SUBSCRIBER_QUEUE_CAPACITY);
        let (tx_b, mut rx_b) = mpsc::channel(SUBSCRIBER_QUEUE_CAPACITY);
        subs.insert(user("a"), tx_a);
        subs.insert(user("b"), tx_b);

        subs.broadcast(&PlayerUpdate::Hand(Hand::empty()));
        subs.broadcast(&PlayerUpdate::Hand(Hand::empty()));

        assert!(rx_a.recv().await.is_some());
        assert!(rx_a.recv().await.is_some());
        assert!(rx_b.recv().await.is_some());
        assert!(rx_b.recv().await.is_some());
    }

    #[tokio::test]
    async fn full_queue_drops_subscriber_without_blocking() {
        let mut subs = Subscribers::new();
        let (tx, rx) = mpsc::channel(1);
        subs.insert(user("a"), tx);
        // Fill the queue, then overflow it.
        subs.broadcast(&PlayerUpdate::Hand(Hand::empty()));
        let dropped = subs.broadcast(&PlayerUpdate::Hand(Hand::empty()));
        assert_eq!(dropped, vec![user("a")]);
        assert!(subs.is_empty());
        drop(rx);
    }

    #[tokio::test]
    async fn send_to_targets_a_single_subscriber() {
        let mut subs = Subscribers::new();
        let (tx_a, mut rx_a) = mpsc::channel(SUBSCRIBER_QUEUE_CAPACITY);
        let (tx_b, mut rx_b) = mpsc::channel(SUBSCRIBER_QUEUE_CAPACITY);
        subs.insert(user("a"), tx_a);
        subs.insert(user("b"), tx_b);

        assert!(subs.send_to(&user("a"), PlayerUpdate::Hand(Hand::empty())));
        assert!(rx_a.recv().await.is_some());
        assert!(rx_b.try_recv().is_err());
    }
}
