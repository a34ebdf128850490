use crate::domain::types::SubscriberId;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::debug;

/// A connected WebSocket client
#[derive(Debug, Clone)]
pub struct Subscriber {
    pub id: SubscriberId,
    pub addr: SocketAddr,
    pub connected_at: Instant,
    outbox: mpsc::UnboundedSender<String>,
}

impl Subscriber {
    pub fn new(id: SubscriberId, addr: SocketAddr, outbox: mpsc::UnboundedSender<String>) -> Self {
        Self {
            id,
            addr,
            connected_at: Instant::now(),
            outbox,
        }
    }

    /// Queue a frame for this subscriber.
    ///
    /// Returns false if the connection task is already gone; the subscriber
    /// stays in the set until its own disconnect event arrives.
    pub fn deliver(&self, line: &str) -> bool {
        self.outbox.send(line.to_string()).is_ok()
    }

    pub fn is_open(&self) -> bool {
        !self.outbox.is_closed()
    }
}

/// Active subscribers keyed by identity
#[derive(Debug, Default)]
pub struct SubscriberSet {
    members: HashMap<SubscriberId, Subscriber>,
}

impl SubscriberSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber; returns false and keeps the existing entry if the id is taken
    pub fn insert(&mut self, subscriber: Subscriber) -> bool {
        if self.members.contains_key(&subscriber.id) {
            return false;
        }
        self.members.insert(subscriber.id, subscriber);
        true
    }

    pub fn remove(&mut self, id: &SubscriberId) -> Option<Subscriber> {
        self.members.remove(id)
    }

    pub fn contains(&self, id: &SubscriberId) -> bool {
        self.members.contains_key(id)
    }

    pub fn get(&self, id: &SubscriberId) -> Option<&Subscriber> {
        self.members.get(id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn ids(&self) -> Vec<SubscriberId> {
        self.members.keys().copied().collect()
    }

    /// Queue `line` to every member; returns how many accepted it
    pub fn broadcast(&self, line: &str) -> usize {
        self.members
            .values()
            .filter(|subscriber| {
                let delivered = subscriber.deliver(line);
                if !delivered {
                    debug!("Subscriber {} outbox closed, frame dropped", subscriber.id);
                }
                delivered
            })
            .count()
    }

    /// Remove every member, closing their outboxes
    pub fn clear(&mut self) -> usize {
        let count = self.members.len();
        self.members.clear();
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn addr() -> SocketAddr {
        "127.0.0.1:50000".parse().unwrap()
    }

    fn subscriber() -> (Subscriber, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Subscriber::new(SubscriberId::new(), addr(), tx), rx)
    }

    #[test]
    fn test_insert_rejects_duplicates() {
        let mut set = SubscriberSet::new();
        let (sub, _rx) = subscriber();
        let id = sub.id;

        assert!(set.insert(sub.clone()));
        assert!(!set.insert(sub));
        assert_eq!(set.len(), 1);
        assert!(set.contains(&id));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut set = SubscriberSet::new();
        let (sub, _rx) = subscriber();
        let id = sub.id;
        set.insert(sub);

        assert!(set.remove(&id).is_some());
        assert!(set.remove(&id).is_none());
        assert!(set.is_empty());
    }

    #[test]
    fn test_broadcast_reaches_every_member() {
        let mut set = SubscriberSet::new();
        let (a, mut rx_a) = subscriber();
        let (b, mut rx_b) = subscriber();
        set.insert(a);
        set.insert(b);

        assert_eq!(set.broadcast("hello"), 2);
        assert_eq!(rx_a.try_recv().unwrap(), "hello");
        assert_eq!(rx_b.try_recv().unwrap(), "hello");
    }

    #[test]
    fn test_broadcast_skips_closed_outbox() {
        let mut set = SubscriberSet::new();
        let (a, rx_a) = subscriber();
        let (b, mut rx_b) = subscriber();
        let a_id = a.id;
        set.insert(a);
        set.insert(b);
        drop(rx_a);

        assert!(!set.get(&a_id).unwrap().is_open());
        assert_eq!(set.broadcast("x"), 1);
        assert_eq!(rx_b.try_recv().unwrap(), "x");
        // closed connections leave only through their disconnect event
        assert_eq!(set.len(), 2);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Connect(usize),
        Disconnect(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0usize..8).prop_map(Op::Connect),
            (0usize..8).prop_map(Op::Disconnect),
        ]
    }

    proptest! {
        #[test]
        fn prop_set_matches_connected_minus_disconnected(ops in prop::collection::vec(op(), 0..64)) {
            let ids: Vec<SubscriberId> = (0..8).map(|_| SubscriberId::new()).collect();
            let mut set = SubscriberSet::new();
            let mut model = HashSet::new();
            let mut receivers = Vec::new();

            for op in ops {
                match op {
                    Op::Connect(i) => {
                        let (tx, rx) = mpsc::unbounded_channel();
                        receivers.push(rx);
                        set.insert(Subscriber::new(ids[i], addr(), tx));
                        model.insert(ids[i]);
                    }
                    Op::Disconnect(i) => {
                        set.remove(&ids[i]);
                        model.remove(&ids[i]);
                    }
                }
            }

            let actual: HashSet<SubscriberId> = set.ids().into_iter().collect();
            prop_assert_eq!(actual, model.clone());
            prop_assert_eq!(set.len(), model.len());
        }
    }
}
