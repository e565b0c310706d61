use crate::types::Rank;
use std::collections::HashMap;

/// The peer table built during group formation: rank → address.
///
/// Fixed once formation completes; the group's membership is immutable for
/// the session's lifetime.
#[derive(Debug, Default)]
pub struct GroupRoster {
    peers: HashMap<Rank, String>,
}

impl GroupRoster {
    pub fn new() -> Self {
        Self {
            peers: HashMap::new(),
        }
    }

    /// Register a peer's address under its assigned rank.
    pub fn add_peer(&mut self, rank: Rank, addr: String) {
        self.peers.insert(rank, addr);
    }

    /// The full peer table as `(rank, addr)` pairs, sorted by rank.
    pub fn peers(&self) -> Vec<(Rank, String)> {
        let mut list: Vec<(Rank, String)> = self
            .peers
            .iter()
            .map(|(&rank, addr)| (rank, addr.clone()))
            .collect();
        list.sort_by_key(|(rank, _)| *rank);
        list
    }

    /// A specific peer's address.
    pub fn get(&self, rank: Rank) -> Option<&str> {
        self.peers.get(&rank).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
