// Copyright 2020 Graydon Hoare <graydon@pobox.com>
// Licensed under the MIT and Apache-2.0 licenses.

use crate::Item;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// A cluster-wide assignment of each node to the neighbors it should gossip
/// with. Links need not be symmetric.
pub type TopologyAssignment<Peer> = BTreeMap<Peer, Vec<Peer>>;

/// The fixed list of neighbors this node actively pushes to.
///
/// It is expected to be configured exactly once, before the first
/// reconciliation tick. Configuring again appends rather than replaces,
/// skipping any neighbor already present.
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq)]
pub struct Topology<Peer: Item> {
    neighbors: Vec<Peer>,
}

impl<Peer: Item> Topology<Peer> {
    pub fn new() -> Self {
        Topology {
            neighbors: Vec::new(),
        }
    }

    /// Extracts `me`'s neighbor list from `assignment` and appends it,
    /// returning the neighbors that were actually added.
    pub fn configure(&mut self, me: &Peer, assignment: &TopologyAssignment<Peer>) -> Vec<Peer> {
        let listed = match assignment.get(me) {
            Some(listed) => listed,
            None => {
                warn!("peer {:?} missing from topology assignment", me);
                return Vec::new();
            }
        };
        let mut added = Vec::new();
        for n in listed {
            if n == me {
                warn!("peer {:?} listed as its own neighbor, skipping", me);
                continue;
            }
            if self.neighbors.contains(n) {
                continue;
            }
            self.neighbors.push(n.clone());
            added.push(n.clone());
        }
        debug!("peer {:?} neighbors now {:?}", me, self.neighbors);
        added
    }

    pub fn neighbors(&self) -> &[Peer] {
        &self.neighbors
    }

    pub fn contains(&self, peer: &Peer) -> bool {
        self.neighbors.contains(peer)
    }
}
