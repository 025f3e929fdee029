// Copyright 2020 Graydon Hoare <graydon@pobox.com>
// Licensed under the MIT and Apache-2.0 licenses.

use crate::*;
use itertools::Itertools;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

type Peer = String;
type Val = u64;

// Replies carry the push they answer, standing in for the reply continuation
// a real transport would keep.
#[derive(Clone, Debug)]
enum Msg {
    Gossip {
        from: Peer,
        to: Peer,
        push: Push<Peer, Val>,
    },
    GossipOk {
        from: Peer,
        to: Peer,
        push: Push<Peer, Val>,
        reply: ValueSet<Val>,
    },
}

impl Msg {
    fn endpoints(&self) -> (Peer, Peer) {
        match self {
            Msg::Gossip { from, to, .. } | Msg::GossipOk { from, to, .. } => {
                (from.clone(), to.clone())
            }
        }
    }
}

struct PeerRecord {
    incoming: Vec<Msg>,
    replica: Replica<Peer, Val>,
}

/// A lock-step cluster. Each step every peer handles whatever was delivered
/// to it last step, then ticks once. Messages sent during a step arrive at
/// the start of the next, unless dropped.
#[derive(Default)]
struct Network {
    peers: BTreeMap<Peer, PeerRecord>,
    cut: BTreeSet<(Peer, Peer)>,
    // Percentage of routed messages to lose, drawn from a fixed-seed xorshift.
    loss_pct: u64,
    rng: u64,
    duplicate: bool,
    routed: usize,
    broadcasts: BTreeSet<Val>,
    sizes: BTreeMap<Peer, usize>,
}

fn peer(i: usize) -> Peer {
    format!("n{}", i)
}

impl Network {
    fn with_topology(assignment: TopologyAssignment<Peer>) -> Self {
        let mut n = Network {
            rng: 0x2545_f491_4f6c_dd1d,
            ..Network::default()
        };
        for id in assignment.keys() {
            let mut replica = Replica::new(id.clone(), UnknownSenders::Admit);
            replica.configure(&assignment);
            debug!("created peer {} with neighbors {:?}", id, replica.neighbors());
            n.peers.insert(
                id.clone(),
                PeerRecord {
                    incoming: vec![],
                    replica,
                },
            );
        }
        n
    }

    fn broadcast(&mut self, at: &str, v: Val) {
        self.broadcasts.insert(v);
        if let Some(p) = self.peers.get_mut(at) {
            p.replica.broadcast(v);
        }
    }

    fn partition(&mut self, side_a: &[Peer], side_b: &[Peer]) {
        for (a, b) in side_a.iter().cartesian_product(side_b.iter()) {
            self.cut.insert((a.clone(), b.clone()));
            self.cut.insert((b.clone(), a.clone()));
        }
    }

    fn roll(&mut self) -> u64 {
        let mut x = self.rng;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.rng = x;
        x % 100
    }

    fn route(&mut self, msg: Msg) {
        let (from, to) = msg.endpoints();
        if self.cut.contains(&(from.clone(), to.clone())) {
            return;
        }
        self.routed += 1;
        if self.loss_pct != 0 && self.roll() < self.loss_pct {
            debug!("dropped {} -> {}", from, to);
            return;
        }
        if let Some(p) = self.peers.get_mut(&to) {
            if self.duplicate {
                p.incoming.push(msg.clone());
            }
            p.incoming.push(msg);
        }
    }

    fn step(&mut self) {
        let mut outgoing: Vec<Msg> = vec![];
        for p in self.peers.values_mut() {
            let replica = &mut p.replica;
            for msg in p.incoming.drain(..) {
                match msg {
                    Msg::Gossip { from, to, push } => match replica.on_gossip(&from, &push.delta) {
                        Ok(reply) => outgoing.push(Msg::GossipOk {
                            from: to,
                            to: from,
                            push,
                            reply,
                        }),
                        Err(e) => debug!("gossip refused: {}", e),
                    },
                    Msg::GossipOk { push, reply, .. } => {
                        replica.on_push_reply(&push, &reply);
                    }
                }
            }
            for push in replica.pending_pushes() {
                outgoing.push(Msg::Gossip {
                    from: replica.id.clone(),
                    to: push.to.clone(),
                    push,
                });
            }
        }
        for msg in outgoing {
            self.route(msg);
        }
        self.check_invariants();
    }

    fn check_invariants(&mut self) {
        for (id, p) in self.peers.iter() {
            // Stores never shrink.
            let size = p.replica.store.len();
            let prev = self.sizes.insert(id.clone(), size).unwrap_or(0);
            assert!(size >= prev, "store of {} shrank", id);

            // Nothing is believed of a peer that the peer does not hold.
            for other in p.replica.beliefs.peers() {
                if let Some(o) = self.peers.get(other) {
                    assert!(
                        p.replica.believed(other) <= o.replica.snapshot(),
                        "{} over-believes {}",
                        id,
                        other
                    );
                }
            }
        }
    }

    fn converged(&self) -> bool {
        let want = ValueSet::from_values(self.broadcasts.iter().cloned());
        self.peers.values().all(|p| p.replica.snapshot() == want)
    }

    fn quiet(&self) -> bool {
        self.peers
            .values()
            .all(|p| p.incoming.is_empty() && p.replica.pending_pushes().is_empty())
    }

    fn run_until_converged(&mut self, max_steps: usize) -> usize {
        for i in 0..max_steps {
            if self.converged() {
                return i;
            }
            self.step();
        }
        assert!(self.converged(), "no convergence after {} steps", max_steps);
        max_steps
    }
}

fn line(n: usize) -> TopologyAssignment<Peer> {
    (0..n)
        .map(|i| {
            let mut ns = vec![];
            if i > 0 {
                ns.push(peer(i - 1));
            }
            if i + 1 < n {
                ns.push(peer(i + 1));
            }
            (peer(i), ns)
        })
        .collect()
}

fn ring(n: usize) -> TopologyAssignment<Peer> {
    (0..n)
        .map(|i| (peer(i), vec![peer((i + n - 1) % n), peer((i + 1) % n)]))
        .collect()
}

fn grid(w: usize, h: usize) -> TopologyAssignment<Peer> {
    let mut a = TopologyAssignment::new();
    for (x, y) in (0..w).cartesian_product(0..h) {
        let mut ns = vec![];
        if x > 0 {
            ns.push(peer(y * w + x - 1));
        }
        if x + 1 < w {
            ns.push(peer(y * w + x + 1));
        }
        if y > 0 {
            ns.push(peer((y - 1) * w + x));
        }
        if y + 1 < h {
            ns.push(peer((y + 1) * w + x));
        }
        a.insert(peer(y * w + x), ns);
    }
    a
}

#[test]
fn one_exchange_delivers_to_both_ends() {
    crate::init_test_tracing();
    let mut a = TopologyAssignment::new();
    a.insert("A".to_string(), vec!["B".to_string()]);
    a.insert("B".to_string(), vec![]);
    let mut n = Network::with_topology(a);
    n.broadcast("A", 7);

    // A pushes {7}, then B merges it and replies.
    n.step();
    n.step();
    assert!(n.converged());
    assert_eq!(n.peers["B"].replica.read(), vec![7]);

    // The reply lands; A had already pushed {7} again, and that one's reply
    // lands a step later.
    n.step();
    assert_eq!(n.peers["A"].replica.believed(&"B".to_string()).to_vec(), vec![7]);
    n.step();
    assert!(n.quiet());
}

#[test]
fn converges_on_line() {
    crate::init_test_tracing();
    let mut n = Network::with_topology(line(8));
    n.broadcast("n0", 1);
    n.broadcast("n7", 2);
    n.broadcast("n3", 3);
    n.run_until_converged(50);
}

#[test]
fn converges_on_ring_and_grid() {
    crate::init_test_tracing();
    let mut n = Network::with_topology(ring(10));
    for i in 0..10 {
        n.broadcast(&peer(i), i as Val * 10);
    }
    n.run_until_converged(50);

    let mut n = Network::with_topology(grid(5, 5));
    n.broadcast("n0", 1);
    n.broadcast("n24", 2);
    n.broadcast("n12", 3);
    n.run_until_converged(50);
}

#[test]
fn converges_over_one_way_links() {
    crate::init_test_tracing();
    // Only n0 and n1 ever push; values from n2 travel back on replies.
    let mut a = TopologyAssignment::new();
    a.insert(peer(0), vec![peer(1)]);
    a.insert(peer(1), vec![peer(2)]);
    a.insert(peer(2), vec![]);
    let mut n = Network::with_topology(a);
    n.broadcast("n2", 5);
    n.broadcast("n0", 6);
    n.run_until_converged(20);
}

#[test]
fn converges_despite_loss() {
    crate::init_test_tracing();
    let mut n = Network::with_topology(ring(6));
    n.loss_pct = 30;
    for i in 0..6 {
        n.broadcast(&peer(i), 100 + i as Val);
    }
    n.run_until_converged(200);
}

#[test]
fn converges_despite_duplication() {
    crate::init_test_tracing();
    let mut n = Network::with_topology(line(5));
    n.duplicate = true;
    n.broadcast("n0", 1);
    n.broadcast("n4", 2);
    n.run_until_converged(50);
}

#[test]
fn partition_then_heal() {
    crate::init_test_tracing();
    let mut n = Network::with_topology(ring(6));
    let left = (0..3).map(peer).collect_vec();
    let right = (3..6).map(peer).collect_vec();
    n.partition(&left, &right);
    n.broadcast("n0", 1);
    n.broadcast("n4", 2);
    for _ in 0..30 {
        n.step();
    }
    for p in left.iter() {
        assert_eq!(n.peers[p].replica.read(), vec![1]);
    }
    for p in right.iter() {
        assert_eq!(n.peers[p].replica.read(), vec![2]);
    }

    n.cut.clear();
    n.run_until_converged(50);
}

#[test]
fn no_resend_storm_after_convergence() {
    crate::init_test_tracing();
    let mut n = Network::with_topology(grid(3, 3));
    n.broadcast("n4", 1);
    n.run_until_converged(50);
    for _ in 0..5 {
        n.step();
    }
    assert!(n.quiet());

    let before = n.routed;
    for _ in 0..10 {
        n.step();
    }
    assert_eq!(n.routed, before);

    n.broadcast("n0", 2);
    n.run_until_converged(50);
    assert!(n.routed > before);
}
