// Copyright 2020 Graydon Hoare <graydon@pobox.com>
// Licensed under the MIT and Apache-2.0 licenses.

use crate::{
    BeliefTable, Error, Item, Result, Topology, TopologyAssignment, UnknownSenders, ValueSet,
    ValueSetExt, ValueStore,
};
use tracing::{debug, trace};

// Replicas _could_ own their own timers and sockets, but then nothing could
// step them deterministically, clone them mid-exchange, or check invariants
// across a whole simulated cluster between steps.
//
// So instead a Replica is a plain state machine: every operation is a
// synchronous transition over its state, and network effects come out as
// values (`Push`es, reply sets) for something else to deliver. The `Node`
// runtime delivers them with a transport and a timer; the tests deliver them
// by hand.

/// A push of `delta` to neighbor `to`, computed on one reconciliation tick.
///
/// The push is also its own completion record: when `to` replies, `delta` is
/// what proves `to` now holds those values, so it has to travel with the
/// in-flight request and come back to `on_push_reply`.
#[derive(Clone, Debug, Hash, PartialEq)]
pub struct Push<Peer: Item, V: Item> {
    pub to: Peer,
    pub delta: ValueSet<V>,
}

/// `Replica`s hold one node's share of the broadcast protocol: its values,
/// its beliefs about its peers, and who its neighbors are.
///
/// All mutation is by join, so the order in which gossip, replies and client
/// broadcasts are applied does not affect what the replica eventually holds.
#[derive(Clone, Debug)]
pub struct Replica<Peer: Item, V: Item> {
    pub id: Peer,
    pub(crate) unknown_senders: UnknownSenders,
    pub(crate) topology: Topology<Peer>,
    pub(crate) store: ValueStore<V>,
    pub(crate) beliefs: BeliefTable<Peer, V>,
}

impl<Peer: Item, V: Item> Replica<Peer, V> {
    pub fn new(id: Peer, unknown_senders: UnknownSenders) -> Self {
        Replica {
            id,
            unknown_senders,
            topology: Topology::new(),
            store: ValueStore::new(),
            beliefs: BeliefTable::new(),
        }
    }

    /// Accepts a new value from a client. Nothing is sent: dissemination is
    /// left entirely to the next reconciliation tick.
    pub fn broadcast(&mut self, v: V) -> bool {
        let fresh = self.store.add(v);
        trace!("peer {:?} broadcast, fresh={}", self.id, fresh);
        fresh
    }

    /// Every value this replica holds, in no meaningful order.
    pub fn read(&self) -> Vec<V> {
        self.store.snapshot().to_vec()
    }

    pub fn snapshot(&self) -> ValueSet<V> {
        self.store.snapshot()
    }

    /// Appends this replica's neighbors from `assignment`, giving each new
    /// neighbor an empty belief entry.
    pub fn configure(&mut self, assignment: &TopologyAssignment<Peer>) -> Vec<Peer> {
        let added = self.topology.configure(&self.id, assignment);
        for n in added.iter() {
            self.beliefs.register(n.clone());
        }
        added
    }

    pub fn neighbors(&self) -> &[Peer] {
        self.topology.neighbors()
    }

    pub fn believed(&self, peer: &Peer) -> ValueSet<V> {
        self.beliefs.believed(peer)
    }

    /// Handles a push from `from`, returning the reply: everything we hold
    /// that `from` is not believed to hold.
    ///
    /// `delta` is folded into `from`'s belief entry before the reply is
    /// computed, so nothing `from` just sent is echoed back to it.
    pub fn on_gossip(&mut self, from: &Peer, delta: &ValueSet<V>) -> Result<ValueSet<V>> {
        if !self.beliefs.is_registered(from) && !self.topology.contains(from) {
            match self.unknown_senders {
                UnknownSenders::Reject => return Err(Error::unknown_sender(from)),
                UnknownSenders::Admit => {
                    debug!("peer {:?} admitting unconfigured peer {:?}", self.id, from);
                    self.beliefs.register(from.clone());
                }
            }
        }
        let learned = self.store.merge(delta);
        self.beliefs.record(from, delta);
        let reply = self.beliefs.outstanding(from, &self.store.snapshot());
        debug!(
            "peer {:?} gossip from {:?}: got {}, learned {}, replying {}",
            self.id,
            from,
            delta.values().len(),
            learned,
            reply.values().len()
        );
        Ok(reply)
    }

    /// Computes this tick's pushes: one per neighbor with a non-empty
    /// outstanding delta.
    pub fn pending_pushes(&self) -> Vec<Push<Peer, V>> {
        let store = self.store.snapshot();
        let mut pushes = Vec::new();
        for n in self.topology.neighbors() {
            let delta = self.beliefs.outstanding(n, &store);
            if delta.values().is_empty() {
                continue;
            }
            pushes.push(Push {
                to: n.clone(),
                delta,
            });
        }
        trace!("peer {:?} has {} pending pushes", self.id, pushes.len());
        pushes
    }

    /// Applies the reply to `push`. The neighbor now holds both what we
    /// pushed and what it replied with, and so do we.
    ///
    /// Replies may arrive late, out of order, or more than once; all of
    /// those are harmless.
    pub fn on_push_reply(&mut self, push: &Push<Peer, V>, reply: &ValueSet<V>) -> usize {
        let learned = self.store.merge(reply);
        self.beliefs.record(&push.to, &(&push.delta + reply));
        debug!(
            "peer {:?} push to {:?} acknowledged: sent {}, learned {}",
            self.id,
            push.to,
            push.delta.values().len(),
            learned
        );
        learned
    }
}
