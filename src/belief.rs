// Copyright 2020 Graydon Hoare <graydon@pobox.com>
// Licensed under the MIT and Apache-2.0 licenses.

use crate::{Item, ValueSet, ValueSetExt};
use im::OrdMap as ArcOrdMap;

/// What this node thinks each of its peers already holds.
///
/// Every entry is an under-approximation of the peer's real `ValueStore`. A
/// value is only recorded against a peer when that peer sent it to us, or
/// replied to a push that carried it; never on the strength of having merely
/// sent it. Being too small costs a redundant resend on the next tick. Being
/// too large would mean a value the peer lacks is never sent to it again.
///
/// Entries only grow.
#[derive(Clone, Debug, Default, Hash, PartialEq)]
pub struct BeliefTable<Peer: Item, V: Item> {
    entries: ArcOrdMap<Peer, ValueSet<V>>,
}

impl<Peer: Item, V: Item> BeliefTable<Peer, V> {
    pub fn new() -> Self {
        BeliefTable {
            entries: ArcOrdMap::new(),
        }
    }

    /// Creates an empty entry for `peer` unless it already has one.
    pub fn register(&mut self, peer: Peer) {
        if !self.entries.contains_key(&peer) {
            self.entries.insert(peer, ValueSet::default());
        }
    }

    pub fn is_registered(&self, peer: &Peer) -> bool {
        self.entries.contains_key(peer)
    }

    /// Joins `seen` into `peer`'s entry, creating the entry if needed.
    pub fn record(&mut self, peer: &Peer, seen: &ValueSet<V>) {
        let joined = match self.entries.get(peer) {
            Some(prev) => prev + seen,
            None => seen.clone(),
        };
        self.entries.insert(peer.clone(), joined);
    }

    /// What we believe `peer` holds. Unknown peers are believed to hold
    /// nothing.
    pub fn believed(&self, peer: &Peer) -> ValueSet<V> {
        self.entries.get(peer).cloned().unwrap_or_default()
    }

    /// Everything in `store` that `peer` is not yet believed to hold.
    pub fn outstanding(&self, peer: &Peer, store: &ValueSet<V>) -> ValueSet<V> {
        match self.entries.get(peer) {
            Some(belief) => store.minus(belief),
            None => store.clone(),
        }
    }

    pub fn peers(&self) -> impl Iterator<Item = &Peer> {
        self.entries.keys()
    }
}
