// Copyright 2020 Graydon Hoare <graydon@pobox.com>
// Licensed under the MIT and Apache-2.0 licenses.

//! An in-process transport, for tests and simulation only.
//!
//! Every node on a `MemNetwork` can call every other registered node. Links
//! can be cut to model partitions: a request crossing a cut link is lost, so
//! its future never resolves and the caller's timeout fires.

use crate::{Body, Error, Handler, Item, Result, Transport};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::trace;

struct NetState<Peer: Item, V: Item> {
    // Held weakly: nodes own their transports, so owning the nodes here too
    // would keep every node on the network alive forever.
    nodes: BTreeMap<Peer, Weak<dyn Handler<Peer, V>>>,
    // Directed (from, to) links that currently drop everything.
    cut: BTreeSet<(Peer, Peer)>,
}

#[derive(Clone)]
pub struct MemNetwork<Peer: Item, V: Item> {
    state: Arc<Mutex<NetState<Peer, V>>>,
}

impl<Peer: Item, V: Item> Default for MemNetwork<Peer, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Peer: Item, V: Item> MemNetwork<Peer, V> {
    pub fn new() -> Self {
        MemNetwork {
            state: Arc::new(Mutex::new(NetState {
                nodes: BTreeMap::new(),
                cut: BTreeSet::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, NetState<Peer, V>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A transport that sends as `id`.
    pub fn transport(&self, id: Peer) -> MemTransport<Peer, V> {
        MemTransport {
            id,
            net: self.clone(),
        }
    }

    /// Routes requests addressed to `id` to `handler`, replacing any
    /// previous registration.
    pub fn register(&self, id: Peer, handler: Weak<dyn Handler<Peer, V>>) {
        self.lock().nodes.insert(id, handler);
    }

    /// Cuts every link between `side_a` and `side_b`, in both directions.
    pub fn partition(&self, side_a: &[Peer], side_b: &[Peer]) {
        let mut st = self.lock();
        for a in side_a {
            for b in side_b {
                st.cut.insert((a.clone(), b.clone()));
                st.cut.insert((b.clone(), a.clone()));
            }
        }
    }

    /// Restores every cut link.
    pub fn heal(&self) {
        self.lock().cut.clear();
    }

    fn is_cut(&self, from: &Peer, to: &Peer) -> bool {
        self.lock().cut.contains(&(from.clone(), to.clone()))
    }

    fn route(&self, to: &Peer) -> Option<Arc<dyn Handler<Peer, V>>> {
        self.lock().nodes.get(to).and_then(Weak::upgrade)
    }
}

#[derive(Clone)]
pub struct MemTransport<Peer: Item, V: Item> {
    id: Peer,
    net: MemNetwork<Peer, V>,
}

impl<Peer: Item, V: Item> Transport<Peer, V> for MemTransport<Peer, V> {
    fn node_id(&self) -> Peer {
        self.id.clone()
    }

    fn call(&self, to: Peer, body: Body<Peer, V>) -> BoxFuture<'static, Result<Body<Peer, V>>> {
        let from = self.id.clone();
        let net = self.net.clone();
        async move {
            if net.is_cut(&from, &to) {
                trace!("request {:?} -> {:?} lost", from, to);
                return futures::future::pending().await;
            }
            let handler = net.route(&to).ok_or_else(|| Error::unreachable(&to))?;
            let reply = handler.handle(&from, body)?;
            if net.is_cut(&to, &from) {
                trace!("reply {:?} -> {:?} lost", to, from);
                return futures::future::pending().await;
            }
            Ok(reply)
        }
        .boxed()
    }
}
