// Copyright 2020 Graydon Hoare <graydon@pobox.com>
// Licensed under the MIT and Apache-2.0 licenses.

use crate::reconcile::{spawn_reconcile_task, ReconcileTask};
use crate::{
    Body, Config, DynTransport, Error, Handler, Item, Replica, Result, TopologyAssignment,
    ValueSet, ValueSetExt,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{info, warn};

// Every mutation under these locks is a join or an insert; state behind a
// poisoned lock is still consistent.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A `Node` runs one `Replica` against a real transport: it answers client
/// and peer requests as a `Handler`, and owns the background task that
/// periodically pushes outstanding values to each neighbor.
///
/// The replica sits behind a single lock. Request handling holds it only for
/// the duration of a synchronous transition; the reconciliation task takes
/// it to snapshot pending pushes and again to apply each reply, and never
/// holds it across network I/O.
pub struct Node<Peer: Item, V: Item> {
    config: Arc<Config>,
    state: Arc<Mutex<Replica<Peer, V>>>,
    transport: DynTransport<Peer, V>,
    reconciler: Mutex<Option<ReconcileTask>>,
}

impl<Peer: Item, V: Item> Node<Peer, V> {
    pub fn new(config: Config, transport: DynTransport<Peer, V>) -> Result<Arc<Self>> {
        config.validate()?;
        let id = transport.node_id();
        info!("peer {:?} created with {:?}", id, config);
        Ok(Arc::new(Node {
            state: Arc::new(Mutex::new(Replica::new(id, config.unknown_senders))),
            config: Arc::new(config),
            transport,
            reconciler: Mutex::new(None),
        }))
    }

    pub fn id(&self) -> Peer {
        self.transport.node_id()
    }

    pub fn broadcast(&self, v: V) -> bool {
        lock(&self.state).broadcast(v)
    }

    pub fn read(&self) -> Vec<V> {
        lock(&self.state).read()
    }

    pub fn configure_topology(&self, assignment: &TopologyAssignment<Peer>) -> Vec<Peer> {
        lock(&self.state).configure(assignment)
    }

    pub fn neighbors(&self) -> Vec<Peer> {
        lock(&self.state).neighbors().to_vec()
    }

    /// A copy of the replica's current state, for inspection.
    pub fn replica(&self) -> Replica<Peer, V> {
        lock(&self.state).clone()
    }

    /// Starts the reconciliation task. Must be called from within a tokio
    /// runtime. Starting a running node does nothing.
    pub fn start(&self) {
        let mut task = lock(&self.reconciler);
        if task.is_some() {
            info!("peer {:?} already running", self.transport.node_id());
            return;
        }
        *task = Some(spawn_reconcile_task(
            self.config.clone(),
            self.state.clone(),
            self.transport.clone(),
        ));
    }

    /// Stops the reconciliation task, returning once it has exited.
    pub async fn stop(&self) {
        let task = lock(&self.reconciler).take();
        if let Some(task) = task {
            task.stop().await;
        }
    }

    pub fn is_running(&self) -> bool {
        lock(&self.reconciler).is_some()
    }
}

impl<Peer: Item, V: Item> Handler<Peer, V> for Node<Peer, V> {
    fn handle(&self, from: &Peer, body: Body<Peer, V>) -> Result<Body<Peer, V>> {
        match body {
            Body::Broadcast { message } => {
                self.broadcast(message);
                Ok(Body::BroadcastOk)
            }
            Body::Read => Ok(Body::ReadOk {
                messages: self.read(),
            }),
            Body::Topology { topology } => {
                self.configure_topology(&topology);
                Ok(Body::TopologyOk)
            }
            Body::Gossip { messages } => {
                let delta = ValueSet::from_values(messages);
                let reply = lock(&self.state).on_gossip(from, &delta)?;
                Ok(Body::gossip_ok(&reply))
            }
            other => {
                warn!("unexpected {} request from {:?}", other.kind(), from);
                Err(Error::malformed(format!(
                    "unexpected {} request",
                    other.kind()
                )))
            }
        }
    }
}
