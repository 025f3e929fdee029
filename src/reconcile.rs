// Copyright 2020 Graydon Hoare <graydon@pobox.com>
// Licensed under the MIT and Apache-2.0 licenses.

use crate::node::lock;
use crate::{Body, Config, DynTransport, Error, Item, Push, Replica, ValueSet, ValueSetExt};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace, warn};

/// Handle on a running reconciliation task. Dropping it aborts the task.
pub(crate) struct ReconcileTask {
    stop: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ReconcileTask {
    /// Signals the task and waits for it to exit. Pushes already in flight
    /// are left to finish, or not, on their own.
    pub(crate) async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!("reconcile task did not exit cleanly: {}", e);
            }
        }
    }
}

impl Drop for ReconcileTask {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.as_ref() {
            handle.abort();
        }
    }
}

/// Spawns the periodic push loop. Each tick snapshots the pending pushes
/// under the state lock, releases it, and sends each push from its own task.
pub(crate) fn spawn_reconcile_task<Peer: Item, V: Item>(
    config: Arc<Config>,
    state: Arc<Mutex<Replica<Peer, V>>>,
    transport: DynTransport<Peer, V>,
) -> ReconcileTask {
    let id = transport.node_id();
    info!("peer {:?} starting reconcile task", id);

    let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(config.gossip_interval());
        // After a stall, tick once and resume the period from there.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = &mut stop_rx => {
                    info!("peer {:?} stopping reconcile task", id);
                    break;
                }
                _ = ticker.tick() => {}
            }
            let pushes = lock(&state).pending_pushes();
            trace!("peer {:?} tick, {} pushes", id, pushes.len());
            for push in pushes {
                tokio::spawn(push_delta(
                    config.rpc_timeout(),
                    state.clone(),
                    transport.clone(),
                    push,
                ));
            }
        }
    });

    ReconcileTask {
        stop: Some(stop_tx),
        handle: Some(handle),
    }
}

async fn push_delta<Peer: Item, V: Item>(
    rpc_timeout: Duration,
    state: Arc<Mutex<Replica<Peer, V>>>,
    transport: DynTransport<Peer, V>,
    push: Push<Peer, V>,
) {
    let call = transport.call(push.to.clone(), Body::gossip(&push.delta));
    let res = match tokio::time::timeout(rpc_timeout, call).await {
        Ok(res) => res,
        Err(_) => Err(Error::timeout(&push.to)),
    };
    match res {
        Ok(Body::GossipOk { messages }) => {
            let reply = ValueSet::from_values(messages);
            lock(&state).on_push_reply(&push, &reply);
        }
        Ok(other) => {
            warn!("peer {:?} answered gossip with {}", push.to, other.kind());
        }
        Err(e) => {
            // Nothing to undo: the delta is still outstanding and goes out
            // again next tick.
            debug!("push to {:?} abandoned: {}", push.to, e);
        }
    }
}
