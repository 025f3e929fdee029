// Copyright 2020 Graydon Hoare <graydon@pobox.com>
// Licensed under the MIT and Apache-2.0 licenses.

/*!
 * This crate implements a small anti-entropy broadcast protocol: every node in
 * a message-passing cluster ends up knowing every value broadcast anywhere in
 * the cluster, given only direct links to a few neighbors and a network that
 * drops, duplicates, reorders and partitions messages.
 *
 * The state each node keeps is deliberately simple:
 *
 *   - A grow-only set of values it knows about (its `ValueStore`). This is a
 *     join-semilattice under set union, so merging is idempotent, commutative
 *     and associative and any interleaving of merges converges.
 *
 *   - For each neighbor, a conservative under-approximation of that neighbor's
 *     set (the `BeliefTable`). A value only enters a neighbor's belief entry
 *     when that neighbor has sent it to us, or has acknowledged receiving it
 *     from us. Under-approximation costs a redundant resend; over-approximation
 *     would lose a value forever, so it never happens.
 *
 * Periodically each node pushes, to each neighbor, the difference between its
 * own set and what it believes the neighbor holds. The neighbor merges the
 * push, and replies with the difference in the other direction, so every
 * exchange moves values both ways. Lost pushes and lost replies need no retry
 * bookkeeping: the unacknowledged values stay in the difference and go out
 * again on the next tick.
 *
 * The protocol itself lives in `Replica`, an explicit state machine with no
 * I/O, which can be cloned, inspected and stepped by a simulator. `Node` wraps
 * a `Replica` in a lock, dispatches inbound requests to it, and runs the
 * periodic reconciliation task on tokio against an injected `Transport`.
 *
 * ## Reference
 *
 * Alan Demers, Dan Greene, Carl Hauser, Wes Irish, John Larson, Scott Shenker,
 * Howard Sturgis, Dan Swinehart, Doug Terry. Epidemic Algorithms for
 * Replicated Database Maintenance. PODC 1987.
 *
 * ## Name
 *
 * Gossamer is the fine web spiders spin and the wind carries between trees;
 * the strands are thin, but they get everywhere.
 */

mod belief;
mod config;
mod error;
pub mod mem_transport;
mod message;
mod node;
mod reconcile;
mod replica;
mod topology;
mod transport;
mod values;

pub use belief::BeliefTable;
pub use config::{Config, UnknownSenders};
pub use error::{Error, Result};
pub use message::Body;
pub use node::Node;
pub use replica::{Push, Replica};
pub use topology::{Topology, TopologyAssignment};
pub use transport::{DynTransport, Handler, Transport};
pub use values::{ValueLD, ValueSet, ValueSetExt, ValueStore};

use std::fmt::Debug;
use std::hash::Hash;

/// Bounds shared by peer identifiers and broadcast values. Anything small,
/// ordered and cheaply cloneable works: integers, strings, UUIDs.
pub trait Item: Clone + Debug + Default + Hash + Ord + Send + Sync + 'static {}

impl<T: Clone + Debug + Default + Hash + Ord + Send + Sync + 'static> Item for T {}

#[cfg(test)]
mod tests;


#[cfg(test)]
pub(crate) fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
