// Copyright 2020 Graydon Hoare <graydon@pobox.com>
// Licensed under the MIT and Apache-2.0 licenses.

use crate::{Item, ValueSet, ValueSetExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Message bodies exchanged with clients and with peers. Requests and their
/// replies are distinct variants; correlating one with the other, and
/// addressing them, is the transport's business.
///
/// Value lists are unordered and may arrive with duplicates; receivers treat
/// them as sets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Body<Peer: Ord, V> {
    Broadcast { message: V },
    BroadcastOk,
    Read,
    ReadOk { messages: Vec<V> },
    Topology { topology: BTreeMap<Peer, Vec<Peer>> },
    TopologyOk,
    /// A push of values the sender believes we lack.
    Gossip { messages: Vec<V> },
    /// The reply to a push: values the replier believes the pusher lacks.
    GossipOk { messages: Vec<V> },
}

impl<Peer: Ord, V> Body<Peer, V> {
    /// The wire name of this body's type.
    pub fn kind(&self) -> &'static str {
        match self {
            Body::Broadcast { .. } => "broadcast",
            Body::BroadcastOk => "broadcast_ok",
            Body::Read => "read",
            Body::ReadOk { .. } => "read_ok",
            Body::Topology { .. } => "topology",
            Body::TopologyOk => "topology_ok",
            Body::Gossip { .. } => "gossip",
            Body::GossipOk { .. } => "gossip_ok",
        }
    }
}

impl<Peer: Ord, V: Item> Body<Peer, V> {
    pub fn gossip(delta: &ValueSet<V>) -> Self {
        Body::Gossip {
            messages: delta.to_vec(),
        }
    }

    pub fn gossip_ok(delta: &ValueSet<V>) -> Self {
        Body::GossipOk {
            messages: delta.to_vec(),
        }
    }
}
