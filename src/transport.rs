// Copyright 2020 Graydon Hoare <graydon@pobox.com>
// Licensed under the MIT and Apache-2.0 licenses.

//! The seams between a `Node` and whatever carries its messages.
//!
//! Outbound, a node only needs to know its own identity and how to make a
//! request that may, eventually, produce a reply. Inbound, the transport hands
//! each request to a `Handler` and sends back whatever it returns.

use crate::{Body, Item, Result};
use futures::future::BoxFuture;
use std::sync::Arc;

pub trait Handler<Peer: Item, V: Item>: Send + Sync {
    /// Handles one request from `from`. The returned body, or error, is the
    /// reply.
    fn handle(&self, from: &Peer, body: Body<Peer, V>) -> Result<Body<Peer, V>>;
}

pub trait Transport<Peer: Item, V: Item>: Send + Sync {
    /// The stable identifier of the local node.
    fn node_id(&self) -> Peer;

    /// Sends `body` to `to` and resolves with its reply.
    ///
    /// The returned future may never resolve if the request or its reply is
    /// lost; callers bound it with a timeout.
    fn call(&self, to: Peer, body: Body<Peer, V>) -> BoxFuture<'static, Result<Body<Peer, V>>>;
}

pub type DynTransport<Peer, V> = Arc<dyn Transport<Peer, V>>;
