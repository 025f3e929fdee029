// Copyright 2020 Graydon Hoare <graydon@pobox.com>
// Licensed under the MIT and Apache-2.0 licenses.

use std::fmt::Debug;
use std::sync::Arc;

/// Nothing in here is fatal. Errors on the reconciliation side are logged and
/// absorbed by the next tick; errors on the request side go back to whoever
/// sent the request.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// A request or reply that does not have the expected shape.
    #[error("Malformed message - {ctx}")]
    Malformed { ctx: Arc<str> },

    /// Gossip from a peer we were never configured with, when such peers are
    /// being rejected.
    #[error("Gossip from unconfigured peer {peer}")]
    UnknownSender { peer: Arc<str> },

    /// The transport has no route to the peer.
    #[error("Peer {peer} is unreachable")]
    Unreachable { peer: Arc<str> },

    /// No reply from the peer within the RPC timeout.
    #[error("Timed out waiting for peer {peer}")]
    Timeout { peer: Arc<str> },

    #[error("Invalid config - {ctx}")]
    Config { ctx: Arc<str> },
}

impl Error {
    pub fn malformed(ctx: impl Into<Arc<str>>) -> Self {
        Self::Malformed { ctx: ctx.into() }
    }

    pub fn unknown_sender(peer: &impl Debug) -> Self {
        Self::UnknownSender {
            peer: format!("{:?}", peer).into(),
        }
    }

    pub fn unreachable(peer: &impl Debug) -> Self {
        Self::Unreachable {
            peer: format!("{:?}", peer).into(),
        }
    }

    pub fn timeout(peer: &impl Debug) -> Self {
        Self::Timeout {
            peer: format!("{:?}", peer).into(),
        }
    }

    pub fn config(ctx: impl Into<Arc<str>>) -> Self {
        Self::Config { ctx: ctx.into() }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
