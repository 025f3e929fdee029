// Copyright 2020 Graydon Hoare <graydon@pobox.com>
// Licensed under the MIT and Apache-2.0 licenses.

//! Configuration parameters for a gossiping `Node`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What to do with gossip from a peer that is neither a configured neighbor
/// nor already known from earlier contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UnknownSenders {
    /// Register the sender with an empty belief entry and answer it normally.
    Admit,
    /// Refuse the gossip with `Error::UnknownSender`, leaving state untouched.
    Reject,
}

impl Default for UnknownSenders {
    fn default() -> Self {
        UnknownSenders::Admit
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// The interval in milliseconds between reconciliation ticks.
    ///
    /// Default: 500
    pub gossip_interval_ms: u64,

    /// How long in milliseconds a push waits for its reply before it is
    /// abandoned. An abandoned push is simply resent on a later tick.
    ///
    /// Default: 1000
    pub rpc_timeout_ms: u64,

    /// Default: admit
    pub unknown_senders: UnknownSenders,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gossip_interval_ms: 500,
            rpc_timeout_ms: 1000,
            unknown_senders: UnknownSenders::default(),
        }
    }
}

impl Config {
    pub fn gossip_interval(&self) -> Duration {
        Duration::from_millis(self.gossip_interval_ms)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.gossip_interval_ms == 0 {
            return Err(Error::config("gossipIntervalMs must be non-zero"));
        }
        if self.rpc_timeout_ms == 0 {
            return Err(Error::config("rpcTimeoutMs must be non-zero"));
        }
        Ok(())
    }
}
