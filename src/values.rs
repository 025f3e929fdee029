// Copyright 2020 Graydon Hoare <graydon@pobox.com>
// Licensed under the MIT and Apache-2.0 licenses.

//! `ValueSet` is the one lattice everything in this crate is built on: a set
//! of opaque broadcast values ordered by inclusion, joined by union. It is
//! backed by a persistent `im::OrdSet`, so taking a snapshot under a lock and
//! handing it to a network task is a refcount bump, not a copy.
//!
//! The values are parameterized by any `Item`, but in practice they're small
//! integers or strings. Nothing about them is interpreted beyond equality and
//! the (arbitrary) order the set needs to store them.
use crate::Item;
use im::OrdSet as ArcOrdSet;
use itertools::Itertools;
use pergola::{ArcOrdSetWithUnion, LatticeElt};

pub type ValueLD<V> = ArcOrdSetWithUnion<V>;
pub type ValueSet<V> = LatticeElt<ValueLD<V>>;

// Helper methods on the ValueSet lattice elements.
pub trait ValueSetExt<V: Item>: Sized {
    fn from_values<I: IntoIterator<Item = V>>(vals: I) -> Self;
    fn values(&self) -> &ArcOrdSet<V>;
    /// Everything in `self` that is not in `other`. Not a lattice operation:
    /// the result is not generally above or below either argument.
    fn minus(&self, other: &Self) -> Self;
    fn to_vec(&self) -> Vec<V>;
}

impl<V: Item> ValueSetExt<V> for ValueSet<V> {
    fn from_values<I: IntoIterator<Item = V>>(vals: I) -> Self {
        ValueSet::new_from(vals.into_iter().collect())
    }
    fn values(&self) -> &ArcOrdSet<V> {
        &self.value
    }
    fn minus(&self, other: &Self) -> Self {
        ValueSet::new_from(self.value.clone().relative_complement(other.value.clone()))
    }
    fn to_vec(&self) -> Vec<V> {
        self.value.iter().cloned().collect_vec()
    }
}

/// The set of values this node knows about.
///
/// There is no way to remove anything: a value, once present,
/// stays present for the lifetime of the store. Every mutation is a join.
#[derive(Clone, Debug, Default, Hash, PartialEq)]
pub struct ValueStore<V: Item> {
    set: ValueSet<V>,
}

impl<V: Item> ValueStore<V> {
    pub fn new() -> Self {
        ValueStore {
            set: ValueSet::default(),
        }
    }

    /// Adds a single value, returning true if it was not already present.
    pub fn add(&mut self, v: V) -> bool {
        self.set.value.insert(v).is_none()
    }

    /// Joins `delta` into the store, returning the number of values that
    /// were newly learned.
    pub fn merge(&mut self, delta: &ValueSet<V>) -> usize {
        let before = self.len();
        self.set = &self.set + delta;
        self.len() - before
    }

    pub fn snapshot(&self) -> ValueSet<V> {
        self.set.clone()
    }

    pub fn contains(&self, v: &V) -> bool {
        self.set.value.contains(v)
    }

    pub fn len(&self) -> usize {
        self.set.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.value.is_empty()
    }
}
