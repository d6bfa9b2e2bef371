//! Causal context: the set of dots a replica has observed.
//!
//! Kept in compact form: a version vector holding, per actor, the highest
//! counter `n` such that dots `1..=n` have all been seen, plus a "dot cloud"
//! of observed dots that are not contiguous with that prefix. After every
//! mutation the context is compacted, so two contexts covering the same dots
//! are structurally equal.

use crate::dot::{ActorId, Dot};
use crate::lattice::Lattice;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CausalContext {
    /// Contiguous prefix per actor
    clock: BTreeMap<ActorId, u64>,
    /// Observed dots beyond the contiguous prefix
    cloud: BTreeSet<Dot>,
}

impl CausalContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context covering exactly one dot.
    pub fn from_dot(dot: Dot) -> Self {
        let mut context = Self::new();
        context.insert(dot);
        context
    }

    /// Has this dot been observed?
    pub fn contains(&self, dot: &Dot) -> bool {
        self.clock.get(&dot.actor).is_some_and(|&n| dot.counter <= n) || self.cloud.contains(dot)
    }

    /// Highest counter observed for `actor`, 0 if none.
    pub fn max_counter(&self, actor: &ActorId) -> u64 {
        let prefix = self.clock.get(actor).copied().unwrap_or(0);
        let cloud = self
            .cloud
            .range(Dot::new(actor.clone(), 0)..=Dot::new(actor.clone(), u64::MAX))
            .next_back()
            .map_or(0, |dot| dot.counter);
        prefix.max(cloud)
    }

    /// The next unused dot for `actor`. Does not record it.
    pub fn next_dot(&self, actor: &ActorId) -> Dot {
        Dot::new(actor.clone(), self.max_counter(actor) + 1)
    }

    /// Record a dot as observed.
    pub fn insert(&mut self, dot: Dot) {
        if !self.contains(&dot) {
            self.cloud.insert(dot);
            self.compact();
        }
    }

    pub fn union(&self, other: &Self) -> Self {
        let mut clock = self.clock.clone();
        for (actor, &n) in &other.clock {
            clock
                .entry(actor.clone())
                .and_modify(|e| *e = (*e).max(n))
                .or_insert(n);
        }

        let mut result = Self {
            clock,
            cloud: self.cloud.union(&other.cloud).cloned().collect(),
        };
        result.compact();
        result
    }

    pub fn is_empty(&self) -> bool {
        self.clock.is_empty() && self.cloud.is_empty()
    }

    /// The contiguous prefix per actor.
    pub fn clock(&self) -> impl Iterator<Item = (&ActorId, u64)> {
        self.clock.iter().map(|(actor, &n)| (actor, n))
    }

    /// Fold cloud dots that extend the contiguous prefix into it.
    ///
    /// The cloud iterates in (actor, counter) order, so one pass absorbs any
    /// run of consecutive counters.
    fn compact(&mut self) {
        let clock = &mut self.clock;
        self.cloud.retain(|dot| {
            let seen = clock.entry(dot.actor.clone()).or_insert(0);
            if dot.counter <= *seen {
                false
            } else if dot.counter == *seen + 1 {
                *seen += 1;
                false
            } else {
                true
            }
        });
        clock.retain(|_, n| *n > 0);
    }
}

impl Lattice for CausalContext {
    fn bottom() -> Self {
        Self::new()
    }

    fn join(&self, other: &Self) -> Self {
        self.union(other)
    }
}
