//! Commutative counter (CCounter)
//!
//! Each actor owns one live entry in a dot kernel holding its cumulative
//! contribution. A local increment or decrement retracts the actor's previous
//! entry and stamps a new one with the updated magnitude, so an actor never
//! forks into several live entries and concurrent updates from different
//! actors simply add up.

use crate::crdt::Crdt;
use crate::dot::ActorId;
use crate::error::Result;
use crate::kernel::DotKernel;
use crate::lattice::Lattice;
use serde::{Deserialize, Serialize};

fn one() -> u64 {
    1
}

/// Named counter mutators.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum CounterOp {
    Inc {
        #[serde(default = "one")]
        by: u64,
    },
    Dec {
        #[serde(default = "one")]
        by: u64,
    },
}

/// A replica's handle on a commutative counter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CCounter {
    actor: ActorId,
}

impl CCounter {
    pub fn new(actor: impl Into<ActorId>) -> Self {
        Self {
            actor: actor.into(),
        }
    }

    pub fn actor(&self) -> &ActorId {
        &self.actor
    }

    /// Delta adding `by` to this actor's contribution.
    pub fn inc(&self, state: &DotKernel<i64>, by: u64) -> DotKernel<i64> {
        let (mut delta, base) = self.retract_own(state);
        delta.join_assign(&state.add(&self.actor, base.saturating_add(magnitude(by))));
        delta
    }

    /// Delta subtracting `by` from this actor's contribution. The counter has
    /// no floor.
    pub fn dec(&self, state: &DotKernel<i64>, by: u64) -> DotKernel<i64> {
        let (mut delta, base) = self.retract_own(state);
        delta.join_assign(&state.add(&self.actor, base.saturating_sub(magnitude(by))));
        delta
    }

    /// Sum of all live contributions.
    pub fn value(state: &DotKernel<i64>) -> i64 {
        state.values().fold(0i64, |acc, v| acc.saturating_add(*v))
    }

    /// Retract every live entry of the local actor.
    ///
    /// Returns the retraction delta and the base to build on: the largest of
    /// the retracted magnitudes, or 0 when the actor has contributed nothing.
    /// A well-formed state holds at most one entry per actor.
    fn retract_own(&self, state: &DotKernel<i64>) -> (DotKernel<i64>, i64) {
        let mut delta = DotKernel::new();
        let mut base: Option<i64> = None;

        for (dot, value) in state.dots_of(&self.actor) {
            base = Some(base.map_or(*value, |b| b.max(*value)));
            delta.join_assign(&DotKernel::retraction(dot.clone()));
        }

        (delta, base.unwrap_or(0))
    }
}

fn magnitude(by: u64) -> i64 {
    i64::try_from(by).unwrap_or(i64::MAX)
}

impl Crdt for CCounter {
    type State = DotKernel<i64>;
    type Value = i64;
    type Op = CounterOp;

    fn value_of(&self, state: &Self::State) -> i64 {
        Self::value(state)
    }

    fn mutate(&mut self, state: &Self::State, op: CounterOp) -> Result<Self::State> {
        Ok(match op {
            CounterOp::Inc { by } => self.inc(state, by),
            CounterOp::Dec { by } => self.dec(state, by),
        })
    }
}
