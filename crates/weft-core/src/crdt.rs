//! The uniform contract every replicated data type implements.
//!
//! A `Crdt` value is one replica's handle on a type: it knows who the local
//! actor is and, where needed, how to mint fresh identifiers. The state it
//! works on is plain data owned by the caller:
//!
//! ```text
//! d = crdt.mutate(&X, op)?   // compute delta, X untouched
//! X = crdt.join(&X, &d)      // caller folds it in
//! ```
//!
//! Named mutators are the variants of [`Crdt::Op`]; serialized ops carry the
//! operation name in an `op` field.

use crate::error::Result;
use crate::lattice::Lattice;

pub trait Crdt {
    /// Full and delta state
    type State: Lattice;
    /// What `value_of` projects the state to
    type Value;
    /// The named mutators
    type Op;

    /// Identity element of `join`.
    fn initial(&self) -> Self::State {
        Self::State::bottom()
    }

    /// Commutative, associative, idempotent merge.
    fn join(&self, left: &Self::State, right: &Self::State) -> Self::State {
        left.join(right)
    }

    /// Project the state to its user-facing value. Never mutates.
    fn value_of(&self, state: &Self::State) -> Self::Value;

    /// Run a mutator against the current local state and return the delta it
    /// produces. On error no delta is produced.
    fn mutate(&mut self, state: &Self::State, op: Self::Op) -> Result<Self::State>;
}
