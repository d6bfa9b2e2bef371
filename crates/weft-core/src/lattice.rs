//! Join-semilattices
//!
//! Every replicated state in weft is an element of a join-semilattice: `join`
//! is commutative, associative and idempotent, and `bottom` is its identity.
//! Full states and mutator deltas share one type and one `join`.

use std::cmp::Ordering;

pub trait Lattice: Clone + PartialEq {
    /// Identity for `join`.
    fn bottom() -> Self;

    /// Least upper bound of `self` and `other`.
    fn join(&self, other: &Self) -> Self;

    fn join_assign(&mut self, other: &Self) {
        *self = self.join(other);
    }

    /// `self ≤ other`, i.e. `other` already holds everything `self` does.
    fn leq(&self, other: &Self) -> bool {
        self.join(other) == *other
    }

    /// Order induced by `join`; `None` for concurrent states.
    fn partial_cmp_lattice(&self, other: &Self) -> Option<Ordering> {
        match (self.leq(other), other.leq(self)) {
            (true, true) => Some(Ordering::Equal),
            (true, false) => Some(Ordering::Less),
            (false, true) => Some(Ordering::Greater),
            (false, false) => None,
        }
    }
}
