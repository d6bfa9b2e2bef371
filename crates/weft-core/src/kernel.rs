//! Dot kernel: a causally tracked map from dot to payload.
//!
//! The kernel is the merge substrate for observed-remove and
//! max-wins-per-actor types. Removal is represented by absence: a dot that
//! is covered by a kernel's causal context but has no entry has been seen and
//! removed, and a join never brings it back.
//!
//! Invariant: every live entry's dot is covered by the kernel's own context.

use crate::context::CausalContext;
use crate::dot::{ActorId, Dot};
use crate::error::{CrdtError, Result};
use crate::lattice::Lattice;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(serialize = "V: Serialize", deserialize = "V: Deserialize<'de>"))]
pub struct DotKernel<V> {
    /// Live contributions
    #[serde(with = "crate::wire::pairs")]
    entries: BTreeMap<Dot, V>,
    /// Every dot ever observed, live or removed
    context: CausalContext,
}

impl<V: Clone + PartialEq> DotKernel<V> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            context: CausalContext::new(),
        }
    }

    /// Stamp a fresh contribution for `actor`.
    ///
    /// Returns a singleton delta holding the next unused dot of `actor`
    /// (one past the highest counter this kernel has observed) mapped to
    /// `value`. `self` is not modified.
    pub fn add(&self, actor: &ActorId, value: V) -> Self {
        let dot = self.context.next_dot(actor);
        let mut entries = BTreeMap::new();
        entries.insert(dot.clone(), value);
        Self {
            entries,
            context: CausalContext::from_dot(dot),
        }
    }

    /// Delta retracting a live dot: the dot is covered by the delta's context
    /// but carries no payload.
    pub fn remove_dot(&self, dot: &Dot) -> Result<Self> {
        if !self.entries.contains_key(dot) {
            return Err(CrdtError::UnknownDot(dot.clone()));
        }
        Ok(Self::retraction(dot.clone()))
    }

    pub(crate) fn retraction(dot: Dot) -> Self {
        Self {
            entries: BTreeMap::new(),
            context: CausalContext::from_dot(dot),
        }
    }

    pub fn get(&self, dot: &Dot) -> Option<&V> {
        self.entries.get(dot)
    }

    /// Live `(dot, value)` pairs in dot order.
    pub fn iter(&self) -> impl Iterator<Item = (&Dot, &V)> {
        self.entries.iter()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.values()
    }

    /// Live entries contributed by `actor`.
    pub fn dots_of<'a>(&'a self, actor: &'a ActorId) -> impl Iterator<Item = (&'a Dot, &'a V)> + 'a {
        self.entries.iter().filter(move |(dot, _)| dot.is_from(actor))
    }

    pub fn context(&self) -> &CausalContext {
        &self.context
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: Clone + PartialEq> Default for DotKernel<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + PartialEq> Lattice for DotKernel<V> {
    fn bottom() -> Self {
        Self::new()
    }

    /// Causal merge.
    ///
    /// A dot held by both sides survives. A dot held by one side survives only
    /// if the other side has never observed it; if the other side's context
    /// covers it, it was removed there.
    fn join(&self, other: &Self) -> Self {
        let mut entries = BTreeMap::new();

        for (dot, value) in &self.entries {
            if other.entries.contains_key(dot) || !other.context.contains(dot) {
                entries.insert(dot.clone(), value.clone());
            }
        }

        for (dot, value) in &other.entries {
            if !self.entries.contains_key(dot) && !self.context.contains(dot) {
                entries.insert(dot.clone(), value.clone());
            }
        }

        Self {
            entries,
            context: self.context.union(&other.context),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(id: &str) -> ActorId {
        ActorId::new(id)
    }

    #[test]
    fn test_add_allocates_next_counter() {
        let kernel: DotKernel<&str> = DotKernel::new();
        let first = kernel.add(&actor("a"), "x");
        assert_eq!(first.iter().next(), Some((&Dot::new("a", 1), &"x")));

        let state = kernel.join(&first);
        let second = state.add(&actor("a"), "y");
        assert_eq!(second.iter().next(), Some((&Dot::new("a", 2), &"y")));
        assert_eq!(second.len(), 1);

        // add never mutates its input
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_removed_dot_does_not_reappear() {
        let state = DotKernel::new().add(&actor("a"), 10);
        let dot = Dot::new("a", 1);

        let removal = state.remove_dot(&dot).unwrap();
        let after = state.join(&removal);
        assert!(after.is_empty());
        assert!(after.context().contains(&dot));

        // A stale copy still carrying the dot cannot resurrect it
        assert!(after.join(&state).is_empty());
        assert!(state.join(&after).is_empty());
    }

    #[test]
    fn test_concurrent_adds_both_survive() {
        let base: DotKernel<i64> = DotKernel::new();
        let a = base.add(&actor("a"), 1);
        let b = base.add(&actor("b"), 2);

        let merged = a.join(&b);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged, b.join(&a));
    }

    #[test]
    fn test_remove_unknown_dot_fails() {
        let state: DotKernel<i64> = DotKernel::new();
        let err = state.remove_dot(&Dot::new("a", 1)).unwrap_err();
        assert_eq!(err, CrdtError::UnknownDot(Dot::new("a", 1)));
        assert!(err.is_out_of_bounds());
    }

    #[test]
    fn test_dots_of_filters_by_actor() {
        let state = DotKernel::new().add(&actor("a"), 1);
        let state = state.join(&state.add(&actor("b"), 2));
        let state = state.join(&state.add(&actor("a"), 3));

        let a = actor("a");
        let own: Vec<_> = state.dots_of(&a).map(|(_, v)| *v).collect();
        assert_eq!(own, vec![1, 3]);
    }

    #[test]
    fn test_join_is_idempotent_and_bottom_is_identity() {
        let state = DotKernel::new().add(&actor("a"), 5);
        assert_eq!(state.join(&state), state);
        assert_eq!(DotKernel::bottom().join(&state), state);
        assert_eq!(state.join(&DotKernel::bottom()), state);
    }

    #[test]
    fn test_kernel_serialization() {
        let state = DotKernel::new().add(&actor("a"), 5i64);
        let json = serde_json::to_string(&state).unwrap();
        let back: DotKernel<i64> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
