//! Vertex identifiers for the RGA and the generators that produce them.
//!
//! Identifiers are ordered by Lamport clock first and actor second. A
//! generator is always asked for an identifier greater than everything in the
//! state it is mutating, so a vertex sorts after the vertex it was inserted
//! next to, and two actors can never produce the same identifier.

use crate::dot::ActorId;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VertexId {
    pub clock: u64,
    pub actor: ActorId,
}

impl VertexId {
    pub fn new(clock: u64, actor: impl Into<ActorId>) -> Self {
        Self {
            clock,
            actor: actor.into(),
        }
    }

    /// The sentinel "before the first element". Sorts before every
    /// generated identifier.
    pub fn root() -> Self {
        Self {
            clock: 0,
            actor: ActorId::default(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.clock == 0 && self.actor.as_str().is_empty()
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            f.write_str("root")
        } else {
            write!(f, "{}@{}", self.clock, self.actor)
        }
    }
}

/// Source of fresh vertex identifiers, injected into RGA mutators.
///
/// `seen` is the greatest identifier in the state being mutated; the
/// returned identifier must be strictly greater and must not be produced by
/// any other replica.
pub trait IdGenerator {
    fn next_id(&mut self, seen: Option<&VertexId>) -> VertexId;
}

/// Closures work as generators, which lets tests pin an exact sequence.
impl<F> IdGenerator for F
where
    F: FnMut(Option<&VertexId>) -> VertexId,
{
    fn next_id(&mut self, seen: Option<&VertexId>) -> VertexId {
        self(seen)
    }
}

/// Per-actor Lamport clock.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LamportIds {
    actor: ActorId,
    clock: u64,
}

impl LamportIds {
    pub fn new(actor: impl Into<ActorId>) -> Self {
        Self {
            actor: actor.into(),
            clock: 0,
        }
    }

    pub fn actor(&self) -> &ActorId {
        &self.actor
    }

    /// Last clock value handed out.
    pub fn clock(&self) -> u64 {
        self.clock
    }
}

impl IdGenerator for LamportIds {
    fn next_id(&mut self, seen: Option<&VertexId>) -> VertexId {
        let floor = seen.map_or(0, |id| id.clock);
        self.clock = self.clock.max(floor) + 1;
        VertexId::new(self.clock, self.actor.clone())
    }
}
