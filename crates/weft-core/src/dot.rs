//! Actors and causal dots.
//!
//! A dot `(actor, counter)` names exactly one contribution. Dots of the same
//! actor are ordered by counter; dots of different actors are only related
//! through a [`CausalContext`](crate::context::CausalContext).

use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Opaque, totally ordered replica identity.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(String);

impl ActorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A fresh identifier that will not collide with other replicas.
    pub fn generate() -> Self {
        Self(Ulid::new().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActorId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ActorId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A single causal event: the `counter`-th contribution of `actor`.
///
/// Counters start at 1.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Dot {
    pub actor: ActorId,
    pub counter: u64,
}

impl Dot {
    pub fn new(actor: impl Into<ActorId>, counter: u64) -> Self {
        Self {
            actor: actor.into(),
            counter,
        }
    }

    /// Decompose into `(actor, counter)`.
    pub fn parts(&self) -> (&ActorId, u64) {
        (&self.actor, self.counter)
    }

    pub fn is_from(&self, actor: &ActorId) -> bool {
        &self.actor == actor
    }
}

impl fmt::Display for Dot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.actor, self.counter)
    }
}
