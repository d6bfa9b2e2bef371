//! # weft-core
//!
//! Join-semilattice CRDTs built from pure functions over immutable state.
//!
//! - [`lattice`]: the `Lattice` trait every state implements
//! - [`crdt`]: the `Crdt` contract (initial, join, value_of, named mutators)
//! - [`dot`], [`context`], [`kernel`]: causal dots, causal contexts and the
//!   dot kernel used for per-actor provenance
//! - [`ccounter`]: commutative counter on top of the dot kernel
//! - [`rga`], [`id`]: replicated growable array and its vertex identifiers
//!
//! ```rust
//! use weft_core::{CCounter, CounterOp, Crdt, Lattice};
//!
//! let mut counter = CCounter::new("replica-1");
//! let mut state = counter.initial();
//!
//! let delta = counter.mutate(&state, CounterOp::Inc { by: 2 }).unwrap();
//! state.join_assign(&delta);
//! assert_eq!(counter.value_of(&state), 2);
//! ```

pub mod ccounter;
pub mod context;
pub mod crdt;
pub mod dot;
pub mod error;
pub mod id;
pub mod kernel;
pub mod lattice;
pub mod rga;
mod wire;

pub use ccounter::{CCounter, CounterOp};
pub use context::CausalContext;
pub use crdt::Crdt;
pub use dot::{ActorId, Dot};
pub use error::{CrdtError, Result};
pub use id::{IdGenerator, LamportIds, VertexId};
pub use kernel::DotKernel;
pub use lattice::Lattice;
pub use rga::{Rga, RgaOp, RgaState};
