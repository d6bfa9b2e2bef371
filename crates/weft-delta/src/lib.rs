//! # weft-delta
//!
//! Delta-state replication for weft CRDTs:
//! - [`buffer`]: sequence-numbered delta buffer, sync payloads, peer acks
//! - [`replica`]: a replica driving one CRDT through local ops and remote payloads
//! - [`config`]: replica configuration
//! - [`anti_entropy`]: a cluster simulator over a lossy, duplicating,
//!   reordering network
//!
//! ## Protocol
//!
//! ```text
//! On local mutation op:
//!   d = mutate(X, op)   // compute delta
//!   X = X ⊔ d           // apply to local state
//!   D.push(d)           // buffer for sending
//!
//! On send to peer j:
//!   send D[acked[j]..] to j (or X when D was truncated past acked[j])
//!
//! On receive deltas from peer i:
//!   X = X ⊔ d for each new d, in order
//!   send ack(seq) to i
//! ```
//!
//! # Example
//!
//! ```rust
//! use weft_core::{CCounter, CounterOp};
//! use weft_delta::Replica;
//!
//! let mut a = Replica::new("a", CCounter::new("a"));
//! let mut b = Replica::new("b", CCounter::new("b"));
//! a.register_peer("b");
//!
//! a.apply(CounterOp::Inc { by: 3 }).unwrap();
//! let payload = a.prepare_sync("b").unwrap();
//! let acked = b.receive("a", payload).unwrap();
//! a.process_ack("b", acked);
//!
//! assert_eq!(b.value(), 3);
//! ```

pub mod anti_entropy;
pub mod buffer;
pub mod config;
pub mod error;
pub mod replica;

pub use anti_entropy::{AntiEntropyCluster, AntiEntropyMessage, NetworkConfig, NetworkSimulator};
pub use buffer::{AckTracker, DeltaBuffer, ReplicaId, SeqNo, SyncPayload, TaggedDelta};
pub use config::{ReplicaConfig, ReplicaConfigBuilder};
pub use error::{DeltaError, Result};
pub use replica::Replica;
