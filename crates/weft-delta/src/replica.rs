//! A replica driving one CRDT through delta-state anti-entropy.
//!
//! ```text
//! On apply(op):
//!   d = mutate(X, op)?     // compute delta, X untouched
//!   X = X ⊔ d
//!   D.push(d)
//!
//! On receive(i, deltas):
//!   for d in deltas with seq = received[i] + 1, ...:
//!     X = X ⊔ d
//!     D.push(d) if it changed X   // forwarding
//!   ack(received[i]) to i
//! ```
//!
//! Every state change goes through the buffer in the order it happened, so
//! any prefix of a replica's stream joins to a state it actually held. That
//! keeps RGA anchors ahead of the vertices hanging off them for every peer.

use crate::buffer::{AckTracker, DeltaBuffer, ReplicaId, SeqNo, SyncPayload};
use crate::config::ReplicaConfig;
use crate::error::{DeltaError, Result};
use std::collections::BTreeMap;
use weft_core::{Crdt, Lattice};

pub struct Replica<C: Crdt> {
    id: ReplicaId,
    crdt: C,
    state: C::State,
    buffer: DeltaBuffer<C::State>,
    acks: AckTracker,
    /// Highest contiguous sequence number applied, per sender
    received: BTreeMap<ReplicaId, SeqNo>,
    config: ReplicaConfig,
}

impl<C: Crdt> Replica<C> {
    pub fn new(id: impl Into<ReplicaId>, crdt: C) -> Self {
        Self::with_config(id, crdt, ReplicaConfig::default())
    }

    pub fn with_config(id: impl Into<ReplicaId>, crdt: C, config: ReplicaConfig) -> Self {
        let state = crdt.initial();
        Self {
            id: id.into(),
            crdt,
            state,
            buffer: DeltaBuffer::new(config.buffer_size),
            acks: AckTracker::new(),
            received: BTreeMap::new(),
            config,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn crdt(&self) -> &C {
        &self.crdt
    }

    pub fn state(&self) -> &C::State {
        &self.state
    }

    pub fn value(&self) -> C::Value {
        self.crdt.value_of(&self.state)
    }

    pub fn buffer(&self) -> &DeltaBuffer<C::State> {
        &self.buffer
    }

    pub fn config(&self) -> &ReplicaConfig {
        &self.config
    }

    pub fn current_seq(&self) -> SeqNo {
        self.buffer.current_seq()
    }

    /// Highest sequence number applied from `peer`'s stream.
    pub fn received_from(&self, peer: &str) -> SeqNo {
        self.received.get(peer).copied().unwrap_or(0)
    }

    pub fn register_peer(&mut self, peer_id: impl Into<ReplicaId>) {
        self.acks.register_peer(peer_id);
    }

    /// Run a mutator: compute its delta, fold it in and buffer it.
    pub fn apply(&mut self, op: C::Op) -> Result<C::State> {
        let delta = self.crdt.mutate(&self.state, op)?;
        self.state.join_assign(&delta);
        let seq = self.buffer.push(delta.clone());
        tracing::trace!(replica = %self.id, seq, "applied local delta");
        Ok(delta)
    }

    /// Has `peer` yet to acknowledge part of this replica's stream?
    pub fn has_pending(&self, peer: &str) -> bool {
        self.acks.get_ack(peer) < self.buffer.current_seq()
    }

    /// What to send to `peer`, or `None` when it has acknowledged everything.
    pub fn prepare_sync(&self, peer: &str) -> Option<SyncPayload<C::State>> {
        if !self.has_pending(peer) {
            return None;
        }
        let acked = self.acks.get_ack(peer);

        if self.buffer.covers(acked) {
            Some(SyncPayload::Deltas {
                deltas: self.buffer.deltas_since(acked),
            })
        } else {
            tracing::debug!(
                replica = %self.id,
                peer,
                acked,
                truncated = self.buffer.truncated(),
                "peer is behind the delta buffer, sending full state"
            );
            Some(SyncPayload::Full {
                state: self.state.clone(),
                seq: self.buffer.current_seq(),
            })
        }
    }

    /// Apply a payload from `from`. Returns the sequence number to
    /// acknowledge back to the sender.
    ///
    /// Deltas already applied are skipped. A payload that starts past the
    /// next expected sequence number is rejected whole.
    pub fn receive(&mut self, from: &str, payload: SyncPayload<C::State>) -> Result<SeqNo> {
        let cursor = self.received_from(from);

        match payload {
            SyncPayload::Deltas { deltas } => {
                let mut expected = cursor + 1;
                for td in deltas.iter().filter(|td| td.seq > cursor) {
                    if td.seq != expected {
                        tracing::debug!(replica = %self.id, from, expected, got = td.seq, "gap in delta stream");
                        return Err(DeltaError::Gap {
                            from: from.to_string(),
                            expected,
                            got: td.seq,
                        });
                    }
                    expected += 1;
                }

                for td in deltas.into_iter().filter(|td| td.seq > cursor) {
                    tracing::trace!(replica = %self.id, from, seq = td.seq, "applying remote delta");
                    self.absorb(td.delta);
                    self.received.insert(from.to_string(), td.seq);
                }
            }
            SyncPayload::Full { state, seq } => {
                self.absorb(state);
                if seq > cursor {
                    self.received.insert(from.to_string(), seq);
                }
            }
        }

        Ok(self.received_from(from))
    }

    /// Join remote state in, buffering it for forwarding if it added anything.
    fn absorb(&mut self, delta: C::State) {
        let next = self.state.join(&delta);
        if next == self.state {
            return;
        }
        self.state = next;
        if self.config.forward_remote_deltas {
            self.buffer.push(delta);
        }
    }

    /// Record an ack from a peer and drop deltas every peer has seen.
    pub fn process_ack(&mut self, peer: &str, seq: SeqNo) {
        self.acks.update_ack(peer, seq);
        let min_acked = self.acks.min_acked();
        self.buffer.ack(min_acked);
    }

    /// Exchange full states directly (testing and simulation).
    pub fn sync_with(&mut self, other: &mut Replica<C>) {
        let mine = self.state.clone();
        let theirs = other.state.clone();

        self.absorb(theirs);
        other.absorb(mine);
    }
}

impl<C> std::fmt::Debug for Replica<C>
where
    C: Crdt + std::fmt::Debug,
    C::State: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Replica")
            .field("id", &self.id)
            .field("crdt", &self.crdt)
            .field("state", &self.state)
            .field("current_seq", &self.buffer.current_seq())
            .field("received", &self.received)
            .finish()
    }
}
