//! Outgoing delta buffer and peer acknowledgments
//!
//! The buffer keeps every delta a replica has folded into its state, tagged
//! with a sequence number, until all peers have acknowledged it:
//!
//! ```text
//! On local or forwarded delta d:
//!   D.push(d)              // seq = seq + 1
//!
//! On send to peer j:
//!   send D[acked[j]..] to j, or X itself if D no longer reaches back that far
//!
//! On ack(seq) from peer j:
//!   acked[j] = max(acked[j], seq)
//!   drop D[..min(acked)]
//! ```
//!
//! Deltas are never joined together inside the buffer. An RGA delta is only
//! placeable once its anchor is known, so the receiver must see them one by
//! one in the order they were produced.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// Sequence number of a buffered delta, starting at 1
pub type SeqNo = u64;

/// Replica identifier
pub type ReplicaId = String;

/// A delta tagged with its position in the sender's stream
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaggedDelta<D> {
    pub seq: SeqNo,
    pub delta: D,
}

/// What a replica sends to one peer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
#[serde(bound(serialize = "D: Serialize", deserialize = "D: Deserialize<'de>"))]
pub enum SyncPayload<D> {
    /// Consecutive deltas the peer has not acknowledged yet
    Deltas { deltas: Vec<TaggedDelta<D>> },
    /// The whole state, standing in for every delta up to `seq`
    Full { state: D, seq: SeqNo },
}

impl<D> SyncPayload<D> {
    /// Highest sequence number the payload covers.
    pub fn last_seq(&self) -> Option<SeqNo> {
        match self {
            SyncPayload::Deltas { deltas } => deltas.last().map(|td| td.seq),
            SyncPayload::Full { seq, .. } => Some(*seq),
        }
    }

    pub fn is_full(&self) -> bool {
        matches!(self, SyncPayload::Full { .. })
    }
}

/// Bounded buffer of outgoing deltas
#[derive(Debug, Clone)]
pub struct DeltaBuffer<D> {
    current_seq: SeqNo,
    deltas: VecDeque<TaggedDelta<D>>,
    max_buffer_size: usize,
    /// Every delta up to this sequence number has left the buffer
    truncated: SeqNo,
}

impl<D: Clone> DeltaBuffer<D> {
    pub fn new(max_buffer_size: usize) -> Self {
        Self {
            current_seq: 0,
            deltas: VecDeque::new(),
            max_buffer_size,
            truncated: 0,
        }
    }

    /// Append a delta and return its sequence number. On overflow the oldest
    /// delta is dropped; peers that never received it get the full state.
    pub fn push(&mut self, delta: D) -> SeqNo {
        self.current_seq += 1;
        self.deltas.push_back(TaggedDelta {
            seq: self.current_seq,
            delta,
        });

        while self.deltas.len() > self.max_buffer_size.max(1) {
            if let Some(dropped) = self.deltas.pop_front() {
                self.truncated = dropped.seq;
            }
        }

        self.current_seq
    }

    /// Can a peer that acknowledged `acked_seq` be served from the buffer?
    pub fn covers(&self, acked_seq: SeqNo) -> bool {
        acked_seq >= self.truncated
    }

    /// Deltas after `acked_seq`, oldest first.
    pub fn deltas_since(&self, acked_seq: SeqNo) -> Vec<TaggedDelta<D>> {
        self.deltas
            .iter()
            .filter(|td| td.seq > acked_seq)
            .cloned()
            .collect()
    }

    /// Drop every delta up to `acked_seq`. Returns how many were dropped.
    pub fn ack(&mut self, acked_seq: SeqNo) -> usize {
        let initial_len = self.deltas.len();
        self.deltas.retain(|td| td.seq > acked_seq);
        let removed = initial_len - self.deltas.len();
        if removed > 0 {
            self.truncated = self.truncated.max(acked_seq.min(self.current_seq));
        }
        removed
    }

    pub fn current_seq(&self) -> SeqNo {
        self.current_seq
    }

    /// Highest sequence number no longer held
    pub fn truncated(&self) -> SeqNo {
        self.truncated
    }

    pub fn max_buffer_size(&self) -> usize {
        self.max_buffer_size
    }

    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }
}

/// Tracks acknowledgments from peers for garbage collection
#[derive(Debug, Clone, Default)]
pub struct AckTracker {
    acked: BTreeMap<ReplicaId, SeqNo>,
}

impl AckTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a peer; a new peer starts at 0.
    pub fn register_peer(&mut self, peer_id: impl Into<ReplicaId>) {
        self.acked.entry(peer_id.into()).or_insert(0);
    }

    pub fn is_registered(&self, peer_id: &str) -> bool {
        self.acked.contains_key(peer_id)
    }

    /// Raise the ack for a registered peer. Acks never move backwards.
    pub fn update_ack(&mut self, peer_id: &str, seq: SeqNo) {
        if let Some(acked) = self.acked.get_mut(peer_id) {
            *acked = (*acked).max(seq);
        }
    }

    pub fn get_ack(&self, peer_id: &str) -> SeqNo {
        self.acked.get(peer_id).copied().unwrap_or(0)
    }

    /// Minimum acked sequence across all peers (safe to GC up to this)
    pub fn min_acked(&self) -> SeqNo {
        self.acked.values().copied().min().unwrap_or(0)
    }

    pub fn peers(&self) -> impl Iterator<Item = &ReplicaId> {
        self.acked.keys()
    }
}
