//! Anti-entropy over a simulated network
//!
//! A cluster of replicas exchanging [`SyncPayload`]s and acks through a
//! network that can lose, duplicate and reorder messages:
//!
//! 1. On local mutation: `d = mutate(X, op)`, `X = X ⊔ d`, `D.push(d)`
//! 2. On send to peer j: `D[acked[j]..]`, or the full state when the buffer
//!    no longer reaches back to `acked[j]`
//! 3. On receive from peer i: apply in order, then `ack(seq)` back to i
//!
//! Lost messages are recovered by retransmission or by the next sync round,
//! which resends everything past the last ack.

use crate::buffer::{ReplicaId, SeqNo, SyncPayload};
use crate::config::ReplicaConfig;
use crate::error::{DeltaError, Result};
use crate::replica::Replica;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use weft_core::Crdt;

/// Message types for the anti-entropy protocol
#[derive(Debug, Clone)]
pub enum AntiEntropyMessage<D> {
    Sync {
        from: ReplicaId,
        to: ReplicaId,
        payload: SyncPayload<D>,
    },
    /// `from` has applied `to`'s stream up to `seq`
    Ack {
        from: ReplicaId,
        to: ReplicaId,
        seq: SeqNo,
    },
}

/// Network configuration for simulation
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Probability of message loss (0.0 - 1.0)
    pub loss_rate: f64,
    /// Probability of message duplication (0.0 - 1.0)
    pub dup_rate: f64,
    /// Probability of message reordering (0.0 - 1.0)
    pub reorder_rate: f64,
    /// Seed for the simulator's RNG; runs with the same seed are identical
    pub seed: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            loss_rate: 0.0,
            dup_rate: 0.0,
            reorder_rate: 0.0,
            seed: 12345,
        }
    }
}

impl NetworkConfig {
    pub fn lossy(loss_rate: f64) -> Self {
        Self {
            loss_rate,
            ..Default::default()
        }
    }

    pub fn with_dups(dup_rate: f64) -> Self {
        Self {
            dup_rate,
            ..Default::default()
        }
    }

    pub fn reordering(reorder_rate: f64) -> Self {
        Self {
            reorder_rate,
            ..Default::default()
        }
    }

    /// Loss, duplication and reordering at once
    pub fn chaotic() -> Self {
        Self {
            loss_rate: 0.1,
            dup_rate: 0.2,
            reorder_rate: 0.3,
            ..Default::default()
        }
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// A network simulator for testing anti-entropy under various conditions
#[derive(Debug)]
pub struct NetworkSimulator<D> {
    in_flight: VecDeque<AntiEntropyMessage<D>>,
    lost: Vec<AntiEntropyMessage<D>>,
    config: NetworkConfig,
    rng: StdRng,
}

impl<D: Clone> NetworkSimulator<D> {
    pub fn new(config: NetworkConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            in_flight: VecDeque::new(),
            lost: Vec::new(),
            config,
            rng,
        }
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn send(&mut self, msg: AntiEntropyMessage<D>) {
        if self.rng.gen_bool(self.config.loss_rate.clamp(0.0, 1.0)) {
            self.lost.push(msg);
            return;
        }

        if self.rng.gen_bool(self.config.dup_rate.clamp(0.0, 1.0)) {
            self.in_flight.push_back(msg.clone());
        }

        self.in_flight.push_back(msg);
        if self.in_flight.len() > 1 && self.rng.gen_bool(self.config.reorder_rate.clamp(0.0, 1.0)) {
            let last = self.in_flight.len() - 1;
            let pos = self.rng.gen_range(0..last);
            self.in_flight.swap(pos, last);
        }
    }

    pub fn receive(&mut self) -> Option<AntiEntropyMessage<D>> {
        self.in_flight.pop_front()
    }

    /// Put every lost message back in flight
    pub fn retransmit_lost(&mut self) {
        self.in_flight.extend(self.lost.drain(..));
    }

    pub fn is_empty(&self) -> bool {
        self.in_flight.is_empty()
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn lost_count(&self) -> usize {
        self.lost.len()
    }
}

/// Anti-entropy coordinator for a cluster of replicas
pub struct AntiEntropyCluster<C: Crdt> {
    replicas: Vec<Replica<C>>,
    network: NetworkSimulator<C::State>,
}

impl<C: Crdt> AntiEntropyCluster<C> {
    /// Create `n` replicas named `replica_0..`, each peered with all others.
    /// `make` builds the CRDT handle for a replica from its id.
    pub fn new(n: usize, config: NetworkConfig, make: impl FnMut(&str) -> C) -> Self {
        Self::with_replica_config(n, config, ReplicaConfig::default(), make)
    }

    pub fn with_replica_config(
        n: usize,
        config: NetworkConfig,
        replica_config: ReplicaConfig,
        mut make: impl FnMut(&str) -> C,
    ) -> Self {
        let replicas = (0..n)
            .map(|i| {
                let id = format!("replica_{}", i);
                let mut replica = Replica::with_config(id.clone(), make(&id), replica_config.clone());
                for j in (0..n).filter(|&j| j != i) {
                    replica.register_peer(format!("replica_{}", j));
                }
                replica
            })
            .collect();

        Self {
            replicas,
            network: NetworkSimulator::new(config),
        }
    }

    /// # Panics
    /// If `idx` is out of range.
    pub fn replica(&self, idx: usize) -> &Replica<C> {
        &self.replicas[idx]
    }

    /// # Panics
    /// If `idx` is out of range.
    pub fn replica_mut(&mut self, idx: usize) -> &mut Replica<C> {
        &mut self.replicas[idx]
    }

    pub fn replicas(&self) -> &[Replica<C>] {
        &self.replicas
    }

    pub fn network(&self) -> &NetworkSimulator<C::State> {
        &self.network
    }

    /// Run a mutator on one replica
    pub fn apply(&mut self, replica_idx: usize, op: C::Op) -> Result<C::State> {
        self.replicas
            .get_mut(replica_idx)
            .ok_or(DeltaError::UnknownReplica(replica_idx))?
            .apply(op)
    }

    /// Put a sync payload from one replica to another on the network
    pub fn initiate_sync(&mut self, from_idx: usize, to_idx: usize) {
        let (Some(from), Some(to)) = (self.replicas.get(from_idx), self.replicas.get(to_idx)) else {
            return;
        };
        if let Some(payload) = from.prepare_sync(to.id()) {
            let msg = AntiEntropyMessage::Sync {
                from: from.id().to_string(),
                to: to.id().to_string(),
                payload,
            };
            self.network.send(msg);
        }
    }

    /// Deliver one message. Returns `false` once the network is empty.
    pub fn process_one(&mut self) -> bool {
        let Some(msg) = self.network.receive() else {
            return false;
        };

        match msg {
            AntiEntropyMessage::Sync { from, to, payload } => {
                let Some(replica) = self.replicas.iter_mut().find(|r| r.id() == to) else {
                    return true;
                };
                match replica.receive(&from, payload) {
                    Ok(seq) => {
                        let ack = AntiEntropyMessage::Ack {
                            from: to,
                            to: from,
                            seq,
                        };
                        self.network.send(ack);
                    }
                    Err(err) => {
                        tracing::debug!(%err, replica = %to, "dropping sync payload");
                    }
                }
            }
            AntiEntropyMessage::Ack { from, to, seq } => {
                if let Some(replica) = self.replicas.iter_mut().find(|r| r.id() == to) {
                    replica.process_ack(&from, seq);
                }
            }
        }
        true
    }

    pub fn drain_network(&mut self) {
        while self.process_one() {}
    }

    /// Send from one replica to all others
    pub fn broadcast(&mut self, from_idx: usize) {
        for to_idx in (0..self.replicas.len()).filter(|&to| to != from_idx) {
            self.initiate_sync(from_idx, to_idx);
        }
    }

    /// Every replica syncs with every other replica, then the network drains
    pub fn full_sync_round(&mut self) {
        for from_idx in 0..self.replicas.len() {
            self.broadcast(from_idx);
        }
        self.drain_network();
    }

    pub fn retransmit_and_process(&mut self) {
        self.network.retransmit_lost();
        self.drain_network();
    }

    /// Nothing in flight and every replica's stream fully acknowledged by
    /// every peer. Lost messages may remain; they carry nothing new.
    pub fn is_quiescent(&self) -> bool {
        self.network.is_empty()
            && self.replicas.iter().all(|replica| {
                self.replicas
                    .iter()
                    .all(|peer| peer.id() == replica.id() || !replica.has_pending(peer.id()))
            })
    }

    pub fn len(&self) -> usize {
        self.replicas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replicas.is_empty()
    }
}

impl<C: Crdt> AntiEntropyCluster<C>
where
    C::Value: PartialEq,
{
    /// Do all replicas project to the same value?
    pub fn is_converged(&self) -> bool {
        let mut values = self.replicas.iter().map(Replica::value);
        match values.next() {
            Some(first) => values.all(|v| v == first),
            None => true,
        }
    }
}
