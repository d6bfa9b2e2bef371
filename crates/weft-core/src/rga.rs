//! Replicated Growable Array (RGA)
//!
//! The state is three sets:
//! - added vertices: vertex id → element; the root sentinel is implicit and
//!   never stored, so any element value (`null` included) round-trips
//! - removed vertices: tombstones, never shrink
//! - edges: vertex id → successor id, a single chain starting at the root;
//!   `None` marks the tail
//!
//! Concurrent insertions after the same vertex are ordered by identifier:
//! while splicing a new vertex in, the merge walks past every successor whose
//! identifier is greater, so greater identifiers end up closer to the anchor
//! regardless of merge order. Because every identifier is generated greater
//! than everything its replica had seen, the result is the same linear order
//! on every replica.
//!
//! As described in http://hal.upmc.fr/inria-00555588/document

use crate::crdt::Crdt;
use crate::dot::ActorId;
use crate::error::{CrdtError, Result};
use crate::id::{IdGenerator, LamportIds, VertexId};
use crate::lattice::Lattice;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::marker::PhantomData;

type Edges = BTreeMap<VertexId, Option<VertexId>>;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(serialize = "T: Serialize", deserialize = "T: Deserialize<'de>"))]
pub struct RgaState<T> {
    #[serde(with = "crate::wire::pairs")]
    added: BTreeMap<VertexId, T>,
    removed: BTreeSet<VertexId>,
    #[serde(with = "crate::wire::pairs")]
    edges: Edges,
}

impl<T: Clone + PartialEq> RgaState<T> {
    /// The empty sequence: just the root sentinel.
    pub fn new() -> Self {
        let mut edges = BTreeMap::new();
        edges.insert(VertexId::root(), None);
        Self {
            added: BTreeMap::new(),
            removed: BTreeSet::new(),
            edges,
        }
    }

    fn empty() -> Self {
        Self {
            added: BTreeMap::new(),
            removed: BTreeSet::new(),
            edges: BTreeMap::new(),
        }
    }

    /// Delta holding one new vertex linked between `left` and `right`.
    fn insertion(left: VertexId, id: VertexId, value: T, right: Option<VertexId>) -> Self {
        let mut delta = Self::empty();
        delta.added.insert(id.clone(), value);
        delta.edges.insert(left, Some(id.clone()));
        delta.edges.insert(id, right);
        delta
    }

    /// Delta holding one tombstone.
    fn removal(vertex: VertexId) -> Self {
        let mut delta = Self::empty();
        delta.removed.insert(vertex);
        delta
    }

    fn successor(&self, id: &VertexId) -> Option<&VertexId> {
        self.edges.get(id).and_then(Option::as_ref)
    }

    /// Every linked vertex after the root, tombstones included, in order.
    pub fn chain(&self) -> impl Iterator<Item = &VertexId> + '_ {
        std::iter::successors(self.successor(&VertexId::root()), move |id| self.successor(id))
            .take(self.edges.len())
    }

    /// Live vertices in order.
    pub fn vertices(&self) -> impl Iterator<Item = &VertexId> + '_ {
        self.chain().filter(move |id| !self.removed.contains(*id))
    }

    /// Live elements in order.
    pub fn values(&self) -> impl Iterator<Item = &T> + '_ {
        self.vertices().filter_map(move |id| self.added.get(id))
    }

    /// The `pos`-th live vertex, counting from 0.
    pub fn vertex_at(&self, pos: usize) -> Option<&VertexId> {
        self.vertices().nth(pos)
    }

    /// Last linked vertex, tombstones included; the root when empty.
    pub fn tail(&self) -> VertexId {
        self.chain().last().cloned().unwrap_or_else(VertexId::root)
    }

    pub fn len(&self) -> usize {
        self.vertices().count()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices().next().is_none()
    }

    /// Is `id` linked into the chain (live or tombstoned)?
    pub fn contains(&self, id: &VertexId) -> bool {
        self.edges.contains_key(id)
    }

    pub fn is_removed(&self, id: &VertexId) -> bool {
        self.removed.contains(id)
    }

    /// Element stored at `id`; `None` for the root and unknown vertices.
    pub fn get(&self, id: &VertexId) -> Option<&T> {
        self.added.get(id)
    }

    /// Greatest identifier this state knows about, if any besides the root.
    pub fn max_id(&self) -> Option<&VertexId> {
        let added = self.added.keys().next_back();
        let removed = self.removed.iter().next_back();
        added.max(removed).filter(|id| !id.is_root())
    }

    pub fn added(&self) -> &BTreeMap<VertexId, T> {
        &self.added
    }

    pub fn removed(&self) -> &BTreeSet<VertexId> {
        &self.removed
    }

    pub fn edges(&self) -> &BTreeMap<VertexId, Option<VertexId>> {
        &self.edges
    }

    /// Edges in the order they can be spliced: the chain from the root
    /// first, then edges hanging off vertices not on that chain (deltas).
    fn splice_order(&self) -> Vec<(&VertexId, &VertexId)> {
        let mut order = Vec::with_capacity(self.edges.len());
        let mut on_chain = BTreeSet::new();

        if let Some((root, _)) = self.edges.get_key_value(&VertexId::root()) {
            let mut left = root;
            on_chain.insert(left);
            while let Some(Some(next)) = self.edges.get(left) {
                if !on_chain.insert(next) {
                    break;
                }
                order.push((left, next));
                left = next;
            }
        }

        for (left, next) in &self.edges {
            if on_chain.contains(left) {
                continue;
            }
            if let Some(next) = next {
                order.push((left, next));
            }
        }

        order
    }
}

/// Link `new` after `left` in `edges`.
///
/// Returns `true` once the edge is consumed: either `new` is already linked
/// or it has just been placed. Returns `false` if `left` is not linked yet.
fn splice(edges: &mut Edges, left: &VertexId, new: &VertexId) -> bool {
    if edges.contains_key(new) {
        return true;
    }
    if !edges.contains_key(left) {
        return false;
    }

    let mut anchor = left.clone();
    let mut right = edges.get(&anchor).cloned().flatten();
    while let Some(next) = right.take() {
        if new < &next {
            right = edges.get(&next).cloned().flatten();
            anchor = next;
        } else {
            right = Some(next);
            break;
        }
    }

    edges.insert(anchor, Some(new.clone()));
    edges.insert(new.clone(), right);
    true
}

impl<T: Clone + PartialEq> Default for RgaState<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + PartialEq> Lattice for RgaState<T> {
    fn bottom() -> Self {
        Self::new()
    }

    /// Union the vertex and tombstone sets, then rebuild the chain by
    /// splicing every edge whose vertex is not linked yet.
    ///
    /// Edges are spliced in dependency order, repeating until no more can be
    /// placed. A delta edge whose anchor is unknown to both sides is left
    /// out; its vertex stays in `added` and is linked when the delta is
    /// joined again after its anchor arrives.
    fn join(&self, other: &Self) -> Self {
        let mut added = self.added.clone();
        for (id, value) in &other.added {
            added.entry(id.clone()).or_insert_with(|| value.clone());
        }

        let removed = self.removed.union(&other.removed).cloned().collect();

        let mut edges = BTreeMap::new();
        edges.insert(VertexId::root(), None);

        let mut pending: Vec<_> = self
            .splice_order()
            .into_iter()
            .chain(other.splice_order())
            .collect();
        loop {
            let before = pending.len();
            pending.retain(|&(left, new)| !splice(&mut edges, left, new));
            if pending.is_empty() || pending.len() == before {
                break;
            }
        }

        if !pending.is_empty() {
            tracing::trace!(unplaced = pending.len(), "rga join left edges with unknown anchors");
        }

        Self {
            added,
            removed,
            edges,
        }
    }
}

/// Named RGA mutators.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum RgaOp<T> {
    AddRight { before: VertexId, value: T },
    Push { value: T },
    InsertAt { pos: usize, value: T },
    Remove { vertex: VertexId },
    RemoveAt { pos: usize },
}

/// A replica's handle on an RGA. Owns the identifier generator.
#[derive(Clone, Debug)]
pub struct Rga<T, G = LamportIds> {
    ids: G,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Clone + PartialEq> Rga<T, LamportIds> {
    pub fn new(actor: impl Into<ActorId>) -> Self {
        Self::with_ids(LamportIds::new(actor))
    }
}

impl<T: Clone + PartialEq, G: IdGenerator> Rga<T, G> {
    pub fn with_ids(ids: G) -> Self {
        Self {
            ids,
            _marker: PhantomData,
        }
    }

    pub fn ids(&self) -> &G {
        &self.ids
    }

    fn insert_after(&mut self, state: &RgaState<T>, left: &VertexId, value: T) -> RgaState<T> {
        let id = self.ids.next_id(state.max_id());
        let right = state.successor(left).cloned();
        RgaState::insertion(left.clone(), id, value, right)
    }

    /// Insert `value` immediately after `before` (the root for the front).
    pub fn add_right(&mut self, state: &RgaState<T>, before: &VertexId, value: T) -> Result<RgaState<T>> {
        if !state.contains(before) {
            tracing::debug!(vertex = %before, "add_right on unknown vertex");
            return Err(CrdtError::UnknownVertex(before.clone()));
        }
        Ok(self.insert_after(state, before, value))
    }

    /// Append after the current tail.
    pub fn push(&mut self, state: &RgaState<T>, value: T) -> RgaState<T> {
        let tail = state.tail();
        self.insert_after(state, &tail, value)
    }

    /// Insert so that `value` becomes the `pos`-th live element.
    pub fn insert_at(&mut self, state: &RgaState<T>, pos: usize, value: T) -> Result<RgaState<T>> {
        let left = if pos == 0 {
            VertexId::root()
        } else {
            match state.vertex_at(pos - 1) {
                Some(id) => id.clone(),
                None => {
                    let length = state.len();
                    tracing::debug!(index = pos, length, "insert_at out of bounds");
                    return Err(CrdtError::OutOfBounds { index: pos, length });
                }
            }
        };
        Ok(self.insert_after(state, &left, value))
    }

    /// Tombstone a vertex. Removing an already removed vertex yields the same
    /// delta again.
    pub fn remove(&self, state: &RgaState<T>, vertex: &VertexId) -> Result<RgaState<T>> {
        if vertex.is_root() || !state.added.contains_key(vertex) {
            tracing::debug!(vertex = %vertex, "remove of unknown vertex");
            return Err(CrdtError::UnknownVertex(vertex.clone()));
        }
        Ok(RgaState::removal(vertex.clone()))
    }

    /// Tombstone the `pos`-th live element.
    pub fn remove_at(&self, state: &RgaState<T>, pos: usize) -> Result<RgaState<T>> {
        match state.vertex_at(pos) {
            Some(id) => Ok(RgaState::removal(id.clone())),
            None => {
                let length = state.len();
                tracing::debug!(index = pos, length, "remove_at out of bounds");
                Err(CrdtError::OutOfBounds { index: pos, length })
            }
        }
    }
}

impl<T: Clone + PartialEq, G: IdGenerator> Crdt for Rga<T, G> {
    type State = RgaState<T>;
    type Value = Vec<T>;
    type Op = RgaOp<T>;

    fn value_of(&self, state: &RgaState<T>) -> Vec<T> {
        state.values().cloned().collect()
    }

    fn mutate(&mut self, state: &RgaState<T>, op: RgaOp<T>) -> Result<RgaState<T>> {
        match op {
            RgaOp::AddRight { before, value } => self.add_right(state, &before, value),
            RgaOp::Push { value } => Ok(self.push(state, value)),
            RgaOp::InsertAt { pos, value } => self.insert_at(state, pos, value),
            RgaOp::Remove { vertex } => self.remove(state, &vertex),
            RgaOp::RemoveAt { pos } => self.remove_at(state, pos),
        }
    }
}
