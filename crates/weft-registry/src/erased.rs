//! Type-erased CRDT handles over JSON states.
//!
//! Callers that only know a type by name hold a `Box<dyn DynCrdt>` and pass
//! states, deltas and operations around as `serde_json::Value`. Every call
//! decodes its inputs into the concrete types, runs the typed contract and
//! encodes the result.

use crate::error::{RegistryError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use weft_core::Crdt;

/// Object-safe view of a [`Crdt`].
pub trait DynCrdt: Send {
    /// Name the type was registered under
    fn type_name(&self) -> &str;

    fn initial(&self) -> Result<Value>;

    fn join(&self, left: &Value, right: &Value) -> Result<Value>;

    fn value_of(&self, state: &Value) -> Result<Value>;

    /// Run the mutator named by `op`'s `op` field against `state` and return
    /// the encoded delta.
    fn mutate(&mut self, state: &Value, op: Value) -> Result<Value>;
}

impl std::fmt::Debug for dyn DynCrdt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynCrdt")
            .field("type_name", &self.type_name())
            .finish()
    }
}

/// Adapter from a typed [`Crdt`] to [`DynCrdt`].
pub struct Erased<C> {
    type_name: String,
    crdt: C,
}

impl<C> Erased<C> {
    pub fn new(type_name: impl Into<String>, crdt: C) -> Self {
        Self {
            type_name: type_name.into(),
            crdt,
        }
    }

    pub fn inner(&self) -> &C {
        &self.crdt
    }
}

impl<C> Erased<C>
where
    C: Crdt,
    C::State: DeserializeOwned,
{
    fn decode_state(&self, state: &Value) -> Result<C::State> {
        C::State::deserialize(state).map_err(|e| RegistryError::InvalidState {
            type_name: self.type_name.clone(),
            reason: e.to_string(),
        })
    }
}

impl<C> DynCrdt for Erased<C>
where
    C: Crdt + Send,
    C::State: Serialize + DeserializeOwned,
    C::Value: Serialize,
    C::Op: DeserializeOwned,
{
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn initial(&self) -> Result<Value> {
        Ok(serde_json::to_value(self.crdt.initial())?)
    }

    fn join(&self, left: &Value, right: &Value) -> Result<Value> {
        let left = self.decode_state(left)?;
        let right = self.decode_state(right)?;
        Ok(serde_json::to_value(self.crdt.join(&left, &right))?)
    }

    fn value_of(&self, state: &Value) -> Result<Value> {
        let state = self.decode_state(state)?;
        Ok(serde_json::to_value(self.crdt.value_of(&state))?)
    }

    fn mutate(&mut self, state: &Value, op: Value) -> Result<Value> {
        let state = self.decode_state(state)?;
        let op: C::Op = serde_json::from_value(op).map_err(|e| RegistryError::InvalidOperation {
            type_name: self.type_name.clone(),
            reason: e.to_string(),
        })?;

        let delta = self.crdt.mutate(&state, op).map_err(|err| {
            tracing::debug!(type_name = %self.type_name, %err, "mutator failed");
            err
        })?;
        Ok(serde_json::to_value(delta)?)
    }
}
