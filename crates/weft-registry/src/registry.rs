//! Lookup of CRDT types by name.

use crate::erased::{DynCrdt, Erased};
use crate::error::{RegistryError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use weft_core::{ActorId, CCounter, Crdt, Rga};

type Factory = Box<dyn Fn(ActorId) -> Box<dyn DynCrdt> + Send + Sync>;

/// Name → factory for type-erased CRDT handles.
pub struct Registry {
    types: BTreeMap<String, Factory>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            types: BTreeMap::new(),
        }
    }

    /// A registry holding `ccounter` and `rga` (over arbitrary JSON elements).
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.insert("ccounter", CCounter::new);
        registry.insert("rga", Rga::<Value>::new);
        registry
    }

    /// Define a new type. `make` builds a handle for a given actor.
    pub fn register<C, F>(&mut self, name: impl Into<String>, make: F) -> Result<()>
    where
        C: Crdt + Send + 'static,
        C::State: Serialize + DeserializeOwned,
        C::Value: Serialize,
        C::Op: DeserializeOwned,
        F: Fn(ActorId) -> C + Send + Sync + 'static,
    {
        let name = name.into();
        if self.types.contains_key(&name) {
            return Err(RegistryError::DuplicateType(name));
        }
        tracing::debug!(type_name = %name, "registering CRDT type");
        self.insert(name, make);
        Ok(())
    }

    fn insert<C, F>(&mut self, name: impl Into<String>, make: F)
    where
        C: Crdt + Send + 'static,
        C::State: Serialize + DeserializeOwned,
        C::Value: Serialize,
        C::Op: DeserializeOwned,
        F: Fn(ActorId) -> C + Send + Sync + 'static,
    {
        let name = name.into();
        let type_name = name.clone();
        let factory: Factory = Box::new(move |actor: ActorId| -> Box<dyn DynCrdt> {
            Box::new(Erased::new(type_name.clone(), make(actor)))
        });
        self.types.insert(name, factory);
    }

    /// A handle on the type named `name` for `actor`.
    pub fn create(&self, name: &str, actor: impl Into<ActorId>) -> Result<Box<dyn DynCrdt>> {
        let factory = self
            .types
            .get(name)
            .ok_or_else(|| RegistryError::UnknownType(name.to_string()))?;
        Ok(factory(actor.into()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("types", &self.types.keys().collect::<Vec<_>>())
            .finish()
    }
}
