//! # weft-registry
//!
//! Look up CRDT types by name and drive them over JSON.
//!
//! ```rust
//! use serde_json::json;
//! use weft_registry::Registry;
//!
//! let registry = Registry::with_builtins();
//! let mut list = registry.create("rga", "replica-1").unwrap();
//!
//! let mut state = list.initial().unwrap();
//! let delta = list.mutate(&state, json!({"op": "push", "value": "hello"})).unwrap();
//! state = list.join(&state, &delta).unwrap();
//!
//! assert_eq!(list.value_of(&state).unwrap(), json!(["hello"]));
//! ```

pub mod erased;
pub mod error;
pub mod registry;

pub use erased::{DynCrdt, Erased};
pub use error::{RegistryError, Result};
pub use registry::Registry;
