//! Managed objects and the values behind them.
//!
//! - [`ObjectStore`] - sorted, read-only set of [`ManagedObject`]s with exact
//!   and successor lookup
//! - [`ValueProvider`] - source of the current value for an object's key
//! - [`SnapshotProvider`] - provider backed by a refreshed JSON value file
//! - [`RequestContext`] - information about the request being resolved
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashMap;
//!
//! use async_snmp_agent::handler::{ManagedObject, ObjectStore, ValueProvider};
//! use async_snmp_agent::{Syntax, Value, oid};
//!
//! let store = ObjectStore::from_objects(vec![ManagedObject::new(
//!     oid!(1, 3, 6, 1, 4, 1, 99999, 1, 1, 0),
//!     Syntax::Integer32,
//!     "temperature",
//! )])
//! .unwrap();
//!
//! let mut values = HashMap::new();
//! values.insert("temperature".to_string(), Value::Integer(21));
//!
//! let object = store.get(&oid!(1, 3, 6, 1, 4, 1, 99999, 1, 1, 0)).unwrap();
//! assert_eq!(values.fetch(&object.key), Some(Value::Integer(21)));
//! ```

mod context;
mod provider;
mod store;

pub use context::RequestContext;
pub use provider::{SnapshotProvider, ValueProvider};
pub use store::{ManagedObject, ObjectStore};
