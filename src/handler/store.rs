//! Sorted store of managed objects.
//!
//! The store is built once from configuration and is read-only afterwards,
//! so it can be shared between request tasks behind an `Arc` without locking.
//! Both lookups are a binary search over a vector kept in OID order.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{ConfigErrorKind, Error, Result};
use crate::oid::Oid;
use crate::value::Syntax;

/// A scalar exposed by the agent.
///
/// The value itself is not stored here; `key` names the entry the
/// [`ValueProvider`](super::ValueProvider) is asked for on each request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedObject {
    /// Instance OID (including the trailing `.0` for scalars).
    pub oid: Oid,
    /// Declared syntax; values of any other type are not served.
    pub syntax: Syntax,
    /// Lookup token for the value provider.
    pub key: Arc<str>,
}

impl ManagedObject {
    pub fn new(oid: Oid, syntax: Syntax, key: impl Into<Arc<str>>) -> Self {
        Self {
            oid,
            syntax,
            key: key.into(),
        }
    }
}

/// Read-only collection of managed objects in OID order.
///
/// # Example
///
/// ```rust
/// use async_snmp_agent::handler::{ManagedObject, ObjectStore};
/// use async_snmp_agent::{Syntax, oid};
///
/// let store = ObjectStore::from_objects(vec![
///     ManagedObject::new(oid!(1, 3, 6, 1, 4, 1, 99999, 1, 2, 0), Syntax::Integer32, "b"),
///     ManagedObject::new(oid!(1, 3, 6, 1, 4, 1, 99999, 1, 1, 0), Syntax::Integer32, "a"),
/// ])
/// .unwrap();
///
/// let first = store.next(&oid!(1, 3, 6, 1, 4, 1, 99999)).unwrap();
/// assert_eq!(&*first.key, "a");
/// assert!(store.next(&oid!(1, 3, 6, 1, 4, 1, 99999, 1, 2, 0)).is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ObjectStore {
    // Strictly ascending by OID.
    objects: Vec<ManagedObject>,
}

impl ObjectStore {
    /// Build a store from an unordered list of objects.
    ///
    /// Fails if two objects share an OID, an object has an empty key, or two
    /// objects share a key but not a syntax. A value is coerced once per key,
    /// so every object reading that key must agree on its type.
    pub fn from_objects(mut objects: Vec<ManagedObject>) -> Result<Self> {
        if let Some(obj) = objects.iter().find(|o| o.key.is_empty()) {
            return Err(Error::config(ConfigErrorKind::EmptyValueKey {
                oid: obj.oid.clone(),
            }));
        }

        objects.sort_by(|a, b| a.oid.cmp(&b.oid));

        if let Some(pair) = objects.windows(2).find(|w| w[0].oid == w[1].oid) {
            return Err(Error::config(ConfigErrorKind::DuplicateObject {
                oid: pair[0].oid.clone(),
            }));
        }

        let mut syntaxes: HashMap<&str, Syntax> = HashMap::new();
        for obj in &objects {
            let declared = *syntaxes.entry(&*obj.key).or_insert(obj.syntax);
            if declared != obj.syntax {
                return Err(Error::config(ConfigErrorKind::ConflictingKeySyntax {
                    key: obj.key.to_string(),
                    oid: obj.oid.clone(),
                }));
            }
        }

        tracing::debug!(target: "async_snmp_agent::store", objects = objects.len(), "object store loaded");

        Ok(Self { objects })
    }

    /// Object registered at exactly `oid`.
    pub fn get(&self, oid: &Oid) -> Option<&ManagedObject> {
        self.search(oid).ok().map(|idx| &self.objects[idx])
    }

    /// Object with the smallest OID strictly greater than `oid`.
    pub fn next(&self, oid: &Oid) -> Option<&ManagedObject> {
        let idx = match self.search(oid) {
            Ok(idx) => idx + 1,
            Err(idx) => idx,
        };
        self.objects.get(idx)
    }

    /// Objects strictly after `oid`, in ascending order.
    ///
    /// Used by walks that need to skip objects without restarting the search.
    pub fn after<'a>(&'a self, oid: &Oid) -> impl Iterator<Item = &'a ManagedObject> + 'a {
        let start = match self.search(oid) {
            Ok(idx) => idx + 1,
            Err(idx) => idx,
        };
        self.objects[start..].iter()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// All objects in ascending OID order.
    pub fn iter(&self) -> impl Iterator<Item = &ManagedObject> {
        self.objects.iter()
    }

    fn search(&self, oid: &Oid) -> std::result::Result<usize, usize> {
        self.objects.binary_search_by(|o| o.oid.cmp(oid))
    }
}
