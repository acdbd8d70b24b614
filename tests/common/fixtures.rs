//! Common test fixtures and constants.

use std::collections::HashMap;

use async_snmp_agent::agent::CommunityTable;
use async_snmp_agent::handler::{ManagedObject, ObjectStore};
use async_snmp_agent::{Oid, Syntax, Value, oid};

/// Community accepted by every test agent.
pub const COMMUNITY: &str = "public";

/// Security name of [`COMMUNITY`].
pub const SECURITY_NAME: &str = "my-area";

// =============================================================================
// Enterprise subtree (1.3.6.1.4.1.99999.*)
// =============================================================================

/// Enterprise root: 1.3.6.1.4.1.99999
pub fn enterprise() -> Oid {
    oid!(1, 3, 6, 1, 4, 1, 99999)
}

/// Scalar instance `enterprise.1.n.0`.
pub fn scalar(n: u32) -> Oid {
    oid!(1, 3, 6, 1, 4, 1, 99999, 1, n, 0)
}

/// Scalars that are declared TimeTicks rather than Integer32.
pub const TIMETICKS_SCALARS: [u32; 2] = [28, 35];

/// An object outside the readable enterprise subtree.
pub fn hidden_scalar() -> Oid {
    oid!(1, 3, 6, 1, 4, 1, 88888, 1, 1, 0)
}

/// Nonexistent OID inside the readable subtree.
pub fn nonexistent_oid() -> Oid {
    oid!(1, 3, 6, 1, 4, 1, 99999, 1, 99, 0)
}

/// Value key for scalar `n`.
pub fn key(n: u32) -> String {
    format!("Param{}", n)
}

fn syntax(n: u32) -> Syntax {
    if TIMETICKS_SCALARS.contains(&n) {
        Syntax::TimeTicks
    } else {
        Syntax::Integer32
    }
}

/// Expected value of scalar `n` in [`values`].
pub fn value(n: u32) -> Value {
    match syntax(n) {
        Syntax::TimeTicks => Value::TimeTicks(n * 1000),
        _ => Value::Integer(n as i32 * 10),
    }
}

/// Scalars `enterprise.1.1.0` through `enterprise.1.39.0`, plus one object
/// outside the readable subtree.
pub fn store() -> ObjectStore {
    let mut objects: Vec<ManagedObject> = (1..=39)
        .map(|n| ManagedObject::new(scalar(n), syntax(n), key(n)))
        .collect();
    objects.push(ManagedObject::new(hidden_scalar(), Syntax::Integer32, "Hidden"));
    ObjectStore::from_objects(objects).expect("valid fixture store")
}

/// A value for every fixture object.
pub fn values() -> HashMap<String, Value> {
    let mut values: HashMap<String, Value> = (1..=39).map(|n| (key(n), value(n))).collect();
    values.insert("Hidden".to_string(), Value::Integer(-1));
    values
}

/// `public` may read the enterprise subtree only.
pub fn communities() -> CommunityTable {
    CommunityTable::builder()
        .community(COMMUNITY, SECURITY_NAME, |p| p.include(enterprise()))
        .build()
        .expect("valid fixture communities")
}
