//! Prelude module for convenient imports.
//!
//! ```rust
//! use async_snmp_agent::prelude::*;
//! ```
//!
//! This imports the agent types, the object model, error handling and the
//! [`oid!`] macro.

pub use crate::agent::{AccessProfile, Agent, CommunityTable};
pub use crate::error::{Error, Result};
pub use crate::handler::{ManagedObject, ObjectStore, SnapshotProvider, ValueProvider};
pub use crate::oid::Oid;
pub use crate::value::{Syntax, Value};
pub use crate::varbind::VarBind;

#[doc(no_inline)]
pub use crate::oid;
