//! # async-snmp-agent
//!
//! Read-only SNMPv2c agent for a fixed set of scalar managed objects.
//!
//! ## Features
//!
//! - GET, GETNEXT and GETBULK over UDP, built on Tokio
//! - Zero-copy BER decoding and a reverse-buffer encoder
//! - Sorted object store with O(log n) exact and successor lookup
//! - Per-community subtree read views, checked in constant time
//! - Values served from a periodically reloaded JSON snapshot
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use async_snmp_agent::config::AgentConfig;
//! use async_snmp_agent::handler::SnapshotProvider;
//!
//! #[tokio::main]
//! async fn main() -> async_snmp_agent::Result<()> {
//!     let config = AgentConfig::from_file("agent.json")?;
//!
//!     let store = config.object_store()?;
//!     let provider = Arc::new(SnapshotProvider::for_store(&config.values, &store));
//!     provider.load()?;
//!
//!     let agent = config.agent_builder()?.provider(provider).build().await?;
//!     agent.run().await
//! }
//! ```
//!
//! ## Request handling
//!
//! Every datagram is decoded, authenticated, resolved and encoded by
//! [`agent::Dispatcher`]. Datagrams that fail to decode, carry an unknown
//! community, or hold anything but a GET, GETNEXT or GETBULK request get no
//! reply at all. Objects outside the community's read view, and objects
//! without a current value, are reported as `noSuchObject`; walks skip them.

// The Error enum carries OIDs inline.
#![allow(clippy::result_large_err)]

pub mod agent;
pub mod ber;
pub mod config;
pub mod error;
pub mod handler;
pub mod message;
pub mod oid;
pub mod pdu;
pub mod prelude;
pub mod value;
pub mod varbind;
pub mod version;

pub(crate) mod util;

#[cfg(feature = "cli")]
pub mod cli;

// Re-exports for convenience
pub use agent::{AccessProfile, Agent, AgentBuilder, Community, CommunityTable, Dispatcher};
pub use config::AgentConfig;
pub use error::{ConfigErrorKind, DecodeErrorKind, Error, ErrorStatus, OidErrorKind, Result};
pub use handler::{ManagedObject, ObjectStore, RequestContext, SnapshotProvider, ValueProvider};
pub use message::CommunityMessage;
pub use oid::Oid;
pub use pdu::{Pdu, PduType};
pub use value::{Syntax, Value};
pub use varbind::VarBind;
pub use version::Version;
