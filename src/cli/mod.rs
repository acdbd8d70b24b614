//! Command-line support for the `asnmp-agent` binary.
//!
//! This module is only available with the `cli` feature.

pub mod args;

pub use args::AgentArgs;
