//! BER (Basic Encoding Rules) codec for SNMP.
//!
//! Encoding and decoding of the X.690 subset used by SNMPv2c messages.

mod decode;
mod encode;
mod length;
pub mod tag;

pub use decode::*;
pub use encode::*;
pub use length::*;
