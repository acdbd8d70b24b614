//! SNMP message wrappers.
//!
//! Only the community-based v2c framing is served; see [`CommunityMessage`].

mod community;

pub use community::CommunityMessage;
