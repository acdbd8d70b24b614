//! Community authentication and subtree read views.
//!
//! A reduced form of the View-based Access Control Model (RFC 3415) for a
//! read-only SNMPv2c agent. Each community token maps to a security name and
//! an [`AccessProfile`]: the set of OID subtrees that community may read.
//! There are no groups, contexts, write views or exclusion masks.
//!
//! # Example
//!
//! ```rust
//! use async_snmp_agent::agent::CommunityTable;
//! use async_snmp_agent::oid;
//!
//! let table = CommunityTable::builder()
//!     .community("public", "my-area", |p| p.include(oid!(1, 3, 6, 1, 4, 1, 99999)))
//!     .build()
//!     .unwrap();
//!
//! let community = table.authenticate(b"public").unwrap();
//! assert!(community.can_read(&oid!(1, 3, 6, 1, 4, 1, 99999, 1, 1, 0)));
//! assert!(!community.can_read(&oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)));
//! assert!(table.authenticate(b"wrong").is_none());
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use bytes::Bytes;
use subtle::ConstantTimeEq;

use crate::error::{ConfigErrorKind, Error, Result};
use crate::oid::Oid;

/// Set of readable OID subtrees.
///
/// An OID is readable if it equals, or lies beneath, any listed subtree.
/// An empty profile denies everything.
///
/// ```rust
/// use async_snmp_agent::agent::AccessProfile;
/// use async_snmp_agent::oid;
///
/// let profile = AccessProfile::new()
///     .include(oid!(1, 3, 6, 1, 4, 1, 99999, 1))
///     .include(oid!(1, 3, 6, 1, 2, 1, 1));
///
/// assert!(profile.is_readable(&oid!(1, 3, 6, 1, 4, 1, 99999, 1)));
/// assert!(profile.is_readable(&oid!(1, 3, 6, 1, 2, 1, 1, 5, 0)));
/// assert!(!profile.is_readable(&oid!(1, 3, 6, 1, 4, 1, 99999, 2, 0)));
/// assert!(!profile.is_readable(&oid!(1, 3, 6, 1, 4, 1)));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessProfile {
    subtrees: Vec<Oid>,
}

impl AccessProfile {
    /// Create an empty profile.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a readable subtree.
    pub fn include(mut self, subtree: Oid) -> Self {
        self.subtrees.push(subtree);
        self
    }

    /// Readable subtrees in the order they were added.
    pub fn subtrees(&self) -> &[Oid] {
        &self.subtrees
    }

    /// Check whether `oid` falls inside one of the subtrees.
    pub fn is_readable(&self, oid: &Oid) -> bool {
        self.subtrees.iter().any(|subtree| oid.starts_with(subtree))
    }
}

impl FromIterator<Oid> for AccessProfile {
    fn from_iter<I: IntoIterator<Item = Oid>>(iter: I) -> Self {
        Self {
            subtrees: iter.into_iter().collect(),
        }
    }
}

/// Check whether `profile` permits reading `oid`.
pub fn is_readable(oid: &Oid, profile: &AccessProfile) -> bool {
    profile.is_readable(oid)
}

/// A configured community.
#[derive(Debug, Clone)]
pub struct Community {
    token: Bytes,
    security_name: Arc<str>,
    profile: AccessProfile,
}

impl Community {
    pub fn new(
        token: impl Into<Bytes>,
        security_name: impl Into<Arc<str>>,
        profile: AccessProfile,
    ) -> Self {
        Self {
            token: token.into(),
            security_name: security_name.into(),
            profile,
        }
    }

    /// Name used in logs; never the token itself.
    pub fn security_name(&self) -> &str {
        &self.security_name
    }

    pub fn profile(&self) -> &AccessProfile {
        &self.profile
    }

    /// Shorthand for `self.profile().is_readable(oid)`.
    pub fn can_read(&self, oid: &Oid) -> bool {
        self.profile.is_readable(oid)
    }

    pub(crate) fn token_len(&self) -> usize {
        self.token.len()
    }

    fn matches(&self, token: &[u8]) -> bool {
        self.token.len() == token.len() && bool::from(self.token.as_ref().ct_eq(token))
    }
}

/// Immutable table of accepted communities.
#[derive(Debug, Clone)]
pub struct CommunityTable {
    communities: Vec<Community>,
}

impl CommunityTable {
    /// Create a builder.
    pub fn builder() -> CommunityTableBuilder {
        CommunityTableBuilder::default()
    }

    /// Build a table from a list of communities.
    ///
    /// Fails if the list is empty, a token is empty, or two communities share
    /// a token.
    pub fn new(communities: Vec<Community>) -> Result<Self> {
        if communities.is_empty() {
            return Err(Error::config(ConfigErrorKind::NoCommunities));
        }

        let mut seen = HashSet::with_capacity(communities.len());
        for community in &communities {
            if community.token.is_empty() {
                return Err(Error::config(ConfigErrorKind::EmptyCommunity));
            }
            if !seen.insert(community.token.clone()) {
                return Err(Error::config(ConfigErrorKind::DuplicateCommunity {
                    security_name: community.security_name.to_string(),
                }));
            }
        }

        Ok(Self { communities })
    }

    /// Look up the community for `token`.
    ///
    /// Every configured token is compared in constant time, and the scan does
    /// not stop at the first match, so response timing does not reveal how
    /// much of a guessed token was right.
    pub fn authenticate(&self, token: &[u8]) -> Option<&Community> {
        let mut found = None;
        for community in &self.communities {
            if community.matches(token) {
                found = Some(community);
            }
        }
        found
    }

    pub fn len(&self) -> usize {
        self.communities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.communities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Community> {
        self.communities.iter()
    }
}

/// Builder for [`CommunityTable`].
#[derive(Debug, Default)]
pub struct CommunityTableBuilder {
    communities: Vec<Community>,
}

impl CommunityTableBuilder {
    /// Add a community whose profile is configured by `configure`.
    pub fn community<F>(
        mut self,
        token: impl Into<Bytes>,
        security_name: impl Into<Arc<str>>,
        configure: F,
    ) -> Self
    where
        F: FnOnce(AccessProfile) -> AccessProfile,
    {
        self.communities.push(Community::new(
            token,
            security_name,
            configure(AccessProfile::new()),
        ));
        self
    }

    pub fn build(self) -> Result<CommunityTable> {
        CommunityTable::new(self.communities)
    }
}
