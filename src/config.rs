//! Agent configuration file.
//!
//! Configuration is a single JSON document loaded once at startup:
//!
//! ```json
//! {
//!     "bind": "0.0.0.0:161",
//!     "enterprise": "1.3.6.1.4.1.99999",
//!     "communities": [
//!         { "community": "public", "security_name": "my-area" }
//!     ],
//!     "objects": [
//!         { "suffix": "1.1.0", "syntax": "Integer32", "key": "Param1" },
//!         { "suffix": "1.28.0", "syntax": "TimeTicks", "key": "Uptime" }
//!     ],
//!     "values": "data.json",
//!     "refresh_secs": 5
//! }
//! ```
//!
//! Object OIDs are suffixes under `enterprise`. A community without
//! `read_views` may read the whole enterprise subtree. Every other field is
//! optional and falls back to the defaults on [`AgentConfig::default`].

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::agent::{
    AccessProfile, AgentBuilder, Community, CommunityTable, DEFAULT_MAX_BULK_VARBINDS,
    DEFAULT_MAX_CONCURRENT_REQUESTS, DEFAULT_MAX_MESSAGE_SIZE, DEFAULT_RECV_BUFFER_SIZE,
};
use crate::error::{ConfigErrorKind, Error, Result};
use crate::handler::{ManagedObject, ObjectStore};
use crate::oid::Oid;
use crate::value::Syntax;

/// Top-level agent configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgentConfig {
    /// UDP listen address.
    pub bind: String,
    /// Root under which object suffixes are registered.
    pub enterprise: Oid,
    /// Accepted communities.
    pub communities: Vec<CommunityConfig>,
    /// Managed objects.
    pub objects: Vec<ObjectConfig>,
    /// JSON value file read by the snapshot provider.
    pub values: PathBuf,
    /// Seconds between value file reloads; 0 disables reloading.
    pub refresh_secs: u64,
    /// Cap on varbinds in one GETBULK response.
    pub max_bulk_varbinds: usize,
    /// Largest response datagram, in bytes.
    pub max_message_size: usize,
    /// Concurrent request limit; 0 means unbounded.
    pub max_concurrent_requests: usize,
    /// Socket receive buffer size in bytes; 0 keeps the OS default.
    pub recv_buffer_size: usize,
}

/// One accepted community.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommunityConfig {
    pub community: String,
    #[serde(default = "default_security_name")]
    pub security_name: String,
    /// Readable subtrees (absolute OIDs). Defaults to the enterprise root.
    #[serde(default)]
    pub read_views: Option<Vec<Oid>>,
}

/// One managed scalar.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectConfig {
    /// OID relative to the enterprise root, e.g. `1.28.0`.
    pub suffix: Oid,
    pub syntax: Syntax,
    /// Key looked up in the value file.
    pub key: String,
}

fn default_security_name() -> String {
    "my-area".to_string()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:161".to_string(),
            enterprise: crate::oid!(1, 3, 6, 1, 4, 1, 99999),
            communities: vec![CommunityConfig {
                community: "public".to_string(),
                security_name: default_security_name(),
                read_views: None,
            }],
            objects: Vec::new(),
            values: PathBuf::from("data.json"),
            refresh_secs: 5,
            max_bulk_varbinds: DEFAULT_MAX_BULK_VARBINDS,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
            recv_buffer_size: DEFAULT_RECV_BUFFER_SIZE,
        }
    }
}

impl AgentConfig {
    /// Load and validate a configuration file.
    ///
    /// A relative `values` path is resolved against the configuration file's
    /// directory.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|source| Error::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self = serde_json::from_slice(&data).map_err(|source| Error::ParseFile {
            path: path.to_path_buf(),
            source,
        })?;

        if config.values.is_relative()
            && let Some(dir) = path.parent()
        {
            config.values = dir.join(&config.values);
        }

        config.validate()?;
        tracing::debug!(target: "async_snmp_agent::config", { path = %path.display(), objects = config.objects.len(), communities = config.communities.len() }, "configuration loaded");
        Ok(config)
    }

    /// Parse and validate a configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|source| Error::ParseFile {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check everything that can be checked without touching the network.
    pub fn validate(&self) -> Result<()> {
        self.bind_addr()?;
        if self.max_bulk_varbinds == 0 {
            return Err(Error::config(ConfigErrorKind::ZeroBulkCap));
        }
        self.community_table()?;
        self.object_store()?;
        Ok(())
    }

    /// Parsed listen address.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.bind.parse().map_err(|_| {
            Error::config(ConfigErrorKind::InvalidBindAddress {
                addr: self.bind.clone(),
            })
        })
    }

    /// Reload period for the value file, if reloading is enabled.
    pub fn refresh_interval(&self) -> Option<Duration> {
        (self.refresh_secs > 0).then(|| Duration::from_secs(self.refresh_secs))
    }

    /// Build the object store, joining each suffix onto the enterprise root.
    pub fn object_store(&self) -> Result<ObjectStore> {
        let objects = self
            .objects
            .iter()
            .map(|obj| {
                ManagedObject::new(self.enterprise.join(&obj.suffix), obj.syntax, obj.key.as_str())
            })
            .collect();
        ObjectStore::from_objects(objects)
    }

    /// Build the community table.
    pub fn community_table(&self) -> Result<CommunityTable> {
        let communities = self
            .communities
            .iter()
            .map(|c| {
                let profile: AccessProfile = match &c.read_views {
                    Some(views) => views.iter().cloned().collect(),
                    None => AccessProfile::new().include(self.enterprise.clone()),
                };
                Community::new(c.community.clone(), c.security_name.as_str(), profile)
            })
            .collect();
        CommunityTable::new(communities)
    }

    /// Agent builder with every setting from this configuration except the
    /// value provider.
    pub fn agent_builder(&self) -> Result<AgentBuilder> {
        Ok(AgentBuilder::new()
            .bind(self.bind.clone())
            .store(self.object_store()?)
            .communities(self.community_table()?)
            .max_bulk_varbinds(self.max_bulk_varbinds)
            .max_message_size(self.max_message_size)
            .max_concurrent_requests((self.max_concurrent_requests > 0).then_some(self.max_concurrent_requests))
            .recv_buffer_size((self.recv_buffer_size > 0).then_some(self.recv_buffer_size)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;

    #[test]
    fn test_defaults() {
        let config = AgentConfig::from_json("{}").unwrap();
        assert_eq!(config.bind_addr().unwrap(), "0.0.0.0:161".parse::<SocketAddr>().unwrap());
        assert_eq!(config.enterprise, oid!(1, 3, 6, 1, 4, 1, 99999));
        assert_eq!(config.refresh_interval(), Some(Duration::from_secs(5)));
        assert!(config.object_store().unwrap().is_empty());

        let table = config.community_table().unwrap();
        let public = table.authenticate(b"public").unwrap();
        assert_eq!(public.security_name(), "my-area");
        assert!(public.can_read(&oid!(1, 3, 6, 1, 4, 1, 99999, 1, 1, 0)));
        assert!(!public.can_read(&oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)));
    }

    #[test]
    fn test_objects_join_enterprise() {
        let config = AgentConfig::from_json(
            r#"{
                "objects": [
                    { "suffix": "1.28.0", "syntax": "TimeTicks", "key": "Uptime" },
                    { "suffix": ".1.1.0", "syntax": "Integer32", "key": "Param1" }
                ]
            }"#,
        )
        .unwrap();

        let store = config.object_store().unwrap();
        let keys: Vec<_> = store.iter().map(|o| (o.oid.clone(), &*o.key, o.syntax)).collect();
        assert_eq!(
            keys,
            vec![
                (oid!(1, 3, 6, 1, 4, 1, 99999, 1, 1, 0), "Param1", Syntax::Integer32),
                (oid!(1, 3, 6, 1, 4, 1, 99999, 1, 28, 0), "Uptime", Syntax::TimeTicks),
            ]
        );
    }

    #[test]
    fn test_explicit_read_views() {
        let config = AgentConfig::from_json(
            r#"{
                "communities": [
                    { "community": "ops", "security_name": "operators", "read_views": ["1.3.6.1.4.1.99999.1.1"] }
                ]
            }"#,
        )
        .unwrap();

        let table = config.community_table().unwrap();
        assert!(table.authenticate(b"public").is_none());
        let ops = table.authenticate(b"ops").unwrap();
        assert!(ops.can_read(&oid!(1, 3, 6, 1, 4, 1, 99999, 1, 1, 0)));
        assert!(!ops.can_read(&oid!(1, 3, 6, 1, 4, 1, 99999, 1, 2, 0)));
    }

    #[test]
    fn test_rejects_duplicate_objects() {
        let err = AgentConfig::from_json(
            r#"{
                "objects": [
                    { "suffix": "1.1.0", "syntax": "Integer32", "key": "a" },
                    { "suffix": "1.1.0", "syntax": "Integer32", "key": "b" }
                ]
            }"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::Config {
                kind: ConfigErrorKind::DuplicateObject { .. }
            }
        ));
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(matches!(
            AgentConfig::from_json(r#"{ "bind": "nowhere" }"#),
            Err(Error::Config {
                kind: ConfigErrorKind::InvalidBindAddress { .. }
            })
        ));
        assert!(matches!(
            AgentConfig::from_json(r#"{ "max_bulk_varbinds": 0 }"#),
            Err(Error::Config {
                kind: ConfigErrorKind::ZeroBulkCap
            })
        ));
        assert!(matches!(
            AgentConfig::from_json(r#"{ "communities": [] }"#),
            Err(Error::Config {
                kind: ConfigErrorKind::NoCommunities
            })
        ));
        assert!(matches!(
            AgentConfig::from_json(r#"{ "objects": [{ "suffix": "1.1.0", "syntax": "Float", "key": "x" }] }"#),
            Err(Error::ParseFile { .. })
        ));
        assert!(matches!(
            AgentConfig::from_json(r#"{ "enterprise": "1.3.x" }"#),
            Err(Error::ParseFile { .. })
        ));
        assert!(matches!(
            AgentConfig::from_json(r#"{ "unknown": true }"#),
            Err(Error::ParseFile { .. })
        ));
    }

    #[test]
    fn test_from_file_resolves_values_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.json");
        std::fs::write(&path, br#"{ "values": "data.json", "refresh_secs": 0 }"#).unwrap();

        let config = AgentConfig::from_file(&path).unwrap();
        assert_eq!(config.values, dir.path().join("data.json"));
        assert_eq!(config.refresh_interval(), None);
    }

    #[test]
    fn test_from_file_missing() {
        assert!(matches!(
            AgentConfig::from_file("/nonexistent/agent.json"),
            Err(Error::ReadFile { .. })
        ));
    }
}
