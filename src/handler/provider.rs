//! Value sources for managed objects.
//!
//! The dispatcher never stores values itself. For every object that survives
//! lookup and access checks it asks a [`ValueProvider`] for the object's key,
//! and a missing value is reported to the manager as `noSuchObject`.
//!
//! [`SnapshotProvider`] serves values from a JSON file of the form
//! `{"key": value, ...}`, re-read periodically. Readers always see one whole
//! snapshot; a refresh swaps the snapshot atomically and never blocks a
//! `fetch` for longer than an `Arc` clone.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::value::{Syntax, Value};

use super::ObjectStore;

/// Supplies the current value for a managed object's key.
///
/// `fetch` is called synchronously from request tasks and must not block on
/// slow I/O. Implementations that front changing data are responsible for
/// returning a consistent value for each call.
pub trait ValueProvider: Send + Sync {
    /// Current value for `key`, or `None` if there is none.
    fn fetch(&self, key: &str) -> Option<Value>;
}

impl<P: ValueProvider + ?Sized> ValueProvider for Arc<P> {
    fn fetch(&self, key: &str) -> Option<Value> {
        (**self).fetch(key)
    }
}

/// Fixed values, mostly useful in tests and for embedding.
impl ValueProvider for HashMap<String, Value> {
    fn fetch(&self, key: &str) -> Option<Value> {
        self.get(key).cloned()
    }
}

type Snapshot = HashMap<Arc<str>, Value>;

/// Provider backed by a periodically re-read JSON value file.
///
/// Each key is coerced to the syntax of the object that references it, so a
/// file value of `"42"` is served as `Integer32` 42 for an `Integer32`
/// object. Entries that cannot be coerced, and keys no object references, are
/// skipped with a warning and served as absent.
///
/// A failed reload keeps the previous snapshot.
#[derive(Debug)]
pub struct SnapshotProvider {
    path: PathBuf,
    schema: HashMap<Arc<str>, Syntax>,
    current: RwLock<Arc<Snapshot>>,
}

impl SnapshotProvider {
    /// Create a provider with an empty snapshot.
    ///
    /// Call [`load`](Self::load) before serving requests.
    pub fn new(path: impl Into<PathBuf>, schema: impl IntoIterator<Item = (Arc<str>, Syntax)>) -> Self {
        Self {
            path: path.into(),
            schema: schema.into_iter().collect(),
            current: RwLock::new(Arc::default()),
        }
    }

    /// Create a provider whose schema is every key referenced by `store`.
    pub fn for_store(path: impl Into<PathBuf>, store: &ObjectStore) -> Self {
        Self::new(
            path,
            store.iter().map(|obj| (obj.key.clone(), obj.syntax)),
        )
    }

    /// Path of the value file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of values in the current snapshot.
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// Read the value file synchronously and install the result.
    ///
    /// Returns the number of values loaded.
    pub fn load(&self) -> Result<usize> {
        let data = std::fs::read(&self.path).map_err(|source| Error::ReadFile {
            path: self.path.clone(),
            source,
        })?;
        self.install(&data)
    }

    /// Read the value file without blocking the runtime and install the result.
    pub async fn reload(&self) -> Result<usize> {
        let data = tokio::fs::read(&self.path)
            .await
            .map_err(|source| Error::ReadFile {
                path: self.path.clone(),
                source,
            })?;
        self.install(&data)
    }

    /// Reload the value file every `interval` until `cancel` fires.
    ///
    /// Failures are logged and the previous snapshot stays in place.
    pub fn spawn_refresh(
        self: &Arc<Self>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let provider = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // First tick completes immediately; the caller has already loaded.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = cancel.cancelled() => break,
                }

                if let Err(e) = provider.reload().await {
                    tracing::warn!(target: "async_snmp_agent::provider", error = %e, "value refresh failed, keeping previous snapshot");
                }
            }

            tracing::debug!(target: "async_snmp_agent::provider", "value refresh stopped");
        })
    }

    fn install(&self, data: &[u8]) -> Result<usize> {
        let snapshot = self.parse(data)?;
        let count = snapshot.len();
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(snapshot);
        tracing::debug!(target: "async_snmp_agent::provider", { path = %self.path.display(), values = count }, "value snapshot installed");
        Ok(count)
    }

    fn parse(&self, data: &[u8]) -> Result<Snapshot> {
        let raw: HashMap<String, serde_json::Value> =
            serde_json::from_slice(data).map_err(|source| Error::ParseFile {
                path: self.path.clone(),
                source,
            })?;

        let mut snapshot = Snapshot::with_capacity(self.schema.len());
        for (key, json) in raw {
            let Some((key, syntax)) = self.schema.get_key_value(key.as_str()) else {
                tracing::trace!(target: "async_snmp_agent::provider", %key, "ignoring unreferenced value");
                continue;
            };
            match syntax.coerce(&json) {
                Some(value) => {
                    snapshot.insert(key.clone(), value);
                }
                None => {
                    tracing::warn!(target: "async_snmp_agent::provider", { %key, %syntax, %json }, "value does not fit object syntax");
                }
            }
        }

        Ok(snapshot)
    }

    fn snapshot(&self) -> Arc<Snapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ValueProvider for SnapshotProvider {
    fn fetch(&self, key: &str) -> Option<Value> {
        self.snapshot().get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn schema() -> Vec<(Arc<str>, Syntax)> {
        vec![
            (Arc::from("temp"), Syntax::Integer32),
            (Arc::from("uptime"), Syntax::TimeTicks),
            (Arc::from("name"), Syntax::OctetString),
        ]
    }

    fn value_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_static_provider() {
        let mut values = HashMap::new();
        values.insert("a".to_string(), Value::Integer(1));
        assert_eq!(values.fetch("a"), Some(Value::Integer(1)));
        assert_eq!(values.fetch("b"), None);

        let shared: Arc<dyn ValueProvider> = Arc::new(values);
        assert_eq!(shared.fetch("a"), Some(Value::Integer(1)));
    }

    #[test]
    fn test_snapshot_load_coerces() {
        let file = value_file(r#"{"temp": "21", "uptime": 360000, "name": 7, "extra": 1}"#);
        let provider = SnapshotProvider::new(file.path(), schema());

        assert!(provider.is_empty());
        assert_eq!(provider.load().unwrap(), 3);
        assert_eq!(provider.fetch("temp"), Some(Value::Integer(21)));
        assert_eq!(provider.fetch("uptime"), Some(Value::TimeTicks(360000)));
        assert_eq!(provider.fetch("name"), Some(Value::from("7")));
        assert_eq!(provider.fetch("extra"), None);
    }

    #[test]
    fn test_snapshot_serves_fractional_readings() {
        let file = value_file(r#"{"temp": 21.5, "uptime": 1234.0}"#);
        let provider = SnapshotProvider::new(file.path(), schema());

        assert_eq!(provider.load().unwrap(), 2);
        assert_eq!(provider.fetch("temp"), Some(Value::Integer(21)));
        assert_eq!(provider.fetch("uptime"), Some(Value::TimeTicks(1234)));
    }

    #[test]
    fn test_snapshot_skips_bad_values() {
        let file = value_file(r#"{"temp": "warm", "uptime": -1, "name": "ok"}"#);
        let provider = SnapshotProvider::new(file.path(), schema());

        assert_eq!(provider.load().unwrap(), 1);
        assert_eq!(provider.fetch("temp"), None);
        assert_eq!(provider.fetch("uptime"), None);
        assert_eq!(provider.fetch("name"), Some(Value::from("ok")));
    }

    #[test]
    fn test_snapshot_failed_load_keeps_previous() {
        let file = value_file(r#"{"temp": 5}"#);
        let provider = SnapshotProvider::new(file.path(), schema());
        provider.load().unwrap();

        std::fs::write(file.path(), b"{not json").unwrap();
        let err = provider.load().unwrap_err();
        assert!(matches!(err, Error::ParseFile { .. }));
        assert_eq!(provider.fetch("temp"), Some(Value::Integer(5)));
    }

    #[test]
    fn test_snapshot_missing_file() {
        let provider = SnapshotProvider::new("/nonexistent/values.json", schema());
        assert!(matches!(provider.load(), Err(Error::ReadFile { .. })));
    }

    #[tokio::test]
    async fn test_snapshot_reload_picks_up_changes() {
        let file = value_file(r#"{"temp": 5}"#);
        let provider = SnapshotProvider::new(file.path(), schema());
        provider.reload().await.unwrap();

        std::fs::write(file.path(), br#"{"temp": 6}"#).unwrap();
        provider.reload().await.unwrap();
        assert_eq!(provider.fetch("temp"), Some(Value::Integer(6)));
    }

    #[tokio::test]
    async fn test_spawn_refresh_stops_on_cancel() {
        let file = value_file(r#"{"temp": 5}"#);
        let provider = Arc::new(SnapshotProvider::new(file.path(), schema()));
        provider.load().unwrap();

        let cancel = CancellationToken::new();
        let handle = provider.spawn_refresh(Duration::from_secs(5), cancel.clone());
        cancel.cancel();
        handle.await.unwrap();
        assert_eq!(provider.fetch("temp"), Some(Value::Integer(5)));
    }
}
