//! Read-only SNMPv2c agent.
//!
//! The agent answers GET, GETNEXT and GETBULK requests for the scalars in an
//! [`ObjectStore`], authenticating each request against a [`CommunityTable`]
//! and reading values through a [`ValueProvider`].
//!
//! Protocol handling lives in [`Dispatcher`], which turns a datagram into an
//! optional reply without touching the network. [`Agent`] wraps it in a UDP
//! receive loop that handles each datagram in its own task.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! use async_snmp_agent::agent::{Agent, CommunityTable};
//! use async_snmp_agent::handler::{ManagedObject, ObjectStore};
//! use async_snmp_agent::{Syntax, Value, oid};
//!
//! # async fn example() -> async_snmp_agent::Result<()> {
//! let store = ObjectStore::from_objects(vec![ManagedObject::new(
//!     oid!(1, 3, 6, 1, 4, 1, 99999, 1, 1, 0),
//!     Syntax::Integer32,
//!     "temperature",
//! )])?;
//! let values = HashMap::from([("temperature".to_string(), Value::Integer(21))]);
//!
//! let agent = Agent::builder()
//!     .bind("0.0.0.0:161")
//!     .store(store)
//!     .communities(
//!         CommunityTable::builder()
//!             .community("public", "my-area", |p| p.include(oid!(1, 3, 6, 1, 4, 1, 99999)))
//!             .build()?,
//!     )
//!     .provider(Arc::new(values))
//!     .build()
//!     .await?;
//!
//! agent.run().await
//! # }
//! ```

mod dispatch;
pub mod vacm;

pub use dispatch::{DEFAULT_MAX_BULK_VARBINDS, DEFAULT_MAX_MESSAGE_SIZE, Dispatcher, DropCounters};
pub use vacm::{AccessProfile, Community, CommunityTable, CommunityTableBuilder, is_readable};

use std::collections::HashMap;
use std::io::IoSliceMut;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use quinn_udp::{RecvMeta, Transmit, UdpSockRef, UdpSocketState};
use tokio::net::UdpSocket;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::error::{ConfigErrorKind, Error, Result};
use crate::handler::{ObjectStore, ValueProvider};
use crate::util::bind_udp_socket;
use crate::value::Value;

/// Default limit on requests handled at the same time.
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 1000;

/// Default socket receive buffer size.
pub const DEFAULT_RECV_BUFFER_SIZE: usize = 4 * 1024 * 1024;

/// Builder for [`Agent`].
pub struct AgentBuilder {
    bind_addr: String,
    store: ObjectStore,
    communities: Option<CommunityTable>,
    provider: Option<Arc<dyn ValueProvider>>,
    max_bulk_varbinds: usize,
    max_message_size: usize,
    max_concurrent_requests: Option<usize>,
    recv_buffer_size: Option<usize>,
    cancel: Option<CancellationToken>,
}

impl AgentBuilder {
    /// Create a builder with default settings.
    ///
    /// Defaults:
    /// - Bind address: `0.0.0.0:161`
    /// - No objects, no communities, no values
    /// - GETBULK cap: 100 varbinds
    /// - Max message size: 1472 bytes (Ethernet MTU - IP/UDP headers)
    /// - Max concurrent requests: 1000
    /// - Receive buffer: 4MB (kernel may cap)
    pub fn new() -> Self {
        Self {
            bind_addr: "0.0.0.0:161".to_string(),
            store: ObjectStore::default(),
            communities: None,
            provider: None,
            max_bulk_varbinds: DEFAULT_MAX_BULK_VARBINDS,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            max_concurrent_requests: Some(DEFAULT_MAX_CONCURRENT_REQUESTS),
            recv_buffer_size: Some(DEFAULT_RECV_BUFFER_SIZE),
            cancel: None,
        }
    }

    /// Set the UDP bind address.
    ///
    /// Use `[::]:161` for dual-stack and `127.0.0.1:0` for an ephemeral
    /// localhost port.
    pub fn bind(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = addr.into();
        self
    }

    /// Set the managed objects to serve.
    pub fn store(mut self, store: ObjectStore) -> Self {
        self.store = store;
        self
    }

    /// Set the accepted communities. Required.
    pub fn communities(mut self, communities: CommunityTable) -> Self {
        self.communities = Some(communities);
        self
    }

    /// Set the source of object values.
    ///
    /// Without one, every object resolves to `noSuchObject`.
    pub fn provider(mut self, provider: Arc<dyn ValueProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the most varbinds a GETBULK response may carry.
    pub fn max_bulk_varbinds(mut self, limit: usize) -> Self {
        self.max_bulk_varbinds = limit;
        self
    }

    /// Set the maximum response size in bytes.
    pub fn max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    /// Limit concurrent request tasks. `None` means unbounded.
    pub fn max_concurrent_requests(mut self, limit: Option<usize>) -> Self {
        self.max_concurrent_requests = limit;
        self
    }

    /// Set the socket receive buffer size. `None` keeps the OS default.
    pub fn recv_buffer_size(mut self, size: Option<usize>) -> Self {
        self.recv_buffer_size = size;
        self
    }

    /// Set a cancellation token for graceful shutdown.
    ///
    /// If not set, the agent creates its own token accessible via
    /// [`Agent::cancel()`].
    pub fn cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Bind the socket and build the agent.
    pub async fn build(self) -> Result<Agent> {
        let communities = self
            .communities
            .ok_or_else(|| Error::config(ConfigErrorKind::NoCommunities))?;
        if self.max_bulk_varbinds == 0 {
            return Err(Error::config(ConfigErrorKind::ZeroBulkCap));
        }

        let bind_addr: SocketAddr = self.bind_addr.parse().map_err(|_| {
            Error::config(ConfigErrorKind::InvalidBindAddress {
                addr: self.bind_addr.clone(),
            })
        })?;

        let io_err = |source| Error::Io {
            target: Some(bind_addr),
            source,
        };

        let socket = bind_udp_socket(bind_addr, self.recv_buffer_size)
            .await
            .map_err(io_err)?;
        let local_addr = socket.local_addr().map_err(io_err)?;
        let socket_state = UdpSocketState::new(UdpSockRef::from(&socket)).map_err(io_err)?;

        let provider = self
            .provider
            .unwrap_or_else(|| Arc::new(HashMap::<String, Value>::new()));

        let dispatcher = Dispatcher::new(self.store, communities, provider)
            .max_bulk_varbinds(self.max_bulk_varbinds)
            .max_message_size(self.max_message_size);

        let concurrency_limit = self
            .max_concurrent_requests
            .map(|n| Arc::new(Semaphore::new(n)));

        tracing::debug!(target: "async_snmp_agent::agent", { snmp.local_addr = %local_addr, objects = dispatcher.store().len(), communities = dispatcher.communities().len() }, "agent bound");

        Ok(Agent {
            inner: Arc::new(AgentInner {
                socket,
                socket_state,
                local_addr,
                dispatcher,
                concurrency_limit,
                cancel: self.cancel.unwrap_or_default(),
            }),
        })
    }
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

struct AgentInner {
    socket: UdpSocket,
    socket_state: UdpSocketState,
    local_addr: SocketAddr,
    dispatcher: Dispatcher,
    concurrency_limit: Option<Arc<Semaphore>>,
    cancel: CancellationToken,
}

/// SNMPv2c agent bound to a UDP socket.
///
/// Cloning is cheap; clones share the socket, the dispatcher and the
/// cancellation token.
#[derive(Clone)]
pub struct Agent {
    inner: Arc<AgentInner>,
}

impl Agent {
    /// Create a builder for configuring the agent.
    pub fn builder() -> AgentBuilder {
        AgentBuilder::new()
    }

    /// Get the local address the agent is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.inner.local_addr
    }

    /// Get the cancellation token for this agent.
    ///
    /// Call `token.cancel()` to initiate graceful shutdown.
    pub fn cancel(&self) -> CancellationToken {
        self.inner.cancel.clone()
    }

    /// The request dispatcher.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }

    /// Counters for requests that received no response.
    pub fn counters(&self) -> &DropCounters {
        self.inner.dispatcher.counters()
    }

    /// Run the agent, processing requests concurrently.
    ///
    /// Each datagram is decoded, dispatched and answered in its own task, up
    /// to the configured `max_concurrent_requests`. This method runs until
    /// the cancellation token is triggered.
    #[instrument(skip(self), err, fields(snmp.local_addr = %self.local_addr()))]
    pub async fn run(&self) -> Result<()> {
        let mut buf = vec![0u8; 65535];

        loop {
            let recv_meta = tokio::select! {
                result = self.recv_packet(&mut buf) => {
                    result?
                }
                _ = self.inner.cancel.cancelled() => {
                    tracing::info!(target: "async_snmp_agent::agent", "agent shutdown requested");
                    return Ok(());
                }
            };

            let data = Bytes::copy_from_slice(&buf[..recv_meta.len]);
            let agent = self.clone();

            let permit = match self.inner.concurrency_limit {
                Some(ref sem) => sem.clone().acquire_owned().await.ok(),
                None => None,
            };

            tokio::spawn(async move {
                let source = recv_meta.addr;
                if let Some(response) = agent.inner.dispatcher.handle(data, Some(source))
                    && let Err(e) = agent.send_response(&response, &recv_meta).await
                {
                    tracing::warn!(target: "async_snmp_agent::agent", { snmp.source = %source, error = %e }, "failed to send response");
                }

                drop(permit);
            });
        }
    }

    async fn recv_packet(&self, buf: &mut [u8]) -> Result<RecvMeta> {
        let mut iov = [IoSliceMut::new(buf)];
        let mut meta = [RecvMeta::default()];

        loop {
            self.inner.socket.readable().await.map_err(|e| Error::Io {
                target: Some(self.inner.local_addr),
                source: e,
            })?;

            let result = self.inner.socket.try_io(tokio::io::Interest::READABLE, || {
                let sref = UdpSockRef::from(&self.inner.socket);
                self.inner.socket_state.recv(sref, &mut iov, &mut meta)
            });

            match result {
                Ok(n) if n > 0 => return Ok(meta[0]),
                Ok(_) => continue,
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => continue,
                Err(e) => {
                    return Err(Error::Io {
                        target: Some(self.inner.local_addr),
                        source: e,
                    });
                }
            }
        }
    }

    /// Reply from the address the request was sent to, so multi-homed hosts
    /// answer from the expected interface.
    async fn send_response(&self, data: &[u8], recv_meta: &RecvMeta) -> std::io::Result<()> {
        let transmit = Transmit {
            destination: recv_meta.addr,
            ecn: None,
            contents: data,
            segment_size: None,
            src_ip: recv_meta.dst_ip,
        };

        loop {
            self.inner.socket.writable().await?;

            let result = self.inner.socket.try_io(tokio::io::Interest::WRITABLE, || {
                let sref = UdpSockRef::from(&self.inner.socket);
                self.inner.socket_state.try_send(sref, &transmit)
            });

            match result {
                Ok(()) => return Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("local_addr", &self.inner.local_addr)
            .field("dispatcher", &self.inner.dispatcher)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;

    fn communities() -> CommunityTable {
        CommunityTable::builder()
            .community("public", "my-area", |p| p.include(oid!(1, 3, 6, 1, 4, 1, 99999)))
            .build()
            .unwrap()
    }

    #[test]
    fn test_agent_builder_defaults() {
        let builder = AgentBuilder::new();
        assert_eq!(builder.bind_addr, "0.0.0.0:161");
        assert_eq!(builder.max_bulk_varbinds, DEFAULT_MAX_BULK_VARBINDS);
        assert_eq!(builder.max_message_size, DEFAULT_MAX_MESSAGE_SIZE);
        assert_eq!(builder.max_concurrent_requests, Some(1000));
        assert!(builder.communities.is_none());
        assert!(builder.provider.is_none());
    }

    #[tokio::test]
    async fn test_build_requires_communities() {
        let err = Agent::builder().bind("127.0.0.1:0").build().await.unwrap_err();
        assert!(matches!(
            err,
            Error::Config {
                kind: ConfigErrorKind::NoCommunities
            }
        ));
    }

    #[tokio::test]
    async fn test_build_rejects_bad_bind_address() {
        let err = Agent::builder()
            .bind("not-an-address")
            .communities(communities())
            .build()
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Config {
                kind: ConfigErrorKind::InvalidBindAddress { .. }
            }
        ));
    }

    #[tokio::test]
    async fn test_build_rejects_zero_bulk_cap() {
        let err = Agent::builder()
            .bind("127.0.0.1:0")
            .communities(communities())
            .max_bulk_varbinds(0)
            .build()
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Config {
                kind: ConfigErrorKind::ZeroBulkCap
            }
        ));
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let agent = Agent::builder()
            .bind("127.0.0.1:0")
            .communities(communities())
            .build()
            .await
            .unwrap();
        assert_ne!(agent.local_addr().port(), 0);

        let cancel = agent.cancel();
        let task = tokio::spawn({
            let agent = agent.clone();
            async move { agent.run().await }
        });
        cancel.cancel();
        task.await.unwrap().unwrap();
    }
}
