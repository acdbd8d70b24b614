//! In-process agent and a minimal manager for end-to-end tests.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_snmp_agent::agent::{Agent, AgentBuilder, DropCounters};
use async_snmp_agent::handler::ValueProvider;
use async_snmp_agent::{CommunityMessage, Oid, Pdu, Value};
use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

use super::fixtures;

/// How long a manager waits for a reply.
pub const REPLY_TIMEOUT: Duration = Duration::from_millis(500);

/// Agent bound to an ephemeral loopback port, running until dropped.
pub struct TestAgent {
    agent: Agent,
    task: Option<JoinHandle<()>>,
}

impl TestAgent {
    /// Start an agent over the fixture store, communities and values.
    pub async fn start() -> Self {
        Self::start_with(|builder| builder).await
    }

    /// Start an agent after customizing the fixture builder.
    pub async fn start_with(customize: impl FnOnce(AgentBuilder) -> AgentBuilder) -> Self {
        let values: HashMap<String, Value> = fixtures::values();
        let provider: Arc<dyn ValueProvider> = Arc::new(values);
        let builder = Agent::builder()
            .bind("127.0.0.1:0")
            .store(fixtures::store())
            .communities(fixtures::communities())
            .provider(provider);

        let agent = customize(builder).build().await.expect("agent should bind");
        let task = tokio::spawn({
            let agent = agent.clone();
            async move {
                agent.run().await.expect("agent run failed");
            }
        });

        Self {
            agent,
            task: Some(task),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.agent.local_addr()
    }

    pub fn counters(&self) -> &DropCounters {
        self.agent.counters()
    }

    /// A manager speaking the fixture community.
    pub async fn manager(&self) -> Manager {
        Manager::connect(self.addr(), fixtures::COMMUNITY).await
    }

    /// Cancel the agent and wait for its loop to exit.
    pub async fn shutdown(mut self) {
        self.agent.cancel().cancel();
        if let Some(task) = self.task.take() {
            task.await.expect("agent task panicked");
        }
    }
}

impl Drop for TestAgent {
    fn drop(&mut self) {
        self.agent.cancel().cancel();
    }
}

/// Connected UDP socket sending v2c requests to one agent.
pub struct Manager {
    socket: UdpSocket,
    community: Bytes,
    next_request_id: i32,
}

impl Manager {
    pub async fn connect(agent: SocketAddr, community: &str) -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").await.expect("bind manager");
        socket.connect(agent).await.expect("connect manager");
        Self {
            socket,
            community: Bytes::copy_from_slice(community.as_bytes()),
            next_request_id: 1,
        }
    }

    fn request_id(&mut self) -> i32 {
        let id = self.next_request_id;
        self.next_request_id += 1;
        id
    }

    /// Send raw bytes and wait for a reply.
    ///
    /// Returns `None` if nothing arrives within [`REPLY_TIMEOUT`].
    pub async fn exchange(&self, datagram: &[u8]) -> Option<Bytes> {
        self.socket.send(datagram).await.expect("send request");
        let mut buf = vec![0u8; 65535];
        match tokio::time::timeout(REPLY_TIMEOUT, self.socket.recv(&mut buf)).await {
            Ok(Ok(len)) => Some(Bytes::copy_from_slice(&buf[..len])),
            Ok(Err(e)) => panic!("recv failed: {e}"),
            Err(_) => None,
        }
    }

    /// Send a PDU under this manager's community and decode the reply.
    pub async fn request(&self, pdu: Pdu) -> Option<Pdu> {
        let message = CommunityMessage::v2c(self.community.clone(), pdu);
        let reply = self.exchange(&message.encode()).await?;
        let reply = CommunityMessage::decode(reply).expect("agent sent undecodable reply");
        assert_eq!(reply.community, self.community);
        Some(reply.pdu)
    }

    pub async fn get(&mut self, oids: &[Oid]) -> Option<Pdu> {
        let id = self.request_id();
        self.request(Pdu::get_request(id, oids)).await
    }

    pub async fn get_next(&mut self, oids: &[Oid]) -> Option<Pdu> {
        let id = self.request_id();
        self.request(Pdu::get_next_request(id, oids)).await
    }

    pub async fn get_bulk(
        &mut self,
        non_repeaters: i32,
        max_repetitions: i32,
        oids: &[Oid],
    ) -> Option<Pdu> {
        let id = self.request_id();
        self.request(Pdu::get_bulk(id, non_repeaters, max_repetitions, oids))
            .await
    }
}
