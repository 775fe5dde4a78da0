//! In-process broadcast bus
//!
//! Simulates a shared radio medium between nodes living in one process.
//! Topology is either fully connected or an explicit set of undirected
//! links. Frames go through the wire codec on every hop and a sender never
//! hears its own broadcast.

use crate::codec::{decode_frame, encode_frame};
use crate::mesh::MeshMessage;
use crate::transport::error::{TransportError, TransportResult};
use crate::transport::{InboundSink, Transport};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone)]
enum Topology {
    FullyConnected,
    Links(HashSet<(String, String)>),
}

impl Topology {
    fn connected(&self, a: &str, b: &str) -> bool {
        match self {
            Topology::FullyConnected => true,
            Topology::Links(links) => links.contains(&link_key(a, b)),
        }
    }
}

fn link_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

struct BusInner {
    endpoints: DashMap<String, Option<InboundSink>>,
    topology: RwLock<Topology>,
    frames_sent: AtomicU64,
    frames_delivered: AtomicU64,
    frames_dropped: AtomicU64,
}

/// Shared medium that [`LocalTransport`] endpoints attach to
#[derive(Clone)]
pub struct LocalBus {
    inner: Arc<BusInner>,
}

impl LocalBus {
    /// Every endpoint hears every other endpoint
    pub fn fully_connected() -> Self {
        Self::with_topology(Topology::FullyConnected)
    }

    /// Endpoints hear each other only once linked
    pub fn with_links() -> Self {
        Self::with_topology(Topology::Links(HashSet::new()))
    }

    fn with_topology(topology: Topology) -> Self {
        Self {
            inner: Arc::new(BusInner {
                endpoints: DashMap::new(),
                topology: RwLock::new(topology),
                frames_sent: AtomicU64::new(0),
                frames_delivered: AtomicU64::new(0),
                frames_dropped: AtomicU64::new(0),
            }),
        }
    }

    /// Register an endpoint named `name`
    pub fn endpoint(&self, name: impl Into<String>) -> LocalTransport {
        let name = name.into();
        self.inner.endpoints.entry(name.clone()).or_insert(None);
        LocalTransport {
            name,
            bus: self.clone(),
        }
    }

    /// Connect two endpoints (switches a fully connected bus to explicit links)
    pub fn link(&self, a: &str, b: &str) {
        let mut topology = self.inner.topology.write();
        match &mut *topology {
            Topology::Links(links) => {
                links.insert(link_key(a, b));
            }
            Topology::FullyConnected => {
                let mut links = HashSet::new();
                links.insert(link_key(a, b));
                *topology = Topology::Links(links);
            }
        }
    }

    /// Disconnect two endpoints
    pub fn unlink(&self, a: &str, b: &str) {
        if let Topology::Links(links) = &mut *self.inner.topology.write() {
            links.remove(&link_key(a, b));
        }
    }

    pub fn is_linked(&self, a: &str, b: &str) -> bool {
        self.inner.topology.read().connected(a, b)
    }

    /// Names of endpoints `name` can reach
    pub fn neighbors(&self, name: &str) -> Vec<String> {
        let topology = self.inner.topology.read();
        let mut neighbors: Vec<String> = self
            .inner
            .endpoints
            .iter()
            .map(|e| e.key().clone())
            .filter(|other| other != name && topology.connected(name, other))
            .collect();
        neighbors.sort();
        neighbors
    }

    /// Hand raw bytes to one endpoint as if they arrived over the air
    pub fn inject_frame(&self, to: &str, frame: &[u8]) -> TransportResult<()> {
        let endpoint = self
            .inner
            .endpoints
            .get(to)
            .ok_or_else(|| TransportError::UnknownEndpoint(to.to_string()))?;

        match decode_frame(frame) {
            Ok(message) => {
                if let Some(sink) = endpoint.value() {
                    if sink.send(message).is_ok() {
                        self.inner.frames_delivered.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
            Err(e) => {
                self.inner.frames_dropped.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Dropping malformed frame for {}: {}", to, e);
            }
        }
        Ok(())
    }

    /// Broadcasts performed by all endpoints
    pub fn frames_sent(&self) -> u64 {
        self.inner.frames_sent.load(Ordering::Relaxed)
    }

    /// Frames handed to a listening endpoint
    pub fn frames_delivered(&self) -> u64 {
        self.inner.frames_delivered.load(Ordering::Relaxed)
    }

    /// Frames discarded because they failed to decode
    pub fn frames_dropped(&self) -> u64 {
        self.inner.frames_dropped.load(Ordering::Relaxed)
    }

    fn deliver(&self, from: &str, frame: &[u8]) {
        self.inner.frames_sent.fetch_add(1, Ordering::Relaxed);

        let message = match decode_frame(frame) {
            Ok(message) => message,
            Err(e) => {
                self.inner.frames_dropped.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Dropping malformed frame from {}: {}", from, e);
                return;
            }
        };

        let topology = self.inner.topology.read();
        for endpoint in self.inner.endpoints.iter() {
            let name = endpoint.key().as_str();
            if name == from || !topology.connected(from, name) {
                continue;
            }
            if let Some(sink) = endpoint.value() {
                if sink.send(message.clone()).is_ok() {
                    self.inner.frames_delivered.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }
}

impl Default for LocalBus {
    fn default() -> Self {
        Self::fully_connected()
    }
}

/// One node's attachment to a [`LocalBus`]
pub struct LocalTransport {
    name: String,
    bus: LocalBus,
}

impl LocalTransport {
    pub fn endpoint_name(&self) -> &str {
        &self.name
    }

    pub fn bus(&self) -> &LocalBus {
        &self.bus
    }
}

#[async_trait]
impl Transport for LocalTransport {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn broadcast(&self, message: &MeshMessage) {
        match encode_frame(message) {
            Ok(frame) => self.bus.deliver(&self.name, &frame),
            Err(e) => tracing::warn!("Cannot encode message {}: {}", message.id, e),
        }
    }

    async fn on_receive(&self, sink: InboundSink) -> TransportResult<()> {
        self.bus.inner.endpoints.insert(self.name.clone(), Some(sink));
        Ok(())
    }

    async fn detach(&self) {
        if let Some(mut slot) = self.bus.inner.endpoints.get_mut(&self.name) {
            *slot = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode_frame;
    use crate::mesh::{MessageType, NodeIdentity, GLOBAL_CHANNEL, MAX_TTL};
    use tokio::sync::mpsc;

    fn message() -> MeshMessage {
        let identity = NodeIdentity::new("FM-AAA111", "Asha");
        MeshMessage::originate(&identity, "hello", MessageType::Text, GLOBAL_CHANNEL, MAX_TTL)
    }

    #[tokio::test]
    async fn test_fully_connected_delivery() {
        let bus = LocalBus::fully_connected();
        let a = bus.endpoint("a");
        let b = bus.endpoint("b");
        let c = bus.endpoint("c");

        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        let (tx_c, mut rx_c) = mpsc::unbounded_channel();
        a.on_receive(tx_a).await.unwrap();
        b.on_receive(tx_b).await.unwrap();
        c.on_receive(tx_c).await.unwrap();

        let msg = message();
        a.broadcast(&msg).await;

        assert_eq!(rx_b.try_recv().unwrap(), msg);
        assert_eq!(rx_c.try_recv().unwrap(), msg);
        assert!(rx_a.try_recv().is_err());
        assert_eq!(bus.frames_sent(), 1);
        assert_eq!(bus.frames_delivered(), 2);
    }

    #[tokio::test]
    async fn test_links_limit_reach() {
        let bus = LocalBus::with_links();
        let a = bus.endpoint("a");
        let b = bus.endpoint("b");
        let c = bus.endpoint("c");
        bus.link("a", "b");
        bus.link("b", "c");

        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        let (tx_c, mut rx_c) = mpsc::unbounded_channel();
        b.on_receive(tx_b).await.unwrap();
        c.on_receive(tx_c).await.unwrap();

        a.broadcast(&message()).await;

        assert!(rx_b.try_recv().is_ok());
        assert!(rx_c.try_recv().is_err());
        assert_eq!(bus.neighbors("b"), vec!["a".to_string(), "c".to_string()]);

        bus.unlink("a", "b");
        assert!(!bus.is_linked("a", "b"));
    }

    #[tokio::test]
    async fn test_detach_stops_delivery() {
        let bus = LocalBus::fully_connected();
        let a = bus.endpoint("a");
        let b = bus.endpoint("b");

        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        b.on_receive(tx_b).await.unwrap();
        b.detach().await;

        a.broadcast(&message()).await;
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_injected_garbage_is_dropped() {
        let bus = LocalBus::fully_connected();
        let b = bus.endpoint("b");
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        b.on_receive(tx_b).await.unwrap();

        bus.inject_frame("b", b"definitely not a frame").unwrap();
        assert!(rx_b.try_recv().is_err());
        assert_eq!(bus.frames_dropped(), 1);

        let frame = encode_frame(&message()).unwrap();
        bus.inject_frame("b", &frame).unwrap();
        assert!(rx_b.try_recv().is_ok());

        assert!(matches!(
            bus.inject_frame("nobody", &frame),
            Err(TransportError::UnknownEndpoint(_))
        ));
    }
}
