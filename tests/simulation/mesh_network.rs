use crate::simulation::LossyTransport;
use floodmesh::engine::{MeshRelay, MessageCallback};
use floodmesh::mesh::{MeshMessage, NodeIdentity};
use floodmesh::store::MemoryStore;
use floodmesh::transport::{LocalBus, Transport};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::time::{sleep, Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(dead_code)]
pub enum Topology {
    /// Node i hears only i-1 and i+1
    Line,
    /// A line whose ends are linked
    Ring,
    /// Every node hears every other node
    Full,
}

pub type Inbox = Arc<Mutex<Vec<MeshMessage>>>;

/// One simulated node and everything its UI was handed
pub struct SimNode {
    pub node_id: String,
    pub relay: Arc<MeshRelay>,
    pub inbox: Inbox,
}

#[allow(dead_code)]
impl SimNode {
    /// Copies of message `id` delivered to this node's UI
    pub fn deliveries(&self, id: &str) -> Vec<MeshMessage> {
        self.inbox
            .lock()
            .iter()
            .filter(|m| m.id == id)
            .cloned()
            .collect()
    }

    pub fn delivered_count(&self) -> usize {
        self.inbox.lock().len()
    }
}

pub struct MeshNetwork {
    pub bus: LocalBus,
    pub nodes: Vec<SimNode>,
}

#[allow(dead_code)]
impl MeshNetwork {
    pub async fn new(size: usize, topology: Topology) -> Self {
        Self::build(size, topology, None).await
    }

    /// Every node drops inbound frames with probability `loss_rate`
    pub async fn lossy(size: usize, topology: Topology, loss_rate: f64, seed: u64) -> Self {
        Self::build(size, topology, Some((loss_rate, seed))).await
    }

    async fn build(size: usize, topology: Topology, loss: Option<(f64, u64)>) -> Self {
        let bus = match topology {
            Topology::Full => LocalBus::fully_connected(),
            Topology::Line | Topology::Ring => LocalBus::with_links(),
        };

        let ids: Vec<String> = (0..size).map(|i| format!("FM-{:06}", i)).collect();

        if topology != Topology::Full {
            for pair in ids.windows(2) {
                bus.link(&pair[0], &pair[1]);
            }
            if topology == Topology::Ring && size > 2 {
                bus.link(&ids[size - 1], &ids[0]);
            }
        }

        let mut nodes = Vec::with_capacity(size);
        for (i, node_id) in ids.into_iter().enumerate() {
            let endpoint = bus.endpoint(node_id.clone());
            let transport: Arc<dyn Transport> = match loss {
                Some((rate, seed)) => Arc::new(LossyTransport::new(endpoint, rate, seed + i as u64)),
                None => Arc::new(endpoint),
            };

            let relay = MeshRelay::builder()
                .identity(NodeIdentity::new(node_id.clone(), format!("Node {}", i)))
                .store(Arc::new(MemoryStore::new()))
                .transport(transport)
                .announce_presence(false)
                .build()
                .unwrap();

            let inbox: Inbox = Arc::default();
            let sink = inbox.clone();
            let callback: MessageCallback = Arc::new(move |m: &MeshMessage| sink.lock().push(m.clone()));
            relay.start(callback).await.unwrap();

            nodes.push(SimNode {
                node_id,
                relay: Arc::new(relay),
                inbox,
            });
        }

        Self { bus, nodes }
    }

    pub fn node(&self, index: usize) -> &SimNode {
        &self.nodes[index]
    }

    /// Frames handled by all nodes so far
    fn activity(&self) -> (u64, u64) {
        let processed = self
            .nodes
            .iter()
            .map(|n| {
                let stats = n.relay.stats();
                stats.received + stats.duplicates + stats.malformed
            })
            .sum();
        (self.bus.frames_sent(), processed)
    }

    /// Wait until no frame has moved for a few polling rounds
    pub async fn settle(&self) {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut last = self.activity();
        let mut quiet_rounds = 0;

        while quiet_rounds < 5 && Instant::now() < deadline {
            sleep(Duration::from_millis(20)).await;
            let now = self.activity();
            if now == last {
                quiet_rounds += 1;
            } else {
                quiet_rounds = 0;
                last = now;
            }
        }
    }

    pub async fn shutdown(&self) {
        for node in &self.nodes {
            node.relay.stop().await;
        }
    }
}
