//! Flood behaviour under frame loss and concurrent senders

mod simulation;

use simulation::{MeshNetwork, Topology};
use std::collections::HashSet;

/// Redundant relays in a dense mesh cover for lost frames
#[tokio::test]
async fn test_flood_survives_frame_loss() {
    let net = MeshNetwork::lossy(8, Topology::Full, 0.2, 42).await;

    let sent = net.node(0).relay.send_sos("Relief camp, school grounds").await;
    net.settle().await;

    for node in &net.nodes {
        assert_eq!(
            node.deliveries(&sent.id).len(),
            1,
            "{} missed the SOS",
            node.node_id
        );
    }

    net.shutdown().await;
}

/// Many nodes talking at once: everyone sees every message exactly once
#[tokio::test]
async fn test_concurrent_senders() {
    const NODES: usize = 6;
    const PER_NODE: usize = 20;

    let net = MeshNetwork::new(NODES, Topology::Full).await;

    let mut handles = Vec::new();
    for node in &net.nodes {
        let relay = node.relay.clone();
        handles.push(tokio::spawn(async move {
            let mut ids = Vec::with_capacity(PER_NODE);
            for n in 0..PER_NODE {
                ids.push(relay.send_text(&format!("status {}", n)).await.id);
            }
            ids
        }));
    }

    let mut all_ids = HashSet::new();
    for handle in handles {
        all_ids.extend(handle.await.unwrap());
    }
    assert_eq!(all_ids.len(), NODES * PER_NODE);

    net.settle().await;

    for node in &net.nodes {
        let inbox = node.inbox.lock();
        let seen: HashSet<&String> = inbox.iter().map(|m| &m.id).collect();
        assert_eq!(inbox.len(), NODES * PER_NODE, "{} delivered {}", node.node_id, inbox.len());
        assert_eq!(seen.len(), inbox.len());

        let stats = node.relay.stats();
        assert_eq!(stats.originated as usize, PER_NODE);
        assert_eq!(stats.received as usize, (NODES - 1) * PER_NODE);
        assert_eq!(stats.relayed, stats.received);
    }

    net.shutdown().await;
}

/// Every node along the line keeps only the most recent 200 messages
#[tokio::test]
async fn test_history_stays_bounded() {
    let net = MeshNetwork::new(3, Topology::Line).await;

    for n in 0..250 {
        net.node(0).relay.send_text(&format!("update {}", n)).await;
    }
    net.settle().await;

    for node in &net.nodes {
        let history = node
            .relay
            .history(floodmesh::mesh::GLOBAL_CHANNEL)
            .await;
        assert_eq!(history.len(), 200);
        assert!(history.last().unwrap().payload.ends_with("249"));
    }

    net.shutdown().await;
}
