//! Peers heard on the mesh

use crate::mesh::MeshMessage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// A node this relay has heard from, directly or through relays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerInfo {
    pub node_id: String,

    /// Most recent nickname the peer used
    pub nickname: String,

    pub last_seen: DateTime<Utc>,

    /// Medium the last message arrived on
    pub transport: String,

    /// Relays the last message took to get here, 0 for a direct neighbour
    pub hops: u32,

    /// Messages accepted from this peer
    pub messages: u64,
}

/// Senders of accepted messages, keyed by node id. The owner keeps its own
/// node id out.
#[derive(Debug, Default)]
pub struct PeerTable {
    peers: HashMap<String, PeerInfo>,
}

impl PeerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, message: &MeshMessage, transport: &str) {
        self.observe_at(message, transport, Utc::now());
    }

    /// Record the sender of an accepted message
    pub fn observe_at(&mut self, message: &MeshMessage, transport: &str, now: DateTime<Utc>) {
        let nickname = message
            .announced_nickname()
            .unwrap_or_else(|| message.sender_name.clone());

        let peer = self
            .peers
            .entry(message.sender_id.clone())
            .or_insert_with(|| PeerInfo {
                node_id: message.sender_id.clone(),
                nickname: nickname.clone(),
                last_seen: now,
                transport: transport.to_string(),
                hops: message.hops,
                messages: 0,
            });

        if !nickname.is_empty() {
            peer.nickname = nickname;
        }
        peer.last_seen = peer.last_seen.max(now);
        peer.transport = transport.to_string();
        peer.hops = message.hops;
        peer.messages += 1;
    }

    pub fn get(&self, node_id: &str) -> Option<&PeerInfo> {
        self.peers.get(node_id)
    }

    /// Peers heard within `timeout` of now
    pub fn active_count(&self, timeout: Duration) -> usize {
        self.active_count_at(timeout, Utc::now())
    }

    pub fn active_count_at(&self, timeout: Duration, now: DateTime<Utc>) -> usize {
        self.peers
            .values()
            .filter(|peer| {
                (now - peer.last_seen)
                    .to_std()
                    .map(|age| age <= timeout)
                    .unwrap_or(true)
            })
            .count()
    }

    /// All known peers, most recently heard first
    pub fn list(&self) -> Vec<PeerInfo> {
        let mut peers: Vec<PeerInfo> = self.peers.values().cloned().collect();
        peers.sort_by(|a, b| b.last_seen.cmp(&a.last_seen).then(a.node_id.cmp(&b.node_id)));
        peers
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{MessageType, NodeIdentity, GLOBAL_CHANNEL, MAX_TTL};

    fn from(node_id: &str, nickname: &str) -> MeshMessage {
        let identity = NodeIdentity::new(node_id, nickname);
        MeshMessage::originate(&identity, "hi", MessageType::Text, GLOBAL_CHANNEL, MAX_TTL)
    }

    #[test]
    fn test_observe_updates_peer() {
        let mut table = PeerTable::new();
        table.observe(&from("FM-AAA111", "Asha"), "local");
        table.observe(&from("FM-AAA111", "Asha K"), "udp");

        let peer = table.get("FM-AAA111").unwrap();
        assert_eq!(peer.nickname, "Asha K");
        assert_eq!(peer.transport, "udp");
        assert_eq!(peer.messages, 2);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_presence_nickname_taken() {
        let mut table = PeerTable::new();
        let identity = NodeIdentity::new("FM-BBB222", "Bilal");
        let mut join = MeshMessage::presence(&identity, GLOBAL_CHANNEL);
        join.sender_name = String::new();

        table.observe(&join, "local");
        assert_eq!(table.get("FM-BBB222").unwrap().nickname, "Bilal");
    }

    #[test]
    fn test_active_count_window() {
        let mut table = PeerTable::new();
        let now = Utc::now();
        table.observe_at(&from("FM-AAA111", "Asha"), "local", now - chrono::Duration::minutes(10));
        table.observe_at(&from("FM-BBB222", "Bilal"), "local", now - chrono::Duration::minutes(1));

        assert_eq!(table.active_count_at(Duration::from_secs(300), now), 1);
        assert_eq!(table.list()[0].node_id, "FM-BBB222");
    }
}
