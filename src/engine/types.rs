//! Relay engine configuration and reporting types

use crate::mesh::{MeshMessage, GLOBAL_CHANNEL, HISTORY_LIMIT, MAX_TTL};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Default bound on remembered message ids
pub const DEFAULT_SEEN_CAPACITY: usize = 4096;

/// Default window in which a peer counts as active
pub const DEFAULT_PEER_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// UI sink invoked once per delivered message
pub type MessageCallback = Arc<dyn Fn(&MeshMessage) + Send + Sync>;

/// Configuration for a mesh relay node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshConfig {
    /// Hop budget given to originated messages
    pub max_ttl: u8,

    /// Messages kept by the default in-memory store
    pub history_limit: usize,

    /// Channel used by the send helpers and replayed on start
    pub default_channel: String,

    /// Message ids remembered for dedup
    pub seen_capacity: usize,

    /// Broadcast a join announcement on start
    pub announce_presence: bool,

    /// How long a silent peer still counts as active
    pub peer_timeout: Duration,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            max_ttl: MAX_TTL,
            history_limit: HISTORY_LIMIT,
            default_channel: GLOBAL_CHANNEL.to_string(),
            seen_capacity: DEFAULT_SEEN_CAPACITY,
            announce_presence: true,
            peer_timeout: DEFAULT_PEER_TIMEOUT,
        }
    }
}

/// Snapshot handed to the UI by `start` and `status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshStatus {
    pub node_id: String,
    pub nickname: String,
    pub active: bool,
    pub peer_count: usize,
    pub messages_relayed: u64,
}

/// Counters for a relay node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayStats {
    /// Messages originated locally
    pub originated: u64,

    /// Inbound messages accepted as new
    pub received: u64,

    /// Relay copies broadcast
    pub relayed: u64,

    /// Inbound messages discarded as already seen
    pub duplicates: u64,

    /// Inbound messages that failed validation
    pub malformed: u64,

    /// Messages handed to the UI callback
    pub delivered: u64,
}

impl RelayStats {
    /// Share of accepted messages this node forwarded
    pub fn relay_ratio(&self) -> f64 {
        if self.received == 0 {
            return 0.0;
        }
        self.relayed as f64 / self.received as f64
    }
}

impl std::fmt::Display for RelayStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Mesh: {} sent, {} recv, {} relayed, {} dup, {} malformed",
            self.originated, self.received, self.relayed, self.duplicates, self.malformed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mesh_config_default() {
        let config = MeshConfig::default();
        assert_eq!(config.max_ttl, 7);
        assert_eq!(config.history_limit, 200);
        assert_eq!(config.default_channel, "floodmesh-global");
        assert_eq!(config.seen_capacity, 4096);
        assert!(config.announce_presence);
        assert_eq!(config.peer_timeout, Duration::from_secs(300));
    }

    #[test]
    fn test_status_wire_names() {
        let status = MeshStatus {
            node_id: "FM-AAA111".into(),
            nickname: "Asha".into(),
            active: true,
            peer_count: 2,
            messages_relayed: 5,
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["nodeId"], "FM-AAA111");
        assert_eq!(json["peerCount"], 2);
        assert_eq!(json["messagesRelayed"], 5);
    }

    #[test]
    fn test_relay_stats_display() {
        let stats = RelayStats {
            originated: 1,
            received: 4,
            relayed: 2,
            ..Default::default()
        };
        assert!((stats.relay_ratio() - 0.5).abs() < f64::EPSILON);
        assert!(stats.to_string().contains("2 relayed"));
    }
}
