//! Mesh message model
//!
//! Field names serialize in camelCase so stored records and frames stay
//! interchangeable with the browser and mobile FloodMesh clients.

use crate::mesh::error::{MeshError, MeshResult};
use crate::mesh::id;
use serde::{Deserialize, Serialize};

/// Hop budget given to every originated message
pub const MAX_TTL: u8 = 7;

/// Number of messages kept in local history
pub const HISTORY_LIMIT: usize = 200;

/// Channel used when the caller does not name one
pub const GLOBAL_CHANNEL: &str = "floodmesh-global";

/// Hop budget of presence announcements
pub const PRESENCE_TTL: u8 = 1;

/// Largest hop count accepted off the wire
pub const MAX_HOPS: u32 = u8::MAX as u32;

/// Identity of this installation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeIdentity {
    pub node_id: String,
    pub nickname: String,
}

impl NodeIdentity {
    pub fn new(node_id: impl Into<String>, nickname: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            nickname: nickname.into(),
        }
    }

    /// Create a fresh random identity
    pub fn generate() -> Self {
        Self::new(id::node_id(), id::nickname())
    }
}

/// Payload classification, drives UI treatment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageType {
    Text,
    Sos,
    Alert,
    Location,
    /// Presence and join announcements
    Ack,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Text => "TEXT",
            MessageType::Sos => "SOS",
            MessageType::Alert => "ALERT",
            MessageType::Location => "LOCATION",
            MessageType::Ack => "ACK",
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message travelling through the mesh
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshMessage {
    /// Originator-assigned unique id
    pub id: String,

    /// Node id of the originator
    pub sender_id: String,

    /// Originator's nickname at send time
    pub sender_name: String,

    /// Logical room
    pub channel_id: String,

    /// Remaining relay budget
    pub ttl: u8,

    /// Relays performed so far
    pub hops: u32,

    /// Nodes that originated or relayed this message, in order
    pub via: Vec<String>,

    #[serde(rename = "type")]
    pub message_type: MessageType,

    pub payload: String,

    /// Origination time, Unix milliseconds
    pub timestamp: i64,
}

impl MeshMessage {
    /// Build a message originating at `identity`
    pub fn originate(
        identity: &NodeIdentity,
        payload: impl Into<String>,
        message_type: MessageType,
        channel_id: impl Into<String>,
        ttl: u8,
    ) -> Self {
        Self {
            id: id::message_id(),
            sender_id: identity.node_id.clone(),
            sender_name: identity.nickname.clone(),
            channel_id: channel_id.into(),
            ttl,
            hops: 0,
            via: vec![identity.node_id.clone()],
            message_type,
            payload: payload.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Build the join announcement for `identity`
    pub fn presence(identity: &NodeIdentity, channel_id: impl Into<String>) -> Self {
        let payload = PresencePayload::join(identity);
        let payload = serde_json::to_string(&payload).unwrap_or_default();
        Self::originate(
            identity,
            payload,
            MessageType::Ack,
            channel_id,
            PRESENCE_TTL,
        )
    }

    /// Whether `node_id` already originated or relayed this message
    pub fn has_visited(&self, node_id: &str) -> bool {
        self.via.iter().any(|n| n == node_id)
    }

    /// Whether `node_id` may forward this message
    pub fn can_relay(&self, node_id: &str) -> bool {
        self.ttl > 0 && !self.has_visited(node_id)
    }

    /// The copy `node_id` forwards: one less ttl, one more hop
    pub fn relay_copy(&self, node_id: &str) -> Self {
        let mut relayed = self.clone();
        relayed.ttl = self.ttl.saturating_sub(1);
        relayed.hops = self.hops.saturating_add(1);
        relayed.via.push(node_id.to_string());
        relayed
    }

    /// Check the fields every peer must fill in
    pub fn validate(&self) -> MeshResult<()> {
        if self.id.is_empty() {
            return Err(MeshError::MissingField("id"));
        }
        if self.sender_id.is_empty() {
            return Err(MeshError::MissingField("senderId"));
        }
        if self.channel_id.is_empty() {
            return Err(MeshError::MissingField("channelId"));
        }
        if self.via.is_empty() {
            return Err(MeshError::MissingField("via"));
        }
        if self.hops > MAX_HOPS {
            return Err(MeshError::HopsOutOfRange(self.hops));
        }
        Ok(())
    }

    /// Nickname announced by an ACK join payload
    pub fn announced_nickname(&self) -> Option<String> {
        if self.message_type != MessageType::Ack {
            return None;
        }
        serde_json::from_str::<PresencePayload>(&self.payload)
            .ok()
            .filter(|p| p.event == "join")
            .map(|p| p.nickname)
    }
}

/// Body of a presence announcement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresencePayload {
    pub event: String,
    pub node_id: String,
    pub nickname: String,
}

impl PresencePayload {
    pub fn join(identity: &NodeIdentity) -> Self {
        Self {
            event: "join".to_string(),
            node_id: identity.node_id.clone(),
            nickname: identity.nickname.clone(),
        }
    }
}

/// Body of an SOS message
pub fn sos_payload(location: &str) -> String {
    format!("🚨 SOS — Need immediate help! Location: {}", location)
}

/// Body of an ALERT message
pub fn alert_payload(text: &str) -> String {
    format!("⚠️ ALERT: {}", text)
}

/// Body of a LOCATION message
pub fn location_payload(lat: f64, lon: f64) -> MeshResult<String> {
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(MeshError::InvalidPayload(format!(
            "coordinates out of range: {}, {}",
            lat, lon
        )));
    }
    Ok(serde_json::json!({ "lat": lat, "lon": lon }).to_string())
}
