//! Bounded, insertion-ordered message log shared by the in-memory and file
//! stores.

use crate::mesh::MeshMessage;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageLog {
    messages: VecDeque<MeshMessage>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append unless the id is already present, then evict the oldest
    /// entries beyond `limit`. Returns whether the message was added.
    pub fn push(&mut self, message: MeshMessage, limit: usize) -> bool {
        if self.contains(&message.id) {
            return false;
        }

        self.messages.push_back(message);
        while self.messages.len() > limit {
            self.messages.pop_front();
        }
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.messages.iter().any(|m| m.id == id)
    }

    /// Messages of one channel, oldest timestamp first
    pub fn channel(&self, channel_id: &str) -> Vec<MeshMessage> {
        let mut messages: Vec<MeshMessage> = self
            .messages
            .iter()
            .filter(|m| m.channel_id == channel_id)
            .cloned()
            .collect();
        messages.sort_by_key(|m| m.timestamp);
        messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MeshMessage> {
        self.messages.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{MessageType, NodeIdentity, GLOBAL_CHANNEL, HISTORY_LIMIT, MAX_TTL};

    fn message(n: usize) -> MeshMessage {
        let identity = NodeIdentity::new("FM-AAA111", "Asha");
        let mut msg = MeshMessage::originate(&identity, format!("msg {}", n), MessageType::Text, GLOBAL_CHANNEL, MAX_TTL);
        msg.id = format!("msg-{}", n);
        msg
    }

    #[test]
    fn test_bounded_fifo() {
        let mut log = MessageLog::new();
        for n in 0..250 {
            assert!(log.push(message(n), HISTORY_LIMIT));
        }

        assert_eq!(log.len(), 200);
        assert!(!log.contains("msg-49"));
        assert!(log.contains("msg-50"));
        assert_eq!(log.iter().next().unwrap().id, "msg-50");
        assert_eq!(log.iter().last().unwrap().id, "msg-249");
    }

    #[test]
    fn test_duplicate_ignored() {
        let mut log = MessageLog::new();
        assert!(log.push(message(1), HISTORY_LIMIT));
        assert!(!log.push(message(1), HISTORY_LIMIT));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_channel_sorted_by_timestamp() {
        let mut log = MessageLog::new();

        let mut late = message(1);
        late.timestamp = 2_000;
        let mut early = message(2);
        early.timestamp = 1_000;
        let mut other = message(3);
        other.channel_id = "rescue-team".to_string();

        log.push(late, HISTORY_LIMIT);
        log.push(early, HISTORY_LIMIT);
        log.push(other, HISTORY_LIMIT);

        let history = log.channel(GLOBAL_CHANNEL);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, "msg-2");
        assert_eq!(history[1].id, "msg-1");
    }
}
