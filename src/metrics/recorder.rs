//! Metrics recorder for mesh relay operations

use crate::mesh::MessageType;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::sync::atomic::{AtomicBool, Ordering};

static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initialize metric descriptions (call once at startup)
pub fn init_metrics() {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }

    describe_counter!(
        "floodmesh_messages_originated_total",
        "Messages originated by this node"
    );
    describe_counter!(
        "floodmesh_messages_received_total",
        "Inbound messages accepted as new"
    );
    describe_counter!(
        "floodmesh_messages_relayed_total",
        "Relay copies broadcast by this node"
    );
    describe_counter!(
        "floodmesh_messages_duplicate_total",
        "Inbound messages discarded as already seen"
    );
    describe_counter!(
        "floodmesh_messages_malformed_total",
        "Inbound messages that failed validation"
    );
    describe_counter!(
        "floodmesh_messages_delivered_total",
        "Messages handed to the UI"
    );

    describe_gauge!("floodmesh_peers", "Peers heard within the activity window");
    describe_gauge!("floodmesh_relay_active", "1 while the relay is running");

    describe_histogram!(
        "floodmesh_message_hops",
        "Relays an accepted message took to arrive"
    );
}

pub fn record_originated(message_type: MessageType) {
    counter!("floodmesh_messages_originated_total", "type" => message_type.as_str()).increment(1);
}

/// Record an accepted inbound message
pub fn record_received(message_type: MessageType, hops: u32) {
    counter!("floodmesh_messages_received_total", "type" => message_type.as_str()).increment(1);
    histogram!("floodmesh_message_hops").record(hops as f64);
}

pub fn record_relayed() {
    counter!("floodmesh_messages_relayed_total").increment(1);
}

pub fn record_duplicate() {
    counter!("floodmesh_messages_duplicate_total").increment(1);
}

pub fn record_malformed() {
    counter!("floodmesh_messages_malformed_total").increment(1);
}

pub fn record_delivered() {
    counter!("floodmesh_messages_delivered_total").increment(1);
}

pub fn set_peer_count(count: usize) {
    gauge!("floodmesh_peers").set(count as f64);
}

pub fn set_relay_active(active: bool) {
    gauge!("floodmesh_relay_active").set(if active { 1.0 } else { 0.0 });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_metrics() {
        // Should not panic when called multiple times
        init_metrics();
        init_metrics();
    }

    #[test]
    fn test_record_without_recorder() {
        record_originated(MessageType::Sos);
        record_received(MessageType::Text, 3);
        record_relayed();
        set_peer_count(2);
        set_relay_active(false);
    }
}
