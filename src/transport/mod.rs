//! Broadcast transport adapters
//!
//! A transport is any medium that delivers an opaque frame to every
//! reachable peer: an in-process bus for simulations, LAN UDP broadcast, or
//! a radio mesh stack. Delivery is best-effort and unordered. Framing and
//! decoding belong to the transport; a frame that fails to decode is simply
//! never handed to the engine.

pub mod error;
pub mod local;
pub mod udp;

pub use error::{TransportError, TransportResult};
pub use local::{LocalBus, LocalTransport};
pub use udp::{UdpBroadcastTransport, UdpConfig, DEFAULT_UDP_PORT};

use crate::mesh::MeshMessage;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Where a transport pushes decoded inbound messages
pub type InboundSink = mpsc::UnboundedSender<MeshMessage>;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Short label for the medium, reported in peer info
    fn name(&self) -> &'static str;

    /// Send to every reachable peer. Failures are logged, never returned.
    async fn broadcast(&self, message: &MeshMessage);

    /// Start delivering inbound messages to `sink`, replacing any previous
    /// sink
    async fn on_receive(&self, sink: InboundSink) -> TransportResult<()>;

    /// Stop delivering inbound messages
    async fn detach(&self);
}
