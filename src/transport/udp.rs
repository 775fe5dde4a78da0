//! LAN UDP broadcast transport
//!
//! Every frame is one datagram sent to the broadcast address. A node hears
//! its own datagrams on most networks; the relay engine's dedup discards them.

use crate::codec::{decode_frame, encode_frame, MAX_BODY_LEN};
use crate::mesh::MeshMessage;
use crate::transport::error::{TransportError, TransportResult};
use crate::transport::{InboundSink, Transport};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use socket2::{Domain, Protocol, Socket, Type};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

pub const DEFAULT_UDP_PORT: u16 = 47470;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UdpConfig {
    /// Local address to listen on
    pub bind_addr: SocketAddr,

    /// Destination of every broadcast
    pub broadcast_addr: SocketAddr,
}

impl Default for UdpConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_UDP_PORT)),
            broadcast_addr: SocketAddr::from(([255, 255, 255, 255], DEFAULT_UDP_PORT)),
        }
    }
}

impl UdpConfig {
    pub fn with_port(port: u16) -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], port)),
            broadcast_addr: SocketAddr::from(([255, 255, 255, 255], port)),
        }
    }
}

pub struct UdpBroadcastTransport {
    config: UdpConfig,
    socket: Arc<UdpSocket>,
    receiver: Mutex<Option<JoinHandle<()>>>,
}

impl UdpBroadcastTransport {
    /// Bind the broadcast socket. Must be called within a tokio runtime.
    pub fn bind(config: UdpConfig) -> TransportResult<Self> {
        let socket = Self::make_socket(config.bind_addr).map_err(|source| {
            TransportError::BindFailed {
                addr: config.bind_addr,
                source,
            }
        })?;
        let socket = UdpSocket::from_std(socket.into())?;

        tracing::info!(
            "UDP mesh transport bound to {} (broadcast {})",
            config.bind_addr,
            config.broadcast_addr
        );

        Ok(Self {
            config,
            socket: Arc::new(socket),
            receiver: Mutex::new(None),
        })
    }

    fn make_socket(bind_addr: SocketAddr) -> std::io::Result<Socket> {
        let socket = Socket::new(Domain::for_address(bind_addr), Type::DGRAM, Some(Protocol::UDP))?;
        // Several nodes may share one host during field tests
        socket.set_reuse_address(true)?;
        socket.set_broadcast(true)?;
        socket.set_nonblocking(true)?;
        socket.bind(&bind_addr.into())?;
        Ok(socket)
    }

    pub fn local_addr(&self) -> TransportResult<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    pub fn config(&self) -> &UdpConfig {
        &self.config
    }

    async fn receive_loop(socket: Arc<UdpSocket>, sink: InboundSink) {
        let mut buf = vec![0u8; MAX_BODY_LEN + 64];
        loop {
            let (len, from) = match socket.recv_from(&mut buf).await {
                Ok(received) => received,
                Err(e) => {
                    tracing::debug!("UDP receive error: {}", e);
                    continue;
                }
            };

            match decode_frame(&buf[..len]) {
                Ok(message) => {
                    if sink.send(message).is_err() {
                        tracing::debug!("Inbound sink closed, stopping UDP receiver");
                        break;
                    }
                }
                Err(e) => tracing::debug!("Dropping malformed frame from {}: {}", from, e),
            }
        }
    }
}

#[async_trait]
impl Transport for UdpBroadcastTransport {
    fn name(&self) -> &'static str {
        "udp"
    }

    async fn broadcast(&self, message: &MeshMessage) {
        let frame = match encode_frame(message) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!("Cannot encode message {}: {}", message.id, e);
                return;
            }
        };

        // No reachable peers is normal for a mesh node
        if let Err(e) = self.socket.send_to(&frame, self.config.broadcast_addr).await {
            tracing::debug!("Broadcast of {} failed: {}", message.id, e);
        }
    }

    async fn on_receive(&self, sink: InboundSink) -> TransportResult<()> {
        let handle = tokio::spawn(Self::receive_loop(self.socket.clone(), sink));
        if let Some(previous) = self.receiver.lock().replace(handle) {
            previous.abort();
        }
        Ok(())
    }

    async fn detach(&self) {
        if let Some(handle) = self.receiver.lock().take() {
            handle.abort();
        }
    }
}

impl Drop for UdpBroadcastTransport {
    fn drop(&mut self) {
        if let Some(handle) = self.receiver.lock().take() {
            handle.abort();
        }
    }
}
