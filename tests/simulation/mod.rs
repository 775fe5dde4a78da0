//! In-process mesh simulation
//!
//! Runs many relay nodes in one process over a shared `LocalBus`, with
//! line, ring or fully connected topologies and optional frame loss.

pub mod lossy_transport;
pub mod mesh_network;

pub use lossy_transport::LossyTransport;
pub use mesh_network::{MeshNetwork, SimNode, Topology};
