//! Metrics and observability module
//!
//! Prometheus-compatible metrics for a mesh relay node.
//!
//! Key metrics exposed:
//! - Message flow (originated, received, relayed, delivered)
//! - Dropped traffic (duplicates, malformed frames)
//! - Hop distance of accepted messages
//! - Active peer count

pub mod exporter;
pub mod recorder;

pub use exporter::{install_recorder, metrics_route, render_metrics, MetricsConfig, MetricsError};
pub use recorder::init_metrics;
