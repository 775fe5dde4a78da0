//! Prometheus metrics exporter
//!
//! The recorder is installed in-process and rendered by the gateway's
//! `/metrics` route, so the node serves everything from one listener.

use crate::metrics::recorder::init_metrics;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

/// Global prometheus handle
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics exporter configuration
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Install the Prometheus recorder at all
    pub enabled: bool,

    /// Path for metrics endpoint (default: "/metrics")
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "/metrics".to_string(),
        }
    }
}

impl MetricsConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }
}

/// Install the Prometheus recorder
///
/// Returns `None` when disabled. Subsequent calls return the existing handle.
pub fn install_recorder(
    config: &MetricsConfig,
) -> Result<Option<&'static PrometheusHandle>, MetricsError> {
    if !config.enabled {
        return Ok(None);
    }

    init_metrics();

    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(Some(handle));
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| MetricsError::SetupFailed(e.to_string()))?;

    // A concurrent caller may have won; keep whichever landed first
    let _ = PROMETHEUS_HANDLE.set(handle);
    Ok(PROMETHEUS_HANDLE.get())
}

/// Get the current prometheus handle (if initialized)
pub fn get_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

/// Render metrics as a string (for custom endpoints)
pub fn render_metrics() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|h| h.render())
}

/// Errors that can occur during metrics setup
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("Failed to setup metrics: {0}")]
    SetupFailed(String),
}

/// Create an axum route for serving metrics
pub fn metrics_route() -> axum::routing::MethodRouter {
    use axum::response::IntoResponse;

    axum::routing::get(|| async {
        match render_metrics() {
            Some(metrics) => (
                [(
                    axum::http::header::CONTENT_TYPE,
                    "text/plain; charset=utf-8",
                )],
                metrics,
            )
                .into_response(),
            None => (
                axum::http::StatusCode::SERVICE_UNAVAILABLE,
                "Metrics not initialized",
            )
                .into_response(),
        }
    })
}
