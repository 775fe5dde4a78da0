//! HTTP and WebSocket gateway
//!
//! Lets browser and mobile clients drive a relay node: send messages,
//! read history, rename the node, and stream delivered messages live.

mod error;
mod feed;
mod rest;
mod types;
mod websocket;

pub use error::{ApiError, ApiResult};
pub use feed::MessageFeed;
pub use rest::RestApi;
pub use types::*;
pub use websocket::websocket_handler;

use crate::engine::MeshRelay;
use crate::metrics::MetricsConfig;
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create a complete API server with REST, WebSocket and metrics routes
///
/// `feed` should be the feed whose callback the relay was started with.
/// Metrics are mounted at `metrics.endpoint` unless disabled.
pub fn create_api_server(
    relay: Arc<MeshRelay>,
    feed: MessageFeed,
    metrics: &MetricsConfig,
) -> Router {
    let rest_api = RestApi::new(relay);

    // Configure CORS to allow frontend requests
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let ws_router = Router::new()
        .route("/ws", get(websocket_handler))
        .with_state(feed);

    let mut router = Router::new().merge(rest_api.router()).merge(ws_router);
    if metrics.enabled {
        router = router.route(&metrics.endpoint, crate::metrics::metrics_route());
    }

    router.layer(TraceLayer::new_for_http()).layer(cors)
}
