use crate::api::error::{ApiError, ApiResult};
use crate::api::types::*;
use crate::engine::{MeshRelay, MeshStatus, RelayStats};
use crate::mesh::{MeshMessage, MessageType, NodeIdentity};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use std::sync::Arc;

pub struct RestApi {
    relay: Arc<MeshRelay>,
}

impl RestApi {
    pub fn new(relay: Arc<MeshRelay>) -> Self {
        Self { relay }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(health_check))
            .route("/api/v1/status", get(get_status))
            .route("/api/v1/stats", get(get_stats))
            .route("/api/v1/peers", get(list_peers))
            .route("/api/v1/messages", get(list_messages).post(send_text))
            .route("/api/v1/sos", post(send_sos))
            .route("/api/v1/alerts", post(send_alert))
            .route("/api/v1/location", post(send_location))
            .route("/api/v1/identity", put(rename))
            .with_state(self.relay.clone())
    }
}

fn required(field: &str, value: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::InvalidRequest(format!("{field} must not be empty")));
    }
    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}

async fn get_status(State(relay): State<Arc<MeshRelay>>) -> Json<MeshStatus> {
    Json(relay.status().await)
}

async fn get_stats(State(relay): State<Arc<MeshRelay>>) -> Json<RelayStats> {
    Json(relay.stats())
}

async fn list_peers(State(relay): State<Arc<MeshRelay>>) -> Json<PeerListResponse> {
    let peers = relay.peers().await;
    let count = peers.len();
    Json(PeerListResponse { peers, count })
}

async fn list_messages(
    State(relay): State<Arc<MeshRelay>>,
    Query(query): Query<HistoryQuery>,
) -> Json<MessageListResponse> {
    let channel = query
        .channel
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| relay.config().default_channel.clone());
    let messages = relay.history(&channel).await;
    let count = messages.len();

    Json(MessageListResponse {
        channel,
        messages,
        count,
    })
}

async fn send_text(
    State(relay): State<Arc<MeshRelay>>,
    Json(req): Json<SendTextRequest>,
) -> ApiResult<(StatusCode, Json<MeshMessage>)> {
    required("text", &req.text)?;

    let message = match req.channel.as_deref().map(str::trim) {
        Some(channel) if !channel.is_empty() => {
            relay.originate(req.text, MessageType::Text, channel).await
        }
        _ => relay.send_text(&req.text).await,
    };

    Ok((StatusCode::CREATED, Json(message)))
}

async fn send_sos(
    State(relay): State<Arc<MeshRelay>>,
    Json(req): Json<SosRequest>,
) -> ApiResult<(StatusCode, Json<MeshMessage>)> {
    required("location", &req.location)?;
    let message = relay.send_sos(req.location.trim()).await;
    Ok((StatusCode::CREATED, Json(message)))
}

async fn send_alert(
    State(relay): State<Arc<MeshRelay>>,
    Json(req): Json<AlertRequest>,
) -> ApiResult<(StatusCode, Json<MeshMessage>)> {
    required("text", &req.text)?;
    let message = relay.send_alert(req.text.trim()).await;
    Ok((StatusCode::CREATED, Json(message)))
}

async fn send_location(
    State(relay): State<Arc<MeshRelay>>,
    Json(req): Json<LocationRequest>,
) -> ApiResult<(StatusCode, Json<MeshMessage>)> {
    let message = relay.send_location(req.lat, req.lon).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

async fn rename(
    State(relay): State<Arc<MeshRelay>>,
    Json(req): Json<RenameRequest>,
) -> ApiResult<Json<NodeIdentity>> {
    let identity = relay.set_nickname(&req.nickname).await?;
    Ok(Json(identity))
}
