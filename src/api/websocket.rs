use crate::api::types::*;
use crate::api::MessageFeed;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use tokio::sync::broadcast::error::RecvError;

pub async fn websocket_handler(ws: WebSocketUpgrade, State(feed): State<MessageFeed>) -> Response {
    ws.on_upgrade(move |socket| handle_websocket(socket, feed))
}

async fn handle_websocket(mut socket: WebSocket, feed: MessageFeed) {
    let mut messages = feed.subscribe();

    loop {
        tokio::select! {
            delivered = messages.recv() => {
                let event = match delivered {
                    Ok(message) => WebSocketMessage::Message(message),
                    Err(RecvError::Lagged(skipped)) => WebSocketMessage::Lagged { skipped },
                    Err(RecvError::Closed) => break,
                };

                if let Ok(json) = serde_json::to_string(&event) {
                    if socket.send(Message::Text(json)).await.is_err() {
                        return;
                    }
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if socket.send(Message::Text(reply_to(&text))).await.is_err() {
                            return;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        break;
                    }
                    _ => {}
                }
            }
        }
    }
}

/// Answer to a text frame from the client; the stream is server-to-client
/// apart from keepalive pings
fn reply_to(text: &str) -> String {
    if text == "ping" {
        return "pong".to_string();
    }

    let error = WebSocketMessage::Error(ErrorResponse {
        error: "Only \"ping\" is accepted on this socket; use the REST API to send".to_string(),
        code: "UNSUPPORTED_FRAME".to_string(),
    });
    serde_json::to_string(&error).unwrap_or_default()
}
