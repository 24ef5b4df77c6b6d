//! WebSocket feed of lifecycle notifications.
//!
//! Each connection owns one hub subscription for its whole life. Every
//! notification goes out as a JSON text frame; anything the client sends
//! besides pings and close frames is ignored.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use event_store::EventStore;
use futures_util::{SinkExt, StreamExt};
use notify::NotificationHub;

use crate::state::AppState;

/// GET /ws/orders: upgrade to WebSocket
pub async fn subscribe<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let hub = state.coordinator.hub().clone();
    ws.on_upgrade(move |socket| handle_socket(socket, hub))
}

async fn handle_socket(socket: WebSocket, hub: NotificationHub) {
    let mut subscription = hub.subscribe();
    let subscriber_id = subscription.id();
    tracing::info!(%subscriber_id, "observer connected");
    metrics::gauge!("ws_connections").increment(1.0);

    let (mut ws_sink, mut ws_stream) = socket.split();

    loop {
        tokio::select! {
            incoming = ws_stream.next() => match incoming {
                Some(Ok(Message::Ping(payload))) => {
                    if ws_sink.send(Message::Pong(payload)).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(%subscriber_id, "websocket read error: {e}");
                    break;
                }
            },
            notification = subscription.recv() => {
                let Some(notification) = notification else {
                    break;
                };
                let json = match serde_json::to_string(notification.as_ref()) {
                    Ok(json) => json,
                    Err(e) => {
                        tracing::error!(%subscriber_id, "failed to encode notification: {e}");
                        continue;
                    }
                };
                if ws_sink.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
        }
    }

    hub.unsubscribe(subscriber_id);
    let _ = ws_sink.close().await;
    metrics::gauge!("ws_connections").decrement(1.0);
    tracing::info!(%subscriber_id, "observer disconnected");
}
