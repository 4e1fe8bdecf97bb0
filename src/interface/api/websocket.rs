//! WebSocket notification stream for the authenticated user

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{sink::SinkExt, stream::StreamExt};
use tracing::{debug, error, info};

use super::identity::CurrentUser;
use super::metrics_handler::update_realtime_connections;
use super::state::AppState;
use crate::domain::shared::UserId;
use crate::infrastructure::realtime::SessionRegistry;

/// WebSocket handler
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Response {
    let registry = state.sessions.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, registry, user))
}

/// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, registry: SessionRegistry, user: UserId) {
    let (mut sender, mut receiver) = socket.split();
    let connection = registry.register(&user).await;
    let connection_id = connection.id;
    let mut notifications = connection.receiver;
    update_realtime_connections(registry.connection_count().await);

    let welcome = serde_json::json!({
        "type": "connected",
        "userId": user,
        "connectionId": connection_id,
        "timestamp": chrono::Utc::now().timestamp(),
    });

    if sender.send(Message::Text(welcome.to_string())).await.is_err() {
        error!("Failed to send welcome message to {}", user);
        registry.unregister(&user, connection_id).await;
        update_realtime_connections(registry.connection_count().await);
        return;
    }

    let mut send_task = tokio::spawn(async move {
        while let Some(notification) = notifications.recv().await {
            match serde_json::to_string(&notification) {
                Ok(json) => {
                    if sender.send(Message::Text(json)).await.is_err() {
                        debug!("Client disconnected");
                        break;
                    }
                }
                Err(e) => error!("Failed to encode {}: {}", notification.event_type(), e),
            }
        }
    });

    // Clients only send pings; anything else is ignored
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Close(_) => {
                    debug!("WebSocket client requested close");
                    break;
                }
                Message::Text(text) => debug!("Ignoring client message: {}", text),
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => {
            recv_task.abort();
        }
        _ = (&mut recv_task) => {
            send_task.abort();
        }
    }

    registry.unregister(&user, connection_id).await;
    update_realtime_connections(registry.connection_count().await);
    info!("WebSocket client {} disconnected", user);
}
