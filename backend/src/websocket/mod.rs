//! # WebSocket Module
//!
//! This module pushes vault-request events to connected clients.
//!
//! ## Features
//!
//! - Admins hear about new vault requests as they are submitted
//! - Nominees hear about decisions on their own requests
//!
//! ## Connection Flow
//!
//! ```text
//! 1. Client connects to /ws?token=<jwt>
//!              ↓
//! 2. Server verifies the token (401 when invalid)
//!              ↓
//! 3. Connection is registered under the user id
//!    (admins are also registered on the "admins" channel)
//!              ↓
//! 4. Events are pushed as they occur:
//!    - vault_request_submitted   (admins)
//!    - vault_request_updated     (requester)
//! ```
//!
//! ## Message Format
//!
//! All messages are JSON:
//!
//! ```json
//! {
//!     "event": "vault_request_updated",
//!     "data": {
//!         "vaultRequestId": "5b0c...",
//!         "status": "approved",
//!         "requesterId": "91de...",
//!         "ownerId": "0a7f...",
//!         "adminNotes": "Certificate checked"
//!     },
//!     "timestamp": "2024-03-05T12:00:00Z"
//! }
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use actix_web::{web, HttpRequest, HttpResponse};
use actix_ws::Message;
use chrono::Utc;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::db::{VaultRequestRecord, VaultRequestStatus};
use crate::models::{ApiResponse, WsQuery};
use crate::AppState;

/// Channel every admin connection is also registered on.
pub const ADMIN_CHANNEL: &str = "admins";

/// WebSocket event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WsEventType {
    /// Sent once after the upgrade.
    Connected,
    /// A nominee raised a new vault request.
    VaultRequestSubmitted,
    /// A vault request changed status.
    VaultRequestUpdated,
    /// Reply to a client text message.
    Pong,
}

/// WebSocket message wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WsMessage<T> {
    /// Event type.
    pub event: WsEventType,
    /// Event data.
    pub data: T,
    /// Timestamp.
    pub timestamp: chrono::DateTime<Utc>,
}

impl<T: Serialize> WsMessage<T> {
    /// Create a new WebSocket message.
    pub fn new(event: WsEventType, data: T) -> Self {
        Self {
            event,
            data,
            timestamp: Utc::now(),
        }
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Payload of `vault_request_submitted` and `vault_request_updated`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultRequestEvent {
    pub vault_request_id: Uuid,
    pub status: VaultRequestStatus,
    pub requester_id: Uuid,
    pub owner_id: Uuid,
    pub admin_notes: Option<String>,
}

impl From<&VaultRequestRecord> for VaultRequestEvent {
    fn from(r: &VaultRequestRecord) -> Self {
        Self {
            vault_request_id: r.id,
            status: r.status,
            requester_id: r.requester_id,
            owner_id: r.owner_id,
            admin_notes: r.admin_notes.clone(),
        }
    }
}

/// WebSocket connection registry.
///
/// Tracks active WebSocket sessions per channel. A channel is a user id,
/// or [`ADMIN_CHANNEL`].
#[derive(Clone)]
pub struct WsRegistry {
    /// Map of channel -> broadcast senders.
    /// A user can have several connections (tabs/devices).
    sessions: Arc<Mutex<HashMap<String, Vec<broadcast::Sender<String>>>>>,
}

impl WsRegistry {
    /// Create a new WebSocket registry.
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Register a new connection on `channel`.
    /// Returns a receiver that will receive messages for this channel.
    pub async fn register(&self, channel: &str) -> broadcast::Receiver<String> {
        let mut sessions = self.sessions.lock().await;
        let (tx, rx) = broadcast::channel(100);

        let senders = sessions.entry(channel.to_string()).or_default();
        senders.push(tx);

        info!(
            "Registered WebSocket on {} (total connections: {})",
            channel,
            senders.len()
        );
        rx
    }

    /// Drop senders on `channel` whose receivers are gone.
    pub async fn unregister(&self, channel: &str) {
        let mut sessions = self.sessions.lock().await;
        if let Some(senders) = sessions.get_mut(channel) {
            senders.retain(|tx| tx.receiver_count() > 0);

            if senders.is_empty() {
                sessions.remove(channel);
                info!("Unregistered all WebSocket connections on {}", channel);
            } else {
                debug!("WebSocket connections left on {}: {}", channel, senders.len());
            }
        }
    }

    /// Send a message to every connection on `channel`.
    ///
    /// A channel with no connections is not an error.
    ///
    /// ## Returns
    ///
    /// * `Ok(usize)` - Number of connections reached
    /// * `Err(String)` - Failed to serialize message
    pub async fn send<T: Serialize>(
        &self,
        channel: &str,
        event: WsEventType,
        data: T,
    ) -> Result<usize, String> {
        let json = WsMessage::new(event, data)
            .to_json()
            .map_err(|e| format!("Failed to serialize message: {}", e))?;

        let mut sessions = self.sessions.lock().await;
        let Some(senders) = sessions.get_mut(channel) else {
            debug!("No active WebSocket connections on {}", channel);
            return Ok(0);
        };

        // A send fails only when every receiver is gone.
        senders.retain(|tx| tx.send(json.clone()).is_ok());
        let sent = senders.len();
        if senders.is_empty() {
            sessions.remove(channel);
        }

        debug!("Sent {:?} on {} ({} connections)", event, channel, sent);
        Ok(sent)
    }

    /// Send a message to every connection of one user.
    pub async fn send_to_user<T: Serialize>(
        &self,
        user_id: Uuid,
        event: WsEventType,
        data: T,
    ) -> Result<usize, String> {
        self.send(&user_id.to_string(), event, data).await
    }

    /// Send a message to every connected admin.
    pub async fn send_to_admins<T: Serialize>(
        &self,
        event: WsEventType,
        data: T,
    ) -> Result<usize, String> {
        self.send(ADMIN_CHANNEL, event, data).await
    }

    /// Number of active connections on `channel`.
    pub async fn connection_count(&self, channel: &str) -> usize {
        let sessions = self.sessions.lock().await;
        sessions.get(channel).map(|v| v.len()).unwrap_or(0)
    }
}

impl Default for WsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Configure WebSocket routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/ws", web::get().to(websocket_handler));
}

/// A task forwarding one channel to one connection.
pub struct Subscription {
    channel: String,
    task: JoinHandle<()>,
}

impl WsRegistry {
    /// Stop the forwarding tasks of a closed connection and drop their senders.
    pub async fn release(&self, subscriptions: Vec<Subscription>) {
        for sub in subscriptions {
            sub.task.abort();
            // The receiver is dropped once the task is.
            let _ = sub.task.await;
            self.unregister(&sub.channel).await;
        }
    }
}

/// Forward registry messages on `rx` to the client until either side closes.
fn forward(
    mut rx: broadcast::Receiver<String>,
    mut session: actix_ws::Session,
    registry: WsRegistry,
    channel: String,
) -> Subscription {
    let task_channel = channel.clone();
    let task = actix_rt::spawn(async move {
        let channel = task_channel;
        loop {
            match rx.recv().await {
                Ok(msg) => {
                    if let Err(e) = session.text(msg).await {
                        debug!("WebSocket session on {} closed: {}", channel, e);
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("WebSocket on {} skipped {} messages", channel, skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        drop(rx);
        registry.unregister(&channel).await;
    });

    Subscription { channel, task }
}

/// WebSocket connection handler.
///
/// ## Endpoint
///
/// `GET /ws?token=<jwt>`
///
/// Browsers cannot set headers on a WebSocket upgrade, so the session
/// token travels in the query string.
///
/// ## Example (JavaScript)
///
/// ```javascript
/// const ws = new WebSocket(`ws://localhost:5000/ws?token=${token}`);
///
/// ws.onmessage = (event) => {
///     const message = JSON.parse(event.data);
///     console.log('Event:', message.event, message.data);
/// };
/// ```
pub async fn websocket_handler(
    req: HttpRequest,
    query: web::Query<WsQuery>,
    body: web::Payload,
    state: web::Data<Arc<AppState>>,
) -> Result<HttpResponse, actix_web::Error> {
    let claims = match state.tokens.verify(&query.token) {
        Ok(claims) => claims,
        Err(e) => {
            debug!("Rejected WebSocket token: {}", e);
            return Ok(HttpResponse::Unauthorized()
                .json(ApiResponse::<()>::error("UNAUTHORIZED", &e.to_string())));
        }
    };
    let user = match AuthUser::from_claims(&claims) {
        Ok(user) => user,
        Err(e) => {
            return Ok(HttpResponse::Unauthorized()
                .json(ApiResponse::<()>::error("UNAUTHORIZED", &e.to_string())));
        }
    };

    let (response, mut session, mut msg_stream) = actix_ws::handle(&req, body)?;

    let registry = state.ws_registry.clone();
    let channel = user.id.to_string();

    let rx = registry.register(&channel).await;
    let mut subscriptions = vec![forward(rx, session.clone(), registry.clone(), channel.clone())];

    if user.is_admin() {
        let admin_rx = registry.register(ADMIN_CHANNEL).await;
        subscriptions.push(forward(
            admin_rx,
            session.clone(),
            registry.clone(),
            ADMIN_CHANNEL.to_string(),
        ));
    }

    let sessions = registry.connection_count(&channel).await;

    actix_rt::spawn(async move {
        info!(
            "WebSocket connected for {} ({}), {} open session(s)",
            user.email, user.role, sessions
        );

        let welcome = WsMessage::new(
            WsEventType::Connected,
            serde_json::json!({
                "userId": user.id,
                "role": user.role,
                "sessions": sessions,
            }),
        );
        if let Ok(json) = welcome.to_json() {
            if let Err(e) = session.text(json).await {
                error!("Failed to send welcome message: {}", e);
            }
        }

        while let Some(Ok(msg)) = msg_stream.next().await {
            match msg {
                Message::Ping(bytes) => {
                    let _ = session.pong(&bytes).await;
                }
                Message::Pong(_) => {}
                Message::Text(text) => {
                    debug!("Received text from {}: {}", user.id, text);
                    let reply = WsMessage::new(
                        WsEventType::Pong,
                        serde_json::json!({ "received": text.to_string() }),
                    );
                    if let Ok(json) = reply.to_json() {
                        let _ = session.text(json).await;
                    }
                }
                Message::Binary(_) => {
                    warn!("Received unexpected binary message from {}", user.id);
                }
                Message::Close(reason) => {
                    info!("WebSocket closed for {}: {:?}", user.id, reason);
                    break;
                }
                _ => {}
            }
        }

        let _ = session.close(None).await;
        registry.release(subscriptions).await;
        info!("WebSocket disconnected for {}", user.id);
    });

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_rt::test]
    async fn test_send_reaches_every_connection_on_channel() {
        let registry = WsRegistry::new();
        let user = Uuid::new_v4();
        let mut first = registry.register(&user.to_string()).await;
        let mut second = registry.register(&user.to_string()).await;

        let sent = registry
            .send_to_user(user, WsEventType::Pong, serde_json::json!({"ok": true}))
            .await
            .unwrap();
        assert_eq!(sent, 2);

        for rx in [&mut first, &mut second] {
            let msg: serde_json::Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
            assert_eq!(msg["event"], "pong");
            assert_eq!(msg["data"]["ok"], true);
        }
    }

    #[actix_rt::test]
    async fn test_dead_connections_are_pruned() {
        let registry = WsRegistry::new();
        let rx = registry.register(ADMIN_CHANNEL).await;
        drop(rx);

        let sent = registry
            .send_to_admins(WsEventType::VaultRequestSubmitted, "x")
            .await
            .unwrap();
        assert_eq!(sent, 0);
        assert_eq!(registry.connection_count(ADMIN_CHANNEL).await, 0);
    }

    #[actix_rt::test]
    async fn test_release_drops_idle_connections() {
        let registry = WsRegistry::new();
        let user = Uuid::new_v4().to_string();

        let mut subscriptions = Vec::new();
        for channel in [user.as_str(), ADMIN_CHANNEL] {
            let mut rx = registry.register(channel).await;
            let task = actix_rt::spawn(async move { while rx.recv().await.is_ok() {} });
            subscriptions.push(Subscription {
                channel: channel.to_string(),
                task,
            });
        }
        assert_eq!(registry.connection_count(&user).await, 1);
        assert_eq!(registry.connection_count(ADMIN_CHANNEL).await, 1);

        // No event is ever sent on either channel.
        registry.release(subscriptions).await;

        assert_eq!(registry.connection_count(&user).await, 0);
        assert_eq!(registry.connection_count(ADMIN_CHANNEL).await, 0);
    }

    #[actix_rt::test]
    async fn test_unconnected_user_is_not_an_error() {
        let registry = WsRegistry::new();
        let sent = registry
            .send_to_user(Uuid::new_v4(), WsEventType::VaultRequestUpdated, "x")
            .await
            .unwrap();
        assert_eq!(sent, 0);
    }
}
