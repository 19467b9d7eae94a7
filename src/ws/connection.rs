//! WebSocket connection state machine.
//!
//! Handles the read/write loop for a single WebSocket connection,
//! dispatching incoming commands and forwarding filtered notifications.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;

use super::messages::{WsCommand, WsMessage, WsMessageType};
use super::subscription::SubscriptionManager;
use crate::api::dto::BadgeListResponse;
use crate::domain::{Notification, Route};
use crate::service::BadgeService;

/// Runs the read/write loop for a single WebSocket connection.
///
/// - Reads commands from the client and dispatches them.
/// - Forwards matching notifications from the [`broadcast::Receiver`].
pub async fn run_connection(
    socket: WebSocket,
    mut notification_rx: broadcast::Receiver<Notification>,
    badges: Arc<BadgeService>,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut subs = SubscriptionManager::new();

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let response = handle_text_message(&text, &mut subs, &badges).await;
                        if let Some(resp_json) = response
                            && ws_tx.send(Message::text(resp_json)).await.is_err() {
                                break;
                            }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
            notification = notification_rx.recv() => {
                match notification {
                    Ok(notification) => {
                        if subs.matches(&notification) {
                            tracing::trace!(kind = notification.kind_str(), "forwarding notification");
                            let msg = WsMessage::new(
                                uuid::Uuid::new_v4().to_string(),
                                WsMessageType::Event,
                                serde_json::to_value(&notification).unwrap_or_default(),
                            );
                            let json = serde_json::to_string(&msg).unwrap_or_default();
                            if ws_tx.send(Message::text(json)).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(lagged = n, "ws client lagged behind notification bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    tracing::debug!("ws connection closed");
}

/// Splits client route keys into parsed routes and the wildcard flag.
/// Malformed keys are returned separately so the client can see them.
fn parse_route_keys(keys: &[String]) -> (Vec<Route>, bool, Vec<String>) {
    let mut routes = Vec::new();
    let mut wildcard = false;
    let mut rejected = Vec::new();
    for key in keys {
        if key == "*" {
            wildcard = true;
        } else if let Ok(route) = key.parse::<Route>() {
            routes.push(route);
        } else {
            rejected.push(key.clone());
        }
    }
    (routes, wildcard, rejected)
}

/// Handles a text message from the client, returning an optional JSON
/// response.
async fn handle_text_message(
    text: &str,
    subs: &mut SubscriptionManager,
    badges: &BadgeService,
) -> Option<String> {
    let Ok(msg) = serde_json::from_str::<WsMessage>(text) else {
        return serde_json::to_string(&WsMessage::error(String::new(), 400, "malformed JSON"))
            .ok();
    };

    let Ok(command) = serde_json::from_value::<WsCommand>(msg.payload) else {
        return serde_json::to_string(&WsMessage::error(msg.id, 404, "unknown command")).ok();
    };

    let payload = match command {
        WsCommand::Subscribe { routes } => {
            let (parsed, wildcard, rejected) = parse_route_keys(&routes);
            subs.subscribe(&parsed, wildcard);
            serde_json::json!({
                "subscribed": parsed.iter().map(ToString::to_string).collect::<Vec<_>>(),
                "rejected": rejected,
                "count": subs.count(),
                "wildcard": subs.is_subscribed_all(),
            })
        }
        WsCommand::Unsubscribe { routes } => {
            let (parsed, wildcard, rejected) = parse_route_keys(&routes);
            subs.unsubscribe(&parsed, wildcard);
            serde_json::json!({
                "unsubscribed": parsed.iter().map(ToString::to_string).collect::<Vec<_>>(),
                "rejected": rejected,
                "remaining_count": subs.count(),
                "wildcard": subs.is_subscribed_all(),
            })
        }
        WsCommand::GetBadges => {
            let snapshot = badges.snapshot().await;
            serde_json::to_value(BadgeListResponse::from(&*snapshot)).unwrap_or_default()
        }
    };

    serde_json::to_string(&WsMessage::new(msg.id, WsMessageType::Response, payload)).ok()
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::EventBus;
    use crate::persistence::{MemoryEventStore, StoreBackend};

    fn badge_service() -> BadgeService {
        BadgeService::new(
            StoreBackend::Memory(MemoryEventStore::new()),
            EventBus::new(16),
            chrono::Duration::hours(24),
        )
    }

    fn command(id: &str, payload: serde_json::Value) -> String {
        serde_json::json!({
            "id": id,
            "type": "command",
            "timestamp": chrono::Utc::now(),
            "payload": payload,
        })
        .to_string()
    }

    async fn reply(
        text: &str,
        subs: &mut SubscriptionManager,
        badges: &BadgeService,
    ) -> serde_json::Value {
        let Some(json) = handle_text_message(text, subs, badges).await else {
            panic!("expected a reply");
        };
        let Ok(value) = serde_json::from_str(&json) else {
            panic!("reply is not JSON");
        };
        value
    }

    #[tokio::test]
    async fn wildcard_can_be_unsubscribed() {
        let badges = badge_service();
        let mut subs = SubscriptionManager::new();

        let sub = command("1", serde_json::json!({ "command": "subscribe", "routes": ["*"] }));
        let ack = reply(&sub, &mut subs, &badges).await;
        assert_eq!(ack["payload"]["wildcard"], true);

        let unsub = command("2", serde_json::json!({ "command": "unsubscribe", "routes": ["*"] }));
        let ack = reply(&unsub, &mut subs, &badges).await;
        assert_eq!(ack["payload"]["wildcard"], false);
        assert!(!subs.is_subscribed_all());
    }

    #[tokio::test]
    async fn malformed_frame_gets_error_reply() {
        let badges = badge_service();
        let mut subs = SubscriptionManager::new();
        let value = reply("{not json", &mut subs, &badges).await;
        assert_eq!(value["type"], "error");
        assert_eq!(value["payload"]["code"], 400);
    }

    #[test]
    fn route_keys_split_into_parsed_wildcard_and_rejected() {
        let keys = vec![
            "jfk-lhr".to_string(),
            "*".to_string(),
            "nonsense".to_string(),
        ];
        let (parsed, wildcard, rejected) = parse_route_keys(&keys);
        assert_eq!(parsed.len(), 1);
        assert!(wildcard);
        assert_eq!(rejected, vec!["nonsense".to_string()]);
    }
}
