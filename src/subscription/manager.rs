use crate::state::StateRecord;
use crate::subscription::protocol::{ClientMessage, ErrorMessage, StateMessage};
use axum::extract::ws::{Message, WebSocket};
use std::collections::HashSet;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// Manages a single WebSocket connection with entity subscriptions
pub struct ConnectionManager {
    /// Set of entity IDs this connection is subscribed to
    subscriptions: HashSet<String>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            subscriptions: HashSet::new(),
        }
    }

    /// Handle WebSocket connection lifecycle.
    ///
    /// Sends `snapshot` first, then forwards live records from `state_rx`.
    /// The receiver must be subscribed before the snapshot is taken so no
    /// update is lost in between; a record may then arrive twice.
    pub async fn handle(
        mut self,
        mut socket: WebSocket,
        mut state_rx: broadcast::Receiver<StateRecord>,
        snapshot: Vec<StateRecord>,
    ) {
        info!(states = snapshot.len(), "WebSocket connection established, replaying states");

        for record in snapshot {
            if let Err(e) = send_json(&mut socket, &StateMessage::from(record)).await {
                warn!(error = %e, "Failed to replay state");
                return;
            }
        }

        loop {
            tokio::select! {
                // Handle incoming client messages
                Some(msg) = socket.recv() => {
                    match msg {
                        Ok(Message::Text(text)) => {
                            if let Err(e) = self.handle_client_message(&text) {
                                warn!(error = %e, "Invalid client message");
                                let reply = ErrorMessage::new(e.to_string());
                                if let Err(e) = send_json(&mut socket, &reply).await {
                                    error!(error = %e, "Failed to send error message");
                                    break;
                                }
                            }
                        }
                        Ok(Message::Close(_)) => {
                            info!("WebSocket client disconnected");
                            break;
                        }
                        Ok(Message::Ping(data)) => {
                            if let Err(e) = socket.send(Message::Pong(data)).await {
                                error!(error = %e, "Failed to send pong");
                                break;
                            }
                        }
                        Ok(_) => {
                            // Ignore binary, pong messages
                        }
                        Err(e) => {
                            warn!(error = %e, "WebSocket error");
                            break;
                        }
                    }
                }

                // Handle records from the broadcast channel
                result = state_rx.recv() => {
                    match result {
                        Ok(record) => {
                            if self.should_forward(&record) {
                                if let Err(e) = send_json(&mut socket, &StateMessage::from(record)).await {
                                    error!(error = %e, "Failed to send state");
                                    break;
                                }
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped = skipped, "WebSocket lagged, skipped states");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            error!("State broadcast channel closed");
                            break;
                        }
                    }
                }

                else => {
                    break;
                }
            }
        }

        info!("WebSocket connection closed");
    }

    /// Handle client message (subscribe/unsubscribe)
    fn handle_client_message(&mut self, text: &str) -> anyhow::Result<()> {
        let msg: ClientMessage = serde_json::from_str(text)?;

        match msg {
            ClientMessage::Subscribe { entity_id } => {
                info!(entity_id = %entity_id, "Client subscribed to entity");
                self.subscriptions.insert(entity_id);
            }
            ClientMessage::Unsubscribe { entity_id } => {
                info!(entity_id = %entity_id, "Client unsubscribed from entity");
                self.subscriptions.remove(&entity_id);
            }
        }

        Ok(())
    }

    /// Check if a record should be forwarded to this connection
    fn should_forward(&self, record: &StateRecord) -> bool {
        // If no subscriptions, forward everything
        self.subscriptions.is_empty() || self.subscriptions.contains(&record.entity_id)
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

async fn send_json<T: serde::Serialize>(socket: &mut WebSocket, msg: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string(msg)?;
    socket.send(Message::Text(json)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forwards_everything_without_subscriptions() {
        let manager = ConnectionManager::new();
        assert!(manager.should_forward(&StateRecord::new("person.alice", "home")));
    }

    #[test]
    fn test_subscriptions_narrow_forwarding() {
        let mut manager = ConnectionManager::new();
        manager
            .handle_client_message(r#"{"type":"subscribe","entity_id":"person.alice"}"#)
            .unwrap();

        assert!(manager.should_forward(&StateRecord::new("person.alice", "home")));
        assert!(!manager.should_forward(&StateRecord::new("person.bob", "home")));

        manager
            .handle_client_message(r#"{"type":"unsubscribe","entity_id":"person.alice"}"#)
            .unwrap();
        assert!(manager.should_forward(&StateRecord::new("person.bob", "home")));
    }

    #[test]
    fn test_invalid_client_message() {
        let mut manager = ConnectionManager::new();
        assert!(manager.handle_client_message("not json").is_err());
    }
}
