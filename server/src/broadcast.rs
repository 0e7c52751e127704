//! Fan-out of outgoing events to connected clients
//!
//! A payload is serialized once, wrapped in the event envelope and queued
//! independently for every target. Queueing never waits: a full or closed
//! queue on one client is logged and the remaining targets still receive the
//! event.

use crate::client::Delivery;
use crate::client_manager::{ClientId, ClientManager};
use crate::error::Rejection;
use log::{debug, error, warn};
use serde::Serialize;
use shared::{tags, timestamp, Event, InvalidActionResponse};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_tungstenite::tungstenite::Message;

#[derive(Clone)]
pub struct Broadcaster {
    clients: Arc<RwLock<ClientManager>>,
}

impl Broadcaster {
    pub fn new(clients: Arc<RwLock<ClientManager>>) -> Self {
        Self { clients }
    }

    /// Queues the event for every target and returns how many accepted it
    pub async fn broadcast<T: Serialize>(
        &self,
        event_type: &str,
        payload: &T,
        targets: &[ClientId],
    ) -> usize {
        let Some(message) = encode(event_type, payload) else {
            return 0;
        };

        let clients = self.clients.read().await;
        let mut delivered = 0;

        for client_id in targets {
            match clients.send(client_id, message.clone()) {
                Delivery::Queued => delivered += 1,
                Delivery::Overflowed => {
                    warn!(
                        "Outbound queue full for client {}, disconnecting it",
                        client_id
                    );
                }
                Delivery::Closed => {
                    debug!("Client {} is gone, skipping {}", client_id, event_type);
                }
            }
        }

        delivered
    }

    pub async fn send<T: Serialize>(&self, event_type: &str, payload: &T, target: ClientId) -> bool {
        self.broadcast(event_type, payload, &[target]).await == 1
    }

    /// Tells a single client its action was refused
    pub async fn reject(&self, target: ClientId, rejection: Rejection) {
        debug!("Rejected action from client {}: {}", target, rejection);
        let response = InvalidActionResponse {
            message: rejection.to_string(),
            sent: timestamp(),
        };
        self.send(tags::RECEIVE_INVALID_ACTION, &response, target)
            .await;
    }
}

fn encode<T: Serialize>(event_type: &str, payload: &T) -> Option<Message> {
    match Event::new(event_type, payload).and_then(|event| event.to_json()) {
        Ok(text) => Some(Message::Text(text)),
        Err(e) => {
            error!("Failed to serialize {} event: {}", event_type, e);
            None
        }
    }
}
