use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Notify};
use tokio_tungstenite::tungstenite::Message;

use crate::client_manager::ClientId;

/// Result of handing a message to a client's outbound queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Queued,
    /// Queue was full; the connection has been told to close
    Overflowed,
    /// Writer task is gone
    Closed,
}

// One connected WebSocket client
#[derive(Debug)]
pub struct Client {
    pub id: ClientId,
    pub addr: SocketAddr,
    /// Session this connection currently plays in
    pub game_id: Option<String>,
    sender: mpsc::Sender<Message>,
    kick: Arc<Notify>,
}

impl Client {
    pub fn new(
        id: ClientId,
        addr: SocketAddr,
        sender: mpsc::Sender<Message>,
        kick: Arc<Notify>,
    ) -> Self {
        Client {
            id,
            addr,
            game_id: None,
            sender,
            kick,
        }
    }

    // Queue a message without waiting. A full queue disconnects the client
    // instead of stalling whoever is broadcasting.
    pub fn send(&self, message: Message) -> Delivery {
        match self.sender.try_send(message) {
            Ok(()) => Delivery::Queued,
            Err(TrySendError::Full(_)) => {
                self.kick.notify_one();
                Delivery::Overflowed
            }
            Err(TrySendError::Closed(_)) => Delivery::Closed,
        }
    }
}
