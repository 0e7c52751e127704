//! Registry of connected clients
//!
//! This module tracks every open connection and, for each one:
//! - the outbound queue its writer task drains to the socket
//! - the session it currently plays in, if any
//!
//! Sessions refer to connections only by [`ClientId`] and resolve them here
//! when broadcasting, so a connection torn down by the transport never leaves
//! a dangling handle inside game state.
//!
//! The registry lock is a leaf: callers may hold a manager or session lock
//! while taking it, but nothing else is acquired while it is held.

use crate::client::{Client, Delivery};
use log::{debug, info};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};
use tokio_tungstenite::tungstenite::Message;

/// Server-assigned connection identifier
pub type ClientId = u32;

/// Manages all connected clients
///
/// Enforces the connection limit and hands out increasing client ids starting
/// from 1.
pub struct ClientManager {
    /// Connected clients indexed by their unique ID
    clients: HashMap<ClientId, Client>,
    /// Next available client ID for new connections
    next_client_id: ClientId,
    /// Maximum number of concurrent clients allowed
    max_clients: usize,
}

impl ClientManager {
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
            max_clients,
        }
    }

    /// Registers a new connection
    ///
    /// Returns None if the server is at capacity.
    pub fn add_client(
        &mut self,
        addr: SocketAddr,
        sender: mpsc::Sender<Message>,
        kick: Arc<Notify>,
    ) -> Option<ClientId> {
        if self.clients.len() >= self.max_clients {
            return None;
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;

        info!("Client {} connected from {}", client_id, addr);
        self.clients
            .insert(client_id, Client::new(client_id, addr, sender, kick));

        Some(client_id)
    }

    /// Deregisters a connection, returning its last known state
    pub fn remove_client(&mut self, client_id: &ClientId) -> Option<Client> {
        let client = self.clients.remove(client_id)?;
        info!("Client {} disconnected", client.id);
        Some(client)
    }

    pub fn contains(&self, client_id: &ClientId) -> bool {
        self.clients.contains_key(client_id)
    }

    /// Session the client currently belongs to
    pub fn game_id(&self, client_id: &ClientId) -> Option<String> {
        self.clients
            .get(client_id)
            .and_then(|client| client.game_id.clone())
    }

    /// Points a client at a session. Returns false for unknown clients.
    pub fn set_game_id(&mut self, client_id: &ClientId, game_id: &str) -> bool {
        match self.clients.get_mut(client_id) {
            Some(client) => {
                client.game_id = Some(game_id.to_string());
                true
            }
            None => false,
        }
    }

    /// Queues a message for one client
    pub fn send(&self, client_id: &ClientId, message: Message) -> Delivery {
        match self.clients.get(client_id) {
            Some(client) => client.send(message),
            None => {
                debug!("Dropping message for unknown client {}", client_id);
                Delivery::Closed
            }
        }
    }

    /// Returns the number of currently connected clients
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns true if no clients are currently connected
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
