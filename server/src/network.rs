//! WebSocket transport
//!
//! Accepts TCP connections, upgrades them to WebSockets and runs two tasks per
//! connection: a reader that parses text frames into events and hands them to
//! the [`EventRouter`] in arrival order, and a writer that drains the
//! connection's bounded outbound queue to the socket. Neither task holds a
//! game lock while doing socket I/O.

use crate::client_manager::{ClientId, ClientManager};
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::handlers::EventRouter;
use crate::session_manager::SessionManager;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::Event;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Notify, RwLock};
use tokio_tungstenite::{accept_async, tungstenite::Message};

/// Game server bound to a listening socket
pub struct NetworkServer {
    listener: TcpListener,
    config: ServerConfig,
    clients: Arc<RwLock<ClientManager>>,
    sessions: Arc<SessionManager>,
    router: EventRouter,
}

impl NetworkServer {
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(config.bind_address()).await?;
        info!("Server listening on {}", listener.local_addr()?);

        let clients = Arc::new(RwLock::new(ClientManager::new(config.max_connections)));
        let sessions = Arc::new(SessionManager::new(config.clone()));
        let router = EventRouter::new(Arc::clone(&sessions), Arc::clone(&clients), &config);

        Ok(Self {
            listener,
            config,
            clients,
            sessions,
            router,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn sessions(&self) -> Arc<SessionManager> {
        Arc::clone(&self.sessions)
    }

    /// Accepts connections until the task is dropped
    pub async fn run(self) -> Result<(), ServerError> {
        let _sweeper = self.sessions.spawn_sweeper();
        info!(
            "Server started (board size {}, clock {:?})",
            self.config.board_size, self.config.clock_period
        );

        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => self.handle_connection(stream, addr),
                Err(e) => error!("Accept error: {}", e),
            }
        }
    }

    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let clients = Arc::clone(&self.clients);
        let router = self.router.clone();
        let capacity = self.config.outbound_queue_capacity;

        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    warn!("WebSocket handshake failed for {}: {}", addr, e);
                    return;
                }
            };

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (tx, mut rx) = mpsc::channel::<Message>(capacity);
            let kick = Arc::new(Notify::new());

            let client_id = clients
                .write()
                .await
                .add_client(addr, tx, Arc::clone(&kick));
            let Some(client_id) = client_id else {
                warn!("Connection limit reached, rejecting {}", addr);
                let _ = ws_sender.close().await;
                return;
            };

            // Writer: drain the outbound queue until it closes or the client
            // is kicked for falling behind
            let mut writer = tokio::spawn(async move {
                loop {
                    tokio::select! {
                        message = rx.recv() => match message {
                            Some(message) => {
                                if let Err(e) = ws_sender.send(message).await {
                                    debug!("Write to client {} failed: {}", client_id, e);
                                    break;
                                }
                            }
                            None => break,
                        },
                        _ = kick.notified() => {
                            warn!("Disconnecting client {} after outbound overflow", client_id);
                            break;
                        }
                    }
                }
                let _ = ws_sender.close().await;
            });

            // Reader: route events in the order they arrive
            let mut writer_done = false;
            loop {
                tokio::select! {
                    frame = ws_receiver.next() => match frame {
                        Some(Ok(Message::Text(text))) => {
                            handle_text(&router, client_id, &text).await;
                        }
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            warn!("WebSocket error for client {}: {}", client_id, e);
                            break;
                        }
                    },
                    _ = &mut writer => {
                        writer_done = true;
                        break;
                    }
                }
            }

            // Dropping the registry entry closes the queue and stops the writer
            router.client_disconnected(client_id).await;
            if !writer_done {
                let _ = writer.await;
            }
        });
    }
}

async fn handle_text(router: &EventRouter, client_id: ClientId, text: &str) {
    match Event::from_json(text) {
        Ok(event) => {
            if let Err(e) = router.route_event(&event, client_id).await {
                warn!("Dropped {} from client {}: {}", event.event_type, client_id, e);
            }
        }
        Err(e) => {
            warn!("Malformed message from client {}: {}", client_id, e);
        }
    }
}
