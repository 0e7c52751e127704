//! # Hex Tactics Game Server Library
//!
//! This library provides the authoritative server for a turn-based tactical
//! game played on a hexagonal board. Clients connect over WebSocket, create or
//! join a session with a short join code, and then spend action points to
//! move, shoot, extend their range or hand points to other players until only
//! one player is left standing.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Rules
//! Every action is checked against the locked session state in a fixed order.
//! A refused action is reported only to the client that sent it, as a
//! `receive_invalid_action` event with a readable reason, and changes nothing.
//!
//! ### Session Lifecycle
//! Sessions start in a lobby (`initialized`), move to `in_progress` when a
//! player starts them and end when a single living player remains. A
//! background sweep evicts lobbies and matches that have been idle too long.
//!
//! ### State Broadcasting
//! After every accepted action the full game state is sent to each member of
//! the session. Delivery to one client never waits on another: each connection
//! has its own bounded outbound queue, and a client that falls behind is
//! disconnected instead of stalling the game.
//!
//! ## Architecture Design
//!
//! ### Independently Locked Sessions
//! Each session is an `Arc<GameSession>` with its own mutex. The session
//! manager's lock only covers the session map and is never taken while a
//! session lock is held. Sessions that must go away are marked closed under
//! their own lock first and removed from the map afterwards.
//!
//! ### Connections by Id
//! Game state never holds a socket. Roster entries refer to connections by
//! [`client_manager::ClientId`] and are resolved through the
//! [`client_manager::ClientManager`] when broadcasting, so a connection that
//! drops mid-action cannot leave a dangling handle behind.
//!
//! ## Module Organization
//!
//! - [`config`]: server configuration and defaults
//! - [`error`]: rejection reasons and handler/transport errors
//! - [`client`] and [`client_manager`]: registry of open connections
//! - [`game`]: a session's roster and state
//! - [`actions`]: rule checks and mutations for every player action
//! - [`session_manager`]: active sessions, join codes and the cleanup sweep
//! - [`clock`]: per-session action point countdown
//! - [`broadcast`]: fan-out of outgoing events
//! - [`handlers`]: decoding and routing of inbound events
//! - [`network`]: WebSocket listener and per-connection tasks
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::NetworkServer;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig {
//!         port: 8080,
//!         ..ServerConfig::default()
//!     };
//!
//!     // Bind, then accept connections until the process exits
//!     let server = NetworkServer::bind(config).await?;
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod actions;
pub mod broadcast;
pub mod client;
pub mod client_manager;
pub mod clock;
pub mod config;
pub mod error;
pub mod game;
pub mod handlers;
pub mod network;
pub mod session_manager;
