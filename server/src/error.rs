//! Error types
//!
//! Rule violations and failed lookups are [`Rejection`]s: they are reported to
//! the acting client as `receive_invalid_action` and never end the connection.
//! [`HandlerError`] covers messages the router could not act on at all.

use crate::client_manager::ClientId;
use thiserror::Error;

/// Reason an action was refused. The display string is sent to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("game not found")]
    GameNotFound,
    #[error("game has already started")]
    GameInProgress,
    #[error("game is full")]
    GameFull,
    #[error("player id is already taken in this game")]
    PlayerIdTaken,
    #[error("no free cell left on the board")]
    BoardFull,
    #[error("player not found")]
    PlayerNotFound,
    #[error("player has been eliminated")]
    PlayerEliminated,
    #[error("not enough action points")]
    NotEnoughActionPoints,
    #[error("cell is out of range")]
    CellOutOfRange,
    #[error("cell is occupied")]
    CellOccupied,
    #[error("cell is not occupied")]
    CellNotOccupied,
    #[error("cannot target yourself")]
    CannotTargetSelf,
}

/// Failure to route or decode an inbound event
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("bad payload in request: {0}")]
    BadPayload(#[from] serde_json::Error),

    #[error("there is no such event type: {0}")]
    UnknownEventType(String),

    #[error("unknown client {0}")]
    UnknownClient(ClientId),
}

/// Transport and startup failures
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind: {0}")]
    Bind(#[from] std::io::Error),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}
