//! Wire protocol and board geometry shared by the game server and its clients
//!
//! Every message on the wire is a JSON envelope `{ "type": <tag>, "payload": <json> }`.
//! Inbound tags start with `send_`, outbound tags with `receive_`. Payload
//! field names follow the browser client (`playerID`, `joinCode`, `gameState`).

pub mod hex;

pub use hex::{Cube, FractionalCube, Hex};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const DEFAULT_BOARD_SIZE: i32 = 17;
pub const MAX_PLAYERS: usize = 8;
pub const STARTING_HEARTS: i32 = 3;
pub const STARTING_RANGE: i32 = 1;
pub const STARTING_ACTION_POINTS: i32 = 0;

/// Color of the player who created the session
pub const CREATOR_COLOR: &str = "blue";

/// Colors handed out on join, indexed by roster size at join time
pub const JOIN_COLORS: [&str; 7] = [
    "magenta", "red", "green", "purple", "orange", "cyan", "yellow",
];

/// Event type tags
pub mod tags {
    pub const SEND_INITIALIZE_GAME: &str = "send_initialize_game";
    pub const RECEIVE_INITIALIZE_GAME: &str = "receive_initialize_game";
    pub const SEND_JOIN_GAME: &str = "send_join_game";
    pub const RECEIVE_JOIN_GAME: &str = "receive_join_game";
    pub const SEND_START_GAME: &str = "send_start_game";
    pub const RECEIVE_START_GAME: &str = "receive_start_game";
    pub const SEND_PLAYER_MOVE: &str = "send_player_move";
    pub const RECEIVE_PLAYER_MOVE: &str = "receive_player_move";
    pub const SEND_PLAYER_SHOOT: &str = "send_player_shoot";
    pub const RECEIVE_PLAYER_SHOOT: &str = "receive_player_shoot";
    pub const RECEIVE_PLAYER_WIN: &str = "receive_player_win";
    pub const SEND_PLAYER_INCREASE_RANGE: &str = "send_player_increase_range";
    pub const RECEIVE_PLAYER_INCREASE_RANGE: &str = "receive_player_increase_range";
    pub const SEND_PLAYER_GIVE_ACTION_POINT: &str = "send_player_give_action_point";
    pub const RECEIVE_PLAYER_GIVE_ACTION_POINT: &str = "receive_player_give_action_point";
    pub const RECEIVE_INVALID_ACTION: &str = "receive_invalid_action";
    pub const RECEIVE_CLOCK_UPDATE: &str = "receive_clock_update";
    pub const RECEIVE_ACTION_POINT: &str = "receive_action_point";
}

/// Message envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub payload: Value,
}

impl Event {
    /// Wraps a payload with its type tag
    pub fn new<T: Serialize>(event_type: &str, payload: &T) -> Result<Self, serde_json::Error> {
        Ok(Self {
            event_type: event_type.to_string(),
            payload: serde_json::to_value(payload)?,
        })
    }

    /// Decodes the payload into the expected shape for this event type
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.payload)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// Inbound payloads

/// Payload of `send_initialize_game`, `send_start_game` and
/// `send_player_increase_range`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRequest {
    #[serde(rename = "playerID")]
    pub player_id: String,
}

/// Payload of `send_join_game`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinRequest {
    #[serde(rename = "playerID")]
    pub player_id: String,
    #[serde(rename = "joinCode")]
    pub join_code: String,
}

/// Payload of `send_player_move`, `send_player_shoot` and
/// `send_player_give_action_point`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellRequest {
    #[serde(rename = "playerID")]
    pub player_id: String,
    pub hex: Hex,
}

// Outbound payloads

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeGameResponse {
    pub join_code: String,
    pub sent: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinGameResponse {
    pub player_count: usize,
    pub is_main_client: bool,
    pub sent: DateTime<Utc>,
}

/// Payload of every outbound event that carries the authoritative game state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStateUpdate {
    pub game_state: GameState,
    pub sent: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerWinResponse {
    pub game_state: GameState,
    pub player_color: String,
    pub sent: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvalidActionResponse {
    pub message: String,
    pub sent: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClockUpdate {
    pub seconds: u64,
    pub sent: DateTime<Utc>,
}

// Game state

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Initialized,
    InProgress,
}

/// Snapshot broadcast to clients. Board size, join code and session id are
/// deliberately absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub players: BTreeMap<String, Player>,
    pub status: GameStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub color: String,
    /// `None` once the player has been eliminated
    pub state: Option<PlayerState>,
}

impl Player {
    pub fn new(id: String, color: String, state: PlayerState) -> Self {
        Self {
            id,
            color,
            state: Some(state),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.state.is_some()
    }
}

/// Mutable per-player game state.
///
/// Position and range are only changed through [`PlayerState::relocate`] and
/// [`PlayerState::set_range`], which keep the cached range cells in sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    pub hearts: i32,
    range: i32,
    pub action_points: i32,
    position: Hex,
    cells_in_range: Vec<Hex>,
    cells_at_max_range: Vec<Hex>,
}

impl PlayerState {
    pub fn new(board_size: i32, position: Hex) -> Self {
        let mut state = Self {
            hearts: STARTING_HEARTS,
            range: STARTING_RANGE,
            action_points: STARTING_ACTION_POINTS,
            position,
            cells_in_range: Vec::new(),
            cells_at_max_range: Vec::new(),
        };
        state.recompute_ranges(board_size);
        state
    }

    pub fn range(&self) -> i32 {
        self.range
    }

    pub fn position(&self) -> Hex {
        self.position
    }

    /// Spiral of cells reachable within `range`, center last
    pub fn cells_in_range(&self) -> &[Hex] {
        &self.cells_in_range
    }

    /// Outer ring at exactly `range`
    pub fn cells_at_max_range(&self) -> &[Hex] {
        &self.cells_at_max_range
    }

    pub fn is_cell_in_range(&self, hex: Hex) -> bool {
        self.cells_in_range.contains(&hex)
    }

    pub fn relocate(&mut self, board_size: i32, position: Hex) {
        self.position = position;
        self.recompute_ranges(board_size);
    }

    pub fn set_range(&mut self, board_size: i32, range: i32) {
        self.range = range;
        self.recompute_ranges(board_size);
    }

    fn recompute_ranges(&mut self, board_size: i32) {
        self.cells_in_range = hex::spiral(board_size, self.position, self.range);
        self.cells_at_max_range = hex::ring(board_size, self.position, self.range);
    }
}

/// Current wall-clock time for the `sent` field
pub fn timestamp() -> DateTime<Utc> {
    Utc::now()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_decode_cell_request() {
        let event = Event::from_json(
            r#"{"type":"send_player_move","payload":{"playerID":"A","hex":{"r":3,"q":5}}}"#,
        )
        .unwrap();

        assert_eq!(event.event_type, tags::SEND_PLAYER_MOVE);
        let request: CellRequest = event.decode().unwrap();
        assert_eq!(request.player_id, "A");
        assert_eq!(request.hex, Hex::new(3, 5));
    }

    #[test]
    fn test_envelope_decode_rejects_missing_fields() {
        let event = Event::from_json(r#"{"type":"send_join_game","payload":{"playerID":"B"}}"#)
            .unwrap();
        assert!(event.decode::<JoinRequest>().is_err());
    }

    #[test]
    fn test_envelope_without_type_is_rejected() {
        assert!(Event::from_json(r#"{"payload":{}}"#).is_err());
        assert!(Event::from_json("not json").is_err());
    }

    #[test]
    fn test_player_state_starting_values() {
        let state = PlayerState::new(DEFAULT_BOARD_SIZE, Hex::new(8, 8));
        assert_eq!(state.hearts, STARTING_HEARTS);
        assert_eq!(state.range(), STARTING_RANGE);
        assert_eq!(state.action_points, STARTING_ACTION_POINTS);
        assert_eq!(state.cells_in_range().len(), 7);
        assert_eq!(state.cells_at_max_range().len(), 6);
        assert_eq!(state.cells_in_range().last(), Some(&Hex::new(8, 8)));
    }

    #[test]
    fn test_player_state_caches_follow_position_and_range() {
        let mut state = PlayerState::new(DEFAULT_BOARD_SIZE, Hex::new(8, 8));

        state.relocate(DEFAULT_BOARD_SIZE, Hex::new(9, 8));
        assert!(state.is_cell_in_range(Hex::new(10, 8)));
        assert!(!state.is_cell_in_range(Hex::new(7, 8)));

        state.set_range(DEFAULT_BOARD_SIZE, 2);
        assert_eq!(state.cells_in_range().len(), 19);
        assert_eq!(state.cells_at_max_range().len(), 12);
        assert!(state.is_cell_in_range(Hex::new(7, 8)));
        assert!(!state.cells_at_max_range().contains(&Hex::new(9, 8)));
    }

    #[test]
    fn test_snapshot_json_shape() {
        let mut players = BTreeMap::new();
        players.insert(
            "A".to_string(),
            Player::new(
                "A".to_string(),
                CREATOR_COLOR.to_string(),
                PlayerState::new(5, Hex::new(2, 2)),
            ),
        );
        players.insert(
            "B".to_string(),
            Player {
                id: "B".to_string(),
                color: "red".to_string(),
                state: None,
            },
        );

        let update = GameStateUpdate {
            game_state: GameState {
                players,
                status: GameStatus::InProgress,
            },
            sent: timestamp(),
        };
        let value = serde_json::to_value(&update).unwrap();

        assert_eq!(value["gameState"]["status"], json!("in_progress"));
        assert_eq!(value["gameState"]["players"]["B"]["state"], Value::Null);
        let a = &value["gameState"]["players"]["A"]["state"];
        assert_eq!(a["hearts"], json!(3));
        assert_eq!(a["actionPoints"], json!(0));
        assert_eq!(a["position"], json!({"r": 2, "q": 2}));
        assert!(a["cellsInRange"].is_array());
        assert!(a["cellsAtMaxRange"].is_array());
        assert!(value["gameState"].get("boardSize").is_none());
        assert!(value["sent"].is_string());
    }

    #[test]
    fn test_outbound_field_names() {
        let join = serde_json::to_value(JoinGameResponse {
            player_count: 2,
            is_main_client: true,
            sent: timestamp(),
        })
        .unwrap();
        assert_eq!(join["playerCount"], json!(2));
        assert_eq!(join["isMainClient"], json!(true));

        let init = serde_json::to_value(InitializeGameResponse {
            join_code: "ab12".to_string(),
            sent: timestamp(),
        })
        .unwrap();
        assert_eq!(init["joinCode"], json!("ab12"));
    }
}
