//! Event routing and the action pipeline
//!
//! Every inbound event follows the same path: decode the payload, resolve the
//! session through the client's registry entry, lock it, run the action's
//! checks and either reject to the acting client alone or apply the change and
//! broadcast the new state to every member. A handler holds at most one
//! session lock and never takes the manager lock while holding it.

use crate::actions::{self, ShotOutcome};
use crate::broadcast::Broadcaster;
use crate::client_manager::{ClientId, ClientManager};
use crate::clock::spawn_clock;
use crate::config::ServerConfig;
use crate::error::{HandlerError, Rejection};
use crate::game::GameSession;
use crate::session_manager::SessionManager;
use log::{debug, info};
use shared::{
    tags, timestamp, CellRequest, Event, GameStateUpdate, Hex, InitializeGameResponse,
    JoinGameResponse, JoinRequest, PlayerRequest, PlayerWinResponse,
};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-game action performed by one player
#[derive(Debug, Clone, Copy)]
enum PlayerAction {
    Move(Hex),
    Shoot(Hex),
    IncreaseRange,
    GiveActionPoint(Hex),
}

impl PlayerAction {
    fn response_tag(&self) -> &'static str {
        match self {
            PlayerAction::Move(_) => tags::RECEIVE_PLAYER_MOVE,
            PlayerAction::Shoot(_) => tags::RECEIVE_PLAYER_SHOOT,
            PlayerAction::IncreaseRange => tags::RECEIVE_PLAYER_INCREASE_RANGE,
            PlayerAction::GiveActionPoint(_) => tags::RECEIVE_PLAYER_GIVE_ACTION_POINT,
        }
    }
}

/// Dispatches decoded events from connections to the game
#[derive(Clone)]
pub struct EventRouter {
    sessions: Arc<SessionManager>,
    clients: Arc<RwLock<ClientManager>>,
    broadcaster: Broadcaster,
    max_players: usize,
}

impl EventRouter {
    pub fn new(
        sessions: Arc<SessionManager>,
        clients: Arc<RwLock<ClientManager>>,
        config: &ServerConfig,
    ) -> Self {
        let broadcaster = Broadcaster::new(Arc::clone(&clients));
        Self {
            sessions,
            clients,
            broadcaster,
            max_players: config.max_players,
        }
    }

    /// Handles one event from `client_id`.
    ///
    /// Rule violations are reported to the client and return `Ok`. Errors are
    /// only returned for events that could not be acted on at all.
    pub async fn route_event(&self, event: &Event, client_id: ClientId) -> Result<(), HandlerError> {
        if !self.clients.read().await.contains(&client_id) {
            return Err(HandlerError::UnknownClient(client_id));
        }

        debug!("Client {} sent {}", client_id, event.event_type);

        match event.event_type.as_str() {
            tags::SEND_INITIALIZE_GAME => self.initialize_game(event.decode()?, client_id).await,
            tags::SEND_JOIN_GAME => self.join_game(event.decode()?, client_id).await,
            tags::SEND_START_GAME => self.start_game(event.decode()?, client_id).await,
            tags::SEND_PLAYER_MOVE => {
                let request: CellRequest = event.decode()?;
                self.player_action(client_id, &request.player_id, PlayerAction::Move(request.hex))
                    .await
            }
            tags::SEND_PLAYER_SHOOT => {
                let request: CellRequest = event.decode()?;
                self.player_action(client_id, &request.player_id, PlayerAction::Shoot(request.hex))
                    .await
            }
            tags::SEND_PLAYER_INCREASE_RANGE => {
                let request: PlayerRequest = event.decode()?;
                self.player_action(client_id, &request.player_id, PlayerAction::IncreaseRange)
                    .await
            }
            tags::SEND_PLAYER_GIVE_ACTION_POINT => {
                let request: CellRequest = event.decode()?;
                self.player_action(
                    client_id,
                    &request.player_id,
                    PlayerAction::GiveActionPoint(request.hex),
                )
                .await
            }
            other => Err(HandlerError::UnknownEventType(other.to_string())),
        }
    }

    /// Cleans up after a closed connection. Its players stay in their game.
    pub async fn client_disconnected(&self, client_id: ClientId) {
        let removed = self.clients.write().await.remove_client(&client_id);
        if let Some(game_id) = removed.and_then(|client| client.game_id) {
            self.detach_from(&game_id, client_id).await;
        }
    }

    async fn initialize_game(&self, request: PlayerRequest, client_id: ClientId) -> Result<(), HandlerError> {
        let previous = self.clients.read().await.game_id(&client_id);

        let session = match self.sessions.create(client_id, &request.player_id).await {
            Ok(session) => session,
            Err(rejection) => {
                self.broadcaster.reject(client_id, rejection).await;
                return Ok(());
            }
        };

        self.clients
            .write()
            .await
            .set_game_id(&client_id, session.id());
        if let Some(previous) = previous {
            self.detach_from(&previous, client_id).await;
        }

        let response = InitializeGameResponse {
            join_code: session.join_code().to_string(),
            sent: timestamp(),
        };
        self.broadcaster
            .send(tags::RECEIVE_INITIALIZE_GAME, &response, client_id)
            .await;
        Ok(())
    }

    async fn join_game(&self, request: JoinRequest, client_id: ClientId) -> Result<(), HandlerError> {
        let Some(session) = self.sessions.find_by_join_code(&request.join_code).await else {
            self.broadcaster
                .reject(client_id, Rejection::GameNotFound)
                .await;
            return Ok(());
        };

        let previous = self.clients.read().await.game_id(&client_id);

        {
            let mut state = session.lock().await;
            if state.is_closed() {
                self.broadcaster
                    .reject(client_id, Rejection::GameNotFound)
                    .await;
                return Ok(());
            }

            let joined = {
                let mut rng = rand::thread_rng();
                actions::join(
                    &mut state,
                    session.board_size(),
                    self.max_players,
                    &request.player_id,
                    client_id,
                    &mut rng,
                )
            };
            let color = match joined {
                Ok(color) => color,
                Err(rejection) => {
                    self.broadcaster.reject(client_id, rejection).await;
                    return Ok(());
                }
            };

            state.touch();
            info!(
                "{} joined game {} as {}",
                request.player_id,
                session.id(),
                color
            );

            self.clients
                .write()
                .await
                .set_game_id(&client_id, session.id());

            // Each member learns whether it is the creating connection
            let player_count = state.roster_size();
            let mut notified = HashSet::new();
            for (_, member_client) in state.member_clients() {
                if !notified.insert(member_client) {
                    continue;
                }
                let response = JoinGameResponse {
                    player_count,
                    is_main_client: member_client == session.main_client(),
                    sent: timestamp(),
                };
                self.broadcaster
                    .send(tags::RECEIVE_JOIN_GAME, &response, member_client)
                    .await;
            }
        }

        if let Some(previous) = previous.filter(|previous| previous != session.id()) {
            self.detach_from(&previous, client_id).await;
        }
        Ok(())
    }

    async fn start_game(&self, request: PlayerRequest, client_id: ClientId) -> Result<(), HandlerError> {
        let Some(session) = self.session_for(client_id).await else {
            self.broadcaster
                .reject(client_id, Rejection::GameNotFound)
                .await;
            return Ok(());
        };

        let mut state = session.lock().await;
        if state.is_closed() {
            self.broadcaster
                .reject(client_id, Rejection::GameNotFound)
                .await;
            return Ok(());
        }

        if state.start() {
            info!("{} started game {}", request.player_id, session.id());
        }
        state.touch();

        if state.clock.mark_running() {
            spawn_clock(Arc::clone(&session), self.broadcaster.clone());
        }

        let update = GameStateUpdate {
            game_state: state.snapshot(),
            sent: timestamp(),
        };
        self.broadcaster
            .broadcast(tags::RECEIVE_START_GAME, &update, &state.all_clients())
            .await;
        Ok(())
    }

    async fn player_action(
        &self,
        client_id: ClientId,
        player_id: &str,
        action: PlayerAction,
    ) -> Result<(), HandlerError> {
        let Some(session) = self.session_for(client_id).await else {
            self.broadcaster
                .reject(client_id, Rejection::GameNotFound)
                .await;
            return Ok(());
        };

        let mut state = session.lock().await;
        if state.is_closed() {
            self.broadcaster
                .reject(client_id, Rejection::GameNotFound)
                .await;
            return Ok(());
        }

        let board_size = session.board_size();
        let outcome = match action {
            PlayerAction::Move(hex) => {
                actions::move_player(&mut state, board_size, player_id, hex).map(|_| None)
            }
            PlayerAction::Shoot(hex) => actions::shoot(&mut state, player_id, hex).map(Some),
            PlayerAction::IncreaseRange => {
                actions::increase_range(&mut state, board_size, player_id).map(|_| None)
            }
            PlayerAction::GiveActionPoint(hex) => {
                actions::give_action_point(&mut state, player_id, hex).map(|_| None)
            }
        };

        let shot = match outcome {
            Ok(shot) => shot,
            Err(rejection) => {
                self.broadcaster.reject(client_id, rejection).await;
                return Ok(());
            }
        };

        state.touch();
        let targets = state.all_clients();

        if let Some(ShotOutcome::Won { color }) = shot {
            let response = PlayerWinResponse {
                game_state: state.snapshot(),
                player_color: color,
                sent: timestamp(),
            };
            self.broadcaster
                .broadcast(tags::RECEIVE_PLAYER_WIN, &response, &targets)
                .await;

            state.close();
            drop(state);

            info!("{} won game {}", player_id, session.id());
            self.sessions.remove(session.id()).await;
            return Ok(());
        }

        let update = GameStateUpdate {
            game_state: state.snapshot(),
            sent: timestamp(),
        };
        self.broadcaster
            .broadcast(action.response_tag(), &update, &targets)
            .await;
        Ok(())
    }

    /// Session the client is currently attached to
    async fn session_for(&self, client_id: ClientId) -> Option<Arc<GameSession>> {
        let game_id = self.clients.read().await.game_id(&client_id)?;
        self.sessions.get(&game_id).await
    }

    async fn detach_from(&self, game_id: &str, client_id: ClientId) {
        let Some(session) = self.sessions.get(game_id).await else {
            return;
        };
        let detached = session.lock().await.detach_client(client_id);
        if !detached.is_empty() {
            debug!(
                "Client {} detached from {} in game {}",
                client_id,
                detached.join(", "),
                game_id
            );
        }
    }
}
