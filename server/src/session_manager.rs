//! Active game sessions
//!
//! The manager's lock only guards the session map itself (insert, lookup,
//! delete) and is released before any per-session work begins. It is never
//! acquired while a session lock is held: sessions that should go away are
//! first marked closed under their own lock and removed from the map after
//! that lock is released.

use crate::client_manager::ClientId;
use crate::config::ServerConfig;
use crate::error::Rejection;
use crate::game::{GameSession, SessionState};
use log::info;
use rand::Rng;
use shared::hex::random_free_position;
use shared::{GameStatus, Player, PlayerState, CREATOR_COLOR};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::interval;
use uuid::Uuid;

/// Join code draws at one length before trying a longer code
const JOIN_CODE_ATTEMPTS: usize = 64;

pub struct SessionManager {
    games: RwLock<HashMap<String, Arc<GameSession>>>,
    config: ServerConfig,
}

impl SessionManager {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            games: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Creates and registers a session with its creator already seated.
    ///
    /// The map stays write-locked for the whole creation so the new id and
    /// join code cannot collide with a concurrent creation.
    pub async fn create(
        &self,
        main_client: ClientId,
        creator_id: &str,
    ) -> Result<Arc<GameSession>, Rejection> {
        let mut games = self.games.write().await;
        let session = Arc::new(self.build_session(&games, main_client, creator_id)?);

        info!(
            "Created game {} with join code {}",
            session.id(),
            session.join_code()
        );
        games.insert(session.id().to_string(), Arc::clone(&session));
        Ok(session)
    }

    fn build_session(
        &self,
        games: &HashMap<String, Arc<GameSession>>,
        main_client: ClientId,
        creator_id: &str,
    ) -> Result<GameSession, Rejection> {
        let mut rng = rand::thread_rng();
        let board_size = self.config.board_size;

        let position =
            random_free_position(board_size, &HashSet::new(), &mut rng).ok_or(Rejection::BoardFull)?;

        let mut state = SessionState::new(self.config.clock_period);
        state.add_player(
            Player::new(
                creator_id.to_string(),
                CREATOR_COLOR.to_string(),
                PlayerState::new(board_size, position),
            ),
            Some(main_client),
        );

        let active_codes: HashSet<&str> = games.values().map(|game| game.join_code()).collect();
        let join_code = unique_join_code(&active_codes, self.config.join_code_bytes, &mut rng);

        Ok(GameSession::new(
            new_game_id(),
            join_code,
            board_size,
            main_client,
            state,
        ))
    }

    pub async fn get(&self, game_id: &str) -> Option<Arc<GameSession>> {
        self.games.read().await.get(game_id).cloned()
    }

    pub async fn find_by_join_code(&self, join_code: &str) -> Option<Arc<GameSession>> {
        self.games
            .read()
            .await
            .values()
            .find(|game| game.join_code() == join_code)
            .cloned()
    }

    /// Removes a session. Removing an unknown id is a no-op.
    pub async fn remove(&self, game_id: &str) -> bool {
        let removed = self.games.write().await.remove(game_id).is_some();
        if removed {
            info!("Removed game {}", game_id);
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.games.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.games.read().await.is_empty()
    }

    /// Evicts abandoned sessions and returns their ids.
    ///
    /// Works on a snapshot of the map so the manager lock is not held while
    /// each session is inspected under its own lock.
    pub async fn sweep(&self, now: Instant) -> Vec<String> {
        let sessions: Vec<Arc<GameSession>> = self.games.read().await.values().cloned().collect();
        let mut evicted = Vec::new();

        for session in sessions {
            let expired = {
                let mut state = session.lock().await;
                if state.is_closed() {
                    true
                } else if self.is_abandoned(state.status(), state.idle_for(now)) {
                    info!(
                        "Evicting game {} ({:?}, idle {:?})",
                        session.id(),
                        state.status(),
                        state.idle_for(now)
                    );
                    state.close();
                    true
                } else {
                    false
                }
            };

            if expired && self.remove(session.id()).await {
                evicted.push(session.id().to_string());
            }
        }

        evicted
    }

    fn is_abandoned(&self, status: GameStatus, idle: Duration) -> bool {
        match status {
            GameStatus::Initialized => idle >= self.config.lobby_ttl,
            GameStatus::InProgress => idle >= self.config.game_ttl,
        }
    }

    /// Runs [`SessionManager::sweep`] on a fixed interval
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        let every = self.config.sweep_interval;

        tokio::spawn(async move {
            let mut ticker = interval(every);

            // Skip the first tick since it fires immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let evicted = manager.sweep(Instant::now()).await;
                if !evicted.is_empty() {
                    info!("Cleanup sweep evicted {} games", evicted.len());
                }
            }
        })
    }
}

fn new_game_id() -> String {
    format!("game-{}", Uuid::new_v4())
}

/// Hex-encoded random bytes
pub fn new_join_code<R: Rng + ?Sized>(bytes: usize, rng: &mut R) -> String {
    (0..bytes.max(1))
        .map(|_| format!("{:02x}", rng.gen::<u8>()))
        .collect()
}

fn unique_join_code<R: Rng + ?Sized>(active: &HashSet<&str>, bytes: usize, rng: &mut R) -> String {
    let mut bytes = bytes.max(1);
    loop {
        for _ in 0..JOIN_CODE_ATTEMPTS {
            let code = new_join_code(bytes, rng);
            if !active.contains(code.as_str()) {
                return code;
            }
        }
        bytes += 1;
    }
}
