//! One game session and its roster
//!
//! [`GameSession`] holds the fields fixed at creation (id, join code, board
//! size, creating client) next to a mutex around [`SessionState`]. Everything
//! that changes during play lives behind that mutex and is reachable only
//! through [`GameSession::lock`], so every read or write of the roster happens
//! with the lock held.

use crate::clock::Countdown;
use crate::client_manager::ClientId;
use log::info;
use shared::{GameState, GameStatus, Hex, Player, JOIN_COLORS};
use std::collections::{BTreeMap, HashSet};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, MutexGuard};

pub struct GameSession {
    id: String,
    join_code: String,
    board_size: i32,
    main_client: ClientId,
    state: Mutex<SessionState>,
}

impl GameSession {
    pub fn new(
        id: String,
        join_code: String,
        board_size: i32,
        main_client: ClientId,
        state: SessionState,
    ) -> Self {
        Self {
            id,
            join_code,
            board_size,
            main_client,
            state: Mutex::new(state),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn join_code(&self) -> &str {
        &self.join_code
    }

    pub fn board_size(&self) -> i32 {
        self.board_size
    }

    /// Connection that created the session
    pub fn main_client(&self) -> ClientId {
        self.main_client
    }

    /// Exclusive access to the mutable state. Not reentrant.
    pub async fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().await
    }
}

/// A roster entry: the player and the connection currently controlling it
#[derive(Debug, Clone)]
pub struct Member {
    pub player: Player,
    pub client: Option<ClientId>,
}

#[derive(Debug)]
pub struct SessionState {
    status: GameStatus,
    roster: BTreeMap<String, Member>,
    last_activity: Instant,
    closed: bool,
    pub(crate) clock: Countdown,
}

impl SessionState {
    pub fn new(clock_period: Duration) -> Self {
        Self {
            status: GameStatus::Initialized,
            roster: BTreeMap::new(),
            last_activity: Instant::now(),
            closed: false,
            clock: Countdown::new(clock_period),
        }
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    /// Moves the session to `in_progress`. Returns false if it already was.
    pub fn start(&mut self) -> bool {
        if self.status == GameStatus::InProgress {
            return false;
        }
        self.status = GameStatus::InProgress;
        true
    }

    /// Marks the session as finished. Handlers treat a closed session as gone
    /// even before it has been removed from the session manager.
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }

    #[cfg(test)]
    pub(crate) fn set_last_activity(&mut self, at: Instant) {
        self.last_activity = at;
    }

    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_activity)
    }

    pub fn roster_size(&self) -> usize {
        self.roster.len()
    }

    pub fn contains_player(&self, player_id: &str) -> bool {
        self.roster.contains_key(player_id)
    }

    pub fn add_player(&mut self, player: Player, client: Option<ClientId>) {
        info!("Added player {} ({})", player.id, player.color);
        self.roster
            .insert(player.id.clone(), Member { player, client });
    }

    pub fn remove_player(&mut self, player_id: &str) -> Option<Member> {
        self.roster.remove(player_id)
    }

    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.roster.get(player_id).map(|member| &member.player)
    }

    pub fn player_mut(&mut self, player_id: &str) -> Option<&mut Player> {
        self.roster.get_mut(player_id).map(|member| &mut member.player)
    }

    /// Living player standing on `hex`
    pub fn player_at(&self, hex: Hex) -> Option<&Player> {
        self.roster
            .values()
            .map(|member| &member.player)
            .find(|player| {
                player
                    .state
                    .as_ref()
                    .is_some_and(|state| state.position() == hex)
            })
    }

    pub fn living_player_count(&self) -> usize {
        self.roster
            .values()
            .filter(|member| member.player.is_alive())
            .count()
    }

    /// Gives every living player `amount` action points
    pub fn award_action_points(&mut self, amount: i32) -> usize {
        let mut awarded = 0;
        for state in self
            .roster
            .values_mut()
            .filter_map(|member| member.player.state.as_mut())
        {
            state.action_points += amount;
            awarded += 1;
        }
        awarded
    }

    /// Positions of every living player
    pub fn occupied_positions(&self) -> HashSet<Hex> {
        self.roster
            .values()
            .filter_map(|member| member.player.state.as_ref())
            .map(|state| state.position())
            .collect()
    }

    /// Connections of every member that is still connected, each listed once
    pub fn all_clients(&self) -> Vec<ClientId> {
        let mut clients: Vec<ClientId> = self
            .roster
            .values()
            .filter_map(|member| member.client)
            .collect();
        clients.sort_unstable();
        clients.dedup();
        clients
    }

    /// `(player id, connection)` for every connected member
    pub fn member_clients(&self) -> Vec<(String, ClientId)> {
        self.roster
            .iter()
            .filter_map(|(id, member)| member.client.map(|client| (id.clone(), client)))
            .collect()
    }

    /// Forgets a closed connection. The players it controlled stay in the game.
    pub fn detach_client(&mut self, client_id: ClientId) -> Vec<String> {
        let mut detached = Vec::new();
        for (id, member) in self.roster.iter_mut() {
            if member.client == Some(client_id) {
                member.client = None;
                detached.push(id.clone());
            }
        }
        detached
    }

    /// Color for the next player to join
    pub fn next_join_color(&self) -> &'static str {
        JOIN_COLORS[self.roster.len() % JOIN_COLORS.len()]
    }

    /// Authoritative state as broadcast to clients
    pub fn snapshot(&self) -> GameState {
        GameState {
            players: self
                .roster
                .iter()
                .map(|(id, member)| (id.clone(), member.player.clone()))
                .collect(),
            status: self.status,
        }
    }
}
