//! Server configuration
//!
//! Built from command-line arguments in `main`; tests use [`ServerConfig::default`]
//! and override individual fields.

use shared::{DEFAULT_BOARD_SIZE, MAX_PLAYERS};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind the WebSocket listener to
    pub host: String,
    /// Port to listen on, 0 picks a free port
    pub port: u16,
    /// Edge length of the hexagonal board for new sessions
    pub board_size: i32,
    /// Players allowed in one session
    pub max_players: usize,
    /// Concurrent connections accepted before new ones are turned away
    pub max_connections: usize,
    /// Idle time after which a session that never started is evicted
    pub lobby_ttl: Duration,
    /// Idle time after which a running session is evicted
    pub game_ttl: Duration,
    /// How often the cleanup sweep runs
    pub sweep_interval: Duration,
    /// Countdown after which every living player receives an action point
    pub clock_period: Duration,
    /// Outbound messages buffered per connection before it is dropped
    pub outbound_queue_capacity: usize,
    /// Random bytes in a join code (two hex characters each)
    pub join_code_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            board_size: DEFAULT_BOARD_SIZE,
            max_players: MAX_PLAYERS,
            max_connections: 1024,
            lobby_ttl: Duration::from_secs(5 * 60),
            game_ttl: Duration::from_secs(60 * 60),
            sweep_interval: Duration::from_secs(60),
            clock_period: Duration::from_secs(60),
            outbound_queue_capacity: 64,
            join_code_bytes: 2,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_address(), "127.0.0.1:8080");
        assert_eq!(config.board_size, 17);
        assert_eq!(config.max_players, 8);
        assert!(config.lobby_ttl < config.game_ttl);
    }
}
