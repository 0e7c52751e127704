use clap::Parser;
use log::info;
use server::config::ServerConfig;
use server::network::NetworkServer;
use std::time::Duration;

// Larger boards overflow the coordinate math
const MAX_BOARD_SIZE: i64 = 1001;

// Command line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server port to listen on
    #[clap(short, long, default_value = "8080")]
    port: u16,
    /// Edge length of the hexagonal board
    #[clap(
        short,
        long,
        default_value = "17",
        value_parser = clap::value_parser!(i32).range(1..=MAX_BOARD_SIZE)
    )]
    board_size: i32,
    /// Seconds between action point grants
    #[clap(long, default_value = "60")]
    clock_seconds: u64,
    /// Idle seconds before an unstarted game is evicted
    #[clap(long, default_value = "300")]
    lobby_ttl_secs: u64,
    /// Idle seconds before a running game is evicted
    #[clap(long, default_value = "3600")]
    game_ttl_secs: u64,
    /// Seconds between cleanup sweeps
    #[clap(long, default_value = "60")]
    sweep_interval_secs: u64,
    /// Log filter used when RUST_LOG is not set
    #[clap(short, long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        ServerConfig {
            host: self.host,
            port: self.port,
            board_size: self.board_size,
            clock_period: Duration::from_secs(self.clock_seconds.max(1)),
            lobby_ttl: Duration::from_secs(self.lobby_ttl_secs),
            game_ttl: Duration::from_secs(self.game_ttl_secs),
            sweep_interval: Duration::from_secs(self.sweep_interval_secs.max(1)),
            ..ServerConfig::default()
        }
    }
}

/// Parses arguments, sets up logging and runs the server until Ctrl+C
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&args.log_level))
        .init();

    let server = NetworkServer::bind(args.into_config()).await?;

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
