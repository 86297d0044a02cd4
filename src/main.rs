//! quizd: an interactive line-based trivia quiz server
//!
//! Clients connect over TCP, get a prompt, and issue commands to list,
//! create, edit, delete, and answer quiz questions, including a random
//! "play all" game mode.
//!
//! Features:
//! - One independent command-loop session per connection
//! - Thread-safe in-memory question store with validation
//! - Optional question preloading from a TOML file
//! - Configuration via CLI arguments or TOML file

mod channel;
mod command;
mod config;
mod play;
mod server;
mod session;
mod store;

use config::Config;
use server::Server;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(
        listen = %config.listen,
        max_sessions = config.max_sessions,
        questions = ?config.questions,
        "Starting quizd server"
    );

    Server::new(config).run().await
}
