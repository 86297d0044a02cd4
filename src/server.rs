//! TCP server for quiz sessions.
//!
//! Accepts connections and runs one independent command-loop session per
//! client. Sessions share nothing but the question store.

use crate::channel::{ChannelError, LineChannel};
use crate::config::Config;
use crate::session::Session;
use crate::store::QuizStore;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tracing::{debug, error, info};

/// Server instance
pub struct Server {
    config: Config,
    store: Arc<QuizStore>,
    session_limit: Arc<Semaphore>,
}

impl Server {
    /// Create a new server instance
    pub fn new(config: Config) -> Self {
        let store = QuizStore::new();
        let session_limit = Arc::new(Semaphore::new(config.max_sessions));

        Server {
            config,
            store,
            session_limit,
        }
    }

    /// Start the server and begin accepting connections
    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        // Preload questions before the first client can connect
        if let Some(ref path) = self.config.questions {
            self.store.load_questions(path)?;
        }

        let listener = TcpListener::bind(&self.config.listen).await?;
        info!(address = %self.config.listen, "Server listening");

        loop {
            // Wait for a session slot
            let permit = self.session_limit.clone().acquire_owned().await?;

            match listener.accept().await {
                Ok((stream, addr)) => {
                    debug!(peer = %addr, "New connection");

                    let store = Arc::clone(&self.store);

                    tokio::spawn(async move {
                        if let Err(e) = handle_session(stream, store).await {
                            debug!(error = %e, "Session error");
                        }
                        drop(permit);
                    });
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }

    /// Get a reference to the store for testing
    #[cfg(test)]
    pub fn store(&self) -> &Arc<QuizStore> {
        &self.store
    }
}

/// Run one client session over a freshly framed channel
async fn handle_session(stream: TcpStream, store: Arc<QuizStore>) -> Result<(), ChannelError> {
    let channel = LineChannel::new(stream);
    let mut session = Session::new(store, Box::new(channel));
    session.run().await
}
