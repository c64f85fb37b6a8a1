//! `ImpostorServer` builder and accept loop.
//!
//! Ties the layers together: transport → protocol → session registry,
//! with the timer driver running alongside the accept loop.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use impostor_game::{RegistryConfig, SessionRegistry, WordList, WordSource};
use impostor_protocol::{JsonCodec, WordPair};
use impostor_tick::TickConfig;
use impostor_transport::{Transport, WebSocketTransport};
use tokio::sync::{Mutex, Notify};

use crate::ImpostorError;
use crate::driver::run_timer_driver;
use crate::handler::handle_connection;
use crate::hub::Hub;
use crate::tokens::ReconnectTokens;

/// How long a finished session stays around so players can read the result.
pub const DEFAULT_FINISHED_RETENTION: Duration = Duration::from_secs(10);

/// How long a new connection has to send `CreateSession`/`JoinSession`.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// State shared by every connection task and the timer driver.
pub(crate) struct ServerState {
    pub(crate) registry: Mutex<SessionRegistry>,
    pub(crate) hub: Hub,
    pub(crate) tokens: ReconnectTokens,
    pub(crate) codec: JsonCodec,
    pub(crate) finished_retention: Duration,
    pub(crate) handshake_timeout: Duration,
    /// Notified when a session is created, to wake an idle timer driver.
    pub(crate) activity: Notify,
}

/// Builder for an [`ImpostorServer`].
///
/// ```rust,no_run
/// # async fn run() -> Result<(), impostor::ImpostorError> {
/// use impostor::prelude::*;
///
/// let server = ImpostorServer::builder()
///     .bind("0.0.0.0:8080")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct ImpostorServerBuilder {
    bind_addr: String,
    tick_config: TickConfig,
    registry_config: RegistryConfig,
    words: Option<Arc<dyn WordSource>>,
    finished_retention: Duration,
    handshake_timeout: Duration,
}

impl ImpostorServerBuilder {
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            tick_config: TickConfig::default(),
            registry_config: RegistryConfig::default(),
            words: None,
            finished_retention: DEFAULT_FINISHED_RETENTION,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }

    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Cadence of the timer driver.
    pub fn tick_config(mut self, config: TickConfig) -> Self {
        self.tick_config = config;
        self
    }

    pub fn registry_config(mut self, config: RegistryConfig) -> Self {
        self.registry_config = config;
        self
    }

    /// Where word pairs come from. Defaults to the built-in [`WordList`].
    pub fn word_source(mut self, words: Arc<dyn WordSource>) -> Self {
        self.words = Some(words);
        self
    }

    /// Uses `pairs` as the word list. Fails if the list is empty or a
    /// pair has identical or blank words.
    pub fn word_pairs(self, pairs: Vec<WordPair>) -> Result<Self, ImpostorError> {
        let words = WordList::new(pairs)?;
        Ok(self.word_source(Arc::new(words)))
    }

    pub fn finished_retention(mut self, retention: Duration) -> Self {
        self.finished_retention = retention;
        self
    }

    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Binds the listener and assembles the server. Nothing is accepted
    /// until [`ImpostorServer::run`].
    pub async fn build(self) -> Result<ImpostorServer, ImpostorError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;
        let words = self
            .words
            .unwrap_or_else(|| Arc::new(WordList::builtin()));

        let state = Arc::new(ServerState {
            registry: Mutex::new(SessionRegistry::with_config(words, self.registry_config)),
            hub: Hub::default(),
            tokens: ReconnectTokens::default(),
            codec: JsonCodec,
            finished_retention: self.finished_retention,
            handshake_timeout: self.handshake_timeout,
            activity: Notify::new(),
        });

        Ok(ImpostorServer {
            transport,
            state,
            tick_config: self.tick_config,
        })
    }
}

impl Default for ImpostorServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound impostor game server. Call [`run`](Self::run) to serve.
pub struct ImpostorServer {
    transport: WebSocketTransport,
    state: Arc<ServerState>,
    tick_config: TickConfig,
}

impl ImpostorServer {
    pub fn builder() -> ImpostorServerBuilder {
        ImpostorServerBuilder::new()
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ImpostorError> {
        Ok(self.transport.local_addr()?)
    }

    /// Starts the timer driver and accepts connections for as long as the
    /// process runs. A failed accept or upgrade only drops that peer.
    pub async fn run(mut self) -> Result<(), ImpostorError> {
        tracing::info!(addr = ?self.transport.local_addr().ok(), "impostor server running");
        tokio::spawn(run_timer_driver(
            Arc::clone(&self.state),
            self.tick_config.clone(),
        ));

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                }
            }
        }
    }
}
