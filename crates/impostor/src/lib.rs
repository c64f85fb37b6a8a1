//! # Impostor
//!
//! WebSocket server for the impostor word game.
//!
//! Every player gets the same secret word except one, the impostor, who
//! gets a related but different word. Players give one-word clues in
//! turn, then vote on who they think the impostor is.
//!
//! The server wires four layers together:
//!
//! ```text
//! impostor-transport (WebSocket frames)
//!   → impostor-protocol (ClientMessage / ServerMessage, JSON)
//!     → impostor-game (one actor per session, registry)
//!       ← impostor-tick (drives every session's phase timer)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use impostor::prelude::*;
//!
//! # async fn run() -> Result<(), ImpostorError> {
//! let server = ImpostorServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .finished_retention(std::time::Duration::from_secs(15))
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```
//!
//! A client opens a WebSocket, sends `CreateSession` or `JoinSession` as
//! its first message, and receives `Welcome` followed by `StateUpdate`s.

mod driver;
mod error;
mod handler;
mod hub;
mod server;
mod tokens;

pub use error::ImpostorError;
pub use server::{
    ImpostorServer, ImpostorServerBuilder, DEFAULT_FINISHED_RETENTION,
    DEFAULT_HANDSHAKE_TIMEOUT,
};

/// Everything needed to configure and run a server.
pub mod prelude {
    pub use crate::{ImpostorError, ImpostorServer, ImpostorServerBuilder};
    pub use impostor_game::{RegistryConfig, WordList, WordListError, WordSource};
    pub use impostor_protocol::{
        ClientMessage, PlayerId, ServerMessage, SessionConfig, SessionId, WordPair,
    };
    pub use impostor_tick::{TickConfig, TickPolicy};
}
