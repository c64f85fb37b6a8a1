//! Shared types and wire protocol for the impostor word game.
//!
//! This crate is the vocabulary every other layer speaks:
//!
//! - **Types** ([`PlayerId`], [`SessionStatus`], [`PublicState`],
//!   [`ResultRecord`], [`TimerEvent`], ...): the data the game core
//!   produces and the server ships to clients.
//! - **Messages** ([`ClientMessage`], [`ServerMessage`]): the commands
//!   clients send and the events the server pushes back.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those messages are
//!   turned into bytes and back.
//!
//! It knows nothing about sockets, tasks, or game rules.
//!
//! ```text
//! Transport (bytes) → Protocol (ClientMessage / ServerMessage) → Game core
//! ```

mod codec;
mod error;
mod messages;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use messages::{ClientMessage, ServerMessage};
pub use types::{
    ClueEntry, PlayerId, PrivateInfo, PublicPlayer, PublicState,
    ResultRecord, Role, SessionConfig, SessionId, SessionStatus, TimerEvent,
    Winner, WordPair, ABSTAIN_LABEL, MIN_PLAYERS,
};
