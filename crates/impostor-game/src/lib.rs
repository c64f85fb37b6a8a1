//! Session engine for the impostor word game.
//!
//! One player secretly receives a different word than everyone else.
//! Players take turns giving one-word clues, then vote on who the
//! impostor is. This crate owns every rule of that game.
//!
//! # Key types
//!
//! - [`Session`]: the per-game state machine (roster, words, turns,
//!   clues, votes, results). Synchronous, performs no I/O, never reads
//!   a clock itself.
//! - [`SessionTimer`]: deadline arithmetic for the running phase.
//! - [`WordSource`] / [`WordList`]: where word pairs come from.
//! - [`SessionHandle`]: talk to a session running in its own task.
//! - [`SessionRegistry`]: creates, finds, and removes sessions.
//!
//! # Concurrency
//!
//! A `Session` is `&mut self` everywhere, so it cannot be shared. Each one
//! is moved into a Tokio task (actor) and driven through a
//! [`SessionHandle`]; commands and timer checks are queued on one channel
//! and applied one at a time. Different sessions never share state.

mod config;
mod error;
mod handle;
mod player;
mod registry;
mod session;
mod timer;
mod words;

pub use config::RegistryConfig;
pub use error::{CommandError, PreconditionError, SessionError, WordListError};
pub use handle::SessionHandle;
pub use player::Player;
pub use registry::{generate_player_id, SessionRegistry};
pub use session::{Secrets, Session, VoteOutcome, TIMED_OUT_CLUE};
pub use timer::SessionTimer;
pub use words::{WordList, WordSource};
