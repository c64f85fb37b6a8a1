//! Error types for the game layer.
//!
//! Rejections are expected outcomes here, not failures: a player clicking
//! "vote" twice or typing two words is ordinary input. Every operation
//! reports such cases as a typed variant and leaves the session untouched.

use impostor_protocol::{SessionId, SessionStatus};

/// Why a player command (clue or vote) was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// The session is not in the phase this command belongs to.
    #[error("cannot do that while the session is {0}")]
    WrongPhase(SessionStatus),

    /// Someone other than the current player tried to give a clue.
    #[error("it is not your turn")]
    NotYourTurn,

    /// The current player already gave a clue this turn.
    #[error("you already gave your clue this turn")]
    AlreadyActed,

    /// The clue is empty or has more than one word.
    #[error("invalid clue: {0}")]
    InvalidClue(String),

    /// The clue is one of the two secret words.
    #[error("the clue cannot be a secret word")]
    ClueIsSecretWord,

    /// Voter or target is not a player of this session.
    #[error("invalid voter or target")]
    InvalidTarget,

    #[error("you cannot vote for yourself")]
    SelfVote,

    #[error("you already voted")]
    AlreadyVoted,
}

impl CommandError {
    /// Wire error code for this rejection (HTTP-style).
    pub fn code(&self) -> u16 {
        match self {
            Self::WrongPhase(_) | Self::AlreadyActed | Self::AlreadyVoted => 409,
            Self::NotYourTurn => 403,
            Self::InvalidClue(_)
            | Self::ClueIsSecretWord
            | Self::InvalidTarget
            | Self::SelfVote => 400,
        }
    }
}

/// Why `start_game` refused to start.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreconditionError {
    #[error("at least {required} players are required (have {actual})")]
    NotEnoughPlayers { required: usize, actual: usize },

    #[error("the game has already started (session is {0})")]
    AlreadyStarted(SessionStatus),
}

/// Errors from talking to a session through the registry or a handle.
///
/// Game-rule rejections are carried through unchanged via `#[from]`, so
/// `?` works across the layers.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No session with this id is registered.
    #[error("session {0} not found")]
    NotFound(SessionId),

    /// The session's actor is gone (it was removed or shut down).
    #[error("session {0} is unavailable")]
    Unavailable(SessionId),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Precondition(#[from] PreconditionError),
}

impl SessionError {
    /// Wire error code for this error (HTTP-style).
    pub fn code(&self) -> u16 {
        match self {
            Self::NotFound(_) | Self::Unavailable(_) => 404,
            Self::Command(e) => e.code(),
            Self::Precondition(_) => 409,
        }
    }
}

/// Errors building a [`WordList`](crate::WordList).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WordListError {
    #[error("word list is empty")]
    Empty,

    /// A pair whose two words are the same (case-insensitively) or blank.
    #[error("invalid word pair at index {index}: {reason}")]
    InvalidPair { index: usize, reason: String },
}
