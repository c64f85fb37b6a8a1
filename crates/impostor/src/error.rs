//! Unified error type for the impostor server.

use impostor_game::{SessionError, WordListError};
use impostor_protocol::ProtocolError;
use impostor_transport::TransportError;

/// Top-level error wrapping every layer's error type, so `?` works
/// across crate boundaries.
#[derive(Debug, thiserror::Error)]
pub enum ImpostorError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    WordList(#[from] WordListError),
}
