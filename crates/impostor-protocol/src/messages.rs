//! Messages exchanged between clients and the server.
//!
//! Both enums are internally tagged so the JSON stays flat and easy to
//! produce from a browser:
//!
//! ```text
//! client → { "command": "SubmitClue", "clue": "bark" }
//! server → { "type": "VoteAccepted", "remaining": 2 }
//! ```

use serde::{Deserialize, Serialize};

use crate::{PlayerId, PrivateInfo, PublicState, ResultRecord, SessionConfig, SessionId};

/// Client → server.
///
/// The first message on a connection must be `CreateSession` or
/// `JoinSession`; everything else is only valid afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command")]
pub enum ClientMessage {
    /// Open a new session with the sender as host.
    CreateSession {
        player_name: String,
        #[serde(default)]
        config: Option<SessionConfig>,
    },

    /// Join an existing session. A client that was already part of the
    /// session passes its previous `player_id` and the `reconnect_token`
    /// from its `Welcome` to re-attach.
    JoinSession {
        session_id: SessionId,
        player_name: String,
        #[serde(default)]
        player_id: Option<PlayerId>,
        #[serde(default)]
        reconnect_token: Option<String>,
    },

    /// Host only: deal the words and begin the clue rounds.
    StartGame,

    /// Give the clue for the current turn.
    SubmitClue { clue: String },

    /// Accuse a player during the voting phase.
    Vote { voted_id: PlayerId },

    /// Ask for this player's secret again (after a reload, for instance).
    RequestSecret,

    /// Leave the session and close the connection.
    Leave,
}

/// Server → client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Handshake reply: who you are and where you are. Keep the token to
    /// re-attach after a dropped connection.
    Welcome {
        session_id: SessionId,
        player_id: PlayerId,
        is_host: bool,
        reconnect_token: String,
    },

    /// Fresh public snapshot of the session.
    StateUpdate { state: PublicState },

    /// The receiving player's secret word and role. Sent privately.
    Secret { info: PrivateInfo },

    GameStarted,

    ClueAccepted,

    /// Vote recorded; `remaining` players still have to vote.
    VoteAccepted { remaining: usize },

    GameOver { results: ResultRecord },

    /// Countdown of the running phase timer.
    TimerTick { remaining_seconds: u64 },

    /// A player's clue turn timed out.
    TurnSkipped { player_id: PlayerId },

    /// The session no longer exists (host left, or it was cleaned up).
    SessionClosed { reason: String },

    /// A command was rejected. `code` follows HTTP conventions
    /// (400 bad input, 403 not allowed, 404 unknown session, 409 wrong phase).
    Error { code: u16, message: String },
}
