//! Core data types shared by the game core and the server.
//!
//! Everything in here is plain data: it derives `Serialize`/`Deserialize`
//! so the server can ship it to clients, and it carries no behavior
//! beyond small helpers (status transitions, config clamping).
//!
//! Two views of a session exist and must never be mixed up:
//! - [`PublicState`]: safe to broadcast to every client.
//! - [`PrivateInfo`]: one player's secret word and role, delivered only
//!   to that player.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Minimum number of players required to start a game.
pub const MIN_PLAYERS: usize = 3;

/// Tally label under which abstentions are counted in a [`ResultRecord`].
pub const ABSTAIN_LABEL: &str = "ABSTAINED";

/// Upper bound for either phase timer, in seconds.
const MAX_PHASE_SECONDS: u64 = 60 * 60;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Opaque identifier for a player, unique within a session.
///
/// A newtype over `String` so a `SessionId` can never be passed where a
/// player is expected. `#[serde(transparent)]` keeps the JSON form a plain
/// string: `PlayerId("3fa2...")` travels as `"3fa2..."`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    /// Returns the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifier of one game session (the code players share to join).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// Returns the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Roles and status
// ---------------------------------------------------------------------------

/// The secret role a player holds once the game has started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Innocent,
    Impostor,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Innocent => write!(f, "INNOCENT"),
            Self::Impostor => write!(f, "IMPOSTOR"),
        }
    }
}

/// The lifecycle state of a session.
///
/// Transitions are strictly forward, one step at a time:
///
/// ```text
/// WaitingForPlayers → InProgress → Voting → Finished
/// ```
///
/// - **WaitingForPlayers**: accepting joins, players may leave freely.
/// - **InProgress**: clue rounds; one player at a time gives a clue.
/// - **Voting**: every player accuses someone (or lets the timer run out).
/// - **Finished**: results are fixed and readable; nothing else changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    WaitingForPlayers,
    InProgress,
    Voting,
    Finished,
}

impl SessionStatus {
    /// Returns the only status this one may move to, or `None` at the end.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::WaitingForPlayers => Some(Self::InProgress),
            Self::InProgress => Some(Self::Voting),
            Self::Voting => Some(Self::Finished),
            Self::Finished => None,
        }
    }

    /// Returns `true` if moving to `target` is a legal transition.
    pub fn can_transition_to(self, target: Self) -> bool {
        self.next() == Some(target)
    }

    /// Returns `true` if players may still join or leave freely.
    pub fn is_joinable(self) -> bool {
        matches!(self, Self::WaitingForPlayers)
    }

    /// Returns `true` during the clue rounds.
    pub fn accepts_clues(self) -> bool {
        matches!(self, Self::InProgress)
    }

    /// Returns `true` during the voting phase.
    pub fn accepts_votes(self) -> bool {
        matches!(self, Self::Voting)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WaitingForPlayers => write!(f, "WaitingForPlayers"),
            Self::InProgress => write!(f, "InProgress"),
            Self::Voting => write!(f, "Voting"),
            Self::Finished => write!(f, "Finished"),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Per-session tunables, fixed when the session is created.
///
/// Every field has a default, so a client may send `{}` or only the
/// fields it wants to change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Seconds each player has to give a clue on their turn.
    pub clue_time_seconds: u64,

    /// Seconds the whole table has to vote.
    pub vote_time_seconds: u64,

    /// How many clues each player gives before voting starts.
    pub rounds_per_player: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            clue_time_seconds: 60,
            vote_time_seconds: 90,
            rounds_per_player: 1,
        }
    }
}

impl SessionConfig {
    /// Clamps out-of-range values so the config is safe to use.
    ///
    /// - Both timers are forced into `1..=3600` seconds.
    /// - `rounds_per_player` is at least 1.
    pub fn validated(mut self) -> Self {
        let clue = self.clue_time_seconds.clamp(1, MAX_PHASE_SECONDS);
        if clue != self.clue_time_seconds {
            tracing::warn!(
                requested = self.clue_time_seconds,
                using = clue,
                "clue_time_seconds out of range, clamping"
            );
            self.clue_time_seconds = clue;
        }
        let vote = self.vote_time_seconds.clamp(1, MAX_PHASE_SECONDS);
        if vote != self.vote_time_seconds {
            tracing::warn!(
                requested = self.vote_time_seconds,
                using = vote,
                "vote_time_seconds out of range, clamping"
            );
            self.vote_time_seconds = vote;
        }
        if self.rounds_per_player == 0 {
            tracing::warn!("rounds_per_player must be at least 1, using 1");
            self.rounds_per_player = 1;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Secrets
// ---------------------------------------------------------------------------

/// The two secret words of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordPair {
    /// Word shared by every innocent.
    pub innocent: String,
    /// The divergent word only the impostor sees.
    pub impostor: String,
}

impl WordPair {
    pub fn new(innocent: impl Into<String>, impostor: impl Into<String>) -> Self {
        Self {
            innocent: innocent.into(),
            impostor: impostor.into(),
        }
    }
}

/// One player's secret: the word they received and the role it implies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateInfo {
    pub word: String,
    pub role: Role,
}

// ---------------------------------------------------------------------------
// Clues and results
// ---------------------------------------------------------------------------

/// A clue as recorded in the session history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClueEntry {
    pub player_name: String,
    pub clue: String,
}

/// Which side won the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Winner {
    Innocents,
    Impostor,
}

/// Final outcome of a session, fixed once the votes are processed.
///
/// This is the only place the word pair and the impostor's identity
/// become public.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub winner: Winner,
    /// Human-readable summary ("The vote was tied! ...").
    pub message: String,
    pub impostor_name: String,
    pub innocent_word: String,
    pub impostor_word: String,
    /// Full clue history, in the order the clues were given.
    pub clues: Vec<ClueEntry>,
    /// Votes received per player name; abstentions under [`ABSTAIN_LABEL`].
    pub vote_tally: BTreeMap<String, usize>,
}

// ---------------------------------------------------------------------------
// Public snapshot
// ---------------------------------------------------------------------------

/// A roster entry as everyone may see it: no word, no role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicPlayer {
    pub id: PlayerId,
    pub name: String,
}

/// The broadcastable view of a session.
///
/// Never contains any player's word or role, nor the word pair, except
/// inside `results` once the session is Finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicState {
    pub session_id: SessionId,
    pub host_id: PlayerId,
    pub status: SessionStatus,
    pub players: Vec<PublicPlayer>,
    pub player_count: usize,
    pub min_players: usize,
    pub config: SessionConfig,
    pub clues: Vec<ClueEntry>,
    /// 1-based clue round; 0 before the game starts.
    pub current_round: u32,
    pub current_player_id: Option<PlayerId>,
    pub current_player_name: Option<String>,
    /// Seconds left on the running phase timer (0 when idle).
    pub remaining_seconds: u64,
    /// Number of votes needed to close the vote (0 outside Voting).
    pub players_to_vote: usize,
    pub votes_submitted: usize,
    pub results: Option<ResultRecord>,
}

// ---------------------------------------------------------------------------
// Timer events
// ---------------------------------------------------------------------------

/// What a timer check observed.
///
/// `#[serde(tag = "event")]` produces `{ "event": "Tick", "remaining_seconds": 12 }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum TimerEvent {
    /// The phase timer is still running.
    Tick { remaining_seconds: u64 },
    /// The clue timer ran out; the named player's turn was skipped.
    TurnSkipped { player_id: PlayerId },
    /// The vote timer ran out and the game was resolved.
    GameOver { results: ResultRecord },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&PlayerId::from("p1")).unwrap();
        assert_eq!(json, r#""p1""#);
        let back: PlayerId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, PlayerId::from("p1"));
    }

    #[test]
    fn test_session_id_display() {
        assert_eq!(SessionId::from("a1b2c3d4").to_string(), "a1b2c3d4");
    }

    #[test]
    fn test_status_next_follows_strict_order() {
        assert_eq!(
            SessionStatus::WaitingForPlayers.next(),
            Some(SessionStatus::InProgress)
        );
        assert_eq!(SessionStatus::InProgress.next(), Some(SessionStatus::Voting));
        assert_eq!(SessionStatus::Voting.next(), Some(SessionStatus::Finished));
        assert_eq!(SessionStatus::Finished.next(), None);
    }

    #[test]
    fn test_status_can_transition_to() {
        assert!(SessionStatus::InProgress.can_transition_to(SessionStatus::Voting));
        assert!(!SessionStatus::WaitingForPlayers.can_transition_to(SessionStatus::Voting));
        assert!(!SessionStatus::Finished.can_transition_to(SessionStatus::WaitingForPlayers));
        assert!(!SessionStatus::Voting.can_transition_to(SessionStatus::InProgress));
    }

    #[test]
    fn test_status_phase_predicates() {
        assert!(SessionStatus::WaitingForPlayers.is_joinable());
        assert!(!SessionStatus::InProgress.is_joinable());
        assert!(SessionStatus::InProgress.accepts_clues());
        assert!(!SessionStatus::Voting.accepts_clues());
        assert!(SessionStatus::Voting.accepts_votes());
        assert!(!SessionStatus::Finished.accepts_votes());
    }

    #[test]
    fn test_status_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&SessionStatus::WaitingForPlayers).unwrap();
        assert_eq!(json, r#""WAITING_FOR_PLAYERS""#);
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::Impostor).unwrap(), r#""IMPOSTOR""#);
        assert_eq!(Role::Innocent.to_string(), "INNOCENT");
    }

    #[test]
    fn test_config_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.clue_time_seconds, 60);
        assert_eq!(config.vote_time_seconds, 90);
        assert_eq!(config.rounds_per_player, 1);
    }

    #[test]
    fn test_config_partial_json_uses_defaults() {
        let config: SessionConfig = serde_json::from_str(r#"{"rounds_per_player":3}"#).unwrap();
        assert_eq!(config.rounds_per_player, 3);
        assert_eq!(config.clue_time_seconds, 60);
    }

    #[test]
    fn test_config_validated_clamps() {
        let config = SessionConfig {
            clue_time_seconds: 0,
            vote_time_seconds: 1_000_000,
            rounds_per_player: 0,
        }
        .validated();
        assert_eq!(config.clue_time_seconds, 1);
        assert_eq!(config.vote_time_seconds, 3600);
        assert_eq!(config.rounds_per_player, 1);
    }

    #[test]
    fn test_timer_event_json_format() {
        let json = serde_json::to_value(TimerEvent::Tick { remaining_seconds: 7 }).unwrap();
        assert_eq!(json["event"], "Tick");
        assert_eq!(json["remaining_seconds"], 7);
    }
}
