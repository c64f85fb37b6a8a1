//! Session actor: one Tokio task per running game.
//!
//! The [`Session`] is moved into the task and never shared. Callers hold a
//! [`SessionHandle`] and send it commands over a bounded channel; each
//! command carries a oneshot reply. Commands (including timer checks) are
//! applied one at a time, so a clue and the expiry of the same turn can
//! never interleave.

use std::sync::Arc;

use impostor_protocol::{
    PlayerId, PrivateInfo, PublicState, ResultRecord, SessionId, TimerEvent,
};
use rand::rngs::StdRng;
use tokio::sync::{mpsc, oneshot};

use crate::{Secrets, Session, SessionError, VoteOutcome, WordSource};

/// Commands sent to a session actor.
enum SessionCommand {
    Join {
        player_id: PlayerId,
        name: String,
        reply: oneshot::Sender<bool>,
    },
    Leave {
        player_id: PlayerId,
        reply: oneshot::Sender<bool>,
    },
    Start {
        reply: oneshot::Sender<Result<Secrets, SessionError>>,
    },
    SubmitClue {
        player_id: PlayerId,
        text: String,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    SubmitVote {
        voter_id: PlayerId,
        voted_id: PlayerId,
        reply: oneshot::Sender<Result<VoteOutcome, SessionError>>,
    },
    ProcessVotes {
        reply: oneshot::Sender<Result<ResultRecord, SessionError>>,
    },
    PrivateInfo {
        player_id: PlayerId,
        reply: oneshot::Sender<Option<PrivateInfo>>,
    },
    Snapshot {
        reply: oneshot::Sender<PublicState>,
    },
    CheckTimer {
        reply: oneshot::Sender<Option<TimerEvent>>,
    },
    Shutdown,
}

/// Handle to a running session actor.
///
/// Cheap to clone. Every method fails with [`SessionError::Unavailable`]
/// once the actor has stopped.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    session_id: SessionId,
    host_id: PlayerId,
    sender: mpsc::Sender<SessionCommand>,
}

impl std::fmt::Debug for SessionCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Join { .. } => "Join",
            Self::Leave { .. } => "Leave",
            Self::Start { .. } => "Start",
            Self::SubmitClue { .. } => "SubmitClue",
            Self::SubmitVote { .. } => "SubmitVote",
            Self::ProcessVotes { .. } => "ProcessVotes",
            Self::PrivateInfo { .. } => "PrivateInfo",
            Self::Snapshot { .. } => "Snapshot",
            Self::CheckTimer { .. } => "CheckTimer",
            Self::Shutdown => "Shutdown",
        };
        f.write_str(name)
    }
}

impl SessionHandle {
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// The host never changes, so the handle answers without a round trip.
    pub fn host_id(&self) -> &PlayerId {
        &self.host_id
    }

    pub fn is_host(&self, player_id: &PlayerId) -> bool {
        self.host_id == *player_id
    }

    /// Returns `true` once the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Sends a command built around a fresh reply channel and awaits it.
    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Result<T, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(command(reply_tx))
            .await
            .map_err(|_| SessionError::Unavailable(self.session_id.clone()))?;
        reply_rx
            .await
            .map_err(|_| SessionError::Unavailable(self.session_id.clone()))
    }

    /// Adds a player. `Ok(false)` means "cannot join now".
    pub async fn join(
        &self,
        player_id: PlayerId,
        name: impl Into<String>,
    ) -> Result<bool, SessionError> {
        let name = name.into();
        self.request(|reply| SessionCommand::Join {
            player_id,
            name,
            reply,
        })
        .await
    }

    pub async fn leave(&self, player_id: PlayerId) -> Result<bool, SessionError> {
        self.request(|reply| SessionCommand::Leave { player_id, reply })
            .await
    }

    /// Starts the game and returns every player's secret.
    pub async fn start(&self) -> Result<Secrets, SessionError> {
        self.request(|reply| SessionCommand::Start { reply }).await?
    }

    pub async fn submit_clue(
        &self,
        player_id: PlayerId,
        text: impl Into<String>,
    ) -> Result<(), SessionError> {
        let text = text.into();
        self.request(|reply| SessionCommand::SubmitClue {
            player_id,
            text,
            reply,
        })
        .await?
    }

    pub async fn submit_vote(
        &self,
        voter_id: PlayerId,
        voted_id: PlayerId,
    ) -> Result<VoteOutcome, SessionError> {
        self.request(|reply| SessionCommand::SubmitVote {
            voter_id,
            voted_id,
            reply,
        })
        .await?
    }

    /// Closes the vote now, or returns the stored result if already closed.
    pub async fn process_votes(&self) -> Result<ResultRecord, SessionError> {
        self.request(|reply| SessionCommand::ProcessVotes { reply })
            .await?
    }

    pub async fn private_info(
        &self,
        player_id: PlayerId,
    ) -> Result<Option<PrivateInfo>, SessionError> {
        self.request(|reply| SessionCommand::PrivateInfo { player_id, reply })
            .await
    }

    /// The broadcastable view of the session.
    pub async fn snapshot(&self) -> Result<PublicState, SessionError> {
        self.request(|reply| SessionCommand::Snapshot { reply }).await
    }

    /// Runs one timer check against the current time.
    pub async fn tick(&self) -> Result<Option<TimerEvent>, SessionError> {
        self.request(|reply| SessionCommand::CheckTimer { reply })
            .await
    }

    /// Stops the actor. Queued commands ahead of this one still run.
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        self.sender
            .send(SessionCommand::Shutdown)
            .await
            .map_err(|_| SessionError::Unavailable(self.session_id.clone()))
    }
}

/// The task side: owns the session, its word source, and its RNG.
struct SessionActor {
    session: Session,
    words: Arc<dyn WordSource>,
    rng: StdRng,
    receiver: mpsc::Receiver<SessionCommand>,
}

impl SessionActor {
    async fn run(mut self) {
        let session_id = self.session.id().clone();
        tracing::info!(%session_id, "session actor started");

        while let Some(cmd) = self.receiver.recv().await {
            tracing::trace!(%session_id, command = ?cmd, "session command");
            match cmd {
                SessionCommand::Join {
                    player_id,
                    name,
                    reply,
                } => {
                    let _ = reply.send(self.session.add_player(player_id, name));
                }
                SessionCommand::Leave { player_id, reply } => {
                    let _ = reply.send(self.session.remove_player(&player_id));
                }
                SessionCommand::Start { reply } => {
                    let result = self
                        .session
                        .start_game(self.words.as_ref(), &mut self.rng, now())
                        .map_err(SessionError::from);
                    if let Err(e) = &result {
                        tracing::debug!(%session_id, error = %e, "start rejected");
                    }
                    let _ = reply.send(result);
                }
                SessionCommand::SubmitClue {
                    player_id,
                    text,
                    reply,
                } => {
                    let result = self
                        .session
                        .submit_clue(&player_id, &text, now())
                        .map_err(SessionError::from);
                    if let Err(e) = &result {
                        tracing::debug!(%session_id, %player_id, error = %e, "clue rejected");
                    }
                    let _ = reply.send(result);
                }
                SessionCommand::SubmitVote {
                    voter_id,
                    voted_id,
                    reply,
                } => {
                    let result = self
                        .session
                        .submit_vote(&voter_id, &voted_id)
                        .map_err(SessionError::from);
                    if let Err(e) = &result {
                        tracing::debug!(%session_id, %voter_id, error = %e, "vote rejected");
                    }
                    let _ = reply.send(result);
                }
                SessionCommand::ProcessVotes { reply } => {
                    let _ = reply.send(self.session.process_votes().map_err(SessionError::from));
                }
                SessionCommand::PrivateInfo { player_id, reply } => {
                    let _ = reply.send(self.session.private_info(&player_id));
                }
                SessionCommand::Snapshot { reply } => {
                    let _ = reply.send(self.session.public_state(now()));
                }
                SessionCommand::CheckTimer { reply } => {
                    let _ = reply.send(self.session.check_timer(now()));
                }
                SessionCommand::Shutdown => {
                    tracing::info!(%session_id, "session shutting down");
                    break;
                }
            }
        }

        tracing::info!(%session_id, status = %self.session.status(), "session actor stopped");
    }
}

/// Reads the clock through Tokio so paused-time tests can move it.
fn now() -> std::time::Instant {
    tokio::time::Instant::now().into_std()
}

/// Spawns the actor for `session` and returns a handle to it.
///
/// `channel_size` bounds the command queue; senders wait when it is full.
pub(crate) fn spawn_session(
    session: Session,
    words: Arc<dyn WordSource>,
    rng: StdRng,
    channel_size: usize,
) -> SessionHandle {
    let (tx, rx) = mpsc::channel(channel_size);
    let handle = SessionHandle {
        session_id: session.id().clone(),
        host_id: session.host_id().clone(),
        sender: tx,
    };

    let actor = SessionActor {
        session,
        words,
        rng,
        receiver: rx,
    };
    tokio::spawn(actor.run());

    handle
}
