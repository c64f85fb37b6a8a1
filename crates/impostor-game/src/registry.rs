//! Session registry: creates, finds, and removes sessions.

use std::collections::HashMap;
use std::sync::Arc;

use impostor_protocol::{
    PlayerId, PrivateInfo, PublicState, SessionConfig, SessionId, TimerEvent,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::handle::spawn_session;
use crate::{
    RegistryConfig, Secrets, Session, SessionError, SessionHandle, VoteOutcome, WordSource,
};

/// Owns every live session, keyed by id.
///
/// There is no global instance: the server builds one and shares it
/// behind a lock. Lookups hand out cloned [`SessionHandle`]s so callers
/// can await a session without holding that lock.
pub struct SessionRegistry {
    sessions: HashMap<SessionId, SessionHandle>,
    words: Arc<dyn WordSource>,
    config: RegistryConfig,
    /// Sessions created so far; offsets the seed of a seeded registry.
    created: u64,
}

impl SessionRegistry {
    /// Creates an empty registry drawing words from `words`.
    pub fn new(words: Arc<dyn WordSource>) -> Self {
        Self::with_config(words, RegistryConfig::default())
    }

    pub fn with_config(words: Arc<dyn WordSource>, config: RegistryConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            words,
            config: config.validated(),
            created: 0,
        }
    }

    /// Creates a session with `host_id` as its only player and starts its
    /// actor. The id is fresh within this registry.
    pub fn create(
        &mut self,
        host_id: PlayerId,
        host_name: impl Into<String>,
        config: SessionConfig,
    ) -> SessionHandle {
        let mut session_id = generate_session_id();
        while self.sessions.contains_key(&session_id) {
            session_id = generate_session_id();
        }

        let rng = match self.config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(self.created)),
            None => StdRng::from_os_rng(),
        };
        self.created += 1;

        let session = Session::new(session_id.clone(), host_id.clone(), host_name, config);
        let handle = spawn_session(
            session,
            Arc::clone(&self.words),
            rng,
            self.config.channel_size,
        );
        self.sessions.insert(session_id.clone(), handle.clone());
        tracing::info!(%session_id, %host_id, sessions = self.sessions.len(), "session created");
        handle
    }

    pub fn get(&self, session_id: &SessionId) -> Option<SessionHandle> {
        self.sessions.get(session_id).cloned()
    }

    /// Unregisters a session and stops its actor.
    ///
    /// Returns `false` for an unknown id. Handles cloned earlier fail with
    /// [`SessionError::Unavailable`] afterwards.
    pub async fn remove(&mut self, session_id: &SessionId) -> bool {
        let Some(handle) = self.sessions.remove(session_id) else {
            return false;
        };
        let _ = handle.shutdown().await;
        tracing::info!(%session_id, sessions = self.sessions.len(), "session removed");
        true
    }

    pub fn contains(&self, session_id: &SessionId) -> bool {
        self.sessions.contains_key(session_id)
    }

    /// Cloned handles to every live session, for the timer driver.
    pub fn handles(&self) -> Vec<SessionHandle> {
        self.sessions.values().cloned().collect()
    }

    pub fn session_ids(&self) -> Vec<SessionId> {
        self.sessions.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    // -----------------------------------------------------------------------
    // Operations by session id
    // -----------------------------------------------------------------------

    fn lookup(&self, session_id: &SessionId) -> Result<&SessionHandle, SessionError> {
        self.sessions
            .get(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.clone()))
    }

    pub async fn join(
        &self,
        session_id: &SessionId,
        player_id: PlayerId,
        name: impl Into<String>,
    ) -> Result<bool, SessionError> {
        self.lookup(session_id)?.join(player_id, name).await
    }

    pub async fn leave(
        &self,
        session_id: &SessionId,
        player_id: PlayerId,
    ) -> Result<bool, SessionError> {
        self.lookup(session_id)?.leave(player_id).await
    }

    pub async fn start(&self, session_id: &SessionId) -> Result<Secrets, SessionError> {
        self.lookup(session_id)?.start().await
    }

    pub async fn submit_clue(
        &self,
        session_id: &SessionId,
        player_id: PlayerId,
        text: impl Into<String>,
    ) -> Result<(), SessionError> {
        self.lookup(session_id)?.submit_clue(player_id, text).await
    }

    pub async fn submit_vote(
        &self,
        session_id: &SessionId,
        voter_id: PlayerId,
        voted_id: PlayerId,
    ) -> Result<VoteOutcome, SessionError> {
        self.lookup(session_id)?
            .submit_vote(voter_id, voted_id)
            .await
    }

    pub async fn private_info(
        &self,
        session_id: &SessionId,
        player_id: PlayerId,
    ) -> Result<Option<PrivateInfo>, SessionError> {
        self.lookup(session_id)?.private_info(player_id).await
    }

    pub async fn snapshot(&self, session_id: &SessionId) -> Result<PublicState, SessionError> {
        self.lookup(session_id)?.snapshot().await
    }

    pub async fn tick(&self, session_id: &SessionId) -> Result<Option<TimerEvent>, SessionError> {
        self.lookup(session_id)?.tick().await
    }
}

/// Eight lowercase hex characters, short enough to share as a link.
fn generate_session_id() -> SessionId {
    let bytes: [u8; 4] = rand::rng().random();
    SessionId(bytes.iter().map(|b| format!("{b:02x}")).collect())
}

/// Sixteen lowercase hex characters for a newly connected player.
pub fn generate_player_id() -> PlayerId {
    let bytes: [u8; 8] = rand::rng().random();
    PlayerId(bytes.iter().map(|b| format!("{b:02x}")).collect())
}
