//! Reconnect tokens.
//!
//! Player ids show up in every roster broadcast, so an id alone cannot
//! prove who is re-attaching. Each player gets a random token in their
//! `Welcome` and must present it to take the seat back.

use std::collections::HashMap;

use impostor_protocol::{PlayerId, SessionId};
use rand::Rng;
use tokio::sync::Mutex;

#[derive(Default)]
pub(crate) struct ReconnectTokens {
    sessions: Mutex<HashMap<SessionId, HashMap<PlayerId, String>>>,
}

impl ReconnectTokens {
    /// Returns the player's token, generating one on first attach.
    /// A re-attach keeps the token it already had.
    pub(crate) async fn issue(&self, session_id: &SessionId, player_id: &PlayerId) -> String {
        let mut sessions = self.sessions.lock().await;
        sessions
            .entry(session_id.clone())
            .or_default()
            .entry(player_id.clone())
            .or_insert_with(generate_token)
            .clone()
    }

    pub(crate) async fn verify(
        &self,
        session_id: &SessionId,
        player_id: &PlayerId,
        token: &str,
    ) -> bool {
        let sessions = self.sessions.lock().await;
        sessions
            .get(session_id)
            .and_then(|players| players.get(player_id))
            .is_some_and(|expected| expected == token)
    }

    pub(crate) async fn revoke(&self, session_id: &SessionId, player_id: &PlayerId) {
        let mut sessions = self.sessions.lock().await;
        if let Some(players) = sessions.get_mut(session_id) {
            players.remove(player_id);
            if players.is_empty() {
                sessions.remove(session_id);
            }
        }
    }

    pub(crate) async fn forget_session(&self, session_id: &SessionId) {
        self.sessions.lock().await.remove(session_id);
    }
}

/// 32 lowercase hex characters from 16 random bytes.
fn generate_token() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> (SessionId, PlayerId) {
        (SessionId::from("abcd1234"), PlayerId::from("p1"))
    }

    #[tokio::test]
    async fn test_issue_is_stable_per_player() {
        let tokens = ReconnectTokens::default();
        let (session, player) = ids();

        let first = tokens.issue(&session, &player).await;
        let second = tokens.issue(&session, &player).await;

        assert_eq!(first.len(), 32);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_verify_rejects_wrong_token_and_other_player() {
        let tokens = ReconnectTokens::default();
        let (session, player) = ids();
        let token = tokens.issue(&session, &player).await;

        assert!(tokens.verify(&session, &player, &token).await);
        assert!(!tokens.verify(&session, &player, "nope").await);
        assert!(!tokens.verify(&session, &PlayerId::from("p2"), &token).await);
    }

    #[tokio::test]
    async fn test_revoke_and_forget() {
        let tokens = ReconnectTokens::default();
        let (session, player) = ids();
        let token = tokens.issue(&session, &player).await;

        tokens.revoke(&session, &player).await;
        assert!(!tokens.verify(&session, &player, &token).await);

        let token = tokens.issue(&session, &player).await;
        tokens.forget_session(&session).await;
        assert!(!tokens.verify(&session, &player, &token).await);
    }
}
