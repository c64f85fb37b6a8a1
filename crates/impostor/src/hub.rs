//! Broadcast hub: routes server messages to connected players.
//!
//! Every connection owns the receiving end of an unbounded outbox; the hub
//! holds the sending ends, grouped by session. Pushing never waits on a
//! socket, so a slow client cannot stall the timer driver or another
//! player's command.

use std::collections::HashMap;

use impostor_protocol::{PlayerId, ServerMessage, SessionId};
use impostor_transport::ConnectionId;
use tokio::sync::{Mutex, mpsc};

pub(crate) type Outbox = mpsc::UnboundedSender<ServerMessage>;

/// The connection currently attached for a player.
struct Attached {
    conn_id: ConnectionId,
    outbox: Outbox,
}

#[derive(Default)]
pub(crate) struct Hub {
    sessions: Mutex<HashMap<SessionId, HashMap<PlayerId, Attached>>>,
}

impl Hub {
    /// Attaches a connection for `player_id`, replacing (and thereby
    /// closing the outbox of) any earlier connection for the same player.
    pub(crate) async fn register(
        &self,
        session_id: &SessionId,
        player_id: &PlayerId,
        conn_id: ConnectionId,
        outbox: Outbox,
    ) {
        let mut sessions = self.sessions.lock().await;
        let previous = sessions
            .entry(session_id.clone())
            .or_default()
            .insert(player_id.clone(), Attached { conn_id, outbox });
        if let Some(previous) = previous {
            tracing::info!(
                %session_id,
                %player_id,
                old = %previous.conn_id,
                new = %conn_id,
                "player re-attached, replacing connection"
            );
        }
    }

    /// Detaches `player_id` if `conn_id` is still the attached connection.
    /// Returns `false` when a newer connection has taken over.
    pub(crate) async fn unregister(
        &self,
        session_id: &SessionId,
        player_id: &PlayerId,
        conn_id: ConnectionId,
    ) -> bool {
        let mut sessions = self.sessions.lock().await;
        let Some(players) = sessions.get_mut(session_id) else {
            return false;
        };
        if players.get(player_id).map(|a| a.conn_id) != Some(conn_id) {
            return false;
        }
        players.remove(player_id);
        if players.is_empty() {
            sessions.remove(session_id);
        }
        true
    }

    pub(crate) async fn send_to(
        &self,
        session_id: &SessionId,
        player_id: &PlayerId,
        msg: ServerMessage,
    ) {
        let sessions = self.sessions.lock().await;
        if let Some(attached) = sessions.get(session_id).and_then(|p| p.get(player_id)) {
            let _ = attached.outbox.send(msg);
        }
    }

    pub(crate) async fn broadcast(&self, session_id: &SessionId, msg: ServerMessage) {
        let sessions = self.sessions.lock().await;
        let Some(players) = sessions.get(session_id) else {
            return;
        };
        for attached in players.values() {
            let _ = attached.outbox.send(msg.clone());
        }
    }

    /// Sends a final `SessionClosed` and drops every outbox of the session.
    /// Connections drain what is queued, then see their outbox end.
    pub(crate) async fn close_session(&self, session_id: &SessionId, reason: &str) {
        let Some(players) = self.sessions.lock().await.remove(session_id) else {
            return;
        };
        let msg = ServerMessage::SessionClosed {
            reason: reason.to_string(),
        };
        for attached in players.values() {
            let _ = attached.outbox.send(msg.clone());
        }
        tracing::debug!(%session_id, players = players.len(), %reason, "session closed in hub");
    }

    pub(crate) async fn connected(&self, session_id: &SessionId) -> usize {
        self.sessions
            .lock()
            .await
            .get(session_id)
            .map_or(0, HashMap::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> (SessionId, PlayerId) {
        (SessionId::from("s1"), PlayerId::from("p1"))
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_player() {
        let hub = Hub::default();
        let sid = SessionId::from("s1");
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        hub.register(&sid, &PlayerId::from("a"), ConnectionId::new(1), tx1).await;
        hub.register(&sid, &PlayerId::from("b"), ConnectionId::new(2), tx2).await;

        hub.broadcast(&sid, ServerMessage::GameStarted).await;
        assert_eq!(rx1.recv().await, Some(ServerMessage::GameStarted));
        assert_eq!(rx2.recv().await, Some(ServerMessage::GameStarted));
        assert_eq!(hub.connected(&sid).await, 2);
    }

    #[tokio::test]
    async fn test_send_to_is_private() {
        let hub = Hub::default();
        let sid = SessionId::from("s1");
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        hub.register(&sid, &PlayerId::from("a"), ConnectionId::new(1), tx1).await;
        hub.register(&sid, &PlayerId::from("b"), ConnectionId::new(2), tx2).await;

        hub.send_to(&sid, &PlayerId::from("a"), ServerMessage::ClueAccepted).await;
        assert_eq!(rx1.recv().await, Some(ServerMessage::ClueAccepted));
        assert!(rx2.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_reattach_closes_old_outbox_and_keeps_new() {
        let hub = Hub::default();
        let (sid, pid) = ids();
        let (old_tx, mut old_rx) = mpsc::unbounded_channel();
        let (new_tx, mut new_rx) = mpsc::unbounded_channel();
        hub.register(&sid, &pid, ConnectionId::new(1), old_tx).await;
        hub.register(&sid, &pid, ConnectionId::new(2), new_tx).await;

        assert_eq!(old_rx.recv().await, None, "old outbox is dropped");
        assert!(!hub.unregister(&sid, &pid, ConnectionId::new(1)).await);

        hub.broadcast(&sid, ServerMessage::GameStarted).await;
        assert_eq!(new_rx.recv().await, Some(ServerMessage::GameStarted));
        assert!(hub.unregister(&sid, &pid, ConnectionId::new(2)).await);
        assert_eq!(hub.connected(&sid).await, 0);
    }

    #[tokio::test]
    async fn test_close_session_sends_reason_then_ends() {
        let hub = Hub::default();
        let (sid, pid) = ids();
        let (tx, mut rx) = mpsc::unbounded_channel();
        hub.register(&sid, &pid, ConnectionId::new(1), tx).await;

        hub.close_session(&sid, "the host left").await;
        assert_eq!(
            rx.recv().await,
            Some(ServerMessage::SessionClosed {
                reason: "the host left".into()
            })
        );
        assert_eq!(rx.recv().await, None);
    }
}
