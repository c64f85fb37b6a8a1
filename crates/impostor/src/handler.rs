//! Per-connection handler: handshake, command routing, and outbox forwarding.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Receive `CreateSession` or `JoinSession` → attach to a session
//!   2. Send `Welcome` (and the secret again on re-attach)
//!   3. Loop: read commands from the socket and forward broadcasts queued
//!      in this player's outbox, whichever comes first
//!
//! Replies meant only for the sender go straight to the socket. Everything
//! fanned out to the session goes through the hub, so a reply always
//! reaches its sender before the state update it caused.

use std::sync::Arc;

use impostor_game::{generate_player_id, SessionError, SessionHandle, VoteOutcome};
use impostor_protocol::{
    ClientMessage, Codec, JsonCodec, PlayerId, ProtocolError, ServerMessage, SessionId,
};
use impostor_transport::{Connection, ConnectionId, WebSocketConnection};
use tokio::sync::mpsc;

use crate::driver::schedule_cleanup;
use crate::hub::Outbox;
use crate::server::ServerState;
use crate::ImpostorError;

/// Runs the disconnect path when the handler exits, however it exits.
///
/// `Drop` is synchronous, so the async cleanup is spawned.
struct DisconnectGuard {
    session_id: SessionId,
    player_id: PlayerId,
    conn_id: ConnectionId,
    state: Arc<ServerState>,
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        let state = Arc::clone(&self.state);
        let session_id = self.session_id.clone();
        let player_id = self.player_id.clone();
        let conn_id = self.conn_id;
        tokio::spawn(async move {
            on_disconnect(&state, &session_id, &player_id, conn_id).await;
        });
    }
}

/// Whether the message loop keeps going after a command.
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Close,
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection(
    conn: WebSocketConnection,
    state: Arc<ServerState>,
) -> Result<(), ImpostorError> {
    let conn_id = conn.id();
    tracing::debug!(%conn_id, peer = %conn.peer_addr(), "handling new connection");

    // --- Step 1: Handshake ---
    let (outbox, mut inbox) = mpsc::unbounded_channel();
    let (handle, player_id, _guard) = perform_handshake(&conn, &state, outbox).await?;
    let session_id = handle.session_id().clone();

    // --- Step 2: Message loop ---
    loop {
        tokio::select! {
            frame = conn.recv() => {
                let data = match frame {
                    Ok(Some(data)) => data,
                    Ok(None) => {
                        tracing::info!(%session_id, %player_id, "connection closed by client");
                        break;
                    }
                    Err(e) => {
                        tracing::debug!(%session_id, %player_id, error = %e, "recv error");
                        break;
                    }
                };

                let msg: ClientMessage = match state.codec.decode(&data) {
                    Ok(msg) => msg,
                    Err(e) => {
                        tracing::debug!(%player_id, error = %e, "failed to decode command");
                        send_error(&conn, &state.codec, 400, &format!("invalid message: {e}")).await?;
                        continue;
                    }
                };

                if handle_command(&conn, &state, &handle, &player_id, msg).await? == Flow::Close {
                    tracing::info!(%session_id, %player_id, "player left");
                    break;
                }
            }
            queued = inbox.recv() => match queued {
                Some(msg) => send(&conn, &state.codec, &msg).await?,
                // The hub dropped this outbox: the session closed or a newer
                // connection took over this player.
                None => {
                    tracing::debug!(%session_id, %player_id, "outbox closed");
                    break;
                }
            },
        }
    }

    let _ = conn.close().await;
    // _guard drops here → disconnect cleanup fires.
    Ok(())
}

/// Reads the first frame and attaches the connection to a session.
///
/// On success the connection is registered in the hub, `Welcome` has been
/// sent, and a fresh state update is queued for the whole session. The
/// returned guard is armed as soon as the player is attached, so a failure
/// after that point still runs the disconnect cleanup.
async fn perform_handshake(
    conn: &WebSocketConnection,
    state: &Arc<ServerState>,
    outbox: Outbox,
) -> Result<(SessionHandle, PlayerId, DisconnectGuard), ImpostorError> {
    let data = match tokio::time::timeout(state.handshake_timeout, conn.recv()).await {
        Ok(Ok(Some(data))) => data,
        Ok(Ok(None)) => {
            return Err(ProtocolError::InvalidMessage(
                "connection closed before handshake".into(),
            )
            .into());
        }
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => return Err(reject(conn, &state.codec, 408, "handshake timed out").await),
    };

    let msg: ClientMessage = match state.codec.decode(&data) {
        Ok(msg) => msg,
        Err(e) => {
            return Err(reject(conn, &state.codec, 400, &format!("invalid message: {e}")).await);
        }
    };

    let (handle, player_id, reattached) = match msg {
        ClientMessage::CreateSession {
            player_name,
            config,
        } => {
            let Some(name) = clean_name(&player_name) else {
                return Err(reject(conn, &state.codec, 400, "player name is required").await);
            };
            let player_id = generate_player_id();
            let handle = state.registry.lock().await.create(
                player_id.clone(),
                name,
                config.unwrap_or_default(),
            );
            state.activity.notify_one();
            (handle, player_id, false)
        }

        ClientMessage::JoinSession {
            session_id,
            player_name,
            player_id,
            reconnect_token,
        } => {
            let Some(handle) = state.registry.lock().await.get(&session_id) else {
                let message = SessionError::NotFound(session_id).to_string();
                return Err(reject(conn, &state.codec, 404, &message).await);
            };

            match player_id {
                Some(known) if is_member(&handle, &known).await => {
                    let valid = match reconnect_token.as_deref() {
                        Some(token) => state.tokens.verify(&session_id, &known, token).await,
                        None => false,
                    };
                    if !valid {
                        tracing::debug!(%session_id, player_id = %known, "re-attach with bad token");
                        return Err(
                            reject(conn, &state.codec, 403, "invalid reconnect token").await
                        );
                    }
                    (handle, known, true)
                }
                _ => {
                    let Some(name) = clean_name(&player_name) else {
                        return Err(
                            reject(conn, &state.codec, 400, "player name is required").await
                        );
                    };
                    let player_id = generate_player_id();
                    match handle.join(player_id.clone(), name).await {
                        Ok(true) => (handle, player_id, false),
                        Ok(false) => {
                            return Err(reject(conn, &state.codec, 409, "cannot join now").await);
                        }
                        Err(e) => {
                            return Err(reject(conn, &state.codec, e.code(), &e.to_string()).await);
                        }
                    }
                }
            }
        }

        _ => {
            return Err(reject(
                conn,
                &state.codec,
                400,
                "first message must be CreateSession or JoinSession",
            )
            .await);
        }
    };

    let session_id = handle.session_id().clone();
    state
        .hub
        .register(&session_id, &player_id, conn.id(), outbox)
        .await;
    let guard = DisconnectGuard {
        session_id: session_id.clone(),
        player_id: player_id.clone(),
        conn_id: conn.id(),
        state: Arc::clone(state),
    };

    let reconnect_token = state.tokens.issue(&session_id, &player_id).await;
    send(
        conn,
        &state.codec,
        &ServerMessage::Welcome {
            session_id: session_id.clone(),
            player_id: player_id.clone(),
            is_host: handle.is_host(&player_id),
            reconnect_token,
        },
    )
    .await?;

    if reattached {
        tracing::info!(%session_id, %player_id, "player re-attached");
        if let Some(info) = handle.private_info(player_id.clone()).await? {
            send(conn, &state.codec, &ServerMessage::Secret { info }).await?;
        }
    } else {
        tracing::info!(%session_id, %player_id, host = handle.is_host(&player_id), "player attached");
    }

    broadcast_state(state, &handle).await;
    Ok((handle, player_id, guard))
}

/// Routes one command from an attached player.
async fn handle_command(
    conn: &WebSocketConnection,
    state: &Arc<ServerState>,
    handle: &SessionHandle,
    player_id: &PlayerId,
    msg: ClientMessage,
) -> Result<Flow, ImpostorError> {
    let session_id = handle.session_id();

    match msg {
        ClientMessage::CreateSession { .. } | ClientMessage::JoinSession { .. } => {
            send_error(conn, &state.codec, 409, "already in a session").await?;
        }

        ClientMessage::StartGame => {
            if !handle.is_host(player_id) {
                send_error(conn, &state.codec, 403, "only the host can start the game").await?;
                return Ok(Flow::Continue);
            }
            match handle.start().await {
                Ok(secrets) => {
                    for (id, info) in secrets {
                        state
                            .hub
                            .send_to(session_id, &id, ServerMessage::Secret { info })
                            .await;
                    }
                    state.hub.broadcast(session_id, ServerMessage::GameStarted).await;
                    broadcast_state(state, handle).await;
                }
                Err(e) => send_session_error(conn, &state.codec, &e).await?,
            }
        }

        ClientMessage::SubmitClue { clue } => {
            match handle.submit_clue(player_id.clone(), clue).await {
                Ok(()) => {
                    send(conn, &state.codec, &ServerMessage::ClueAccepted).await?;
                    broadcast_state(state, handle).await;
                }
                Err(e) => send_session_error(conn, &state.codec, &e).await?,
            }
        }

        ClientMessage::Vote { voted_id } => {
            match handle.submit_vote(player_id.clone(), voted_id).await {
                Ok(VoteOutcome::Recorded { remaining }) => {
                    send(conn, &state.codec, &ServerMessage::VoteAccepted { remaining }).await?;
                    broadcast_state(state, handle).await;
                }
                Ok(VoteOutcome::GameOver(results)) => {
                    state
                        .hub
                        .broadcast(session_id, ServerMessage::GameOver { results })
                        .await;
                    broadcast_state(state, handle).await;
                    schedule_cleanup(state, session_id.clone());
                }
                Err(e) => send_session_error(conn, &state.codec, &e).await?,
            }
        }

        ClientMessage::RequestSecret => match handle.private_info(player_id.clone()).await {
            Ok(Some(info)) => send(conn, &state.codec, &ServerMessage::Secret { info }).await?,
            Ok(None) => {
                send_error(conn, &state.codec, 409, "no secret has been dealt yet").await?;
            }
            Err(e) => send_session_error(conn, &state.codec, &e).await?,
        },

        ClientMessage::Leave => return Ok(Flow::Close),
    }

    Ok(Flow::Continue)
}

/// Cleanup after a connection ends.
///
/// Does nothing if a newer connection has re-attached the same player.
/// The host leaving closes the session; anyone else is only removed from
/// the roster while the session is still waiting for players.
async fn on_disconnect(
    state: &Arc<ServerState>,
    session_id: &SessionId,
    player_id: &PlayerId,
    conn_id: ConnectionId,
) {
    if !state.hub.unregister(session_id, player_id, conn_id).await {
        return;
    }

    let Some(handle) = state.registry.lock().await.get(session_id) else {
        return;
    };

    if handle.is_host(player_id) {
        state.registry.lock().await.remove(session_id).await;
        state.hub.close_session(session_id, "the host left").await;
        state.tokens.forget_session(session_id).await;
        tracing::info!(%session_id, %player_id, "host left, session closed");
        return;
    }

    match handle.leave(player_id.clone()).await {
        Ok(true) => {
            state.tokens.revoke(session_id, player_id).await;
            let connected = state.hub.connected(session_id).await;
            tracing::info!(%session_id, %player_id, connected, "player removed from lobby");
            broadcast_state(state, &handle).await;
        }
        Ok(false) => {
            tracing::debug!(%session_id, %player_id, "player disconnected mid-game, kept in turn order");
        }
        Err(e) => tracing::debug!(%session_id, error = %e, "leave after disconnect failed"),
    }
}

/// Queues a fresh public snapshot for every player of the session.
pub(crate) async fn broadcast_state(state: &ServerState, handle: &SessionHandle) {
    match handle.snapshot().await {
        Ok(snapshot) => {
            state
                .hub
                .broadcast(
                    handle.session_id(),
                    ServerMessage::StateUpdate { state: snapshot },
                )
                .await;
        }
        Err(e) => {
            tracing::debug!(session_id = %handle.session_id(), error = %e, "snapshot failed");
        }
    }
}

/// `true` if `player_id` is on the session's roster.
async fn is_member(handle: &SessionHandle, player_id: &PlayerId) -> bool {
    handle
        .snapshot()
        .await
        .map(|s| s.players.iter().any(|p| &p.id == player_id))
        .unwrap_or(false)
}

fn clean_name(name: &str) -> Option<String> {
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_string())
}

async fn send(
    conn: &WebSocketConnection,
    codec: &JsonCodec,
    msg: &ServerMessage,
) -> Result<(), ImpostorError> {
    let bytes = codec.encode(msg)?;
    conn.send(&bytes).await?;
    Ok(())
}

async fn send_error(
    conn: &WebSocketConnection,
    codec: &JsonCodec,
    code: u16,
    message: &str,
) -> Result<(), ImpostorError> {
    send(
        conn,
        codec,
        &ServerMessage::Error {
            code,
            message: message.to_string(),
        },
    )
    .await
}

async fn send_session_error(
    conn: &WebSocketConnection,
    codec: &JsonCodec,
    err: &SessionError,
) -> Result<(), ImpostorError> {
    tracing::debug!(error = %err, "command rejected");
    send_error(conn, codec, err.code(), &err.to_string()).await
}

/// Sends an `Error`, closes the socket, and returns the error that ends
/// the handshake.
async fn reject(
    conn: &WebSocketConnection,
    codec: &JsonCodec,
    code: u16,
    message: &str,
) -> ImpostorError {
    if let Err(e) = send_error(conn, codec, code, message).await {
        return e;
    }
    let _ = conn.close().await;
    ProtocolError::InvalidMessage(message.to_string()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_name_trims() {
        assert_eq!(clean_name("  Ana "), Some("Ana".to_string()));
    }

    #[test]
    fn test_clean_name_rejects_blank() {
        assert_eq!(clean_name(""), None);
        assert_eq!(clean_name("   "), None);
    }
}
