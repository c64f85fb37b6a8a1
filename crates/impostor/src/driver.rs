//! Timer driver: one task checks every session's phase timer per tick.
//!
//! Sessions never sleep on their own deadlines. The driver wakes at the
//! configured rate, asks each session actor to compare its deadline with
//! the current time, and fans the resulting events out through the hub.

use std::sync::Arc;

use impostor_game::SessionHandle;
use impostor_protocol::{ServerMessage, SessionId, TimerEvent};
use impostor_tick::{TickConfig, TickScheduler};

use crate::handler::broadcast_state;
use crate::server::ServerState;

/// Runs forever, checking every registered session once per tick.
///
/// The scheduler is paused while no session exists and resumed when
/// `ServerState::activity` is notified.
pub(crate) async fn run_timer_driver(state: Arc<ServerState>, config: TickConfig) {
    let mut scheduler = TickScheduler::new(config);
    tracing::info!(rate_hz = scheduler.tick_rate_hz(), "timer driver started");

    loop {
        tokio::select! {
            tick = scheduler.wait_for_tick() => {
                let sessions = sweep(&state).await;
                scheduler.record_tick_end();
                tracing::trace!(tick = tick.tick, sessions, "timer sweep done");

                if sessions == 0 {
                    scheduler.pause();
                }
            }
            _ = state.activity.notified() => scheduler.resume(),
        }
    }
}

/// Runs one timer check per session. Returns how many were checked.
async fn sweep(state: &Arc<ServerState>) -> usize {
    // Snapshot the handles so the registry lock is not held while
    // talking to the actors.
    let handles = state.registry.lock().await.handles();
    for handle in &handles {
        match handle.tick().await {
            Ok(Some(event)) => dispatch(state, handle, event).await,
            Ok(None) => {}
            // Removed between the snapshot and the check.
            Err(e) => tracing::trace!(session_id = %handle.session_id(), error = %e, "timer check skipped"),
        }
    }
    handles.len()
}

async fn dispatch(state: &Arc<ServerState>, handle: &SessionHandle, event: TimerEvent) {
    let session_id = handle.session_id();
    match event {
        TimerEvent::Tick { remaining_seconds } => {
            state
                .hub
                .broadcast(session_id, ServerMessage::TimerTick { remaining_seconds })
                .await;
        }
        TimerEvent::TurnSkipped { player_id } => {
            tracing::debug!(%session_id, %player_id, "clue turn timed out");
            state
                .hub
                .broadcast(session_id, ServerMessage::TurnSkipped { player_id })
                .await;
            broadcast_state(state, handle).await;
        }
        TimerEvent::GameOver { results } => {
            tracing::info!(%session_id, winner = ?results.winner, "vote closed by timer");
            state
                .hub
                .broadcast(session_id, ServerMessage::GameOver { results })
                .await;
            broadcast_state(state, handle).await;
            schedule_cleanup(state, session_id.clone());
        }
    }
}

/// Removes a finished session once players have had time to read the
/// result, then closes every connection still attached to it.
pub(crate) fn schedule_cleanup(state: &Arc<ServerState>, session_id: SessionId) {
    let state = Arc::clone(state);
    tokio::spawn(async move {
        tokio::time::sleep(state.finished_retention).await;
        let removed = state.registry.lock().await.remove(&session_id).await;
        state.hub.close_session(&session_id, "game finished").await;
        state.tokens.forget_session(&session_id).await;
        if removed {
            tracing::info!(%session_id, "finished session removed");
        }
    });
}
