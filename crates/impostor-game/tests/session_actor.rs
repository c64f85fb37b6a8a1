//! Integration tests for session actors driven through the registry.

use std::sync::Arc;
use std::time::Duration;

use impostor_game::{
    CommandError, PreconditionError, RegistryConfig, SessionError, SessionRegistry, VoteOutcome,
    WordSource, TIMED_OUT_CLUE,
};
use impostor_protocol::{
    PlayerId, Role, SessionConfig, SessionStatus, TimerEvent, Winner, WordPair,
};
use rand::RngCore;

// =========================================================================
// Helpers
// =========================================================================

/// Always deals the same pair.
struct FixedWords;

impl WordSource for FixedWords {
    fn draw(&self, _rng: &mut dyn RngCore) -> WordPair {
        WordPair::new("Coffee", "Tea")
    }
}

fn pid(id: &str) -> PlayerId {
    PlayerId::from(id)
}

fn registry() -> SessionRegistry {
    SessionRegistry::new(Arc::new(FixedWords))
}

fn quick_config() -> SessionConfig {
    SessionConfig {
        clue_time_seconds: 30,
        vote_time_seconds: 60,
        rounds_per_player: 1,
    }
}

/// A session with players `host`, `p1`, `p2`, not yet started.
async fn lobby(registry: &mut SessionRegistry) -> impostor_protocol::SessionId {
    let handle = registry.create(pid("host"), "Host", quick_config());
    let id = handle.session_id().clone();
    assert!(registry.join(&id, pid("p1"), "Ana").await.unwrap());
    assert!(registry.join(&id, pid("p2"), "Ben").await.unwrap());
    id
}

// =========================================================================
// Registry
// =========================================================================

#[tokio::test]
async fn test_create_registers_session_with_host() {
    let mut registry = registry();
    let handle = registry.create(pid("host"), "Host", SessionConfig::default());

    assert_eq!(registry.len(), 1);
    assert!(registry.contains(handle.session_id()));
    assert!(handle.is_host(&pid("host")));

    let state = handle.snapshot().await.unwrap();
    assert_eq!(state.status, SessionStatus::WaitingForPlayers);
    assert_eq!(state.player_count, 1);
    assert_eq!(state.host_id, pid("host"));
    assert_eq!(state.session_id.as_str().len(), 8);
}

#[tokio::test]
async fn test_session_ids_are_unique() {
    let mut registry = registry();
    for i in 0..50 {
        registry.create(pid(&format!("h{i}")), "Host", SessionConfig::default());
    }
    assert_eq!(registry.len(), 50);
    let mut ids = registry.session_ids();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 50);
}

#[tokio::test]
async fn test_unknown_session_is_not_found() {
    let registry = registry();
    let missing = impostor_protocol::SessionId::from("deadbeef");

    let err = registry.snapshot(&missing).await.unwrap_err();
    assert!(matches!(err, SessionError::NotFound(ref id) if *id == missing));
    assert_eq!(err.code(), 404);
    assert!(registry.tick(&missing).await.is_err());
    assert!(registry.join(&missing, pid("x"), "X").await.is_err());
}

#[tokio::test]
async fn test_removed_session_stops_accepting_commands() {
    let mut registry = registry();
    let handle = registry.create(pid("host"), "Host", SessionConfig::default());
    let id = handle.session_id().clone();

    assert!(registry.remove(&id).await);
    assert!(!registry.remove(&id).await, "second remove is a no-op");
    assert!(registry.get(&id).is_none());

    let err = handle.snapshot().await.unwrap_err();
    assert!(matches!(err, SessionError::Unavailable(_)));
    assert!(matches!(
        registry.tick(&id).await,
        Err(SessionError::NotFound(_))
    ));
}

// =========================================================================
// Game flow through the actor
// =========================================================================

#[tokio::test]
async fn test_start_needs_three_players() {
    let mut registry = registry();
    let handle = registry.create(pid("host"), "Host", quick_config());
    handle.join(pid("p1"), "Ana").await.unwrap();

    let err = handle.start().await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Precondition(PreconditionError::NotEnoughPlayers { actual: 2, .. })
    ));
    assert_eq!(err.code(), 409);
}

#[tokio::test]
async fn test_start_returns_secrets_for_everyone() {
    let mut registry = registry();
    let id = lobby(&mut registry).await;

    let secrets = registry.start(&id).await.unwrap();
    assert_eq!(secrets.len(), 3);
    assert_eq!(
        secrets.values().filter(|s| s.role == Role::Impostor).count(),
        1
    );

    for (player_id, secret) in &secrets {
        let info = registry.private_info(&id, player_id.clone()).await.unwrap();
        assert_eq!(info.as_ref(), Some(secret));
    }

    assert!(!registry.join(&id, pid("late"), "Late").await.unwrap());
    assert!(!registry.leave(&id, pid("p1")).await.unwrap());
}

#[tokio::test]
async fn test_rejections_pass_through_unchanged() {
    let mut registry = registry();
    let id = lobby(&mut registry).await;
    registry.start(&id).await.unwrap();

    let state = registry.snapshot(&id).await.unwrap();
    let current = state.current_player_id.clone().unwrap();
    let other = state
        .players
        .iter()
        .map(|p| p.id.clone())
        .find(|p| *p != current)
        .unwrap();

    let err = registry
        .submit_clue(&id, other, "hint")
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Command(CommandError::NotYourTurn)));

    let err = registry
        .submit_clue(&id, current, "two words")
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Command(CommandError::InvalidClue(_))));
}

#[tokio::test]
async fn test_full_game_to_innocent_win() {
    let mut registry = registry();
    let id = lobby(&mut registry).await;
    let secrets = registry.start(&id).await.unwrap();
    let impostor = secrets
        .iter()
        .find(|(_, s)| s.role == Role::Impostor)
        .map(|(id, _)| id.clone())
        .unwrap();

    for i in 0..3 {
        let state = registry.snapshot(&id).await.unwrap();
        let current = state.current_player_id.unwrap();
        registry
            .submit_clue(&id, current, format!("hint{i}"))
            .await
            .unwrap();
    }

    let state = registry.snapshot(&id).await.unwrap();
    assert_eq!(state.status, SessionStatus::Voting);
    assert_eq!(state.clues.len(), 3);

    let innocents: Vec<PlayerId> = secrets
        .keys()
        .filter(|p| **p != impostor)
        .cloned()
        .collect();
    let first = registry
        .submit_vote(&id, innocents[0].clone(), impostor.clone())
        .await
        .unwrap();
    assert_eq!(first, VoteOutcome::Recorded { remaining: 2 });
    registry
        .submit_vote(&id, innocents[1].clone(), impostor.clone())
        .await
        .unwrap();
    let last = registry
        .submit_vote(&id, impostor.clone(), innocents[0].clone())
        .await
        .unwrap();

    let VoteOutcome::GameOver(results) = last else {
        panic!("expected game over");
    };
    assert_eq!(results.winner, Winner::Innocents);

    let state = registry.snapshot(&id).await.unwrap();
    assert_eq!(state.status, SessionStatus::Finished);
    assert_eq!(state.results, Some(results));
}

// =========================================================================
// Timers (paused clock)
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_tick_counts_down_with_the_clock() {
    let mut registry = registry();
    let id = lobby(&mut registry).await;
    registry.start(&id).await.unwrap();

    assert_eq!(
        registry.tick(&id).await.unwrap(),
        Some(TimerEvent::Tick {
            remaining_seconds: 30
        })
    );

    tokio::time::advance(Duration::from_secs(12)).await;
    assert_eq!(
        registry.tick(&id).await.unwrap(),
        Some(TimerEvent::Tick {
            remaining_seconds: 18
        })
    );
    assert_eq!(registry.snapshot(&id).await.unwrap().remaining_seconds, 18);
}

#[tokio::test(start_paused = true)]
async fn test_expired_turn_skipped_exactly_once() {
    let mut registry = registry();
    let id = lobby(&mut registry).await;
    registry.start(&id).await.unwrap();
    let first = registry
        .snapshot(&id)
        .await
        .unwrap()
        .current_player_id
        .unwrap();

    tokio::time::advance(Duration::from_secs(30)).await;
    assert_eq!(
        registry.tick(&id).await.unwrap(),
        Some(TimerEvent::TurnSkipped {
            player_id: first.clone()
        })
    );
    assert!(matches!(
        registry.tick(&id).await.unwrap(),
        Some(TimerEvent::Tick { .. })
    ));

    let state = registry.snapshot(&id).await.unwrap();
    assert_eq!(state.clues.len(), 1);
    assert_eq!(state.clues[0].clue, TIMED_OUT_CLUE);
    assert_ne!(state.current_player_id, Some(first.clone()));

    let err = registry
        .submit_clue(&id, first, "late")
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Command(CommandError::NotYourTurn)));
}

#[tokio::test(start_paused = true)]
async fn test_silent_game_ends_with_impostor_escaping() {
    let mut registry = registry();
    let id = lobby(&mut registry).await;
    registry.start(&id).await.unwrap();

    for _ in 0..3 {
        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(matches!(
            registry.tick(&id).await.unwrap(),
            Some(TimerEvent::TurnSkipped { .. })
        ));
    }
    assert_eq!(
        registry.snapshot(&id).await.unwrap().status,
        SessionStatus::Voting
    );

    tokio::time::advance(Duration::from_secs(60)).await;
    let Some(TimerEvent::GameOver { results }) = registry.tick(&id).await.unwrap() else {
        panic!("expected game over");
    };
    assert_eq!(results.winner, Winner::Impostor);
    assert_eq!(results.vote_tally.get("ABSTAINED"), Some(&3));

    assert_eq!(registry.tick(&id).await.unwrap(), None);
    let handle = registry.get(&id).unwrap();
    assert_eq!(handle.process_votes().await.unwrap(), results);
}

// =========================================================================
// Seeding
// =========================================================================

#[tokio::test]
async fn test_seeded_registries_deal_identically() {
    let config = RegistryConfig {
        rng_seed: Some(1234),
        ..RegistryConfig::default()
    };
    let mut a = SessionRegistry::with_config(Arc::new(FixedWords), config.clone());
    let mut b = SessionRegistry::with_config(Arc::new(FixedWords), config);

    let id_a = lobby(&mut a).await;
    let id_b = lobby(&mut b).await;
    let secrets_a = a.start(&id_a).await.unwrap();
    let secrets_b = b.start(&id_b).await.unwrap();
    assert_eq!(secrets_a, secrets_b);

    let turn_a = a.snapshot(&id_a).await.unwrap().current_player_id;
    let turn_b = b.snapshot(&id_b).await.unwrap().current_player_id;
    assert_eq!(turn_a, turn_b);
}
