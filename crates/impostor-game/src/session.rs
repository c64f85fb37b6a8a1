//! The session state machine.
//!
//! A [`Session`] is one game from creation to result. It is mutated only
//! through the command methods below and [`Session::check_timer`]; every
//! one of them checks the current status and flags before touching
//! anything, so a command that loses a race against the timer (or vice
//! versa) fails its precondition instead of corrupting state.
//!
//! ```text
//!  add/remove_player      start_game        last clue / turn expiry      all votes / vote expiry
//! WaitingForPlayers ────────────────→ InProgress ──────────→ Voting ──────────────→ Finished
//! ```
//!
//! Nothing in here reads a clock or a global RNG: time arrives as `now`
//! and randomness as `&mut dyn RngCore`.

use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use impostor_protocol::{
    ClueEntry, PlayerId, PrivateInfo, PublicState, ResultRecord, Role, SessionConfig, SessionId,
    SessionStatus, TimerEvent, Winner, WordPair, ABSTAIN_LABEL, MIN_PLAYERS,
};
use rand::RngCore;
use rand::seq::{IndexedRandom, SliceRandom};

use crate::{CommandError, Player, PreconditionError, SessionTimer, WordSource};

/// Clue recorded for a player whose turn ran out.
pub const TIMED_OUT_CLUE: &str = "(timed out)";

/// Every player's secret, keyed by player. Returned once by
/// [`Session::start_game`] for private delivery; never broadcast.
pub type Secrets = HashMap<PlayerId, PrivateInfo>;

/// Result of a successful vote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteOutcome {
    /// Vote stored; `remaining` players have not voted yet.
    Recorded { remaining: usize },
    /// That was the last vote; the game is resolved.
    GameOver(ResultRecord),
}

/// A recorded choice. Non-voters get `Abstained` when the votes close.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Ballot {
    For(PlayerId),
    Abstained,
}

/// One game instance.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    host_id: PlayerId,
    config: SessionConfig,
    status: SessionStatus,
    players: HashMap<PlayerId, Player>,
    /// Join order, only used to list players consistently.
    roster: Vec<PlayerId>,
    /// Fixed at game start. Never repaired when a player leaves.
    turn_order: Vec<PlayerId>,
    /// 1-based once started.
    current_round: u32,
    /// `None` before the first turn and once voting begins.
    current_turn: Option<usize>,
    word_pair: Option<WordPair>,
    impostor_id: Option<PlayerId>,
    clues: Vec<ClueEntry>,
    votes: HashMap<PlayerId, Ballot>,
    timer: SessionTimer,
    results: Option<ResultRecord>,
}

impl Session {
    /// Creates a session with the host as its only player.
    pub fn new(
        id: SessionId,
        host_id: PlayerId,
        host_name: impl Into<String>,
        config: SessionConfig,
    ) -> Self {
        let host = Player::new(host_id.clone(), host_name);
        Self {
            id,
            config: config.validated(),
            status: SessionStatus::WaitingForPlayers,
            players: HashMap::from([(host_id.clone(), host)]),
            roster: vec![host_id.clone()],
            host_id,
            turn_order: Vec::new(),
            current_round: 0,
            current_turn: None,
            word_pair: None,
            impostor_id: None,
            clues: Vec::new(),
            votes: HashMap::new(),
            timer: SessionTimer::new(),
            results: None,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn host_id(&self) -> &PlayerId {
        &self.host_id
    }

    pub fn is_host(&self, player_id: &PlayerId) -> bool {
        self.host_id == *player_id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn contains(&self, player_id: &PlayerId) -> bool {
        self.players.contains_key(player_id)
    }

    pub fn player(&self, player_id: &PlayerId) -> Option<&Player> {
        self.players.get(player_id)
    }

    /// Players in join order.
    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.roster.iter().filter_map(|id| self.players.get(id))
    }

    pub fn turn_order(&self) -> &[PlayerId] {
        &self.turn_order
    }

    pub fn current_round(&self) -> u32 {
        self.current_round
    }

    /// The player whose clue is awaited. Only set while InProgress.
    pub fn current_player_id(&self) -> Option<&PlayerId> {
        if !self.status.accepts_clues() {
            return None;
        }
        self.current_turn.and_then(|i| self.turn_order.get(i))
    }

    pub fn impostor_id(&self) -> Option<&PlayerId> {
        self.impostor_id.as_ref()
    }

    pub fn clues(&self) -> &[ClueEntry] {
        &self.clues
    }

    /// Ballots recorded. Once the vote has closed this includes the
    /// abstentions filled in for players who never voted.
    pub fn votes_submitted(&self) -> usize {
        self.votes.len()
    }

    pub fn timer(&self) -> &SessionTimer {
        &self.timer
    }

    pub fn results(&self) -> Option<&ResultRecord> {
        self.results.as_ref()
    }

    // -----------------------------------------------------------------------
    // Roster
    // -----------------------------------------------------------------------

    /// Adds a player. Fails once the game has started or if the id is taken.
    pub fn add_player(&mut self, player_id: PlayerId, name: impl Into<String>) -> bool {
        if !self.status.is_joinable() || self.players.contains_key(&player_id) {
            return false;
        }
        let player = Player::new(player_id.clone(), name);
        tracing::info!(
            session_id = %self.id,
            %player_id,
            name = %player.name,
            players = self.players.len() + 1,
            "player joined"
        );
        self.roster.push(player_id.clone());
        self.players.insert(player_id, player);
        true
    }

    /// Removes a player.
    ///
    /// Anyone may leave while waiting. After the start only the host may be
    /// removed (which the caller treats as the end of the session); the
    /// turn order and round count are left as they are.
    pub fn remove_player(&mut self, player_id: &PlayerId) -> bool {
        if !self.players.contains_key(player_id) {
            return false;
        }
        if !self.status.is_joinable() && !self.is_host(player_id) {
            tracing::debug!(
                session_id = %self.id,
                %player_id,
                status = %self.status,
                "non-host cannot leave a running game"
            );
            return false;
        }
        self.players.remove(player_id);
        self.roster.retain(|id| id != player_id);
        self.votes.remove(player_id);
        tracing::info!(
            session_id = %self.id,
            %player_id,
            players = self.players.len(),
            "player left"
        );
        true
    }

    // -----------------------------------------------------------------------
    // Game start and turns
    // -----------------------------------------------------------------------

    /// Deals the words and begins the first clue turn.
    ///
    /// Draws one pair, shuffles the roster into the turn order, picks the
    /// impostor uniformly, and arms the first clue timer.
    ///
    /// # Errors
    /// - [`PreconditionError::AlreadyStarted`] unless WaitingForPlayers.
    /// - [`PreconditionError::NotEnoughPlayers`] below [`MIN_PLAYERS`].
    pub fn start_game(
        &mut self,
        words: &dyn WordSource,
        rng: &mut dyn RngCore,
        now: Instant,
    ) -> Result<Secrets, PreconditionError> {
        if !self.status.is_joinable() {
            return Err(PreconditionError::AlreadyStarted(self.status));
        }
        let not_enough = PreconditionError::NotEnoughPlayers {
            required: MIN_PLAYERS,
            actual: self.players.len(),
        };
        if self.players.len() < MIN_PLAYERS {
            return Err(not_enough);
        }

        let pair = words.draw(rng);
        let mut order = self.roster.clone();
        order.shuffle(rng);
        let Some(impostor_id) = order.choose(rng).cloned() else {
            return Err(not_enough);
        };

        let mut secrets = Secrets::with_capacity(order.len());
        for player_id in &order {
            let Some(player) = self.players.get_mut(player_id) else {
                continue;
            };
            let (role, word) = if *player_id == impostor_id {
                (Role::Impostor, &pair.impostor)
            } else {
                (Role::Innocent, &pair.innocent)
            };
            player.assign(role, word);
            secrets.insert(
                player_id.clone(),
                PrivateInfo {
                    word: word.clone(),
                    role,
                },
            );
        }

        self.word_pair = Some(pair);
        self.impostor_id = Some(impostor_id);
        self.turn_order = order;
        self.current_round = 1;
        self.current_turn = None;
        self.transition(SessionStatus::InProgress);
        tracing::info!(
            session_id = %self.id,
            players = self.turn_order.len(),
            rounds = self.config.rounds_per_player,
            "game started"
        );

        self.advance_turn(now);
        Ok(secrets)
    }

    /// Moves to the next clue turn, or into Voting after the last round.
    ///
    /// Runs exactly once per recorded clue or expired turn; both callers
    /// re-check status and flags first, and this call re-arms the timer,
    /// so the same expiry cannot trigger it twice.
    fn advance_turn(&mut self, now: Instant) {
        debug_assert!(!self.turn_order.is_empty(), "advancing a turn with no turn order");
        if self.turn_order.is_empty() {
            return;
        }

        let mut next = self.current_turn.map_or(0, |i| i + 1);
        if next >= self.turn_order.len() {
            next = 0;
            self.current_round += 1;
            if self.current_round > self.config.rounds_per_player {
                self.current_turn = None;
                self.transition(SessionStatus::Voting);
                self.timer.arm(now, self.config.vote_time_seconds);
                tracing::info!(
                    session_id = %self.id,
                    clues = self.clues.len(),
                    "clue rounds complete, voting started"
                );
                return;
            }
        }

        self.current_turn = Some(next);
        self.timer.arm(now, self.config.clue_time_seconds);
        let player_id = &self.turn_order[next];
        if let Some(player) = self.players.get_mut(player_id) {
            player.has_given_clue = false;
        }
        tracing::debug!(
            session_id = %self.id,
            round = self.current_round,
            turn = next,
            %player_id,
            "clue turn started"
        );
    }

    // -----------------------------------------------------------------------
    // Clues
    // -----------------------------------------------------------------------

    /// Records the current player's clue and advances the turn.
    ///
    /// The clue is trimmed and uppercased before it is checked and stored.
    ///
    /// # Errors
    /// In order of checking: [`CommandError::WrongPhase`],
    /// [`CommandError::NotYourTurn`], [`CommandError::AlreadyActed`],
    /// [`CommandError::InvalidClue`], [`CommandError::ClueIsSecretWord`].
    pub fn submit_clue(
        &mut self,
        player_id: &PlayerId,
        text: &str,
        now: Instant,
    ) -> Result<(), CommandError> {
        if !self.status.accepts_clues() {
            return Err(CommandError::WrongPhase(self.status));
        }
        if self.current_player_id() != Some(player_id) {
            return Err(CommandError::NotYourTurn);
        }
        let player = self.players.get(player_id).ok_or(CommandError::NotYourTurn)?;
        if player.has_given_clue {
            return Err(CommandError::AlreadyActed);
        }

        let clue = normalize_clue(text)?;
        if let Some(pair) = &self.word_pair {
            if is_same_word(&clue, &pair.innocent) || is_same_word(&clue, &pair.impostor) {
                return Err(CommandError::ClueIsSecretWord);
            }
        }

        let player_name = player.name.clone();
        tracing::debug!(session_id = %self.id, %player_id, %clue, "clue accepted");
        self.clues.push(ClueEntry { player_name, clue });
        if let Some(player) = self.players.get_mut(player_id) {
            player.has_given_clue = true;
        }
        self.advance_turn(now);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Votes
    // -----------------------------------------------------------------------

    /// Records a vote. The last missing vote resolves the game at once.
    ///
    /// # Errors
    /// [`CommandError::WrongPhase`], [`CommandError::InvalidTarget`],
    /// [`CommandError::SelfVote`], [`CommandError::AlreadyVoted`].
    pub fn submit_vote(
        &mut self,
        voter_id: &PlayerId,
        voted_id: &PlayerId,
    ) -> Result<VoteOutcome, CommandError> {
        if !self.status.accepts_votes() {
            return Err(CommandError::WrongPhase(self.status));
        }
        if !self.players.contains_key(voter_id) || !self.players.contains_key(voted_id) {
            return Err(CommandError::InvalidTarget);
        }
        if voter_id == voted_id {
            return Err(CommandError::SelfVote);
        }
        if self.votes.contains_key(voter_id) {
            return Err(CommandError::AlreadyVoted);
        }

        self.votes
            .insert(voter_id.clone(), Ballot::For(voted_id.clone()));
        if let Some(voter) = self.players.get_mut(voter_id) {
            voter.has_voted = true;
        }
        tracing::debug!(session_id = %self.id, %voter_id, %voted_id, "vote recorded");

        let remaining = self.players.len().saturating_sub(self.votes.len());
        if remaining == 0 {
            return Ok(VoteOutcome::GameOver(self.resolve_votes()));
        }
        Ok(VoteOutcome::Recorded { remaining })
    }

    /// Closes the vote and returns the result.
    ///
    /// From Voting this resolves the game; from Finished it returns the
    /// stored record without tallying again.
    ///
    /// # Errors
    /// [`CommandError::WrongPhase`] before the voting phase.
    pub fn process_votes(&mut self) -> Result<ResultRecord, CommandError> {
        match (self.status, &self.results) {
            (SessionStatus::Finished, Some(results)) => Ok(results.clone()),
            (SessionStatus::Voting, _) => Ok(self.resolve_votes()),
            (status, _) => Err(CommandError::WrongPhase(status)),
        }
    }

    /// Tallies the votes and finishes the session.
    ///
    /// Resolution, first match wins:
    /// 1. no votes for anyone → impostor escapes;
    /// 2. tie at the top → impostor escapes (no random tie-break);
    /// 3. unique top target → innocents win iff it is the impostor.
    fn resolve_votes(&mut self) -> ResultRecord {
        debug_assert!(self.word_pair.is_some(), "processing votes with no word pair");
        self.transition(SessionStatus::Finished);
        self.timer.pause();

        for player_id in &self.roster {
            self.votes
                .entry(player_id.clone())
                .or_insert(Ballot::Abstained);
        }

        let mut counts: HashMap<&PlayerId, usize> = HashMap::new();
        let mut abstentions = 0;
        for ballot in self.votes.values() {
            match ballot {
                Ballot::For(target) => *counts.entry(target).or_default() += 1,
                Ballot::Abstained => abstentions += 1,
            }
        }

        let impostor_name = self
            .impostor_id
            .as_ref()
            .map(|id| self.player_name(id))
            .unwrap_or_else(|| "unknown".to_string());

        let top = counts.values().copied().max();
        let (winner, message) = match top {
            None => (
                Winner::Impostor,
                format!("Nobody voted! The impostor ({impostor_name}) escaped."),
            ),
            Some(max) => {
                let leaders: Vec<&PlayerId> = counts
                    .iter()
                    .filter(|(_, count)| **count == max)
                    .map(|(id, _)| *id)
                    .collect();
                match leaders.as_slice() {
                    [voted] if self.impostor_id.as_ref() == Some(*voted) => (
                        Winner::Innocents,
                        format!(
                            "{} was voted out and WAS the impostor! Innocents win.",
                            self.player_name(voted)
                        ),
                    ),
                    [voted] => (
                        Winner::Impostor,
                        format!(
                            "{} was voted out but was innocent. The impostor ({impostor_name}) wins.",
                            self.player_name(voted)
                        ),
                    ),
                    _ => (
                        Winner::Impostor,
                        format!("The vote was tied! The impostor ({impostor_name}) escaped."),
                    ),
                }
            }
        };

        let mut vote_tally = BTreeMap::new();
        for (target, count) in &counts {
            *vote_tally.entry(self.player_name(target)).or_insert(0) += count;
        }
        if abstentions > 0 {
            vote_tally.insert(ABSTAIN_LABEL.to_string(), abstentions);
        }

        let pair = self.word_pair.clone().unwrap_or_default();
        let record = ResultRecord {
            winner,
            message,
            impostor_name,
            innocent_word: pair.innocent,
            impostor_word: pair.impostor,
            clues: self.clues.clone(),
            vote_tally,
        };

        tracing::info!(
            session_id = %self.id,
            winner = ?record.winner,
            votes = self.votes_submitted(),
            abstentions,
            "game finished"
        );
        self.results = Some(record.clone());
        record
    }

    // -----------------------------------------------------------------------
    // Timer
    // -----------------------------------------------------------------------

    /// Checks the phase timer against `now`.
    ///
    /// - Idle or paused: `None`.
    /// - Running: `Tick` with the seconds left; nothing changes.
    /// - Expired during a clue turn: records a timed-out clue for the
    ///   current player (if they gave none), advances, `TurnSkipped`.
    /// - Expired during voting: resolves the game, `GameOver`.
    ///
    /// The expiry action re-arms or pauses the timer, so calling this again
    /// with the same `now` never fires it twice.
    pub fn check_timer(&mut self, now: Instant) -> Option<TimerEvent> {
        if !self.timer.is_running() {
            return None;
        }
        if !self.timer.is_expired(now) {
            return Some(TimerEvent::Tick {
                remaining_seconds: self.timer.remaining_seconds(now),
            });
        }

        match self.status {
            SessionStatus::InProgress => {
                let player_id = self.current_player_id()?.clone();
                let gave_clue = self
                    .players
                    .get(&player_id)
                    .is_some_and(|p| p.has_given_clue);
                if !gave_clue {
                    let player_name = self.player_name(&player_id);
                    self.clues.push(ClueEntry {
                        player_name,
                        clue: TIMED_OUT_CLUE.to_string(),
                    });
                    if let Some(player) = self.players.get_mut(&player_id) {
                        player.has_given_clue = true;
                    }
                }
                tracing::info!(session_id = %self.id, %player_id, "clue turn timed out");
                self.advance_turn(now);
                Some(TimerEvent::TurnSkipped { player_id })
            }
            SessionStatus::Voting => {
                tracing::info!(session_id = %self.id, "vote timed out");
                Some(TimerEvent::GameOver {
                    results: self.resolve_votes(),
                })
            }
            _ => None,
        }
    }

    // -----------------------------------------------------------------------
    // Views
    // -----------------------------------------------------------------------

    /// A player's own word and role, once dealt.
    pub fn private_info(&self, player_id: &PlayerId) -> Option<PrivateInfo> {
        self.players.get(player_id)?.private_info()
    }

    /// The broadcastable snapshot. Secrets appear only inside `results`,
    /// and only once Finished.
    pub fn public_state(&self, now: Instant) -> PublicState {
        let current = self.current_player_id();
        let finished = self.status == SessionStatus::Finished;
        PublicState {
            session_id: self.id.clone(),
            host_id: self.host_id.clone(),
            status: self.status,
            players: self.players().map(Player::public).collect(),
            player_count: self.players.len(),
            min_players: MIN_PLAYERS,
            config: self.config,
            clues: self.clues.clone(),
            current_round: self.current_round.min(self.config.rounds_per_player),
            current_player_id: current.cloned(),
            current_player_name: current.map(|id| self.player_name(id)),
            remaining_seconds: self.timer.remaining_seconds(now),
            players_to_vote: if self.status.accepts_votes() {
                self.players.len()
            } else {
                0
            },
            votes_submitted: self.votes_submitted(),
            results: if finished { self.results.clone() } else { None },
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn transition(&mut self, next: SessionStatus) {
        debug_assert!(
            self.status.can_transition_to(next),
            "illegal transition {} -> {}",
            self.status,
            next
        );
        tracing::debug!(session_id = %self.id, from = %self.status, to = %next, "status changed");
        self.status = next;
    }

    /// Display name for a player; departed players show as their raw id.
    fn player_name(&self, player_id: &PlayerId) -> String {
        self.players
            .get(player_id)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| player_id.to_string())
    }
}

/// Trims and uppercases a clue, requiring exactly one token.
fn normalize_clue(text: &str) -> Result<String, CommandError> {
    let clue = text.trim().to_uppercase();
    if clue.is_empty() {
        return Err(CommandError::InvalidClue("the clue is empty".into()));
    }
    if clue.chars().any(char::is_whitespace) {
        return Err(CommandError::InvalidClue("the clue must be a single word".into()));
    }
    Ok(clue)
}

fn is_same_word(clue: &str, secret: &str) -> bool {
    clue == secret.trim().to_uppercase()
}
