//! The match-owned state store: phase machines, action collection, publish step,
//! and snapshot-based resynchronization.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::config::{ConfigError, GameConfig};
use super::events::{EventBus, GameEvent, StoreEvent, SubscriptionId};
use super::player;
use super::resolver::{keep_last, TurnOutcome, TurnResolver};
use super::state::{
    opponent_of, seat, Action, GamePhase, GameState, IntegrityError, PlayerId, PlayerProfile,
    PlayerState, TurnAction, TurnInput, TurnPhase, TurnRecord, TurnState, PLAYER_COUNT,
};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[serde(tag = "type")]
pub enum StoreError {
    #[error("no match has been initialized")]
    NotInitialized,
    #[error("the match is over")]
    GameOver,
    #[error("expected game phase {expected:?}, found {actual:?}")]
    WrongPhase { expected: GamePhase, actual: GamePhase },
    #[error("expected turn phase {expected:?}, found {actual:?}")]
    WrongTurnPhase { expected: TurnPhase, actual: TurnPhase },
    #[error("player {player_id} is not seated in this match")]
    UnknownPlayer { player_id: PlayerId },
    #[error("player {player_id} already locked in for turn {turn_number}")]
    AlreadyLockedIn { player_id: PlayerId, turn_number: u32 },
    #[error("cannot resolve before both inputs are present")]
    InputsMissing,
    #[error("state failed its integrity check: {error}")]
    Integrity { error: IntegrityError },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[serde(tag = "type")]
pub enum SnapshotError {
    #[error("snapshot is not valid JSON for a game state: {message}")]
    Parse { message: String },
    #[error("snapshot version {found} is not supported (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("snapshot state is inconsistent: {error}")]
    Integrity { error: IntegrityError },
    #[error("snapshot carries an invalid config: {error}")]
    Config { error: ConfigError },
    #[error("state could not be serialized: {message}")]
    Serialize { message: String },
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: u32,
    state: &'a GameState,
}

#[derive(Deserialize)]
struct Snapshot {
    version: u32,
    state: GameState,
}

/// What one resolved turn produced, as handed back to the submitter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TurnReport {
    pub turn_number: u32,
    pub actions: [Action; PLAYER_COUNT],
    pub events: Vec<GameEvent>,
    pub outcome: TurnOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmitOutcome {
    Waiting { turn_number: u32, waiting_on: PlayerId },
    Resolved { report: TurnReport },
}

#[derive(Debug)]
pub struct GameStateManager {
    state: GameState,
    resolver: TurnResolver,
    bus: EventBus,
}

impl GameStateManager {
    pub fn new(config: GameConfig) -> Self {
        Self {
            resolver: TurnResolver::new(config.clone()),
            state: GameState::new(config),
            bus: EventBus::default(),
        }
    }

    /// Seats both players and starts turn 1. Replaces any match in progress.
    pub fn initialize(
        &mut self,
        player1: PlayerProfile,
        player2: PlayerProfile,
        is_hot_seat: bool,
    ) -> Result<(), StoreError> {
        let config = self.state.config.clone();
        let mut state = GameState::new(config.clone());
        state.players = vec![
            PlayerState::new(0, player1, &config),
            PlayerState::new(1, player2, &config),
        ];
        state.is_hot_seat = is_hot_seat;
        state.phase = GamePhase::Playing;
        state
            .integrity_check()
            .map_err(|error| StoreError::Integrity { error })?;

        log::info!(
            "match initialized: {} vs {}{}",
            state.players[0].name,
            state.players[1].name,
            if is_hot_seat { " (hot seat)" } else { "" }
        );
        let from = std::mem::replace(&mut self.state, state).phase;
        if from != GamePhase::Playing {
            self.bus.publish(&StoreEvent::PhaseChanged {
                from,
                to: GamePhase::Playing,
            });
        }
        Ok(())
    }

    pub fn set_phase(&mut self, phase: GamePhase) {
        let from = self.state.phase;
        if from == phase {
            return;
        }
        self.state.phase = phase;
        log::debug!("game phase {from:?} -> {phase:?}");
        self.bus.publish(&StoreEvent::PhaseChanged { from, to: phase });
    }

    pub fn set_turn_phase(&mut self, phase: TurnPhase) {
        let from = self.state.turn.phase;
        if from == phase {
            return;
        }
        self.state.turn.phase = phase;
        self.bus.publish(&StoreEvent::TurnPhaseChanged {
            turn_number: self.state.turn.turn_number,
            from,
            to: phase,
        });
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&StoreEvent) + 'static,
    {
        self.bus.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn config(&self) -> &GameConfig {
        &self.state.config
    }

    pub fn resolver(&self) -> &TurnResolver {
        &self.resolver
    }

    pub fn get_player(&self, id: PlayerId) -> Option<&PlayerState> {
        self.state.get_player(id)
    }

    pub fn get_opponent(&self, id: PlayerId) -> Option<&PlayerState> {
        self.state.get_opponent(id)
    }

    pub fn is_game_over(&self) -> bool {
        self.state.phase == GamePhase::GameOver
    }

    pub fn get_winner(&self) -> Option<PlayerId> {
        self.state.winner
    }

    pub fn is_double_ko(&self) -> bool {
        self.state.is_double_ko
    }

    pub fn turn(&self) -> &TurnState {
        &self.state.turn
    }

    pub fn history(&self) -> &[TurnRecord] {
        &self.state.history
    }

    /// Sets the current turn's selection timer to start at `now_ms`.
    pub fn start_timer(&mut self, now_ms: u64) {
        self.state.turn.timer_started_at_ms = now_ms;
    }

    fn ensure_selection(&self) -> Result<(), StoreError> {
        if self.state.players.len() != PLAYER_COUNT {
            return Err(StoreError::NotInitialized);
        }
        match self.state.phase {
            GamePhase::Playing => {}
            GamePhase::GameOver => return Err(StoreError::GameOver),
            actual => {
                return Err(StoreError::WrongPhase {
                    expected: GamePhase::Playing,
                    actual,
                })
            }
        }
        if self.state.turn.phase != TurnPhase::Selection {
            return Err(StoreError::WrongTurnPhase {
                expected: TurnPhase::Selection,
                actual: self.state.turn.phase,
            });
        }
        Ok(())
    }

    /// Locks in one player's action. The second lock-in resolves the turn, exactly once.
    pub fn submit_action(&mut self, action: TurnAction) -> Result<SubmitOutcome, StoreError> {
        self.ensure_selection()?;
        let index = seat(action.player_id).ok_or(StoreError::UnknownPlayer {
            player_id: action.player_id,
        })?;
        let turn_number = self.state.turn.turn_number;
        if self.state.turn.locked[index] {
            log::warn!(
                "player {} tried to resubmit for turn {turn_number}",
                action.player_id
            );
            return Err(StoreError::AlreadyLockedIn {
                player_id: action.player_id,
                turn_number,
            });
        }

        self.state.turn.inputs[index] = Some(TurnInput::Submitted { action });
        self.state.turn.locked[index] = true;
        let player = &mut self.state.players[index];
        player.selected_card = action.action.card_id();
        player.has_locked_in = true;
        log::debug!("player {} locked in for turn {turn_number}", action.player_id);
        self.bus.publish(&StoreEvent::ActionLocked {
            player_id: action.player_id,
            turn_number,
        });

        if !self.state.turn.all_inputs_present() {
            return Ok(SubmitOutcome::Waiting {
                turn_number,
                waiting_on: opponent_of(action.player_id),
            });
        }
        let report = self.resolve_pending(action.timestamp_ms)?;
        Ok(SubmitOutcome::Resolved { report })
    }

    /// Deadline check for the selection timer. Once `now_ms` reaches the deadline every
    /// missing input becomes a timeout and the turn resolves; before it, nothing happens.
    pub fn expire_selection(&mut self, now_ms: u64) -> Result<Option<TurnReport>, StoreError> {
        self.ensure_selection()?;
        if !self.state.turn.is_expired(now_ms) {
            return Ok(None);
        }
        let turn = &mut self.state.turn;
        for (input, locked) in turn.inputs.iter_mut().zip(turn.locked.iter_mut()) {
            if input.is_none() {
                *input = Some(TurnInput::Timeout);
                *locked = true;
            }
        }
        log::info!("turn {} selection timer expired", turn.turn_number);
        self.resolve_pending(now_ms).map(Some)
    }

    fn resolve_pending(&mut self, now_ms: u64) -> Result<TurnReport, StoreError> {
        let [Some(first), Some(second)] = self.state.turn.inputs else {
            return Err(StoreError::InputsMissing);
        };
        let battlefield: &[PlayerState; PLAYER_COUNT] = self
            .state
            .players
            .as_slice()
            .try_into()
            .map_err(|_| StoreError::NotInitialized)?;
        let turn_number = self.state.turn.turn_number;
        let resolution = self.resolver.resolve(battlefield, turn_number, [first, second]);

        self.set_turn_phase(TurnPhase::Reveal);
        self.set_turn_phase(TurnPhase::Resolution);
        self.state.players = Vec::from(resolution.players);
        keep_last(
            &mut self.state.history,
            TurnRecord {
                turn_number,
                actions: resolution.actions,
                events: resolution.events.clone(),
            },
            self.state.config.history_limit,
        );
        for event in &resolution.events {
            self.bus.publish(&StoreEvent::Combat {
                turn_number,
                event: event.clone(),
            });
        }
        self.set_turn_phase(TurnPhase::TurnEnd);

        let turn = &mut self.state.turn;
        turn.turn_number = resolution.next_turn_number;
        turn.inputs = [None, None];
        turn.locked = [false, false];
        turn.timer_started_at_ms = now_ms;
        turn.timer_duration_ms = self.state.config.turn_timer_ms;
        self.set_turn_phase(TurnPhase::Selection);

        match &resolution.outcome {
            TurnOutcome::Continue => {}
            TurnOutcome::Victory { winner, loser } => {
                log::info!("turn {turn_number}: player {winner} defeats player {loser}");
                self.state.winner = Some(*winner);
                self.set_phase(GamePhase::GameOver);
            }
            TurnOutcome::DoubleKo { message } => {
                log::info!("turn {turn_number}: double KO");
                self.state.is_double_ko = true;
                self.state.double_ko_message = Some(message.clone());
                self.set_phase(GamePhase::GameOver);
            }
        }

        Ok(TurnReport {
            turn_number,
            actions: resolution.actions,
            events: resolution.events,
            outcome: resolution.outcome,
        })
    }

    /// Resets both seats from their drafted decks and starts again at turn 1.
    pub fn rematch(&mut self) -> Result<(), StoreError> {
        if self.state.players.len() != PLAYER_COUNT {
            return Err(StoreError::NotInitialized);
        }
        let config = self.state.config.clone();
        self.state.players = self
            .state
            .players
            .iter()
            .map(|seat| player::reset(seat, seat.deck.clone(), &config))
            .collect();
        self.state.turn = TurnState::new(1, 0, config.turn_timer_ms);
        self.state.history.clear();
        self.state.winner = None;
        self.state.is_double_ko = false;
        self.state.double_ko_message = None;
        log::info!("rematch started");
        self.set_phase(GamePhase::Playing);
        Ok(())
    }

    pub fn create_snapshot(&self) -> Result<String, SnapshotError> {
        serde_json::to_string(&SnapshotRef {
            version: SNAPSHOT_VERSION,
            state: &self.state,
        })
        .map_err(|err| SnapshotError::Serialize {
            message: err.to_string(),
        })
    }

    /// Replaces local state with `json`. Fails closed: on any problem returns `false`
    /// and keeps the current state.
    pub fn restore_from_snapshot(&mut self, json: &str) -> bool {
        match self.try_restore_from_snapshot(json) {
            Ok(()) => true,
            Err(error) => {
                log::warn!("snapshot rejected, keeping current state: {error}");
                false
            }
        }
    }

    pub fn try_restore_from_snapshot(&mut self, json: &str) -> Result<(), SnapshotError> {
        let snapshot: Snapshot = serde_json::from_str(json).map_err(|err| SnapshotError::Parse {
            message: err.to_string(),
        })?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: snapshot.version,
                expected: SNAPSHOT_VERSION,
            });
        }
        let state = snapshot.state;
        state
            .config
            .validate()
            .map_err(|error| SnapshotError::Config { error })?;
        state
            .integrity_check()
            .map_err(|error| SnapshotError::Integrity { error })?;

        self.resolver = TurnResolver::new(state.config.clone());
        self.state = state;
        log::info!("state restored at turn {}", self.state.turn.turn_number);
        self.bus.publish(&StoreEvent::SnapshotRestored {
            turn_number: self.state.turn.turn_number,
        });
        Ok(())
    }
}

impl Default for GameStateManager {
    fn default() -> Self {
        Self::new(GameConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::cards::tests::standard_deck;
    use crate::game::cards::CardId;
    use std::cell::RefCell;
    use std::rc::Rc;

    const FIRE_SHIELD: CardId = 11;
    const FIRE_BLAST: CardId = 31;
    const FIRE_SHOT: CardId = 41;

    fn profile(name: &str) -> PlayerProfile {
        PlayerProfile {
            name: name.into(),
            is_local: true,
            is_ai: false,
            deck: standard_deck(),
        }
    }

    fn started() -> GameStateManager {
        let mut manager = GameStateManager::default();
        manager
            .initialize(profile("Ada"), profile("Brook"), true)
            .expect("initialize should succeed");
        manager
    }

    fn recorder(manager: &mut GameStateManager) -> Rc<RefCell<Vec<StoreEvent>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        manager.subscribe(move |event| sink.borrow_mut().push(event.clone()));
        seen
    }

    #[test]
    fn initialize_enters_playing_at_turn_one() {
        let mut manager = GameStateManager::default();
        let seen = recorder(&mut manager);
        manager
            .initialize(profile("Ada"), profile("Brook"), false)
            .expect("initialize");

        assert_eq!(manager.state().phase, GamePhase::Playing);
        assert_eq!(manager.state().turn.turn_number, 1);
        assert_eq!(manager.state().turn.phase, TurnPhase::Selection);
        assert_eq!(
            seen.borrow().as_slice(),
            &[StoreEvent::PhaseChanged {
                from: GamePhase::Menu,
                to: GamePhase::Playing
            }]
        );
        assert_eq!(manager.get_opponent(0).map(|p| p.name.as_str()), Some("Brook"));
    }

    #[test]
    fn submission_before_initialize_is_rejected() {
        let mut manager = GameStateManager::default();
        assert_eq!(
            manager.submit_action(TurnAction::pass(0, 0)),
            Err(StoreError::NotInitialized)
        );
    }

    #[test]
    fn resubmission_after_lock_in_is_rejected() {
        let mut manager = started();
        let first = manager
            .submit_action(TurnAction::play(0, FIRE_SHOT, 100))
            .expect("first submission");
        assert_eq!(
            first,
            SubmitOutcome::Waiting {
                turn_number: 1,
                waiting_on: 1
            }
        );
        assert!(manager.get_player(0).map(|p| p.has_locked_in).unwrap_or(false));

        let again = manager.submit_action(TurnAction::pass(0, 200));
        assert_eq!(
            again,
            Err(StoreError::AlreadyLockedIn {
                player_id: 0,
                turn_number: 1
            })
        );
        assert_eq!(
            manager.state().turn.inputs[0],
            Some(TurnInput::Submitted {
                action: TurnAction::play(0, FIRE_SHOT, 100)
            }),
            "original submission must stand"
        );
        assert_eq!(
            manager.submit_action(TurnAction::pass(5, 0)),
            Err(StoreError::UnknownPlayer { player_id: 5 })
        );
    }

    #[test]
    fn second_lock_in_resolves_exactly_once() {
        let mut manager = started();
        let seen = recorder(&mut manager);
        manager
            .submit_action(TurnAction::play(0, FIRE_SHIELD, 1_000))
            .expect("p1 submit");
        let outcome = manager
            .submit_action(TurnAction::play(1, FIRE_BLAST, 2_500))
            .expect("p2 submit");

        let SubmitOutcome::Resolved { report } = outcome else {
            panic!("second lock-in should resolve");
        };
        assert_eq!(report.turn_number, 1);
        assert_eq!(manager.history().len(), 1);
        assert_eq!(manager.state().turn.turn_number, 2);
        assert_eq!(manager.state().turn.timer_started_at_ms, 2_500);
        assert_eq!(manager.state().turn.inputs, [None, None]);

        let phases: Vec<TurnPhase> = seen
            .borrow()
            .iter()
            .filter_map(|event| match event {
                StoreEvent::TurnPhaseChanged { to, .. } => Some(*to),
                _ => None,
            })
            .collect();
        assert_eq!(
            phases,
            vec![
                TurnPhase::Reveal,
                TurnPhase::Resolution,
                TurnPhase::TurnEnd,
                TurnPhase::Selection
            ]
        );
        assert!(seen.borrow().iter().any(|event| matches!(
            event,
            StoreEvent::Combat {
                event: GameEvent::WallDamaged { player_id: 0, remaining: 4, .. },
                ..
            }
        )));
    }

    #[test]
    fn reference_scenario_wall_against_blast() {
        let mut manager = started();
        manager.submit_action(TurnAction::play(0, FIRE_SHIELD, 0)).expect("p1");
        manager.submit_action(TurnAction::play(1, FIRE_BLAST, 0)).expect("p2");

        let p1 = manager.get_player(0).expect("p1");
        let p2 = manager.get_player(1).expect("p2");
        assert_eq!(p1.field.wall.as_ref().map(|w| w.current_hp), Some(4));
        assert_eq!(p1.stats.base_hp, 20);
        assert_eq!(p2.stats.energy, 5 - 5 + 2, "spent 5, then odd-turn income");

        manager.submit_action(TurnAction::pass(0, 0)).expect("p1 turn 2");
        manager.submit_action(TurnAction::pass(1, 0)).expect("p2 turn 2");
        assert!(manager.get_player(0).expect("p1").field.wall.is_none());
    }

    #[test]
    fn expired_timer_turns_missing_inputs_into_passes() {
        let mut manager = started();
        manager.start_timer(1_000);
        manager.submit_action(TurnAction::play(0, FIRE_SHOT, 2_000)).expect("p1");

        assert_eq!(manager.expire_selection(5_000), Ok(None), "deadline not reached");
        let report = manager
            .expire_selection(11_000)
            .expect("expiry should resolve")
            .expect("a report is produced");
        assert!(report.events.contains(&GameEvent::TimedOut { player_id: 1 }));
        assert_eq!(manager.get_player(1).map(|p| p.stats.base_hp), Some(17));
        assert_eq!(manager.state().turn.timer_started_at_ms, 11_000);
    }

    #[test]
    fn lethal_turn_ends_the_game() {
        let mut manager = started();
        manager.state.players[1].stats.base_hp = 3;
        manager.submit_action(TurnAction::play(0, FIRE_SHOT, 0)).expect("p1");
        manager.submit_action(TurnAction::pass(1, 0)).expect("p2");

        assert!(manager.is_game_over());
        assert_eq!(manager.get_winner(), Some(0));
        assert!(!manager.is_double_ko());
        assert_eq!(manager.turn().turn_number, 2, "turn advances before the terminal check");
        assert_eq!(manager.turn().phase, TurnPhase::Selection);
        assert_eq!(manager.turn().inputs, [None, None]);
        assert_eq!(
            manager.submit_action(TurnAction::pass(0, 0)),
            Err(StoreError::GameOver)
        );
        assert_eq!(manager.state().integrity_check(), Ok(()));
    }

    #[test]
    fn double_ko_has_no_winner() {
        let mut manager = started();
        manager.state.players[0].stats.base_hp = 3;
        manager.state.players[1].stats.base_hp = 3;
        manager.submit_action(TurnAction::play(0, FIRE_SHOT, 0)).expect("p1");
        manager.submit_action(TurnAction::play(1, FIRE_SHOT, 0)).expect("p2");

        assert!(manager.is_game_over());
        assert!(manager.is_double_ko());
        assert_eq!(manager.get_winner(), None);
        assert!(manager.state().double_ko_message.is_some());
    }

    #[test]
    fn snapshot_round_trips_into_another_store() {
        let mut host = started();
        host.submit_action(TurnAction::play(0, FIRE_SHIELD, 0)).expect("p1");
        host.submit_action(TurnAction::play(1, FIRE_SHOT, 0)).expect("p2");
        let json = host.create_snapshot().expect("snapshot");

        let mut guest = GameStateManager::default();
        let seen = recorder(&mut guest);
        assert!(guest.restore_from_snapshot(&json));
        assert_eq!(guest.state(), host.state());
        assert!(guest.restore_from_snapshot(&json), "restore is idempotent");
        assert_eq!(guest.state(), host.state());
        assert!(matches!(
            seen.borrow().first(),
            Some(StoreEvent::SnapshotRestored { turn_number: 2 })
        ));
    }

    #[test]
    fn malformed_snapshot_leaves_state_untouched() {
        let mut manager = started();
        manager.submit_action(TurnAction::play(0, FIRE_SHOT, 0)).expect("p1");
        let before = manager.create_snapshot().expect("snapshot");

        assert!(!manager.restore_from_snapshot(&before[..before.len() / 2]));
        assert!(!manager.restore_from_snapshot("not json"));
        assert!(!manager.restore_from_snapshot(r#"{"version":1}"#));

        let future = before.replacen(r#""version":1"#, r#""version":99"#, 1);
        assert_eq!(
            manager.try_restore_from_snapshot(&future),
            Err(SnapshotError::UnsupportedVersion {
                found: 99,
                expected: SNAPSHOT_VERSION
            })
        );

        let inconsistent = before.replacen(r#""is_double_ko":false"#, r#""is_double_ko":true"#, 1);
        assert!(matches!(
            manager.try_restore_from_snapshot(&inconsistent),
            Err(SnapshotError::Integrity { .. })
        ));

        let after = manager.create_snapshot().expect("snapshot");
        assert_eq!(before, after, "failed restores must not change state");
    }

    #[test]
    fn rematch_resets_players_and_history() {
        let mut manager = started();
        manager.state.players[1].stats.base_hp = 3;
        manager.submit_action(TurnAction::play(0, FIRE_SHOT, 0)).expect("p1");
        manager.submit_action(TurnAction::pass(1, 0)).expect("p2");
        assert!(manager.is_game_over());

        manager.rematch().expect("rematch");
        assert_eq!(manager.state().phase, GamePhase::Playing);
        assert_eq!(manager.get_winner(), None);
        assert!(manager.history().is_empty());
        assert_eq!(manager.get_player(1).map(|p| p.stats.base_hp), Some(20));
        assert_eq!(manager.state().turn.turn_number, 1);
    }

    #[test]
    fn terminal_turn_publishes_selection_before_game_over() {
        let mut manager = started();
        manager.state.players[0].stats.base_hp = 3;
        manager.state.players[1].stats.base_hp = 3;
        let seen = recorder(&mut manager);
        manager.submit_action(TurnAction::play(0, FIRE_SHOT, 0)).expect("p1");
        manager.submit_action(TurnAction::play(1, FIRE_SHOT, 0)).expect("p2");

        let tail: Vec<StoreEvent> = seen
            .borrow()
            .iter()
            .filter(|event| !matches!(event, StoreEvent::Combat { .. }))
            .rev()
            .take(2)
            .cloned()
            .collect();
        assert_eq!(
            tail,
            vec![
                StoreEvent::PhaseChanged {
                    from: GamePhase::Playing,
                    to: GamePhase::GameOver
                },
                StoreEvent::TurnPhaseChanged {
                    turn_number: 2,
                    from: TurnPhase::TurnEnd,
                    to: TurnPhase::Selection
                },
            ]
        );
        assert_eq!(manager.state().integrity_check(), Ok(()));
    }

    #[test]
    fn snapshot_parked_mid_resolution_is_rejected() {
        let mut manager = started();
        let before = manager.create_snapshot().expect("snapshot");
        let parked = before.replacen(r#""phase":"selection""#, r#""phase":"reveal""#, 1);
        assert_ne!(parked, before);

        assert_eq!(
            manager.try_restore_from_snapshot(&parked),
            Err(SnapshotError::Integrity {
                error: IntegrityError::TurnPhaseStalled {
                    phase: TurnPhase::Reveal
                }
            })
        );
        assert!(manager.submit_action(TurnAction::pass(0, 0)).is_ok(), "match still moves");
    }

    #[test]
    fn snapshot_with_unresolved_knockout_is_rejected() {
        let mut manager = started();
        let before = manager.create_snapshot().expect("snapshot");
        let knocked_out = before.replacen(r#""base_hp":20"#, r#""base_hp":0"#, 1);
        assert_ne!(knocked_out, before);

        assert!(!manager.restore_from_snapshot(&knocked_out));
        assert_eq!(
            manager.try_restore_from_snapshot(&knocked_out),
            Err(SnapshotError::Integrity {
                error: IntegrityError::OutcomeDisagreesWithHp
            })
        );
        assert_eq!(manager.create_snapshot().expect("snapshot"), before);
    }

    #[test]
    fn history_keeps_only_recent_turns() {
        let mut manager = GameStateManager::new(GameConfig {
            history_limit: 2,
            ..GameConfig::default()
        });
        manager
            .initialize(profile("Ada"), profile("Brook"), true)
            .expect("initialize");
        for _ in 0..3 {
            manager.submit_action(TurnAction::pass(0, 0)).expect("p1");
            manager.submit_action(TurnAction::pass(1, 0)).expect("p2");
        }
        let turns: Vec<u32> = manager.history().iter().map(|record| record.turn_number).collect();
        assert_eq!(turns, vec![2, 3]);
    }
}
