use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::cards::{Card, CardId, CardSubtype, Deck};
use super::config::GameConfig;
use super::events::GameEvent;

/// Seat index of a player: 0 or 1.
pub type PlayerId = u8;

pub const PLAYER_COUNT: usize = 2;

pub fn seat(player_id: PlayerId) -> Option<usize> {
    let index = usize::from(player_id);
    (index < PLAYER_COUNT).then_some(index)
}

pub fn opponent_of(player_id: PlayerId) -> PlayerId {
    1 - player_id.min(1)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WallState {
    pub max_hp: u8,
    pub current_hp: u8,
    pub turn_placed: u32,
}

impl WallState {
    pub fn new(hp: u8, turn_placed: u32) -> Self {
        Self {
            max_hp: hp,
            current_hp: hp,
            turn_placed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MinerState {
    pub miner_type: CardSubtype,
    pub turns_until_payout: u8,
    pub payout_interval: u8,
    pub power: u8,
    pub turn_placed: u32,
}

impl MinerState {
    pub fn from_card(card: &Card, turn_placed: u32) -> Self {
        let interval = card.payout_interval.unwrap_or(1).max(1);
        Self {
            miner_type: card.subtype,
            turns_until_payout: interval,
            payout_interval: interval,
            power: card.power,
            turn_placed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerStats {
    pub base_hp: u8,
    pub max_hp: u8,
    pub energy: u8,
    pub max_energy: u8,
}

impl PlayerStats {
    pub fn new(config: &GameConfig) -> Self {
        Self {
            base_hp: config.max_hp,
            max_hp: config.max_hp,
            energy: config.starting_energy.min(config.max_energy),
            max_energy: config.max_energy,
        }
    }

    pub fn add_energy(&mut self, amount: u8) -> u8 {
        let before = self.energy;
        self.energy = self.energy.saturating_add(amount).min(self.max_energy);
        self.energy - before
    }

    pub fn can_afford(&self, cost: u8) -> bool {
        self.energy >= cost
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerField {
    #[serde(default)]
    pub wall: Option<WallState>,
    #[serde(default)]
    pub miner: Option<MinerState>,
    /// Set only while the turn that played a Dodge resolves.
    #[serde(default)]
    pub active_deflection: bool,
    /// Set only while the turn a Dodge Bot paid out resolves.
    #[serde(default)]
    pub active_deflection_miner: bool,
}

impl PlayerField {
    pub fn is_deflecting(&self) -> bool {
        self.active_deflection || self.active_deflection_miner
    }

    pub fn clear_turn_flags(&mut self) {
        self.active_deflection = false;
        self.active_deflection_miner = false;
    }
}

/// Who sits in a seat and what they drafted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerProfile {
    pub name: String,
    #[serde(default = "default_true")]
    pub is_local: bool,
    #[serde(default)]
    pub is_ai: bool,
    pub deck: Deck,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerState {
    pub id: PlayerId,
    pub name: String,
    pub is_local: bool,
    pub is_ai: bool,
    pub stats: PlayerStats,
    #[serde(default)]
    pub field: PlayerField,
    pub deck: Deck,
    #[serde(default)]
    pub hand: Vec<Card>,
    #[serde(default)]
    pub discard: Vec<Card>,
    #[serde(default)]
    pub selected_card: Option<CardId>,
    #[serde(default)]
    pub has_locked_in: bool,
}

impl PlayerState {
    /// A fresh match-start player: full HP, starting energy, the whole deck in hand.
    pub fn new(id: PlayerId, profile: PlayerProfile, config: &GameConfig) -> Self {
        let hand = profile.deck.cards().to_vec();
        Self {
            id,
            name: profile.name,
            is_local: profile.is_local,
            is_ai: profile.is_ai,
            stats: PlayerStats::new(config),
            field: PlayerField::default(),
            deck: profile.deck,
            hand,
            discard: Vec::new(),
            selected_card: None,
            has_locked_in: false,
        }
    }

    pub fn find_in_hand(&self, card_id: CardId) -> Option<&Card> {
        self.hand.iter().find(|card| card.id == card_id)
    }

    pub fn clear_selection(&mut self) {
        self.selected_card = None;
        self.has_locked_in = false;
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum GamePhase {
    Menu,
    Tutorial,
    Draft,
    Playing,
    GameOver,
}

impl Default for GamePhase {
    fn default() -> Self {
        Self::Menu
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TurnPhase {
    Selection,
    Reveal,
    Resolution,
    TurnEnd,
}

impl Default for TurnPhase {
    fn default() -> Self {
        Self::Selection
    }
}

impl TurnPhase {
    pub fn next(self) -> TurnPhase {
        match self {
            TurnPhase::Selection => TurnPhase::Reveal,
            TurnPhase::Reveal => TurnPhase::Resolution,
            TurnPhase::Resolution => TurnPhase::TurnEnd,
            TurnPhase::TurnEnd => TurnPhase::Selection,
        }
    }
}

/// What a player chose for the turn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum Action {
    Play { card_id: CardId },
    Pass,
}

impl Action {
    pub fn card_id(&self) -> Option<CardId> {
        match self {
            Action::Play { card_id } => Some(*card_id),
            Action::Pass => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TurnAction {
    pub player_id: PlayerId,
    pub action: Action,
    #[serde(default)]
    pub timestamp_ms: u64,
}

impl TurnAction {
    pub fn play(player_id: PlayerId, card_id: CardId, timestamp_ms: u64) -> Self {
        Self {
            player_id,
            action: Action::Play { card_id },
            timestamp_ms,
        }
    }

    pub fn pass(player_id: PlayerId, timestamp_ms: u64) -> Self {
        Self {
            player_id,
            action: Action::Pass,
            timestamp_ms,
        }
    }
}

/// One seat's input to a resolution: a submission, or the deadline passing first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum TurnInput {
    Submitted { action: TurnAction },
    Timeout,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TurnState {
    pub turn_number: u32,
    pub phase: TurnPhase,
    pub timer_started_at_ms: u64,
    pub timer_duration_ms: u64,
    #[serde(default)]
    pub inputs: [Option<TurnInput>; PLAYER_COUNT],
    #[serde(default)]
    pub locked: [bool; PLAYER_COUNT],
}

impl TurnState {
    pub fn new(turn_number: u32, started_at_ms: u64, duration_ms: u64) -> Self {
        Self {
            turn_number,
            phase: TurnPhase::Selection,
            timer_started_at_ms: started_at_ms,
            timer_duration_ms: duration_ms,
            inputs: [None, None],
            locked: [false, false],
        }
    }

    pub fn deadline_ms(&self) -> u64 {
        self.timer_started_at_ms.saturating_add(self.timer_duration_ms)
    }

    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.deadline_ms()
    }

    pub fn all_inputs_present(&self) -> bool {
        self.inputs.iter().all(Option::is_some)
    }

    pub fn remaining_ms(&self, now_ms: u64) -> u64 {
        self.deadline_ms().saturating_sub(now_ms)
    }
}

impl Default for TurnState {
    fn default() -> Self {
        Self::new(1, 0, super::config::TURN_TIMER_MS)
    }
}

/// One resolved turn, as kept in the match history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TurnRecord {
    pub turn_number: u32,
    pub actions: [Action; PLAYER_COUNT],
    #[serde(default)]
    pub events: Vec<GameEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[serde(tag = "type")]
pub enum IntegrityError {
    #[error("expected {expected} players, found {actual}")]
    WrongPlayerCount { expected: usize, actual: usize },
    #[error("player in seat {index} carries id {player_id}")]
    SeatMismatch { index: usize, player_id: PlayerId },
    #[error("player {player_id} base HP {value} exceeds {max}")]
    BaseHpOutOfRange { player_id: PlayerId, value: u8, max: u8 },
    #[error("player {player_id} energy {value} exceeds {max}")]
    EnergyOutOfRange { player_id: PlayerId, value: u8, max: u8 },
    #[error("player {player_id} wall HP {current} exceeds its max {max}")]
    WallOutOfRange { player_id: PlayerId, current: u8, max: u8 },
    #[error("player {player_id} miner has a zero payout interval")]
    InvalidMiner { player_id: PlayerId },
    #[error("turn number must start at 1")]
    InvalidTurnNumber,
    #[error("seat {index} lock flag disagrees with its submitted input")]
    LockMismatch { index: usize },
    #[error("a match in play must wait in selection, found {phase:?}")]
    TurnPhaseStalled { phase: TurnPhase },
    #[error("game-over phase and terminal outcome disagree")]
    OutcomeMismatch,
    #[error("recorded outcome does not match the players' base HP")]
    OutcomeDisagreesWithHp,
    #[error("a double KO cannot also name a winner")]
    DoubleKoWithWinner,
    #[error("winner {player_id} is not seated")]
    UnknownWinner { player_id: PlayerId },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameState {
    #[serde(default)]
    pub players: Vec<PlayerState>,
    #[serde(default)]
    pub turn: TurnState,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<TurnRecord>,
    #[serde(default)]
    pub winner: Option<PlayerId>,
    #[serde(default)]
    pub is_double_ko: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub double_ko_message: Option<String>,
    #[serde(default)]
    pub is_hot_seat: bool,
    #[serde(default)]
    pub phase: GamePhase,
    #[serde(default)]
    pub config: GameConfig,
}

impl GameState {
    pub fn new(config: GameConfig) -> Self {
        Self {
            players: Vec::new(),
            turn: TurnState::new(1, 0, config.turn_timer_ms),
            history: Vec::new(),
            winner: None,
            is_double_ko: false,
            double_ko_message: None,
            is_hot_seat: false,
            phase: GamePhase::Menu,
            config,
        }
    }

    pub fn get_player(&self, id: PlayerId) -> Option<&PlayerState> {
        self.players.get(seat(id)?)
    }

    pub fn get_player_mut(&mut self, id: PlayerId) -> Option<&mut PlayerState> {
        self.players.get_mut(seat(id)?)
    }

    pub fn get_opponent(&self, id: PlayerId) -> Option<&PlayerState> {
        seat(id)?;
        self.get_player(opponent_of(id))
    }

    pub fn has_outcome(&self) -> bool {
        self.winner.is_some() || self.is_double_ko
    }

    pub fn integrity_check(&self) -> Result<(), IntegrityError> {
        let seated = matches!(self.phase, GamePhase::Playing | GamePhase::GameOver);
        if (seated || !self.players.is_empty()) && self.players.len() != PLAYER_COUNT {
            return Err(IntegrityError::WrongPlayerCount {
                expected: PLAYER_COUNT,
                actual: self.players.len(),
            });
        }
        check_battlefield(&self.players)?;

        if self.turn.turn_number == 0 {
            return Err(IntegrityError::InvalidTurnNumber);
        }
        for (index, (input, locked)) in self.turn.inputs.iter().zip(self.turn.locked).enumerate() {
            if input.is_some() != locked {
                return Err(IntegrityError::LockMismatch { index });
            }
        }
        if self.phase == GamePhase::Playing && self.turn.phase != TurnPhase::Selection {
            return Err(IntegrityError::TurnPhaseStalled {
                phase: self.turn.phase,
            });
        }

        if self.is_double_ko && self.winner.is_some() {
            return Err(IntegrityError::DoubleKoWithWinner);
        }
        if let Some(winner) = self.winner {
            if seat(winner).is_none() || self.players.is_empty() {
                return Err(IntegrityError::UnknownWinner { player_id: winner });
            }
        }
        let knocked_out: Vec<bool> = self
            .players
            .iter()
            .map(|player| player.stats.base_hp == 0)
            .collect();
        let outcome_matches_hp = match knocked_out.as_slice() {
            [true, true] => self.is_double_ko,
            [true, false] => self.winner == Some(1),
            [false, true] => self.winner == Some(0),
            _ => !self.has_outcome(),
        };
        if !outcome_matches_hp {
            return Err(IntegrityError::OutcomeDisagreesWithHp);
        }
        if (self.phase == GamePhase::GameOver) != self.has_outcome() {
            return Err(IntegrityError::OutcomeMismatch);
        }

        Ok(())
    }
}

/// Per-seat checks shared by snapshot restore and standalone resolution: seat order,
/// stat ranges, wall and miner shape.
pub fn check_battlefield(players: &[PlayerState]) -> Result<(), IntegrityError> {
    for (index, player) in players.iter().enumerate() {
        if usize::from(player.id) != index {
            return Err(IntegrityError::SeatMismatch {
                index,
                player_id: player.id,
            });
        }
        let stats = &player.stats;
        if stats.base_hp > stats.max_hp {
            return Err(IntegrityError::BaseHpOutOfRange {
                player_id: player.id,
                value: stats.base_hp,
                max: stats.max_hp,
            });
        }
        if stats.energy > stats.max_energy {
            return Err(IntegrityError::EnergyOutOfRange {
                player_id: player.id,
                value: stats.energy,
                max: stats.max_energy,
            });
        }
        if let Some(wall) = &player.field.wall {
            if wall.current_hp > wall.max_hp {
                return Err(IntegrityError::WallOutOfRange {
                    player_id: player.id,
                    current: wall.current_hp,
                    max: wall.max_hp,
                });
            }
        }
        if let Some(miner) = &player.field.miner {
            if miner.payout_interval == 0 || !miner.miner_type.is_miner() {
                return Err(IntegrityError::InvalidMiner { player_id: player.id });
            }
        }
    }
    Ok(())
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(GameConfig::default())
    }
}
