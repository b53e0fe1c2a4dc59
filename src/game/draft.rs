//! Six timed draft rounds producing a validated `Deck`.

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::cards::{Card, CardId, Deck, DeckError, DeckSlot, DECK_SIZE};
use super::config::GameConfig;
use super::state::PlayerId;

pub const DRAFT_ROUNDS: u8 = DECK_SIZE as u8;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[serde(tag = "type")]
pub enum DraftError {
    #[error("the draft is already complete")]
    AlreadyComplete,
    #[error("card {card_id} is not offered in round {round}")]
    NotAnOption { card_id: CardId, round: u8 },
    #[error("round {round} has no options to pick from")]
    NoOptions { round: u8 },
    #[error("only {picked} of 6 cards have been picked")]
    Incomplete { picked: usize },
    #[error("drafted cards do not form a legal deck: {error}")]
    InvalidDeck { error: DeckError },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DraftEvent {
    RoundStarted {
        player_id: PlayerId,
        round: u8,
        slot: DeckSlot,
        time_limit_ms: u64,
        options: Vec<CardId>,
    },
    CardPicked {
        player_id: PlayerId,
        round: u8,
        card_id: CardId,
        auto_selected: bool,
    },
    Completed {
        player_id: PlayerId,
        card_ids: Vec<CardId>,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DraftProgress {
    pub round: u8,
    pub total_rounds: u8,
    pub slot: DeckSlot,
    pub picks: usize,
}

/// One player's draft in flight.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DraftState {
    pub player_id: PlayerId,
    pub round: u8,
    pub time_remaining_ms: u64,
    pub options: Vec<Card>,
    pub selected: Vec<Card>,
    /// Whether the most recent pick was made by the timer.
    pub auto_selected: bool,
}

impl DraftState {
    pub fn is_complete(&self) -> bool {
        self.selected.len() >= DECK_SIZE
    }

    pub fn current_slot(&self) -> Option<DeckSlot> {
        if self.is_complete() {
            return None;
        }
        DeckSlot::from_round(self.round)
    }

    pub fn progress(&self) -> DraftProgress {
        DraftProgress {
            round: self.round,
            total_rounds: DRAFT_ROUNDS,
            slot: DeckSlot::from_round(self.round).unwrap_or(DeckSlot::Miner2),
            picks: self.selected.len(),
        }
    }
}

pub struct DraftEngine {
    config: GameConfig,
    rng: SmallRng,
}

impl DraftEngine {
    pub fn new(config: GameConfig) -> Self {
        Self {
            config,
            rng: SmallRng::from_entropy(),
        }
    }

    pub fn with_seed(config: GameConfig, seed: u64) -> Self {
        Self {
            config,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn time_limit_for_round(&self, round: u8) -> u64 {
        if round <= 4 {
            self.config.draft_timer_short_ms
        } else {
            self.config.draft_timer_long_ms
        }
    }

    pub fn begin(&mut self, player_id: PlayerId) -> (DraftState, Vec<DraftEvent>) {
        let mut state = DraftState {
            player_id,
            round: 1,
            time_remaining_ms: 0,
            options: Vec::new(),
            selected: Vec::with_capacity(DECK_SIZE),
            auto_selected: false,
        };
        let event = self.start_round(&mut state);
        (state, vec![event])
    }

    pub fn pick(&mut self, state: &mut DraftState, card_id: CardId) -> Result<Vec<DraftEvent>, DraftError> {
        if state.is_complete() {
            return Err(DraftError::AlreadyComplete);
        }
        let index = state
            .options
            .iter()
            .position(|card| card.id == card_id)
            .ok_or(DraftError::NotAnOption {
                card_id,
                round: state.round,
            })?;
        Ok(self.take(state, index, false))
    }

    /// Picks a random option on the player's behalf, as when the round timer expires.
    pub fn auto_pick(&mut self, state: &mut DraftState) -> Result<Vec<DraftEvent>, DraftError> {
        if state.is_complete() {
            return Err(DraftError::AlreadyComplete);
        }
        let indices: Vec<usize> = (0..state.options.len()).collect();
        let index = *indices
            .choose(&mut self.rng)
            .ok_or(DraftError::NoOptions { round: state.round })?;
        Ok(self.take(state, index, true))
    }

    /// Advances the round clock; auto-picks once it runs out.
    pub fn tick(&mut self, state: &mut DraftState, elapsed_ms: u64) -> Result<Vec<DraftEvent>, DraftError> {
        if state.is_complete() {
            return Ok(Vec::new());
        }
        state.time_remaining_ms = state.time_remaining_ms.saturating_sub(elapsed_ms);
        if state.time_remaining_ms > 0 {
            return Ok(Vec::new());
        }
        log::debug!(
            "draft round {} timed out for player {}",
            state.round,
            state.player_id
        );
        self.auto_pick(state)
    }

    pub fn finish(&self, state: &DraftState) -> Result<Deck, DraftError> {
        if !state.is_complete() {
            return Err(DraftError::Incomplete {
                picked: state.selected.len(),
            });
        }
        Deck::new(state.selected.clone()).map_err(|error| DraftError::InvalidDeck { error })
    }

    fn take(&mut self, state: &mut DraftState, index: usize, auto_selected: bool) -> Vec<DraftEvent> {
        let card = state.options.remove(index);
        let mut events = vec![DraftEvent::CardPicked {
            player_id: state.player_id,
            round: state.round,
            card_id: card.id,
            auto_selected,
        }];
        log::debug!(
            "player {} drafted {} in round {}{}",
            state.player_id,
            card.name,
            state.round,
            if auto_selected { " (auto)" } else { "" }
        );
        state.selected.push(card);
        state.auto_selected = auto_selected;

        if state.is_complete() {
            state.options.clear();
            state.time_remaining_ms = 0;
            events.push(DraftEvent::Completed {
                player_id: state.player_id,
                card_ids: state.selected.iter().map(|card| card.id).collect(),
            });
        } else {
            state.round += 1;
            events.push(self.start_round(state));
        }
        events
    }

    fn start_round(&mut self, state: &mut DraftState) -> DraftEvent {
        let slot = DeckSlot::from_round(state.round).unwrap_or(DeckSlot::Miner2);
        let first_helper = if slot == DeckSlot::Miner2 {
            state.selected.get(4).map(|card| card.subtype)
        } else {
            None
        };
        let mut options: Vec<Card> = slot
            .pool()
            .into_iter()
            .filter(|card| Some(card.subtype) != first_helper)
            .cloned()
            .collect();
        options.shuffle(&mut self.rng);

        state.options = options;
        state.time_remaining_ms = self.time_limit_for_round(state.round);
        DraftEvent::RoundStarted {
            player_id: state.player_id,
            round: state.round,
            slot,
            time_limit_ms: state.time_remaining_ms,
            options: state.options.iter().map(|card| card.id).collect(),
        }
    }
}
