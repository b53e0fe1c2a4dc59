//! Simultaneous turn resolution: the attack/defense interaction matrix, wall decay,
//! miner payouts and miner fragility.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::cards::{Card, CardId, CardSubtype};
use super::config::GameConfig;
use super::events::{AttackKind, AttackOrigin, BlockReason, GameEvent, WallDestroyCause};
use super::state::{
    check_battlefield, opponent_of, Action, IntegrityError, MinerState, PlayerId, PlayerState,
    TurnInput, WallState, PLAYER_COUNT,
};

const DOUBLE_KO_MESSAGES: [&str; 5] = [
    "Nobody wins a war. Both bases lie in ruins.",
    "Fire met water, stone met storm, and nothing was left standing.",
    "Two fortresses fell on the same day. Was it worth it?",
    "The elements are spent, and so is everyone who wielded them.",
    "Peace was the only move neither of you played.",
];

/// Why a submitted action was turned into a pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[serde(tag = "type")]
pub enum ActionError {
    #[error("card {card_id} is not in the player's hand")]
    CardNotInHand { card_id: CardId },
    #[error("card costs {required} energy but only {available} is available")]
    InsufficientEnergy { required: u8, available: u8 },
    #[error("a {miner_type:?} is already installed")]
    MinerSlotOccupied { miner_type: CardSubtype },
    #[error("action for player {actual} submitted in seat {expected}")]
    PlayerMismatch { expected: PlayerId, actual: PlayerId },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum TurnOutcome {
    Continue,
    Victory { winner: PlayerId, loser: PlayerId },
    DoubleKo { message: String },
}

impl TurnOutcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TurnOutcome::Continue)
    }
}

/// The next battlefield plus everything that happened on the way there.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnResolution {
    pub players: [PlayerState; PLAYER_COUNT],
    /// Actions after validation; rejected and timed-out inputs appear as `Pass`.
    pub actions: [Action; PLAYER_COUNT],
    pub events: Vec<GameEvent>,
    pub outcome: TurnOutcome,
    pub next_turn_number: u32,
}

#[derive(Debug, Clone, Copy)]
struct Strike {
    source: PlayerId,
    attack: AttackKind,
    origin: AttackOrigin,
    power: u8,
}

#[derive(Debug, Clone, Default)]
pub struct TurnResolver {
    config: GameConfig,
}

impl TurnResolver {
    pub fn new(config: GameConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Checks a play against the player's hand, energy and miner slot.
    pub fn validate_play<'p>(
        &self,
        player: &'p PlayerState,
        card_id: CardId,
    ) -> Result<&'p Card, ActionError> {
        let card = player
            .find_in_hand(card_id)
            .ok_or(ActionError::CardNotInHand { card_id })?;
        if !player.stats.can_afford(card.cost) {
            return Err(ActionError::InsufficientEnergy {
                required: card.cost,
                available: player.stats.energy,
            });
        }
        if card.is_miner() {
            if let Some(miner) = &player.field.miner {
                return Err(ActionError::MinerSlotOccupied {
                    miner_type: miner.miner_type,
                });
            }
        }
        Ok(card)
    }

    /// `resolve` for battlefields that did not come from this crate's own store.
    pub fn try_resolve(
        &self,
        battlefield: &[PlayerState; PLAYER_COUNT],
        turn_number: u32,
        inputs: [TurnInput; PLAYER_COUNT],
    ) -> Result<TurnResolution, IntegrityError> {
        if turn_number == 0 {
            return Err(IntegrityError::InvalidTurnNumber);
        }
        check_battlefield(battlefield)?;
        Ok(self.resolve(battlefield, turn_number, inputs))
    }

    /// Resolves one turn. Never fails: invalid inputs degrade to a pass for that seat only.
    pub fn resolve(
        &self,
        battlefield: &[PlayerState; PLAYER_COUNT],
        turn_number: u32,
        inputs: [TurnInput; PLAYER_COUNT],
    ) -> TurnResolution {
        let mut players = battlefield.clone();
        let mut events = Vec::new();
        let mut actions = [Action::Pass; PLAYER_COUNT];
        let mut plays: [Option<Card>; PLAYER_COUNT] = [None, None];

        for (index, input) in inputs.iter().enumerate() {
            let seat_id = index as PlayerId;
            if let Some(card) = self.normalize(&battlefield[index], seat_id, input, &mut events) {
                let stats = &mut players[index].stats;
                stats.energy -= card.cost;
                events.push(GameEvent::CardPlayed {
                    player_id: seat_id,
                    card_id: card.id,
                    subtype: card.subtype,
                });
                events.push(GameEvent::EnergySpent {
                    player_id: seat_id,
                    amount: card.cost,
                    remaining: stats.energy,
                });
                keep_last(&mut players[index].discard, card.clone(), self.config.history_limit);
                actions[index] = Action::Play { card_id: card.id };
                plays[index] = Some(card);
            }
        }

        for player in players.iter_mut() {
            self.decay_wall(player, turn_number, &mut events);
        }

        let mut strikes = Vec::new();
        for player in players.iter_mut() {
            self.tick_miner(player, turn_number, &mut strikes, &mut events);
        }

        for (index, play) in plays.iter().enumerate() {
            let Some(card) = play else {
                continue;
            };
            let player = &mut players[index];
            match card.subtype {
                CardSubtype::Shield => {
                    let replaced = player.field.wall.is_some();
                    player.field.wall = Some(WallState::new(card.power, turn_number));
                    events.push(GameEvent::WallPlaced {
                        player_id: player.id,
                        hp: card.power,
                        replaced,
                    });
                }
                CardSubtype::Dodge => {
                    player.field.active_deflection = true;
                    events.push(GameEvent::DeflectionActivated {
                        player_id: player.id,
                        origin: AttackOrigin::Card,
                    });
                }
                CardSubtype::Blast | CardSubtype::Shot => {
                    let attack = if card.subtype == CardSubtype::Blast {
                        AttackKind::Blast
                    } else {
                        AttackKind::Shot
                    };
                    strikes.push(Strike {
                        source: player.id,
                        attack,
                        origin: AttackOrigin::Card,
                        power: card.power,
                    });
                }
                CardSubtype::DeflectionMiner
                | CardSubtype::ProjectileMiner
                | CardSubtype::ContinuousMiner
                | CardSubtype::RepairMiner => {
                    let miner = MinerState::from_card(card, turn_number);
                    events.push(GameEvent::MinerInstalled {
                        player_id: player.id,
                        miner_type: miner.miner_type,
                        payout_interval: miner.payout_interval,
                    });
                    player.field.miner = Some(miner);
                }
            }
        }

        let mut base_damaged = [false; PLAYER_COUNT];
        for strike in &strikes {
            let target = usize::from(opponent_of(strike.source));
            if self.apply_strike(&mut players[target], strike, &mut events) {
                base_damaged[target] = true;
            }
        }

        for (player, damaged) in players.iter_mut().zip(base_damaged) {
            if !damaged {
                continue;
            }
            if let Some(miner) = player.field.miner.take() {
                events.push(GameEvent::MinerKilled {
                    player_id: player.id,
                    miner_type: miner.miner_type,
                });
            }
        }

        let income = self.config.income_after_turn(turn_number);
        for player in players.iter_mut() {
            player.field.clear_turn_flags();
            player.clear_selection();
            let gained = player.stats.add_energy(income);
            if gained > 0 {
                events.push(GameEvent::EnergyGained {
                    player_id: player.id,
                    amount: gained,
                    total: player.stats.energy,
                });
            }
        }

        let outcome = Self::outcome(&players, turn_number);
        match &outcome {
            TurnOutcome::Continue => {}
            TurnOutcome::Victory { winner, loser } => events.push(GameEvent::Victory {
                winner: *winner,
                loser: *loser,
            }),
            TurnOutcome::DoubleKo { message } => events.push(GameEvent::DoubleKo {
                message: message.clone(),
            }),
        }

        log::debug!(
            "turn {turn_number} resolved: {:?} vs {:?}, {} events, outcome {:?}",
            actions[0],
            actions[1],
            events.len(),
            outcome
        );

        TurnResolution {
            players,
            actions,
            events,
            outcome,
            next_turn_number: turn_number + 1,
        }
    }

    fn normalize(
        &self,
        player: &PlayerState,
        seat_id: PlayerId,
        input: &TurnInput,
        events: &mut Vec<GameEvent>,
    ) -> Option<Card> {
        let action = match input {
            TurnInput::Timeout => {
                events.push(GameEvent::TimedOut { player_id: seat_id });
                return None;
            }
            TurnInput::Submitted { action } => action,
        };
        if action.player_id != seat_id {
            self.reject(
                seat_id,
                ActionError::PlayerMismatch {
                    expected: seat_id,
                    actual: action.player_id,
                },
                events,
            );
            return None;
        }
        let card_id = match action.action {
            Action::Pass => {
                events.push(GameEvent::Passed { player_id: seat_id });
                return None;
            }
            Action::Play { card_id } => card_id,
        };
        match self.validate_play(player, card_id) {
            Ok(card) => Some(card.clone()),
            Err(error) => {
                self.reject(seat_id, error, events);
                None
            }
        }
    }

    fn reject(&self, player_id: PlayerId, error: ActionError, events: &mut Vec<GameEvent>) {
        log::warn!("player {player_id} action rejected, treating as pass: {error}");
        events.push(GameEvent::ActionRejected { player_id, error });
    }

    fn decay_wall(&self, player: &mut PlayerState, turn_number: u32, events: &mut Vec<GameEvent>) {
        let Some(wall) = player.field.wall.as_mut() else {
            return;
        };
        if wall.turn_placed >= turn_number {
            return;
        }
        let amount = self.config.wall_decay_per_turn.min(wall.current_hp);
        wall.current_hp -= amount;
        let remaining = wall.current_hp;
        events.push(GameEvent::WallDecayed {
            player_id: player.id,
            amount,
            remaining,
        });
        if remaining == 0 {
            player.field.wall = None;
            events.push(GameEvent::WallDestroyed {
                player_id: player.id,
                cause: WallDestroyCause::Decay,
            });
        }
    }

    fn tick_miner(
        &self,
        player: &mut PlayerState,
        turn_number: u32,
        strikes: &mut Vec<Strike>,
        events: &mut Vec<GameEvent>,
    ) {
        let Some(miner) = player.field.miner.as_mut() else {
            return;
        };
        if miner.turn_placed >= turn_number {
            return;
        }
        miner.turns_until_payout = miner.turns_until_payout.saturating_sub(1);
        if miner.turns_until_payout > 0 {
            return;
        }
        miner.turns_until_payout = miner.payout_interval;
        let (miner_type, power) = (miner.miner_type, miner.power);
        events.push(GameEvent::MinerPayout {
            player_id: player.id,
            miner_type,
        });

        match miner_type {
            CardSubtype::ProjectileMiner | CardSubtype::ContinuousMiner => {
                let attack = if miner_type == CardSubtype::ProjectileMiner {
                    AttackKind::Shot
                } else {
                    AttackKind::Blast
                };
                strikes.push(Strike {
                    source: player.id,
                    attack,
                    origin: AttackOrigin::Miner,
                    power,
                });
            }
            CardSubtype::DeflectionMiner => {
                player.field.active_deflection_miner = true;
                events.push(GameEvent::DeflectionActivated {
                    player_id: player.id,
                    origin: AttackOrigin::Miner,
                });
            }
            CardSubtype::RepairMiner => {
                if let Some(wall) = player.field.wall.as_mut() {
                    let amount = wall.max_hp.saturating_sub(wall.current_hp);
                    wall.current_hp = wall.max_hp;
                    if amount > 0 {
                        events.push(GameEvent::WallRepaired {
                            player_id: player.id,
                            amount,
                            hp: wall.current_hp,
                        });
                    }
                }
            }
            CardSubtype::Blast | CardSubtype::Shot | CardSubtype::Shield | CardSubtype::Dodge => {}
        }
    }

    /// Applies one attack to `target`. Returns whether the target's base lost HP.
    fn apply_strike(
        &self,
        target: &mut PlayerState,
        strike: &Strike,
        events: &mut Vec<GameEvent>,
    ) -> bool {
        let blocked = |blocked_by, amount| GameEvent::DamageBlocked {
            source_player: strike.source,
            target_player: target.id,
            attack: strike.attack,
            origin: strike.origin,
            blocked_by,
            amount,
        };

        let damage = match strike.attack {
            AttackKind::Shot => {
                if target.field.is_deflecting() {
                    events.push(blocked(BlockReason::Deflection, strike.power));
                    return false;
                }
                strike.power
            }
            AttackKind::Blast => {
                let mut damage = strike.power;
                if let Some(wall) = target.field.wall.as_mut() {
                    let absorbed = damage.min(wall.current_hp);
                    wall.current_hp -= absorbed;
                    damage -= absorbed;
                    let remaining = wall.current_hp;
                    events.push(GameEvent::WallDamaged {
                        player_id: target.id,
                        amount: absorbed,
                        remaining,
                    });
                    if remaining == 0 {
                        target.field.wall = None;
                        events.push(GameEvent::WallDestroyed {
                            player_id: target.id,
                            cause: WallDestroyCause::Attack,
                        });
                    }
                    if damage == 0 {
                        events.push(blocked(BlockReason::Wall, absorbed));
                    }
                } else if target.field.is_deflecting() {
                    let mitigated = damage.min(self.config.deflection_vs_continuous);
                    damage -= mitigated;
                    if mitigated > 0 {
                        events.push(blocked(BlockReason::Deflection, mitigated));
                    }
                }
                damage
            }
        };

        if damage == 0 {
            return false;
        }
        let dealt = damage.min(target.stats.base_hp);
        target.stats.base_hp -= dealt;
        events.push(GameEvent::DamageDealt {
            source_player: strike.source,
            target_player: target.id,
            attack: strike.attack,
            origin: strike.origin,
            amount: dealt,
            base_hp: target.stats.base_hp,
        });
        dealt > 0
    }

    fn outcome(players: &[PlayerState; PLAYER_COUNT], turn_number: u32) -> TurnOutcome {
        let down = [players[0].stats.base_hp == 0, players[1].stats.base_hp == 0];
        match down {
            [true, true] => TurnOutcome::DoubleKo {
                message: double_ko_message(turn_number).to_string(),
            },
            [true, false] => TurnOutcome::Victory { winner: 1, loser: 0 },
            [false, true] => TurnOutcome::Victory { winner: 0, loser: 1 },
            [false, false] => TurnOutcome::Continue,
        }
    }
}

/// Appends `item`, dropping the oldest entries beyond `limit`.
pub(crate) fn keep_last<T>(log: &mut Vec<T>, item: T, limit: usize) {
    log.push(item);
    if log.len() > limit {
        let excess = log.len() - limit;
        log.drain(..excess);
    }
}

/// Deterministic pick from the double-KO pool so both peers show the same line.
pub fn double_ko_message(turn_number: u32) -> &'static str {
    DOUBLE_KO_MESSAGES[turn_number as usize % DOUBLE_KO_MESSAGES.len()]
}
