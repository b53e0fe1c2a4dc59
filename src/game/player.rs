//! Stateless helpers over a single `PlayerState`, shared by the resolver, the store
//! and whatever drives the UI or an AI seat.

use super::cards::{Card, Deck};
use super::config::GameConfig;
use super::resolver::TurnResolver;
use super::state::{PlayerProfile, PlayerState};

/// Full deep copy, for speculative resolution or snapshotting a single seat.
pub fn clone_player(player: &PlayerState) -> PlayerState {
    player.clone()
}

fn percent(value: u8, max: u8) -> f64 {
    if max == 0 {
        return 0.0;
    }
    f64::from(value) / f64::from(max) * 100.0
}

pub fn hp_percent(player: &PlayerState) -> f64 {
    percent(player.stats.base_hp, player.stats.max_hp)
}

pub fn energy_percent(player: &PlayerState) -> f64 {
    percent(player.stats.energy, player.stats.max_energy)
}

/// 0 when no wall stands.
pub fn wall_percent(player: &PlayerState) -> f64 {
    player
        .field
        .wall
        .as_ref()
        .map(|wall| percent(wall.current_hp, wall.max_hp))
        .unwrap_or(0.0)
}

pub fn is_alive(player: &PlayerState) -> bool {
    player.stats.base_hp > 0
}

pub fn can_afford(player: &PlayerState, card: &Card) -> bool {
    player.stats.can_afford(card.cost)
}

/// Cards the resolver would accept from this player right now.
pub fn playable_cards<'p>(player: &'p PlayerState, resolver: &TurnResolver) -> Vec<&'p Card> {
    player
        .hand
        .iter()
        .filter(|card| resolver.validate_play(player, card.id).is_ok())
        .collect()
}

pub fn summary(player: &PlayerState) -> String {
    let wall = match &player.field.wall {
        Some(wall) => format!("{}/{}", wall.current_hp, wall.max_hp),
        None => "none".to_string(),
    };
    let miner = match &player.field.miner {
        Some(miner) => format!(
            "{} (payout in {})",
            miner.miner_type.label(),
            miner.turns_until_payout
        ),
        None => "none".to_string(),
    };
    format!(
        "{} [P{}] HP {}/{} | Energy {}/{} | Wall {} | Bot {}{}",
        player.name,
        player.id + 1,
        player.stats.base_hp,
        player.stats.max_hp,
        player.stats.energy,
        player.stats.max_energy,
        wall,
        miner,
        if player.has_locked_in { " | locked in" } else { "" }
    )
}

/// Restores a match-start player from `deck`, keeping identity and seat.
pub fn reset(player: &PlayerState, deck: Deck, config: &GameConfig) -> PlayerState {
    let profile = PlayerProfile {
        name: player.name.clone(),
        is_local: player.is_local,
        is_ai: player.is_ai,
        deck,
    };
    PlayerState::new(player.id, profile, config)
}
