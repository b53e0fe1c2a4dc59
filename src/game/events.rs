//! Typed combat and phase events, and the synchronous subscriber registry.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::cards::{CardId, CardSubtype};
use super::resolver::ActionError;
use super::state::{GamePhase, PlayerId, TurnPhase};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AttackKind {
    Shot,
    Blast,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AttackOrigin {
    Card,
    Miner,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    Deflection,
    Wall,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WallDestroyCause {
    Attack,
    Decay,
}

/// Everything the resolver reports for one turn, in the order it happened.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameEvent {
    CardPlayed {
        player_id: PlayerId,
        card_id: CardId,
        subtype: CardSubtype,
    },
    Passed {
        player_id: PlayerId,
    },
    TimedOut {
        player_id: PlayerId,
    },
    ActionRejected {
        player_id: PlayerId,
        error: ActionError,
    },
    EnergySpent {
        player_id: PlayerId,
        amount: u8,
        remaining: u8,
    },
    EnergyGained {
        player_id: PlayerId,
        amount: u8,
        total: u8,
    },
    WallPlaced {
        player_id: PlayerId,
        hp: u8,
        replaced: bool,
    },
    WallDamaged {
        player_id: PlayerId,
        amount: u8,
        remaining: u8,
    },
    WallDecayed {
        player_id: PlayerId,
        amount: u8,
        remaining: u8,
    },
    WallDestroyed {
        player_id: PlayerId,
        cause: WallDestroyCause,
    },
    WallRepaired {
        player_id: PlayerId,
        amount: u8,
        hp: u8,
    },
    DeflectionActivated {
        player_id: PlayerId,
        origin: AttackOrigin,
    },
    DamageDealt {
        source_player: PlayerId,
        target_player: PlayerId,
        attack: AttackKind,
        origin: AttackOrigin,
        amount: u8,
        base_hp: u8,
    },
    DamageBlocked {
        source_player: PlayerId,
        target_player: PlayerId,
        attack: AttackKind,
        origin: AttackOrigin,
        blocked_by: BlockReason,
        amount: u8,
    },
    MinerInstalled {
        player_id: PlayerId,
        miner_type: CardSubtype,
        payout_interval: u8,
    },
    MinerPayout {
        player_id: PlayerId,
        miner_type: CardSubtype,
    },
    MinerKilled {
        player_id: PlayerId,
        miner_type: CardSubtype,
    },
    Victory {
        winner: PlayerId,
        loser: PlayerId,
    },
    DoubleKo {
        message: String,
    },
}

/// What subscribers of a `GameStateManager` observe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StoreEvent {
    PhaseChanged {
        from: GamePhase,
        to: GamePhase,
    },
    TurnPhaseChanged {
        turn_number: u32,
        from: TurnPhase,
        to: TurnPhase,
    },
    ActionLocked {
        player_id: PlayerId,
        turn_number: u32,
    },
    Combat {
        turn_number: u32,
        event: GameEvent,
    },
    SnapshotRestored {
        turn_number: u32,
    },
}

pub type SubscriptionId = u64;

type Listener = Box<dyn FnMut(&StoreEvent)>;

/// Listeners run synchronously, in subscription order, with no queuing.
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<(SubscriptionId, Listener)>,
    next_id: SubscriptionId,
}

impl EventBus {
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&StoreEvent) + 'static,
    {
        self.next_id += 1;
        self.listeners.push((self.next_id, Box::new(listener)));
        self.next_id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    pub fn publish(&mut self, event: &StoreEvent) {
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn listeners_receive_events_until_unsubscribed() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::default();
        let sink = Rc::clone(&seen);
        let id = bus.subscribe(move |event| sink.borrow_mut().push(event.clone()));

        let event = StoreEvent::PhaseChanged {
            from: GamePhase::Draft,
            to: GamePhase::Playing,
        };
        bus.publish(&event);
        assert!(bus.unsubscribe(id));
        bus.publish(&event);

        assert_eq!(seen.borrow().len(), 1, "second publish should not reach the listener");
        assert!(!bus.unsubscribe(id), "unsubscribing twice should report false");
    }

    #[test]
    fn combat_events_use_screaming_tags() {
        let event = GameEvent::MinerKilled {
            player_id: 1,
            miner_type: CardSubtype::RepairMiner,
        };
        let json = serde_json::to_string(&event).expect("event should serialize");
        assert!(json.contains(r#""type":"MINER_KILLED""#), "unexpected json {json}");
        assert!(json.contains(r#""miner_type":"repair_miner""#));
    }
}
