//! Duel core: card catalog, draft, turn resolution and the match state store.

pub mod cards;
pub mod config;
pub mod draft;
pub mod events;
pub mod player;
pub mod resolver;
pub mod state;
pub mod store;

pub use cards::{
    catalog,
    find_card,
    Card,
    CardId,
    CardSubtype,
    CardType,
    Deck,
    DeckError,
    DeckSlot,
    Element,
};
pub use config::{ConfigError, GameConfig};
pub use draft::{DraftEngine, DraftError, DraftEvent, DraftProgress, DraftState};
pub use events::{EventBus, GameEvent, StoreEvent, SubscriptionId};
pub use resolver::{ActionError, TurnOutcome, TurnResolution, TurnResolver};
pub use state::{
    Action,
    GamePhase,
    GameState,
    IntegrityError,
    PlayerId,
    PlayerProfile,
    PlayerState,
    TurnAction,
    TurnInput,
    TurnPhase,
};
pub use store::{GameStateManager, SnapshotError, StoreError, SubmitOutcome, TurnReport};
