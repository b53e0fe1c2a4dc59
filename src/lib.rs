pub mod game;

use std::cell::RefCell;
use std::fmt::Display;
use std::rc::Rc;

use serde::Serialize;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

pub use game::{
    catalog, find_card, Action, ActionError, Card, CardId, CardSubtype, CardType, ConfigError, Deck,
    DeckError, DeckSlot, DraftEngine, DraftError, DraftEvent, DraftProgress, DraftState, Element,
    EventBus, GameConfig, GameEvent, GamePhase, GameState, GameStateManager, IntegrityError,
    PlayerId, PlayerProfile, PlayerState, SnapshotError, StoreError, StoreEvent, SubmitOutcome,
    SubscriptionId, TurnAction, TurnInput, TurnOutcome, TurnPhase, TurnReport, TurnResolution,
    TurnResolver,
};

#[cfg(all(feature = "wee_alloc", target_arch = "wasm32"))]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn start() {
    set_panic_hook();
    init_logging();
}

fn to_js_error<E: Serialize + Display>(error: E) -> JsValue {
    to_value(&error).unwrap_or_else(|_| JsValue::from_str(&error.to_string()))
}

fn serde_to_js_error<E: Display>(error: E) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn config_from(json: Option<String>) -> Result<GameConfig, JsValue> {
    match json {
        Some(json) => GameConfig::from_json(&json).map_err(to_js_error),
        None => Ok(GameConfig::default()),
    }
}

/// JS timestamps arrive as `f64` milliseconds.
fn millis(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value as u64
    } else {
        0
    }
}

/// One match, owned by the page. Store events are buffered until `drain_events`.
#[wasm_bindgen]
pub struct MatchEngine {
    manager: GameStateManager,
    events: Rc<RefCell<Vec<StoreEvent>>>,
}

#[wasm_bindgen]
impl MatchEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<MatchEngine, JsValue> {
        let mut manager = GameStateManager::new(config_from(config_json)?);
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        manager.subscribe(move |event| sink.borrow_mut().push(event.clone()));
        Ok(MatchEngine { manager, events })
    }

    pub fn initialize(
        &mut self,
        player1_json: &str,
        player2_json: &str,
        is_hot_seat: bool,
    ) -> Result<(), JsValue> {
        let player1: PlayerProfile = serde_json::from_str(player1_json).map_err(serde_to_js_error)?;
        let player2: PlayerProfile = serde_json::from_str(player2_json).map_err(serde_to_js_error)?;
        self.manager
            .initialize(player1, player2, is_hot_seat)
            .map_err(to_js_error)
    }

    pub fn start_timer(&mut self, now_ms: f64) {
        self.manager.start_timer(millis(now_ms));
    }

    pub fn submit_action(&mut self, action_json: &str) -> Result<String, JsValue> {
        let action: TurnAction = serde_json::from_str(action_json).map_err(serde_to_js_error)?;
        let outcome = self.manager.submit_action(action).map_err(to_js_error)?;
        serde_json::to_string(&outcome).map_err(serde_to_js_error)
    }

    /// Returns the turn report JSON if the deadline had passed, otherwise `undefined`.
    pub fn expire_selection(&mut self, now_ms: f64) -> Result<Option<String>, JsValue> {
        match self
            .manager
            .expire_selection(millis(now_ms))
            .map_err(to_js_error)?
        {
            Some(report) => serde_json::to_string(&report)
                .map(Some)
                .map_err(serde_to_js_error),
            None => Ok(None),
        }
    }

    pub fn state_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(self.manager.state()).map_err(serde_to_js_error)
    }

    pub fn playable_cards(&self, player_id: u8) -> Result<JsValue, JsValue> {
        let player = self
            .manager
            .get_player(player_id)
            .ok_or_else(|| to_js_error(StoreError::UnknownPlayer { player_id }))?;
        let ids: Vec<CardId> = game::player::playable_cards(player, self.manager.resolver())
            .iter()
            .map(|card| card.id)
            .collect();
        to_value(&ids).map_err(JsValue::from)
    }

    pub fn is_game_over(&self) -> bool {
        self.manager.is_game_over()
    }

    pub fn winner(&self) -> Option<u8> {
        self.manager.get_winner()
    }

    pub fn is_double_ko(&self) -> bool {
        self.manager.is_double_ko()
    }

    pub fn snapshot(&self) -> Result<String, JsValue> {
        self.manager.create_snapshot().map_err(to_js_error)
    }

    pub fn restore(&mut self, snapshot_json: &str) -> bool {
        self.manager.restore_from_snapshot(snapshot_json)
    }

    pub fn rematch(&mut self) -> Result<(), JsValue> {
        self.manager.rematch().map_err(to_js_error)
    }

    #[wasm_bindgen(js_name = "drainEvents")]
    pub fn drain_events(&mut self) -> Result<String, JsValue> {
        let events = std::mem::take(&mut *self.events.borrow_mut());
        serde_json::to_string(&events).map_err(serde_to_js_error)
    }
}

/// One player's draft, driven by the page's round timer.
#[wasm_bindgen]
pub struct DraftSession {
    engine: DraftEngine,
    state: DraftState,
    events: Vec<DraftEvent>,
}

#[wasm_bindgen]
impl DraftSession {
    #[wasm_bindgen(constructor)]
    pub fn new(
        player_id: u8,
        config_json: Option<String>,
        seed: Option<u32>,
    ) -> Result<DraftSession, JsValue> {
        let config = config_from(config_json)?;
        let mut engine = match seed {
            Some(seed) => DraftEngine::with_seed(config, u64::from(seed)),
            None => DraftEngine::new(config),
        };
        let (state, events) = engine.begin(player_id);
        Ok(DraftSession {
            engine,
            state,
            events,
        })
    }

    pub fn state_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.state).map_err(serde_to_js_error)
    }

    pub fn progress(&self) -> Result<JsValue, JsValue> {
        to_value(&self.state.progress()).map_err(JsValue::from)
    }

    pub fn pick(&mut self, card_id: u32) -> Result<(), JsValue> {
        let events = self
            .engine
            .pick(&mut self.state, card_id)
            .map_err(to_js_error)?;
        self.events.extend(events);
        Ok(())
    }

    pub fn tick(&mut self, elapsed_ms: u32) -> Result<(), JsValue> {
        let events = self
            .engine
            .tick(&mut self.state, u64::from(elapsed_ms))
            .map_err(to_js_error)?;
        self.events.extend(events);
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        self.state.is_complete()
    }

    /// The drafted deck as JSON, ready to go into a player profile.
    pub fn finish(&self) -> Result<String, JsValue> {
        let deck = self.engine.finish(&self.state).map_err(to_js_error)?;
        serde_json::to_string(&deck).map_err(serde_to_js_error)
    }

    #[wasm_bindgen(js_name = "drainEvents")]
    pub fn drain_events(&mut self) -> Result<String, JsValue> {
        let events = std::mem::take(&mut self.events);
        serde_json::to_string(&events).map_err(serde_to_js_error)
    }
}

#[wasm_bindgen(js_name = "cardCatalog")]
pub fn card_catalog() -> Result<JsValue, JsValue> {
    to_value(&catalog()).map_err(JsValue::from)
}

/// Pure resolution for hosts that keep their own state: two players and two inputs in,
/// a `TurnResolution` out. Seat order, stat ranges and walls are checked first.
#[wasm_bindgen(js_name = "resolveTurn")]
pub fn resolve_turn(
    players: JsValue,
    turn_number: u32,
    inputs: JsValue,
    config_json: Option<String>,
) -> Result<JsValue, JsValue> {
    let players: [PlayerState; 2] = from_value(players).map_err(JsValue::from)?;
    let inputs: [TurnInput; 2] = from_value(inputs).map_err(JsValue::from)?;
    let resolver = TurnResolver::new(config_from(config_json)?);
    let resolution = resolver
        .try_resolve(&players, turn_number, inputs)
        .map_err(to_js_error)?;
    to_value(&resolution).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "validateState")]
pub fn validate_state(state: JsValue) -> Result<(), JsValue> {
    let state: GameState = from_value(state).map_err(JsValue::from)?;
    state.integrity_check().map_err(to_js_error)
}

#[cfg(feature = "console_error_panic_hook")]
fn set_panic_hook() {
    console_error_panic_hook::set_once();
}

#[cfg(not(feature = "console_error_panic_hook"))]
fn set_panic_hook() {}

#[cfg(feature = "browser_log")]
fn init_logging() {
    if console_log::init_with_level(log::Level::Debug).is_err() {
        web_sys::console::warn_1(&JsValue::from_str("logger was already installed"));
    }
}

#[cfg(not(feature = "browser_log"))]
fn init_logging() {
    web_sys::console::info_1(&JsValue::from_str(
        "elemental_duel loaded; build with the browser_log feature for engine logs",
    ));
}
