//! Immutable card definitions and the validated six-card `Deck`.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::config::{CONTINUOUS_DAMAGE, DEFLECTION_VS_CONTINUOUS, PROJECTILE_DAMAGE, WALL_HP};

/// Catalog-wide card identifier.
pub type CardId = u32;

pub const DECK_SIZE: usize = 6;

/// Cosmetic skin; never consulted by the resolver.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Element {
    Fire,
    Water,
    Earth,
    Air,
}

impl Element {
    pub const ALL: [Element; 4] = [Element::Fire, Element::Water, Element::Earth, Element::Air];

    pub fn label(self) -> &'static str {
        match self {
            Element::Fire => "Fire",
            Element::Water => "Water",
            Element::Earth => "Earth",
            Element::Air => "Air",
        }
    }

    fn index(self) -> u32 {
        match self {
            Element::Fire => 1,
            Element::Water => 2,
            Element::Earth => 3,
            Element::Air => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CardType {
    Attack,
    Defense,
    Miner,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CardSubtype {
    /// Continuous attack, absorbed by walls.
    Blast,
    /// Projectile attack, ignores walls.
    Shot,
    /// Wall.
    Shield,
    /// One-turn deflection.
    Dodge,
    DeflectionMiner,
    ProjectileMiner,
    ContinuousMiner,
    RepairMiner,
}

impl CardSubtype {
    pub const MINERS: [CardSubtype; 4] = [
        CardSubtype::DeflectionMiner,
        CardSubtype::ProjectileMiner,
        CardSubtype::ContinuousMiner,
        CardSubtype::RepairMiner,
    ];

    pub fn card_type(self) -> CardType {
        match self {
            CardSubtype::Blast | CardSubtype::Shot => CardType::Attack,
            CardSubtype::Shield | CardSubtype::Dodge => CardType::Defense,
            CardSubtype::DeflectionMiner
            | CardSubtype::ProjectileMiner
            | CardSubtype::ContinuousMiner
            | CardSubtype::RepairMiner => CardType::Miner,
        }
    }

    pub fn is_miner(self) -> bool {
        self.card_type() == CardType::Miner
    }

    pub fn label(self) -> &'static str {
        match self {
            CardSubtype::Blast => "Blast",
            CardSubtype::Shot => "Shot",
            CardSubtype::Shield => "Shield",
            CardSubtype::Dodge => "Dodge",
            CardSubtype::DeflectionMiner => "Dodge Bot",
            CardSubtype::ProjectileMiner => "Shot Bot",
            CardSubtype::ContinuousMiner => "Blast Bot",
            CardSubtype::RepairMiner => "Repair Bot",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Card {
    pub id: CardId,
    pub name: String,
    pub element: Element,
    pub card_type: CardType,
    pub subtype: CardSubtype,
    pub cost: u8,
    pub power: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payout_interval: Option<u8>,
}

impl Card {
    fn elemental(slot: DeckSlot, element: Element, subtype: CardSubtype, cost: u8, power: u8) -> Self {
        Self {
            id: slot.id_base() + element.index(),
            name: format!("{} {}", element.label(), subtype.label()),
            element,
            card_type: subtype.card_type(),
            subtype,
            cost,
            power,
            payout_interval: None,
        }
    }

    fn helper(
        id: CardId,
        element: Element,
        subtype: CardSubtype,
        cost: u8,
        power: u8,
        payout_interval: u8,
    ) -> Self {
        Self {
            id,
            name: subtype.label().to_string(),
            element,
            card_type: CardType::Miner,
            subtype,
            cost,
            power,
            payout_interval: Some(payout_interval),
        }
    }

    pub fn is_miner(&self) -> bool {
        self.subtype.is_miner()
    }
}

/// The six draft categories, in draft order. Index `i` is deck position `i`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DeckSlot {
    Wall,
    Deflection,
    Continuous,
    Projectile,
    Miner,
    Miner2,
}

impl DeckSlot {
    pub const ORDER: [DeckSlot; DECK_SIZE] = [
        DeckSlot::Wall,
        DeckSlot::Deflection,
        DeckSlot::Continuous,
        DeckSlot::Projectile,
        DeckSlot::Miner,
        DeckSlot::Miner2,
    ];

    /// 1-based draft round for this slot.
    pub fn round(self) -> u8 {
        match self {
            DeckSlot::Wall => 1,
            DeckSlot::Deflection => 2,
            DeckSlot::Continuous => 3,
            DeckSlot::Projectile => 4,
            DeckSlot::Miner => 5,
            DeckSlot::Miner2 => 6,
        }
    }

    pub fn from_round(round: u8) -> Option<DeckSlot> {
        DeckSlot::ORDER.get(usize::from(round).checked_sub(1)?).copied()
    }

    pub fn accepts(self, card: &Card) -> bool {
        match self {
            DeckSlot::Wall => card.subtype == CardSubtype::Shield,
            DeckSlot::Deflection => card.subtype == CardSubtype::Dodge,
            DeckSlot::Continuous => card.subtype == CardSubtype::Blast,
            DeckSlot::Projectile => card.subtype == CardSubtype::Shot,
            DeckSlot::Miner | DeckSlot::Miner2 => card.is_miner(),
        }
    }

    pub fn is_helper(self) -> bool {
        matches!(self, DeckSlot::Miner | DeckSlot::Miner2)
    }

    fn id_base(self) -> CardId {
        match self {
            DeckSlot::Wall => 10,
            DeckSlot::Deflection => 20,
            DeckSlot::Continuous => 30,
            DeckSlot::Projectile => 40,
            DeckSlot::Miner | DeckSlot::Miner2 => 50,
        }
    }

    /// Every catalog card this slot can hold.
    pub fn pool(self) -> Vec<&'static Card> {
        catalog().iter().filter(|card| self.accepts(card)).collect()
    }
}

static CATALOG: Lazy<Vec<Card>> = Lazy::new(|| {
    let mut cards = Vec::with_capacity(20);
    for element in Element::ALL {
        cards.push(Card::elemental(DeckSlot::Wall, element, CardSubtype::Shield, 2, WALL_HP));
    }
    for element in Element::ALL {
        cards.push(Card::elemental(
            DeckSlot::Deflection,
            element,
            CardSubtype::Dodge,
            2,
            DEFLECTION_VS_CONTINUOUS,
        ));
    }
    for element in Element::ALL {
        cards.push(Card::elemental(
            DeckSlot::Continuous,
            element,
            CardSubtype::Blast,
            5,
            CONTINUOUS_DAMAGE,
        ));
    }
    for element in Element::ALL {
        cards.push(Card::elemental(
            DeckSlot::Projectile,
            element,
            CardSubtype::Shot,
            3,
            PROJECTILE_DAMAGE,
        ));
    }
    cards.push(Card::helper(51, Element::Air, CardSubtype::DeflectionMiner, 3, 0, 3));
    cards.push(Card::helper(52, Element::Fire, CardSubtype::ProjectileMiner, 3, PROJECTILE_DAMAGE, 2));
    cards.push(Card::helper(53, Element::Earth, CardSubtype::ContinuousMiner, 4, 6, 3));
    cards.push(Card::helper(54, Element::Water, CardSubtype::RepairMiner, 3, WALL_HP, 3));
    cards
});

pub fn catalog() -> &'static [Card] {
    &CATALOG
}

pub fn find_card(id: CardId) -> Option<&'static Card> {
    CATALOG.iter().find(|card| card.id == id)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[serde(tag = "type")]
pub enum DeckError {
    #[error("a deck holds exactly {expected} cards, got {actual}")]
    WrongSize { expected: usize, actual: usize },
    #[error("card {card_id} does not belong in deck slot {slot:?}")]
    SlotMismatch { slot: DeckSlot, card_id: CardId },
    #[error("both helper picks are {subtype:?}; they must differ")]
    DuplicateHelper { subtype: CardSubtype },
}

/// Six cards in draft order with two distinct helpers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "Vec<Card>", into = "Vec<Card>")]
pub struct Deck(Vec<Card>);

impl Deck {
    pub fn new(cards: Vec<Card>) -> Result<Self, DeckError> {
        if cards.len() != DECK_SIZE {
            return Err(DeckError::WrongSize {
                expected: DECK_SIZE,
                actual: cards.len(),
            });
        }
        for (slot, card) in DeckSlot::ORDER.iter().zip(&cards) {
            if !slot.accepts(card) {
                return Err(DeckError::SlotMismatch {
                    slot: *slot,
                    card_id: card.id,
                });
            }
        }
        if cards[4].subtype == cards[5].subtype {
            return Err(DeckError::DuplicateHelper {
                subtype: cards[4].subtype,
            });
        }
        Ok(Self(cards))
    }

    /// Builds a deck from catalog ids, in draft order.
    pub fn from_ids(ids: &[CardId]) -> Result<Self, DeckError> {
        let mut cards = Vec::with_capacity(ids.len());
        for (index, id) in ids.iter().enumerate() {
            let card = find_card(*id).ok_or(DeckError::SlotMismatch {
                slot: DeckSlot::ORDER[index.min(DECK_SIZE - 1)],
                card_id: *id,
            })?;
            cards.push(card.clone());
        }
        Self::new(cards)
    }

    pub fn cards(&self) -> &[Card] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn helpers(&self) -> (&Card, &Card) {
        (&self.0[4], &self.0[5])
    }
}

impl TryFrom<Vec<Card>> for Deck {
    type Error = DeckError;

    fn try_from(cards: Vec<Card>) -> Result<Self, Self::Error> {
        Deck::new(cards)
    }
}

impl From<Deck> for Vec<Card> {
    fn from(deck: Deck) -> Self {
        deck.0
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Fire Shield, Fire Dodge, Fire Blast, Fire Shot, Shot Bot, Repair Bot.
    pub(crate) const STANDARD_DECK: [CardId; DECK_SIZE] = [11, 21, 31, 41, 52, 54];

    pub(crate) fn standard_deck() -> Deck {
        Deck::from_ids(&STANDARD_DECK).expect("standard deck should be valid")
    }

    #[test]
    fn catalog_has_sixteen_skins_and_four_helpers() {
        assert_eq!(catalog().len(), 20);
        for slot in &DeckSlot::ORDER[..4] {
            assert_eq!(slot.pool().len(), 4, "{slot:?} should offer four skins");
        }
        let helpers: Vec<CardSubtype> = DeckSlot::Miner.pool().iter().map(|c| c.subtype).collect();
        assert_eq!(helpers.len(), 4);
        for subtype in CardSubtype::MINERS {
            assert!(helpers.contains(&subtype), "missing helper {subtype:?}");
        }
    }

    #[test]
    fn fire_blast_matches_reference_numbers() {
        let blast = find_card(31).expect("fire blast should exist");
        assert_eq!(blast.name, "Fire Blast");
        assert_eq!((blast.cost, blast.power), (5, 8));
        let wall = find_card(11).expect("fire shield should exist");
        assert_eq!((wall.cost, wall.power), (2, 12));
    }

    #[test]
    fn deck_rejects_duplicate_helpers() {
        let error = Deck::from_ids(&[11, 21, 31, 41, 52, 52]).expect_err("duplicate helper");
        assert_eq!(
            error,
            DeckError::DuplicateHelper {
                subtype: CardSubtype::ProjectileMiner
            }
        );
    }

    #[test]
    fn deck_rejects_out_of_order_cards() {
        let error = Deck::from_ids(&[21, 11, 31, 41, 52, 54]).expect_err("slots swapped");
        assert!(matches!(error, DeckError::SlotMismatch { slot: DeckSlot::Wall, .. }));
    }

    #[test]
    fn deck_deserialization_is_validated() {
        let deck = standard_deck();
        let json = serde_json::to_string(&deck).expect("deck should serialize");
        let parsed: Deck = serde_json::from_str(&json).expect("valid deck should parse");
        assert_eq!(parsed, deck);

        let mut cards: Vec<Card> = deck.into();
        cards.pop();
        let short = serde_json::to_string(&cards).expect("cards should serialize");
        assert!(serde_json::from_str::<Deck>(&short).is_err());
    }
}
