//! Object characteristics: the values the layer system reads and rewrites.
//!
//! [`Characteristics`] is everything a copy effect copies and everything a
//! continuous effect can change: name, mana cost, colors, types, power,
//! toughness, keywords and abilities. Definitions carry the printed values;
//! the layer system derives the effective values from them on every query.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::abilities::Ability;
use crate::costs::ManaCost;

/// The five colors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Color {
    White,
    Blue,
    Black,
    Red,
    Green,
}

impl Color {
    /// All colors in WUBRG order.
    pub const ALL: [Color; 5] = [Color::White, Color::Blue, Color::Black, Color::Red, Color::Green];

    /// Position in WUBRG order.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Color::White => 0,
            Color::Blue => 1,
            Color::Black => 2,
            Color::Red => 3,
            Color::Green => 4,
        }
    }

    /// Mana symbol letter.
    #[must_use]
    pub const fn symbol(self) -> char {
        match self {
            Color::White => 'W',
            Color::Blue => 'U',
            Color::Black => 'B',
            Color::Red => 'R',
            Color::Green => 'G',
        }
    }
}

/// Card types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CardType {
    Artifact,
    Battle,
    Creature,
    Enchantment,
    Instant,
    Kindred,
    Land,
    Planeswalker,
    Sorcery,
}

impl CardType {
    /// Whether objects of this type can exist on the battlefield.
    #[must_use]
    pub const fn is_permanent(self) -> bool {
        !matches!(self, CardType::Instant | CardType::Sorcery | CardType::Kindred)
    }
}

/// Supertypes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Supertype {
    Basic,
    Legendary,
    Snow,
    World,
}

/// A subtype ("Elf", "Wall", "Aura", "Equipment", ...).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Subtype(pub String);

impl Subtype {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Subtype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Keyword abilities.
///
/// Keywords are data. The engine gives rules meaning to the ones its own
/// checks need (targeting, damage, timing, destruction); the rest are
/// carried for filters and for whoever consumes the engine.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Keyword {
    Deathtouch,
    Defender,
    DoubleStrike,
    FirstStrike,
    Flash,
    Flying,
    Haste,
    Hexproof,
    Indestructible,
    Lifelink,
    Menace,
    Reach,
    Shroud,
    Trample,
    Vigilance,
    Other(String),
}

/// Characteristics of an object.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Characteristics {
    pub name: String,
    pub mana_cost: Option<ManaCost>,
    pub colors: BTreeSet<Color>,
    pub card_types: BTreeSet<CardType>,
    pub supertypes: BTreeSet<Supertype>,
    pub subtypes: BTreeSet<Subtype>,
    pub power: Option<i64>,
    pub toughness: Option<i64>,
    pub keywords: BTreeSet<Keyword>,
    pub abilities: Vec<Ability>,
}

impl Characteristics {
    /// Characteristics with only a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// The characteristics of a face-down permanent: a nameless, colorless
    /// 2/2 creature with no abilities.
    #[must_use]
    pub fn face_down() -> Self {
        Self {
            card_types: BTreeSet::from([CardType::Creature]),
            power: Some(2),
            toughness: Some(2),
            ..Self::default()
        }
    }

    /// Set the mana cost. Colors follow the colored symbols.
    #[must_use]
    pub fn with_mana_cost(mut self, cost: ManaCost) -> Self {
        self.colors = cost.colors();
        self.mana_cost = Some(cost);
        self
    }

    #[must_use]
    pub fn with_color(mut self, color: Color) -> Self {
        self.colors.insert(color);
        self
    }

    #[must_use]
    pub fn with_type(mut self, card_type: CardType) -> Self {
        self.card_types.insert(card_type);
        self
    }

    #[must_use]
    pub fn with_supertype(mut self, supertype: Supertype) -> Self {
        self.supertypes.insert(supertype);
        self
    }

    #[must_use]
    pub fn with_subtype(mut self, subtype: impl Into<String>) -> Self {
        self.subtypes.insert(Subtype::new(subtype));
        self
    }

    /// Set printed power and toughness.
    #[must_use]
    pub fn with_stats(mut self, power: i64, toughness: i64) -> Self {
        self.power = Some(power);
        self.toughness = Some(toughness);
        self
    }

    #[must_use]
    pub fn with_keyword(mut self, keyword: Keyword) -> Self {
        self.keywords.insert(keyword);
        self
    }

    #[must_use]
    pub fn with_ability(mut self, ability: Ability) -> Self {
        self.abilities.push(ability);
        self
    }

    /// A creature with the given stats.
    pub fn creature(name: impl Into<String>, power: i64, toughness: i64) -> Self {
        Self::new(name).with_type(CardType::Creature).with_stats(power, toughness)
    }

    #[must_use]
    pub fn has_type(&self, card_type: CardType) -> bool {
        self.card_types.contains(&card_type)
    }

    #[must_use]
    pub fn has_subtype(&self, subtype: &str) -> bool {
        self.subtypes.iter().any(|s| s.as_str() == subtype)
    }

    #[must_use]
    pub fn has_supertype(&self, supertype: Supertype) -> bool {
        self.supertypes.contains(&supertype)
    }

    #[must_use]
    pub fn has_keyword(&self, keyword: &Keyword) -> bool {
        self.keywords.contains(keyword)
    }

    #[must_use]
    pub fn is_creature(&self) -> bool {
        self.has_type(CardType::Creature)
    }

    #[must_use]
    pub fn is_land(&self) -> bool {
        self.has_type(CardType::Land)
    }

    /// Whether the object would be a permanent on the battlefield.
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        self.card_types.iter().any(|t| t.is_permanent())
    }

    /// Mana value of the mana cost (`{X}` counts as zero).
    #[must_use]
    pub fn mana_value(&self) -> i64 {
        self.mana_cost.as_ref().map_or(0, |cost| i64::from(cost.mana_value()))
    }

    /// Whether the two share at least one card type.
    #[must_use]
    pub fn shares_card_type(&self, other: &Characteristics) -> bool {
        !self.card_types.is_disjoint(&other.card_types)
    }

    /// Remove every ability and keyword.
    pub fn clear_abilities(&mut self) {
        self.abilities.clear();
        self.keywords.clear();
    }
}
