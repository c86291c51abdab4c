//! Card definitions: the data the engine consumes.
//!
//! A `CardDefinition` is the immutable description of a card. It holds the
//! printed characteristics (including abilities) the rules read, an
//! optional spell ability for what the card does when it resolves, and a
//! metadata block the rules never look at.
//!
//! Instance-specific data (zone, counters, damage, tapped) lives on
//! [`GameObject`](super::GameObject).

use serde::{Deserialize, Serialize};

use super::characteristics::Characteristics;
use crate::effects::{DynamicAmount, Effect, ObjectFilter, TargetSpec};

/// Unique identifier for a card definition.
///
/// This identifies the card ("Lightning Bolt"), not an object in a game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CardId(pub u32);

impl CardId {
    /// Create a new card ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for CardId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Card({})", self.0)
    }
}

/// Presentation data. Carried through the engine, never interpreted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardMetadata {
    pub name: String,
    pub mana_cost: Option<String>,
    pub type_line: String,
    pub power_toughness: Option<String>,
    pub rarity: Option<String>,
    pub flavor_text: Option<String>,
    pub image_uri: Option<String>,
    pub collector_number: Option<String>,
}

/// What an instant or sorcery does, or what a permanent spell targets.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpellAbility {
    pub targets: Vec<TargetSpec>,
    pub effect: Effect,
}

impl SpellAbility {
    pub fn new(effect: Effect) -> Self {
        Self {
            targets: Vec::new(),
            effect,
        }
    }

    #[must_use]
    pub fn with_target(mut self, target: TargetSpec) -> Self {
        self.targets.push(target);
        self
    }
}

/// Power and toughness defined by a formula (layer 7a).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DynamicStats {
    pub power: DynamicAmount,
    pub toughness: DynamicAmount,
}

/// Static card definition.
///
/// ## Example
///
/// ```
/// use ccg_rules::cards::{CardDefinition, CardId, Characteristics};
///
/// let bears = CardDefinition::new(CardId::new(1), Characteristics::creature("Grizzly Bears", 2, 2));
/// assert_eq!(bears.name(), "Grizzly Bears");
/// assert!(bears.spell.is_none());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CardDefinition {
    /// Unique identifier for this card definition.
    pub id: CardId,

    /// Ignored for rules purposes.
    pub metadata: CardMetadata,

    /// Printed characteristics, abilities included.
    pub characteristics: Characteristics,

    /// Targets and effect used when the card resolves as a spell.
    pub spell: Option<SpellAbility>,

    /// What an Aura with this definition may be attached to.
    pub enchant: Option<ObjectFilter>,

    /// Characteristic-defining power/toughness.
    pub dynamic_stats: Option<DynamicStats>,
}

impl CardDefinition {
    /// Create a definition from printed characteristics.
    pub fn new(id: CardId, characteristics: Characteristics) -> Self {
        let metadata = CardMetadata {
            name: characteristics.name.clone(),
            ..CardMetadata::default()
        };
        Self {
            id,
            metadata,
            characteristics,
            spell: None,
            enchant: None,
            dynamic_stats: None,
        }
    }

    /// Attach a metadata block.
    #[must_use]
    pub fn with_metadata(mut self, metadata: CardMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Set the spell ability.
    #[must_use]
    pub fn with_spell(mut self, spell: SpellAbility) -> Self {
        self.spell = Some(spell);
        self
    }

    /// Make this an Aura that enchants objects matching `filter`.
    ///
    /// The spell targets one such object.
    #[must_use]
    pub fn with_enchant(mut self, filter: ObjectFilter) -> Self {
        let spell = self.spell.take().unwrap_or_else(|| SpellAbility::new(Effect::nothing()));
        self.spell = Some(spell.with_target(TargetSpec::object(filter.clone())));
        self.enchant = Some(filter);
        self
    }

    /// Define power and toughness by formula.
    #[must_use]
    pub fn with_dynamic_stats(mut self, power: DynamicAmount, toughness: DynamicAmount) -> Self {
        self.dynamic_stats = Some(DynamicStats { power, toughness });
        self
    }

    /// Name from the printed characteristics.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.characteristics.name
    }
}
