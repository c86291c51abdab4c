//! Continuous effects and the modifications they make.
//!
//! Every [`Modification`] belongs to exactly one layer. A continuous effect
//! may carry several modifications in different layers ("becomes a 3/3
//! Elemental creature" is a layer 4 and a layer 7b change); the affected
//! set is locked the first time any of them applies.

use serde::{Deserialize, Serialize};

use crate::abilities::Ability;
use crate::cards::{CardType, Characteristics, Color, Keyword, Subtype, Supertype};
use crate::core::{ObjectId, PlayerId, Timestamp};
use crate::effects::{Condition, DynamicAmount, ObjectFilter};

/// Identifier of a registered continuous or replacement effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EffectId(pub u32);

impl std::fmt::Display for EffectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Effect({})", self.0)
    }
}

/// Layers and sublayers, in application order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Layer {
    /// Copy effects.
    OneA,
    /// Face-down status.
    OneB,
    /// Control.
    Two,
    /// Text.
    Three,
    /// Type.
    Four,
    /// Color.
    Five,
    /// Abilities.
    Six,
    /// Characteristic-defining power/toughness.
    SevenA,
    /// Set power/toughness.
    SevenB,
    /// Modify power/toughness.
    SevenC,
    /// Counters.
    SevenD,
    /// Switch power/toughness.
    SevenE,
}

impl Layer {
    pub const ALL: [Layer; 12] = [
        Layer::OneA,
        Layer::OneB,
        Layer::Two,
        Layer::Three,
        Layer::Four,
        Layer::Five,
        Layer::Six,
        Layer::SevenA,
        Layer::SevenB,
        Layer::SevenC,
        Layer::SevenD,
        Layer::SevenE,
    ];
}

/// How long a registered effect lasts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Duration {
    #[default]
    Permanent,
    /// Until the cleanup step of this turn.
    EndOfTurn,
    /// For as long as the source stays on the battlefield.
    WhileSourceOnBattlefield,
}

/// What a registered effect applies to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Affected {
    /// A set locked when the effect was created.
    Objects(Vec<ObjectId>),
    /// Objects matching a filter, determined when the effect first applies.
    Filter(ObjectFilter),
}

/// One change to characteristics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Modification {
    // 1a
    /// Become a copy of another object's copiable values.
    CopyOf(ObjectId),
    /// Become a copy of values captured earlier.
    CopyValues(Box<Characteristics>),
    // 1b
    FaceDown,
    // 2
    /// The effect's controller gains control.
    GainControl,
    // 3
    ChangeSubtypeText { from: Subtype, to: Subtype },
    // 4
    AddType(CardType),
    RemoveType(CardType),
    AddSupertype(Supertype),
    AddSubtype(Subtype),
    RemoveSubtype(Subtype),
    /// Replace every subtype.
    SetSubtypes(Vec<Subtype>),
    // 5
    SetColors(Vec<Color>),
    AddColor(Color),
    // 6
    AddKeyword(Keyword),
    RemoveKeyword(Keyword),
    AddAbility(Box<Ability>),
    RemoveAllAbilities,
    // 7b
    SetPowerToughness { power: DynamicAmount, toughness: DynamicAmount },
    // 7c
    ModifyPowerToughness { power: DynamicAmount, toughness: DynamicAmount },
    // 7e
    SwitchPowerToughness,
}

impl Modification {
    /// "+N/+M"
    #[must_use]
    pub fn pump(power: i64, toughness: i64) -> Self {
        Modification::ModifyPowerToughness {
            power: DynamicAmount::Fixed(power),
            toughness: DynamicAmount::Fixed(toughness),
        }
    }

    /// "base power and toughness N/M"
    #[must_use]
    pub fn set_stats(power: i64, toughness: i64) -> Self {
        Modification::SetPowerToughness {
            power: DynamicAmount::Fixed(power),
            toughness: DynamicAmount::Fixed(toughness),
        }
    }

    pub fn add_subtype(subtype: impl Into<String>) -> Self {
        Modification::AddSubtype(Subtype::new(subtype))
    }

    #[must_use]
    pub fn layer(&self) -> Layer {
        match self {
            Modification::CopyOf(_) | Modification::CopyValues(_) => Layer::OneA,
            Modification::FaceDown => Layer::OneB,
            Modification::GainControl => Layer::Two,
            Modification::ChangeSubtypeText { .. } => Layer::Three,
            Modification::AddType(_)
            | Modification::RemoveType(_)
            | Modification::AddSupertype(_)
            | Modification::AddSubtype(_)
            | Modification::RemoveSubtype(_)
            | Modification::SetSubtypes(_) => Layer::Four,
            Modification::SetColors(_) | Modification::AddColor(_) => Layer::Five,
            Modification::AddKeyword(_)
            | Modification::RemoveKeyword(_)
            | Modification::AddAbility(_)
            | Modification::RemoveAllAbilities => Layer::Six,
            Modification::SetPowerToughness { .. } => Layer::SevenB,
            Modification::ModifyPowerToughness { .. } => Layer::SevenC,
            Modification::SwitchPowerToughness => Layer::SevenE,
        }
    }

    /// Visit the amounts in a power/toughness change.
    pub fn map_amounts(&mut self, f: &mut impl FnMut(&mut DynamicAmount)) {
        if let Modification::SetPowerToughness { power, toughness }
        | Modification::ModifyPowerToughness { power, toughness } = self
        {
            f(power);
            f(toughness);
        }
    }
}

/// A continuous effect created by a resolved spell or ability.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContinuousEffect {
    pub id: EffectId,
    pub source: Option<ObjectId>,
    pub controller: PlayerId,
    pub timestamp: Timestamp,
    pub duration: Duration,
    pub affected: Affected,
    pub modifications: Vec<Modification>,
    pub condition: Option<Condition>,
}

impl ContinuousEffect {
    /// Whether the effect touches `layer`.
    #[must_use]
    pub fn has_layer(&self, layer: Layer) -> bool {
        self.modifications.iter().any(|m| m.layer() == layer)
    }

    /// Whether the effect is locked to `object`.
    #[must_use]
    pub fn is_locked_to(&self, object: ObjectId) -> bool {
        matches!(&self.affected, Affected::Objects(ids) if ids.contains(&object))
    }
}
