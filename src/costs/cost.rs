//! Costs: a conjunction of atomic components.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::mana::ManaCost;
use crate::cards::CounterKind;
use crate::core::ObjectId;
use crate::effects::ObjectFilter;

/// One atomic part of a cost.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CostComponent {
    Mana(ManaCost),
    /// `{T}`. A creature source needs haste or to have been under its
    /// controller's control since the turn began.
    TapSelf,
    /// `{Q}`
    UntapSelf,
    /// Tap N untapped permanents you control matching the filter.
    TapMatching { filter: ObjectFilter, count: u32 },
    SacrificeSelf,
    /// Sacrifice N permanents you control matching the filter.
    SacrificeMatching { filter: ObjectFilter, count: u32 },
    /// Discard N cards matching the filter.
    Discard { filter: ObjectFilter, count: u32 },
    PayLife(i64),
    /// Remove N counters of a kind from the source.
    RemoveCounters { kind: CounterKind, count: u32 },
}

/// A cost. Every component must be paid.
///
/// ```
/// use ccg_rules::costs::{Cost, CostComponent, ManaCost};
///
/// // "{1}, {T}, Sacrifice this: ..."
/// let cost = Cost::mana(ManaCost::generic(1))
///     .and(CostComponent::TapSelf)
///     .and(CostComponent::SacrificeSelf);
///
/// assert_eq!(cost.components.len(), 3);
/// assert!(cost.needs_source());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Cost {
    pub components: SmallVec<[CostComponent; 2]>,
}

impl Cost {
    /// A cost with nothing to pay.
    #[must_use]
    pub fn free() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn mana(cost: ManaCost) -> Self {
        Self::free().and(CostComponent::Mana(cost))
    }

    /// `{T}`
    #[must_use]
    pub fn tap() -> Self {
        Self::free().and(CostComponent::TapSelf)
    }

    /// Add a component.
    #[must_use]
    pub fn and(mut self, component: CostComponent) -> Self {
        self.components.push(component);
        self
    }

    #[must_use]
    pub fn is_free(&self) -> bool {
        self.components.is_empty()
    }

    /// The mana part, if any.
    #[must_use]
    pub fn mana_cost(&self) -> Option<&ManaCost> {
        self.components.iter().find_map(|c| match c {
            CostComponent::Mana(cost) => Some(cost),
            _ => None,
        })
    }

    /// Whether any component refers to the source object.
    #[must_use]
    pub fn needs_source(&self) -> bool {
        self.components.iter().any(|c| {
            matches!(
                c,
                CostComponent::TapSelf
                    | CostComponent::UntapSelf
                    | CostComponent::SacrificeSelf
                    | CostComponent::RemoveCounters { .. }
            )
        })
    }
}

/// The payer's choices for a cost: X and the objects chosen for the
/// "N matching" components, in component order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostPayment {
    pub x: u32,
    pub tapped: Vec<ObjectId>,
    pub sacrificed: Vec<ObjectId>,
    pub discarded: Vec<ObjectId>,
}

impl CostPayment {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_x(mut self, x: u32) -> Self {
        self.x = x;
        self
    }

    #[must_use]
    pub fn tapping(mut self, objects: impl IntoIterator<Item = ObjectId>) -> Self {
        self.tapped.extend(objects);
        self
    }

    #[must_use]
    pub fn sacrificing(mut self, objects: impl IntoIterator<Item = ObjectId>) -> Self {
        self.sacrificed.extend(objects);
        self
    }

    #[must_use]
    pub fn discarding(mut self, objects: impl IntoIterator<Item = ObjectId>) -> Self {
        self.discarded.extend(objects);
        self
    }
}
