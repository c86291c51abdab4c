//! Game objects: runtime state of a card or token in a zone.
//!
//! A `GameObject` only exists in one zone. Moving it to another zone retires
//! it and creates a new object with a new id (see
//! [`ZoneMover`](crate::zones::ZoneMover)), so nothing here survives a zone
//! change except the definition and ownership.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::characteristics::Characteristics;
use super::definition::CardDefinition;
use crate::core::{ObjectId, PlayerId, Timestamp};
use crate::error::{Result, RulesError};
use crate::zones::ZoneId;

/// Kinds of counters.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CounterKind {
    PlusOnePlusOne,
    MinusOneMinusOne,
    Loyalty,
    Charge,
    Named(String),
}

impl std::fmt::Display for CounterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CounterKind::PlusOnePlusOne => f.write_str("+1/+1"),
            CounterKind::MinusOneMinusOne => f.write_str("-1/-1"),
            CounterKind::Loyalty => f.write_str("loyalty"),
            CounterKind::Charge => f.write_str("charge"),
            CounterKind::Named(name) => f.write_str(name),
        }
    }
}

/// Counters on an object. Counts are never negative.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters(BTreeMap<CounterKind, u32>);

impl Counters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of counters of one kind.
    #[must_use]
    pub fn get(&self, kind: &CounterKind) -> u32 {
        self.0.get(kind).copied().unwrap_or(0)
    }

    pub fn add(&mut self, kind: CounterKind, amount: u32) {
        if amount > 0 {
            *self.0.entry(kind).or_insert(0) += amount;
        }
    }

    /// Remove exactly `amount` counters.
    ///
    /// Removing more than are present would leave a negative count, which
    /// is an invariant violation.
    pub fn remove(&mut self, kind: &CounterKind, amount: u32) -> Result<()> {
        let present = self.get(kind);
        if amount > present {
            return Err(RulesError::invariant(format!(
                "removing {amount} {kind} counters with only {present} present"
            )));
        }
        self.set(kind.clone(), i64::from(present - amount))
    }

    /// Remove up to `amount` counters and return how many were removed.
    pub fn remove_up_to(&mut self, kind: &CounterKind, amount: u32) -> u32 {
        let removed = amount.min(self.get(kind));
        if removed > 0 {
            // Cannot underflow: removed <= present.
            let present = self.get(kind);
            if present == removed {
                self.0.remove(kind);
            } else {
                self.0.insert(kind.clone(), present - removed);
            }
        }
        removed
    }

    /// Set a count directly. Negative counts are rejected.
    pub fn set(&mut self, kind: CounterKind, count: i64) -> Result<()> {
        if count < 0 {
            return Err(RulesError::invariant(format!("negative {kind} counter count {count}")));
        }
        if count == 0 {
            self.0.remove(&kind);
        } else {
            let count = u32::try_from(count)
                .map_err(|_| RulesError::invariant(format!("{kind} counter count {count} overflows")))?;
            self.0.insert(kind, count);
        }
        Ok(())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CounterKind, u32)> {
        self.0.iter().map(|(k, v)| (k, *v))
    }
}

/// A card or token in a zone.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameObject {
    pub id: ObjectId,
    pub definition: Arc<CardDefinition>,
    pub owner: PlayerId,
    /// Controller before control-changing effects.
    pub controller: PlayerId,
    pub zone: ZoneId,
    pub tapped: bool,
    pub face_down: bool,
    pub is_token: bool,
    pub counters: Counters,
    /// The object this one enchants or equips.
    pub attached_to: Option<ObjectId>,
    pub damage: i64,
    /// Damage from a source with deathtouch was dealt this turn.
    pub deathtouch_damage: bool,
    pub summoning_sick: bool,
    pub timestamp: Timestamp,
}

impl GameObject {
    /// A fresh object for `definition` in `zone`, controlled by its owner.
    pub fn new(
        id: ObjectId,
        definition: Arc<CardDefinition>,
        owner: PlayerId,
        zone: ZoneId,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            id,
            definition,
            owner,
            controller: owner,
            zone,
            tapped: false,
            face_down: false,
            is_token: false,
            counters: Counters::new(),
            attached_to: None,
            damage: 0,
            deathtouch_damage: false,
            summoning_sick: false,
            timestamp,
        }
    }

    /// Printed characteristics.
    #[must_use]
    pub fn base_characteristics(&self) -> &Characteristics {
        &self.definition.characteristics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_add_remove() {
        let mut counters = Counters::new();
        counters.add(CounterKind::PlusOnePlusOne, 2);
        assert_eq!(counters.get(&CounterKind::PlusOnePlusOne), 2);

        counters.remove(&CounterKind::PlusOnePlusOne, 2).unwrap();
        assert!(counters.is_empty());
    }

    #[test]
    fn test_over_removal_is_invariant_violation() {
        let mut counters = Counters::new();
        counters.add(CounterKind::Charge, 1);

        let err = counters.remove(&CounterKind::Charge, 2).unwrap_err();
        assert!(matches!(err, RulesError::InvariantViolation(_)));
        assert_eq!(counters.get(&CounterKind::Charge), 1);
    }

    #[test]
    fn test_negative_set_rejected() {
        let mut counters = Counters::new();
        assert!(counters.set(CounterKind::Loyalty, -1).is_err());
        counters.set(CounterKind::Loyalty, 3).unwrap();
        assert_eq!(counters.get(&CounterKind::Loyalty), 3);
    }

    #[test]
    fn test_remove_up_to_saturates() {
        let mut counters = Counters::new();
        counters.add(CounterKind::MinusOneMinusOne, 1);
        assert_eq!(counters.remove_up_to(&CounterKind::MinusOneMinusOne, 3), 1);
        assert!(counters.is_empty());
    }
}
