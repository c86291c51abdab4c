//! Zone manager for object locations.
//!
//! The `ZoneManager` tracks which zone each live object is in and keeps
//! the order of ordered zones. It supports:
//! - Ordered zones (library, graveyard, stack) with explicit position control
//! - Unordered zones (battlefield, hand, exile) reported in id order
//! - Object lookup by id
//!
//! It is pure bookkeeping. Rules-aware movement (replacement effects, new
//! identities, last-known information) lives in [`ZoneMover`](super::ZoneMover).

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::zone::ZoneId;
use crate::core::{GameRng, ObjectId};
use crate::error::{Result, RulesError};

/// Position for inserting an object into an ordered zone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZonePosition {
    /// Add to top of zone (e.g., top of library).
    Top,
    /// Add to bottom of zone.
    Bottom,
    /// Insert at specific index (0 = bottom).
    Index(usize),
}

/// Tracks object locations across zones.
///
/// ## Usage
///
/// ```
/// use ccg_rules::core::{ObjectId, PlayerId};
/// use ccg_rules::zones::{ZoneId, ZoneManager, ZonePosition};
///
/// let mut manager = ZoneManager::new();
/// let library = ZoneId::Library(PlayerId(0));
///
/// manager.add_to_zone(ObjectId(10), library, ZonePosition::Top).unwrap();
/// manager.add_to_zone(ObjectId(11), library, ZonePosition::Bottom).unwrap();
///
/// assert_eq!(manager.top(library), Some(ObjectId(10)));
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ZoneManager {
    /// Object locations: object -> zone
    locations: FxHashMap<ObjectId, ZoneId>,

    /// Bottom-to-top order of ordered zones.
    zone_order: FxHashMap<ZoneId, Vec<ObjectId>>,
}

impl ZoneManager {
    /// Create a new empty zone manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object to a zone.
    ///
    /// `position` only matters for ordered zones. An object can be tracked
    /// in one zone at a time.
    pub fn add_to_zone(&mut self, object: ObjectId, zone: ZoneId, position: ZonePosition) -> Result<()> {
        if let Some(existing) = self.locations.get(&object) {
            return Err(RulesError::invariant(format!("{object} is already in {existing}")));
        }

        self.locations.insert(object, zone);

        if zone.is_ordered() {
            let order = self.zone_order.entry(zone).or_default();
            match position {
                ZonePosition::Top => order.push(object),
                ZonePosition::Bottom => order.insert(0, object),
                ZonePosition::Index(i) => {
                    let idx = i.min(order.len());
                    order.insert(idx, object);
                }
            }
        }
        Ok(())
    }

    /// Stop tracking an object.
    ///
    /// Returns the zone it was in, or `None` if not found.
    pub fn remove(&mut self, object: ObjectId) -> Option<ZoneId> {
        let zone = self.locations.remove(&object)?;

        if let Some(order) = self.zone_order.get_mut(&zone) {
            order.retain(|&o| o != object);
        }

        Some(zone)
    }

    /// Get the zone an object is in.
    #[must_use]
    pub fn get_zone(&self, object: ObjectId) -> Option<ZoneId> {
        self.locations.get(&object).copied()
    }

    /// Check if an object is in a specific zone.
    #[must_use]
    pub fn is_in_zone(&self, object: ObjectId, zone: ZoneId) -> bool {
        self.locations.get(&object) == Some(&zone)
    }

    /// Objects in a zone.
    ///
    /// Ordered zones are returned bottom to top; unordered zones in id order.
    #[must_use]
    pub fn contents(&self, zone: ZoneId) -> Vec<ObjectId> {
        if zone.is_ordered() {
            return self.zone_order.get(&zone).cloned().unwrap_or_default();
        }
        let mut objects: Vec<_> = self
            .locations
            .iter()
            .filter(|(_, &z)| z == zone)
            .map(|(&o, _)| o)
            .collect();
        objects.sort_unstable();
        objects
    }

    /// Get the number of objects in a zone.
    #[must_use]
    pub fn zone_size(&self, zone: ZoneId) -> usize {
        if zone.is_ordered() {
            self.zone_order.get(&zone).map_or(0, Vec::len)
        } else {
            self.locations.values().filter(|&&z| z == zone).count()
        }
    }

    /// Top object of an ordered zone.
    #[must_use]
    pub fn top(&self, zone: ZoneId) -> Option<ObjectId> {
        self.zone_order.get(&zone)?.last().copied()
    }

    /// Shuffle an ordered zone.
    pub fn shuffle_zone(&mut self, zone: ZoneId, rng: &mut GameRng) {
        if let Some(order) = self.zone_order.get_mut(&zone) {
            rng.shuffle(order);
        }
    }

    /// Check if the manager tracks an object.
    #[must_use]
    pub fn contains(&self, object: ObjectId) -> bool {
        self.locations.contains_key(&object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PlayerId;

    fn library() -> ZoneId {
        ZoneId::Library(PlayerId(0))
    }

    #[test]
    fn test_ordered_zone_positions() {
        let mut manager = ZoneManager::new();

        manager.add_to_zone(ObjectId(10), library(), ZonePosition::Top).unwrap();
        manager.add_to_zone(ObjectId(11), library(), ZonePosition::Bottom).unwrap();
        manager.add_to_zone(ObjectId(12), library(), ZonePosition::Top).unwrap();
        manager.add_to_zone(ObjectId(13), library(), ZonePosition::Index(1)).unwrap();

        assert_eq!(
            manager.contents(library()),
            vec![ObjectId(11), ObjectId(13), ObjectId(10), ObjectId(12)]
        );
        assert_eq!(manager.top(library()), Some(ObjectId(12)));
    }

    #[test]
    fn test_unordered_zone_sorted_by_id() {
        let mut manager = ZoneManager::new();
        manager.add_to_zone(ObjectId(9), ZoneId::Battlefield, ZonePosition::Top).unwrap();
        manager.add_to_zone(ObjectId(3), ZoneId::Battlefield, ZonePosition::Top).unwrap();

        assert_eq!(manager.contents(ZoneId::Battlefield), vec![ObjectId(3), ObjectId(9)]);
        assert_eq!(manager.zone_size(ZoneId::Battlefield), 2);
    }

    #[test]
    fn test_remove() {
        let mut manager = ZoneManager::new();
        manager.add_to_zone(ObjectId(10), library(), ZonePosition::Top).unwrap();

        assert_eq!(manager.remove(ObjectId(10)), Some(library()));
        assert!(!manager.contains(ObjectId(10)));
        assert_eq!(manager.zone_size(library()), 0);
        assert_eq!(manager.remove(ObjectId(10)), None);
    }

    #[test]
    fn test_duplicate_object_is_invariant_violation() {
        let mut manager = ZoneManager::new();
        manager.add_to_zone(ObjectId(10), ZoneId::Exile, ZonePosition::Top).unwrap();
        let err = manager
            .add_to_zone(ObjectId(10), ZoneId::Battlefield, ZonePosition::Top)
            .unwrap_err();
        assert!(matches!(err, RulesError::InvariantViolation(_)));
    }

    #[test]
    fn test_shuffle_keeps_members() {
        let mut manager = ZoneManager::new();
        for i in 0..20 {
            manager.add_to_zone(ObjectId(i), library(), ZonePosition::Top).unwrap();
        }
        let before = manager.contents(library());

        let mut rng = GameRng::new(42);
        manager.shuffle_zone(library(), &mut rng);
        let mut after = manager.contents(library());

        assert_ne!(before, after);
        after.sort_unstable();
        assert_eq!(before, after);
    }
}
