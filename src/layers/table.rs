//! Derived characteristics for every object.

use rustc_hash::FxHashMap;

use crate::cards::Characteristics;
use crate::core::{ObjectId, PlayerId};

/// Effective characteristics and controller of one object.
#[derive(Clone, Debug, PartialEq)]
pub struct EffectiveObject {
    pub characteristics: Characteristics,
    pub controller: PlayerId,
}

/// Effective values for every live object, produced by
/// [`LayerSystem::compute`](super::LayerSystem::compute).
///
/// A table describes one moment. It is never updated in place after the
/// state changes; callers compute a new one.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CharacteristicsTable {
    entries: FxHashMap<ObjectId, EffectiveObject>,
}

impl CharacteristicsTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, object: ObjectId) -> Option<&EffectiveObject> {
        self.entries.get(&object)
    }

    pub(crate) fn get_mut(&mut self, object: ObjectId) -> Option<&mut EffectiveObject> {
        self.entries.get_mut(&object)
    }

    pub(crate) fn insert(&mut self, object: ObjectId, effective: EffectiveObject) {
        self.entries.insert(object, effective);
    }

    /// Characteristics of an object, if it is live.
    #[must_use]
    pub fn characteristics(&self, object: ObjectId) -> Option<&Characteristics> {
        self.entries.get(&object).map(|e| &e.characteristics)
    }

    /// Controller of an object, if it is live.
    #[must_use]
    pub fn controller(&self, object: ObjectId) -> Option<PlayerId> {
        self.entries.get(&object).map(|e| e.controller)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
