//! Object identity and ordering primitives.
//!
//! Every game object lives in the state's arena keyed by [`ObjectId`].
//! References between objects (an aura and what it enchants, a counter
//! source and its target) are ids, never owning pointers. A zone change
//! allocates a fresh id, so a stale reference simply stops resolving.

use serde::{Deserialize, Serialize};

/// Identifier of a game object in the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId(pub u32);

impl ObjectId {
    /// Create a new object ID.
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

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Object({})", self.0)
    }
}

/// Monotonic game timestamp.
///
/// Objects receive one when they enter a zone; continuous effects receive
/// one when they are created. Later timestamps compare greater.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub u64);

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_id_display() {
        assert_eq!(format!("{}", ObjectId::new(7)), "Object(7)");
        assert_eq!(ObjectId::new(7).raw(), 7);
    }

    #[test]
    fn test_timestamp_ordering() {
        assert!(Timestamp(1) < Timestamp(2));
        assert_eq!(Timestamp::default(), Timestamp(0));
    }
}
