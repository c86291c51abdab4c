//! Card registry for definition lookup.
//!
//! The `CardRegistry` is the boundary with the card catalog: definitions are
//! registered once and shared with game objects through `Arc`.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::definition::{CardDefinition, CardId};
use crate::error::{Result, RulesError};

/// Registry of card definitions.
///
/// ## Example
///
/// ```
/// use ccg_rules::cards::{CardDefinition, CardId, CardRegistry, Characteristics};
///
/// let mut registry = CardRegistry::new();
/// let bears = CardId::new(1);
/// registry
///     .register(CardDefinition::new(bears, Characteristics::creature("Grizzly Bears", 2, 2)))
///     .unwrap();
///
/// let found = registry.get(bears).unwrap();
/// assert_eq!(found.name(), "Grizzly Bears");
/// assert_eq!(registry.find_by_name("Grizzly Bears").unwrap().id, bears);
/// ```
#[derive(Clone, Debug, Default)]
pub struct CardRegistry {
    cards: FxHashMap<CardId, Arc<CardDefinition>>,
}

impl CardRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a card definition.
    ///
    /// Fails if a card with the same ID already exists.
    pub fn register(&mut self, card: CardDefinition) -> Result<Arc<CardDefinition>> {
        if self.cards.contains_key(&card.id) {
            return Err(RulesError::InvalidAction(format!("{} already registered", card.id)));
        }
        let card = Arc::new(card);
        self.cards.insert(card.id, Arc::clone(&card));
        Ok(card)
    }

    /// Get a card definition by ID.
    #[must_use]
    pub fn get(&self, id: CardId) -> Option<Arc<CardDefinition>> {
        self.cards.get(&id).cloned()
    }

    /// Find a card by its printed name.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<Arc<CardDefinition>> {
        self.cards.values().find(|c| c.name() == name).cloned()
    }

    /// Get the number of registered cards.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}
