//! The stack and priority passing.
//!
//! Entries resolve in LIFO order. Players pass priority in turn order;
//! when every player still in the game has passed in succession, the top
//! of the stack resolves (or, with an empty stack, the step ends) and the
//! active player receives priority again.

use serde::{Deserialize, Serialize};

use super::entry::{StackEntry, StackEntryId};
use crate::core::{ObjectId, PlayerId};

/// What the stack is doing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StackState {
    /// Entries are waiting; players have priority.
    AwaitingAction,
    /// The top entry is being resolved.
    Resolving,
    Empty,
}

/// The stack (index 0 = bottom, last = top).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Stack {
    entries: im::Vector<StackEntry>,
    next_id: u32,
    resolving: bool,
}

impl Stack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Push an entry, assigning its id.
    pub fn push(&mut self, mut entry: StackEntry) -> StackEntryId {
        let id = StackEntryId::new(self.next_id);
        self.next_id += 1;
        entry.id = id;
        self.entries.push_back(entry);
        id
    }

    /// Remove and return the top entry.
    pub fn pop(&mut self) -> Option<StackEntry> {
        self.entries.pop_back()
    }

    /// Peek at the top of the stack without removing it.
    #[must_use]
    pub fn top(&self) -> Option<&StackEntry> {
        self.entries.last()
    }

    #[must_use]
    pub fn get(&self, id: StackEntryId) -> Option<&StackEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Remove an entry wherever it is.
    pub fn remove(&mut self, id: StackEntryId) -> Option<StackEntry> {
        let index = self.entries.iter().position(|e| e.id == id)?;
        Some(self.entries.remove(index))
    }

    /// The spell whose card is `object`.
    #[must_use]
    pub fn find_spell(&self, object: ObjectId) -> Option<&StackEntry> {
        self.entries
            .iter()
            .find(|e| e.is_spell() && e.source == Some(object))
    }

    /// Entries, bottom to top.
    pub fn iter(&self) -> impl Iterator<Item = &StackEntry> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn set_resolving(&mut self, resolving: bool) {
        self.resolving = resolving;
    }

    #[must_use]
    pub fn state(&self) -> StackState {
        if self.resolving {
            StackState::Resolving
        } else if self.entries.is_empty() {
            StackState::Empty
        } else {
            StackState::AwaitingAction
        }
    }
}

/// Who holds priority and how many players have passed in succession.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Priority {
    holder: Option<PlayerId>,
    passes: usize,
}

impl Priority {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn holder(&self) -> Option<PlayerId> {
        self.holder
    }

    #[must_use]
    pub fn passes(&self) -> usize {
        self.passes
    }

    /// Give priority to `player` and reset the pass count.
    pub fn give(&mut self, player: PlayerId) {
        self.holder = Some(player);
        self.passes = 0;
    }

    /// Nobody holds priority (during resolution and turn-based actions).
    pub fn clear(&mut self) {
        self.holder = None;
        self.passes = 0;
    }

    /// The holder passes. `in_game` lists the players still in the game
    /// in turn order.
    ///
    /// Returns `true` if every player has now passed in succession; the
    /// holder is cleared. Otherwise priority moves to the next player.
    pub fn pass(&mut self, in_game: &[PlayerId]) -> bool {
        let Some(current) = self.holder else {
            return false;
        };
        self.passes += 1;
        if self.passes >= in_game.len() {
            self.holder = None;
            return true;
        }
        let position = in_game.iter().position(|&p| p == current).unwrap_or(0);
        self.holder = Some(in_game[(position + 1) % in_game.len()]);
        false
    }
}
