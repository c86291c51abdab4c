//! The stack.
//!
//! Spells, activated abilities and triggered abilities wait on a LIFO
//! stack while players pass priority in turn order. When all players pass
//! in succession the top entry resolves. The game loop that drives this
//! lives in [`rules::Game`](crate::rules::Game).
//!
//! ## Example Usage
//!
//! ```
//! use ccg_rules::core::PlayerId;
//! use ccg_rules::effects::Effect;
//! use ccg_rules::stack::{Stack, StackEntry, StackEntryKind, StackState};
//!
//! let mut stack = Stack::new();
//! let first = stack.push(StackEntry::new(StackEntryKind::ActivatedAbility, PlayerId::new(0), Effect::nothing()));
//! let second = stack.push(StackEntry::new(StackEntryKind::ActivatedAbility, PlayerId::new(1), Effect::nothing()));
//!
//! assert_eq!(stack.state(), StackState::AwaitingAction);
//! assert_eq!(stack.pop().map(|e| e.id), Some(second));
//! assert_eq!(stack.pop().map(|e| e.id), Some(first));
//! assert_eq!(stack.state(), StackState::Empty);
//! ```

mod entry;
mod priority;

pub use entry::{StackEntry, StackEntryId, StackEntryKind};
pub use priority::{Priority, Stack, StackState};
