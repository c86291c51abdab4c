//! Turn structure, priority and the game controller.
//!
//! [`Game`] is the public entry point: it takes player actions, runs
//! state-based actions and triggers between them, and stops whenever a
//! player has to decide something.
//!
//! ## Key Types
//!
//! - `Game` / `Progress`: the controller and what it is waiting for
//! - `DecisionRequest` / `DecisionResponse`: player choices
//! - `Step` / `TurnState`: where the game is in the turn

pub mod decision;
pub mod game;
mod sba;
pub mod turn;

pub use decision::{ChoiceReason, DecisionRequest, DecisionResponse, TargetSlot};
pub use game::{CastRequest, Game, GameResult, PlayOption, Progress};
pub use turn::{Step, TurnState};
