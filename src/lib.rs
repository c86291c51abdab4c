//! # rust-ccg-rules
//!
//! The ability and effect resolution core of a stack-based, priority-driven
//! trading card game.
//!
//! Cards are data: triggers, targets, costs, effects, static and
//! replacement abilities are plain values. This crate interprets them under
//! the rules of the game.
//!
//! ## Design Principles
//!
//! 1. **Explicit state**: every component takes a [`GameState`]. Objects
//!    live in an arena and refer to each other by id.
//!
//! 2. **Nothing half-applied**: work runs on an O(1) `im` checkpoint. A
//!    player decision rolls the checkpoint back and the work is replayed
//!    once the answer arrives.
//!
//! 3. **Recompute, don't cache**: effective characteristics are derived
//!    from base values and the layer system on every query.
//!
//! 4. **N-Player First**: APNAP order everywhere, no two-player shortcuts.
//!
//! ## Modules
//!
//! - `core`: object ids, players, state, RNG, configuration
//! - `cards`: characteristics, definitions, objects, counters
//! - `abilities`: triggered, activated, static and replacement abilities
//! - `effects`: effect trees, targeting, filters, amounts, resolution
//! - `layers`: continuous effects and the layer system
//! - `costs`: mana and cost payment
//! - `zones`: zones and zone changes
//! - `triggers`: game events and trigger detection
//! - `stack`: the stack and priority
//! - `rules`: turns, state-based actions and the game controller

pub mod abilities;
pub mod cards;
pub mod core;
pub mod costs;
pub mod effects;
pub mod error;
pub mod layers;
pub mod rules;
pub mod stack;
pub mod triggers;
pub mod zones;

// Re-export commonly used types
pub use crate::core::{EngineConfig, GameState, ObjectId, PlayerId, PlayerMap};

pub use crate::cards::{CardDefinition, CardId, CardRegistry, Characteristics};

pub use crate::effects::{Action, Effect, EffectContext, TargetRef, TargetSpec};

pub use crate::error::{CostError, Result, RulesError};

pub use crate::rules::{CastRequest, DecisionRequest, DecisionResponse, Game, GameResult, Progress};

pub use crate::zones::{ZoneId, ZoneKind};
