//! Core engine types: object ids, players, state, RNG, configuration.
//!
//! Everything else in the crate takes a [`GameState`] explicitly; there is
//! no global or shared mutable state.

pub mod config;
pub mod entity;
pub mod player;
pub mod rng;
pub mod state;

pub use config::EngineConfig;
pub use entity::{ObjectId, Timestamp};
pub use player::{PlayerId, PlayerMap};
pub use rng::{GameRng, GameRngState};
pub use state::{GameState, LastKnown, PlayerState};
