//! Trigger detection.
//!
//! Events flow one way: producers append [`GameEvent`]s to the state's log,
//! the [`TriggerDetector`] drains the log and queues a [`PendingTrigger`]
//! for every triggered ability whose [`TriggerSpec`] matches, and the game
//! puts queued triggers on the stack in APNAP order before the next player
//! receives priority.
//!
//! ## Key Components
//!
//! - [`GameEvent`]: something that happened
//! - [`TriggerSpec`]: event kind, binding, filters and intervening "if"
//! - [`TriggerRegistry`]: delayed and global triggers
//! - [`TriggerDetector`]: matches events against every trigger source

mod condition;
mod event;
mod registry;

pub use condition::{TriggerBinding, TriggerEvent, TriggerSpec};
pub use event::GameEvent;
pub use registry::{PendingTrigger, RegisteredTrigger, TriggerDetector, TriggerId, TriggerRegistry};
