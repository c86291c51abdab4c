//! Continuous effects and the layer system.
//!
//! ## Key Types
//!
//! - `ContinuousEffect`: a registered effect with its modifications
//! - `Modification`: one change, tagged with the layer it applies in
//! - `LayerSystem`: derives effective characteristics on demand
//! - `CharacteristicsTable`: the derived values for one moment

pub mod continuous;
mod dependency;
pub mod system;
pub mod table;

pub use continuous::{Affected, ContinuousEffect, Duration, EffectId, Layer, Modification};
pub use system::LayerSystem;
pub use table::{CharacteristicsTable, EffectiveObject};

pub(crate) use system::effect_is_active;
