//! Abilities: triggered, activated, static and replacement.
//!
//! Abilities are part of an object's characteristics, so effects in layer 6
//! can grant or remove them. They refer to their source by id only.

pub mod ability;
pub mod replacement;

pub use ability::{Ability, ActivatedAbility, ActivationTiming, StaticAbility, TriggeredAbility};
pub use replacement::{ReplacementAction, ReplacementEffect, ReplacementSpec};
