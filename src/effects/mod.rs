//! Effects, targets, filters and amounts.
//!
//! An ability's effect is an [`Effect`] tree of [`Action`]s. Everything in
//! the tree that refers to the game does so relative to an
//! [`EffectContext`]: "the source", "target 0", "each opponent", "the
//! creature that died". Filters and amounts are evaluated against an
//! [`Env`], a state paired with the characteristics computed from it.
//!
//! ## Key Types
//!
//! - `Effect` / `Action`: what an ability does
//! - `TargetSpec` / `TargetValidator`: what may be targeted, and the
//!   legality checks on declaration and resolution
//! - `ObjectFilter` / `PlayerFilter`: predicates over objects and players
//! - `DynamicAmount` / `Condition`: values and tests computed from the game
//! - `EffectResolver`: applies effects to a state
//!
//! ## Example
//!
//! ```
//! use ccg_rules::effects::{Action, DynamicAmount, Effect, PlayerRef};
//!
//! // "You gain 2 life, then draw a card."
//! let effect = Effect::simple(Action::GainLife {
//!     player: PlayerRef::You,
//!     amount: DynamicAmount::Fixed(2),
//! })
//! .then(Effect::simple(Action::DrawCards {
//!     player: PlayerRef::You,
//!     amount: DynamicAmount::Fixed(1),
//! }));
//! assert!(!effect.is_empty());
//! ```

mod amount;
mod context;
mod effect;
mod filter;
mod resolver;
mod targeting;

pub use amount::{AmountEvaluator, Comparison, Condition, DynamicAmount};
pub use context::{EffectContext, Env, ObjectRef, ObjectView, PlayerRef, TriggerContext};
pub use effect::{Action, Effect, Group, Recipient, ReflexiveAbility};
pub use filter::{ObjectFilter, PlayerFilter};
pub use resolver::EffectResolver;
pub use targeting::{Recheck, TargetFilter, TargetRef, TargetSpec, TargetValidator};
