//! Card data: characteristics, definitions, game objects, and the registry.
//!
//! ## Key Types
//!
//! - `Characteristics`: name, cost, colors, types, P/T, keywords, abilities
//! - `CardDefinition`: immutable card data consumed from the catalog
//! - `GameObject`: a card or token in a zone, with counters and attachments
//! - `CardRegistry`: definition lookup

pub mod characteristics;
pub mod definition;
pub mod object;
pub mod registry;

pub use characteristics::{CardType, Characteristics, Color, Keyword, Subtype, Supertype};
pub use definition::{CardDefinition, CardId, CardMetadata, DynamicStats, SpellAbility};
pub use object::{CounterKind, Counters, GameObject};
pub use registry::CardRegistry;
