//! Zones and zone changes.
//!
//! ## Key Types
//!
//! - `ZoneId` / `ZoneKind`: concrete zones and their kinds
//! - `ZoneManager`: which zone each live object is in, and zone order
//! - `ZoneMove` / `ZoneMover`: rules-aware moves with replacement effects,
//!   new identities and last-known information

pub mod manager;
pub mod movement;
pub mod zone;

pub use manager::{ZoneManager, ZonePosition};
pub use movement::{ZoneMove, ZoneMover};
pub use zone::{ZoneId, ZoneKind, ZoneVisibility};
