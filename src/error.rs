//! Error taxonomy for the rules engine.
//!
//! Three categories are recoverable and never leave the component that
//! detected them once resolution is underway: [`RulesError::IllegalTarget`],
//! [`RulesError::UnpayableCost`] and [`RulesError::NoLegalChoice`]. They reach
//! a caller only from declaration-time calls (casting, activating, paying),
//! and in that case the game state is untouched.
//!
//! [`RulesError::InvariantViolation`] is fatal. It signals an authoring or
//! engine bug (a layer dependency cycle, a negative counter count, a replayed
//! decision that no longer fits) and always surfaces to the caller.

use thiserror::Error;

use crate::core::ObjectId;

/// Errors produced by the rules engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RulesError {
    #[error("illegal target: {0}")]
    IllegalTarget(String),

    #[error("unpayable cost: {0}")]
    UnpayableCost(#[from] CostError),

    #[error("no legal choice: {0}")]
    NoLegalChoice(String),

    #[error("invalid action: {0}")]
    InvalidAction(String),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("snapshot error: {0}")]
    Snapshot(String),
}

impl RulesError {
    /// Shorthand for an [`RulesError::InvariantViolation`].
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation(message.into())
    }

    /// Whether the error leaves the game in a playable state.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::InvariantViolation(_) | Self::Snapshot(_))
    }
}

impl From<bincode::Error> for RulesError {
    fn from(err: bincode::Error) -> Self {
        Self::Snapshot(err.to_string())
    }
}

/// Why a cost could not be paid.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CostError {
    #[error("not enough mana to pay {0}")]
    InsufficientMana(String),

    #[error("cannot pay {needed} life with {available}")]
    InsufficientLife { needed: i64, available: i64 },

    #[error("{0} is already tapped")]
    SourceTapped(ObjectId),

    #[error("{0} is already untapped")]
    SourceUntapped(ObjectId),

    #[error("{0} has summoning sickness")]
    SummoningSick(ObjectId),

    #[error("{0} is not on the battlefield")]
    SourceUnavailable(ObjectId),

    #[error("cost needs a source object")]
    MissingSource,

    #[error("{what} needs {needed} objects, {chosen} chosen")]
    WrongChoiceCount {
        what: &'static str,
        needed: u32,
        chosen: usize,
    },

    #[error("{0} does not satisfy the cost")]
    InvalidChoice(ObjectId),

    #[error("{0} chosen more than once")]
    DuplicateChoice(ObjectId),

    #[error("not enough {kind} counters on {object}")]
    NotEnoughCounters { object: ObjectId, kind: String },
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RulesError>;
