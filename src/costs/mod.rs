//! Costs and cost payment.
//!
//! - `ManaCost` / `ManaPool`: mana symbols and floating mana
//! - `Cost`: an AND of atomic components (mana, tap, sacrifice, ...)
//! - `CostPaymentEngine`: all-or-nothing validation and payment

pub mod cost;
pub mod mana;
pub mod payment;

pub use cost::{Cost, CostComponent, CostPayment};
pub use mana::{ManaCost, ManaPool, ManaType};
pub use payment::CostPaymentEngine;
