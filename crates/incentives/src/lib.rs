//! DSH incentives engine.
//!
//! Applies subscription benefits, scoped discount rules, loyalty-point
//! redemption and coupons to a base subtotal and delivery fee, then enforces
//! the stacking guards. Every change to the totals is recorded as an
//! adjustment so the result can be replayed and audited.

pub mod audit;
pub mod calculator;
pub mod engine;
mod guardrails;
pub mod pass;
pub mod scope;
mod stages;

#[cfg(test)]
mod testkit;

pub use audit::{replay, verify, AuditMismatch};
pub use engine::IncentivesEngine;
pub use pass::RunningTotals;
