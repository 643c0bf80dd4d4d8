//! The four promotional stages, applied in a fixed order by the engine.
//!
//! Each stage is a plain function `fn(&StageEnv, Pass) -> Pass`. A stage
//! reads the context and snapshot, consults only the current running totals,
//! and returns the next pass.

pub(crate) mod coupon;
pub(crate) mod discount_rules;
pub(crate) mod rewards;
pub(crate) mod subscription;

use crate::pass::Pass;
use crate::scope::LocalClock;
use chrono::{DateTime, Utc};
use dsh_core::incentives::{IncentiveContext, IncentivesSnapshot};

/// Read-only inputs shared by every stage of one calculation.
pub(crate) struct StageEnv<'a> {
    pub snapshot: &'a IncentivesSnapshot,
    pub context: &'a IncentiveContext,
    /// Context service, or the snapshot's service code when absent.
    pub service: &'a str,
    pub now: DateTime<Utc>,
    pub clock: LocalClock,
}

impl<'a> StageEnv<'a> {
    pub fn new(
        snapshot: &'a IncentivesSnapshot,
        context: &'a IncentiveContext,
        fallback_now: DateTime<Utc>,
    ) -> Self {
        let now = context.timestamp.unwrap_or(fallback_now);
        Self {
            snapshot,
            context,
            service: context
                .service
                .as_deref()
                .unwrap_or(snapshot.meta.service_code.as_str()),
            now,
            clock: LocalClock::at(now, snapshot.local_offset()),
        }
    }
}

pub(crate) type Stage = fn(&StageEnv<'_>, Pass) -> Pass;
