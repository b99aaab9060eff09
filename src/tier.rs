// ABOUTME: Tier gate checking the user's monthly sync quota before processing
// ABOUTME: Month rollover resets the counter before the gate check
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FitGlue

use chrono::{DateTime, Utc};

use fitglue_core::models::UserRecord;

/// Outcome of the tier gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierGate {
    /// Processing may proceed
    Allowed,
    /// The monthly quota is exhausted; short-circuit with SKIPPED
    Exhausted {
        /// The plan's monthly limit
        limit: u32,
    },
}

/// Check the user's monthly quota, rolling the counter over first when the
/// stored month marker differs from the current month.
///
/// Mutates the in-memory snapshot only; the persisted counter is written
/// back by the store at the end of a successful invocation.
pub fn check(user: &mut UserRecord, now: DateTime<Utc>) -> TierGate {
    let month = UserRecord::month_marker(now);
    if user.sync_count_month != month {
        user.sync_count_month = month;
        user.sync_count_this_month = 0;
    }

    match user.plan.monthly_limit() {
        Some(limit) if user.sync_count_this_month >= limit => TierGate::Exhausted { limit },
        _ => TierGate::Allowed,
    }
}
