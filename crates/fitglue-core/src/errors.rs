// ABOUTME: Domain validation error types for the FitGlue core models
// ABOUTME: Covers payload-structure and configuration-shape failures
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FitGlue

use thiserror::Error;

/// Validation errors raised by the core domain model.
///
/// All variants are non-retryable: a payload that fails these checks will
/// fail them on every redelivery, so callers must not requeue on them.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The activity carries no session at all
    #[error("activity has no session")]
    MissingSession,

    /// The session's total elapsed time is zero or negative
    #[error("session elapsed time must be greater than zero")]
    ZeroElapsedTime,

    /// A plan string did not match any known plan
    #[error("invalid plan: {0}")]
    InvalidPlan(String),

    /// A provider-type string did not match any known provider
    #[error("invalid provider type: {0}")]
    InvalidProviderType(String),

    /// A typed-config value failed manifest validation
    #[error("invalid config for field '{field}': {reason}")]
    InvalidConfig {
        /// The manifest field that failed validation
        field: String,
        /// Human-readable failure description
        reason: String,
    },
}
