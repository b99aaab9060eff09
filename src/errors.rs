// ABOUTME: Centralized error handling for the enricher worker
// ABOUTME: Classifies failures into retryable and non-retryable for bus disposition
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FitGlue

use thiserror::Error;
use uuid::Uuid;

use fitglue_core::errors::CoreError;

/// Worker-level errors returned from one invocation.
///
/// The return value drives the message-bus disposition: `Retryable` is the
/// only variant the host NACKs for backoff redelivery; every other variant
/// is a non-retryable error return.
#[derive(Debug, Error)]
pub enum EnricherError {
    /// Payload or configuration failed validation; non-retryable
    #[error("validation failed: {0}")]
    Validation(#[from] CoreError),

    /// The raw event payload did not deserialize
    #[error("malformed raw event payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    /// No user record exists for the event's user id; fatal
    #[error("user {0} not found")]
    UserNotFound(Uuid),

    /// Upstream data has not settled; NACK so the bus redelivers with backoff
    #[error("lagged retry: {reason}")]
    Retryable {
        /// Why the invocation must be retried
        reason: String,
    },

    /// The invocation exceeded its wall-clock deadline; non-retryable
    #[error("invocation deadline of {seconds}s exceeded")]
    DeadlineExceeded {
        /// The configured deadline in seconds
        seconds: u64,
    },

    /// A store or collaborator call failed in a way that dooms the invocation
    #[error("store operation failed: {0}")]
    Store(#[source] anyhow::Error),
}

impl EnricherError {
    /// Whether the host should NACK for bus-managed backoff retry
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable { .. })
    }
}
