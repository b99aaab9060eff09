// ABOUTME: Execution audit records and pending-input rows for the enrichment pipeline
// ABOUTME: ExecutionStatus lifecycle, duration capture, and TTL stamping
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FitGlue

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::ProviderKind;

/// Days an execution row lives before the audit store may expire it
const EXECUTION_TTL_DAYS: i64 = 90;

/// Lifecycle status of an execution record.
///
/// Every record must reach a terminal state before the invocation returns.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    /// Created but not yet started
    Pending,
    /// Provider or orchestrator work in flight
    Started,
    /// Completed successfully
    Success,
    /// Failed with a non-retryable error
    Failed,
    /// Provider missing, nil result, or pipeline halted before this step
    Skipped,
    /// Halted pending user-supplied input
    Waiting,
    /// Offloaded to the lag queue or failed back to the bus for backoff retry
    LaggedRetry,
}

impl ExecutionStatus {
    /// Whether this status ends the record's lifecycle
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending | Self::Started)
    }

    /// Severity rank used to aggregate an invocation status: the overall
    /// result is the worst non-skipped status observed.
    #[must_use]
    pub const fn severity(self) -> u8 {
        match self {
            Self::Pending | Self::Started | Self::Skipped => 0,
            Self::Success => 1,
            Self::Waiting => 2,
            Self::LaggedRetry => 3,
            Self::Failed => 4,
        }
    }
}

/// An audit row describing one unit of work: the invocation itself, or a
/// single provider call linked to it by `parent_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    /// Unique execution id
    pub id: Uuid,
    /// Parent execution, set on per-provider rows
    #[serde(default, alias = "parent_id", skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Uuid>,
    /// Owning user
    #[serde(alias = "user_id")]
    pub user_id: Uuid,
    /// Correlates all rows of one pipeline execution
    #[serde(alias = "pipeline_execution_id")]
    pub pipeline_execution_id: Uuid,
    /// Provider type, absent on the root row
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderKind>,
    /// Current lifecycle status
    pub status: ExecutionStatus,
    /// Input snapshot where safe to persist
    #[serde(default, alias = "inputs_json", skip_serializing_if = "Option::is_none")]
    pub inputs_json: Option<serde_json::Value>,
    /// Output snapshot where safe to persist
    #[serde(default, alias = "outputs_json", skip_serializing_if = "Option::is_none")]
    pub outputs_json: Option<serde_json::Value>,
    /// Error description for failed rows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the work started (UTC)
    #[serde(alias = "started_at")]
    pub started_at: DateTime<Utc>,
    /// When the work reached a terminal state
    #[serde(default, alias = "finished_at", skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Wall-clock duration in milliseconds
    #[serde(default, alias = "duration_ms", skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Test-run correlation tag propagated from the event extension
    #[serde(default, alias = "test_run_id", skip_serializing_if = "Option::is_none")]
    pub test_run_id: Option<String>,
    /// TTL horizon after which the audit store may expire the row
    #[serde(alias = "expires_at")]
    pub expires_at: DateTime<Utc>,
}

impl ExecutionRecord {
    /// Start a new record in the STARTED state.
    #[must_use]
    pub fn begin(
        user_id: Uuid,
        pipeline_execution_id: Uuid,
        parent_id: Option<Uuid>,
        provider: Option<ProviderKind>,
        test_run_id: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            parent_id,
            user_id,
            pipeline_execution_id,
            provider,
            status: ExecutionStatus::Started,
            inputs_json: None,
            outputs_json: None,
            error: None,
            started_at: now,
            finished_at: None,
            duration_ms: None,
            test_run_id,
            expires_at: now + Duration::days(EXECUTION_TTL_DAYS),
        }
    }

    /// Transition to a terminal status, capturing the duration.
    pub fn finish(&mut self, status: ExecutionStatus, error: Option<String>) {
        let now = Utc::now();
        self.status = status;
        self.error = error;
        self.finished_at = Some(now);
        let elapsed = now.signed_duration_since(self.started_at);
        self.duration_ms = Some(elapsed.num_milliseconds().max(0) as u64);
    }
}

/// Status of a pending-input row
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PendingInputStatus {
    /// Waiting for the user to supply the missing fields
    Waiting,
    /// The resume path re-injected the original payload
    Resumed,
}

/// A parked activity waiting on user-supplied fields.
///
/// Created by the orchestrator when a provider signals wait-for-input;
/// consumed by the external resume path, which re-publishes the original
/// payload verbatim. Keyed by activity id for idempotency.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PendingInput {
    /// Activity external id; the idempotency key
    #[serde(alias = "activity_id")]
    pub activity_id: String,
    /// Owning user
    #[serde(alias = "user_id")]
    pub user_id: Uuid,
    /// Field names the user must supply
    #[serde(alias = "required_fields")]
    pub required_fields: Vec<String>,
    /// The raw event payload, verbatim, for later re-publish
    #[serde(alias = "original_payload")]
    pub original_payload: serde_json::Value,
    /// Row status
    pub status: PendingInputStatus,
    /// When the row was created
    #[serde(alias = "created_at")]
    pub created_at: DateTime<Utc>,
}
