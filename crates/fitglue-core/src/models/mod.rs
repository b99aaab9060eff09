// ABOUTME: Core data models module organizing activity, user, and execution types
// ABOUTME: Re-exports the full domain model at the models root
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FitGlue

/// Standardized activity, session, lap, record, and strength-set models
pub mod activity;

/// Execution audit records and pending-input rows
pub mod execution;

/// User records, plans, integrations, and pipeline configuration
pub mod user;

pub use activity::{
    ActivityType, Lap, MuscleGroup, Record, Session, StandardizedActivity, StrengthSet,
};
pub use execution::{ExecutionRecord, ExecutionStatus, PendingInput, PendingInputStatus};
pub use user::{
    Destination, EnricherConfig, Integration, PipelineConfig, Plan, ProviderKind, UserRecord,
};
