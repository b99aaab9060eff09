// ABOUTME: FitGlue enricher worker: per-message pipeline orchestration over raw activities
// ABOUTME: Exposes orchestrator, resolver, lag controller, tier gate, FIT encoder, and contracts
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FitGlue

#![deny(unsafe_code)]

//! # FitGlue Enricher
//!
//! A stateless worker that consumes one raw activity event and produces zero
//! or more enriched, standardized activity events, each annotated with
//! descriptive text, merged sensor streams, and a binary FIT artifact.
//!
//! Data flow: raw event → tier gate → pipeline resolver → orchestrator (per
//! pipeline: provider chain → fan-in → FIT encoding → artifact store) →
//! published enriched events. Retryable provider failures hand off to the
//! lag controller instead of emitting.

/// Event publisher contract and topic names
pub mod bus;

/// Environment-based configuration
pub mod config;

/// Worker error types and retryability classification
pub mod errors;

/// Event payloads and the bus envelope
pub mod events;

/// FIT binary artifact encoding
pub mod fit;

/// Data-lag queueing protocol
pub mod lag;

/// Logging configuration
pub mod logging;

/// Push-notification collaborator contract
pub mod notify;

/// Per-message orchestration
pub mod orchestrator;

/// Pipeline resolution against user configuration
pub mod pipeline;

/// Store contracts and in-memory implementations
pub mod stores;

/// Monthly sync quota gating
pub mod tier;

pub use errors::EnricherError;
pub use orchestrator::{Enricher, EnricherDeps, InvocationSummary};
