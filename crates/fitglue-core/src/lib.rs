// ABOUTME: Core domain types for the FitGlue activity enrichment pipeline
// ABOUTME: Foundation crate with activity, user, pipeline, and execution models
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FitGlue

#![deny(unsafe_code)]

//! # FitGlue Core
//!
//! Foundation crate providing the domain model shared by the enricher worker
//! and the provider catalogue. This crate is designed to change infrequently,
//! enabling incremental compilation benefits in the workspace.
//!
//! ## Modules
//!
//! - **models**: standardized activities, user records, pipeline
//!   configuration, and execution audit rows
//! - **errors**: domain validation errors (`CoreError`)

/// Domain validation errors shared across the workspace
pub mod errors;

/// Core data models (activities, users, pipelines, executions)
pub mod models;

pub use errors::CoreError;
